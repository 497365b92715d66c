//! IR nodes for contracts, functions, statements and expressions.

use crate::ty::Ty;

/// Byte range into the original source.
pub type Span = (usize, usize);

/// A single flattened contract.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contract {
    pub name: String,
    pub state_vars: Vec<StateVar>,
    pub events: Vec<EventDef>,
    pub enums: Vec<EnumDef>,
    pub structs: Vec<StructDef>,
    pub modifiers: Vec<Modifier>,
    pub constructor: Option<Function>,
    pub functions: Vec<Function>,
}

impl Contract {
    pub fn state_var(&self, name: &str) -> Option<&StateVar> {
        self.state_vars.iter().find(|v| v.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn modifier(&self, name: &str) -> Option<&Modifier> {
        self.modifiers.iter().find(|m| m.name == name)
    }
}

/// An interface declaration seen alongside the contracts; contributes method
/// names for cross-contract call routing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interface {
    pub name: String,
    pub functions: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutability {
    Mutable,
    Immutable,
    Constant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl StateMutability {
    /// True when the function cannot write state.
    pub fn is_readonly(self) -> bool {
        matches!(self, Self::Pure | Self::View)
    }
}

/// A contract-level state variable.
#[derive(Clone, Debug, PartialEq)]
pub struct StateVar {
    pub name: String,
    pub ty: Ty,
    pub mutability: Mutability,
    pub visibility: Visibility,
    pub initializer: Option<Expr>,
    pub span: Option<Span>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EventField {
    pub name: String,
    pub ty: Ty,
    pub indexed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EventDef {
    pub name: String,
    pub fields: Vec<EventField>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Ty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
}

/// A modifier applied to a function, with its call arguments. The list on
/// [`Function::modifiers`] is ordered; application is outermost-first.
#[derive(Clone, Debug, PartialEq)]
pub struct ModifierInvocation {
    pub name: String,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub visibility: Visibility,
    pub mutability: StateMutability,
    pub params: Vec<Param>,
    pub returns: Vec<Param>,
    pub modifiers: Vec<ModifierInvocation>,
    pub body: Vec<Stmt>,
    pub span: Option<Span>,
}

impl Function {
    pub fn is_internal(&self) -> bool {
        matches!(self.visibility, Visibility::Internal | Visibility::Private)
    }
}

/// A modifier definition. The body contains exactly one
/// [`Stmt::Placeholder`] where the wrapped body is spliced, or none when the
/// modifier unconditionally aborts.
#[derive(Clone, Debug, PartialEq)]
pub struct Modifier {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

impl Modifier {
    /// Splits the body into statements before and after the placeholder.
    /// With no placeholder, everything is a pre-guard.
    pub fn split_at_placeholder(&self) -> (&[Stmt], &[Stmt]) {
        match self.body.iter().position(|s| matches!(s, Stmt::Placeholder)) {
            Some(i) => (&self.body[..i], &self.body[i + 1..]),
            None => (&self.body[..], &[][..]),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// The closed statement set.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    VarDecl {
        name: String,
        ty: Option<Ty>,
        init: Option<Expr>,
    },
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    Block(Vec<Stmt>),
    Return(Option<Expr>),
    Emit {
        event: String,
        args: Vec<Expr>,
    },
    Revert {
        /// Custom error name from `revert Foo(...)`.
        error: Option<String>,
        /// String message from `revert("...")`.
        message: Option<String>,
    },
    Require {
        cond: Expr,
        message: Option<String>,
    },
    Break,
    Continue,
    Expr(Expr),
    /// `unchecked { ... }`; a transparent delimiter past lowering.
    Unchecked(Vec<Stmt>),
    TryCatch {
        call: Expr,
        success: Vec<Stmt>,
        catch: Vec<Stmt>,
    },
    /// The `_;` marker inside a modifier body.
    Placeholder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    BitNot,
    Neg,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

/// Fields of `msg.*` the IR models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgField {
    Sender,
    Value,
    Data,
    Sig,
}

/// Fields of `block.*` the IR models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockField {
    Timestamp,
    Number,
    ChainId,
    Coinbase,
    Difficulty,
    GasLimit,
    BaseFee,
}

/// Fields of `tx.*` the IR models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxField {
    Origin,
    GasPrice,
}

/// The closed expression set.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Decimal value with scientific exponent and sub-denomination already
    /// folded in; `denom` records the original unit for diagnostics.
    Number {
        value: String,
        denom: Option<String>,
    },
    Bool(bool),
    Str(String),
    /// Hex literal contents without the `hex` keyword or quotes.
    Hex(String),
    /// Address literal including the `0x` prefix.
    Address(String),
    Ident(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        named_args: Vec<(String, Expr)>,
    },
    Member {
        base: Box<Expr>,
        member: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    Cast {
        ty: Ty,
        expr: Box<Expr>,
    },
    New {
        ty: Ty,
        args: Vec<Expr>,
    },
    MsgAccess(MsgField),
    BlockAccess(BlockField),
    TxAccess(TxField),
}

impl Expr {
    pub fn number(value: impl Into<String>) -> Self {
        Self::Number { value: value.into(), denom: None }
    }

    /// The identifier name, if this is a bare identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Self::Ident(name) => Some(name),
            _ => None,
        }
    }
}

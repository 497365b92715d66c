//! Move AST nodes.

use std::fmt;

/// A Move-side type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoveType {
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Bool,
    Address,
    Signer,
    Vector(Box<MoveType>),
    /// `std::string::String`.
    String,
    /// `aptos_std::table::Table<K, V>`.
    Table(Box<MoveType>, Box<MoveType>),
    /// `aptos_std::smart_table::SmartTable<K, V>`.
    SmartTable(Box<MoveType>, Box<MoveType>),
    /// `aptos_framework::aggregator_v2::Aggregator<T>`.
    Aggregator(Box<MoveType>),
    /// `std::option::Option<T>`.
    Option(Box<MoveType>),
    /// A struct or enum declared in the emitted module.
    Struct(String),
    /// An immutable reference.
    Ref(Box<MoveType>),
    /// A mutable reference.
    MutRef(Box<MoveType>),
}

impl MoveType {
    pub fn vector(elem: MoveType) -> Self {
        Self::Vector(Box::new(elem))
    }

    pub fn signer_ref() -> Self {
        Self::Ref(Box::new(Self::Signer))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::U128 | Self::U256)
    }

    pub fn integer_bits(&self) -> Option<u16> {
        Some(match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
            Self::U128 => 128,
            Self::U256 => 256,
            _ => return None,
        })
    }

    /// The literal suffix (`u64`, ...) for this type, if it is an integer.
    pub fn literal_suffix(&self) -> Option<&'static str> {
        Some(match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::U256 => "u256",
            _ => return None,
        })
    }

    /// Whether values of this type can be copied/dropped implicitly; tables
    /// and aggregators cannot.
    pub fn is_copyable(&self) -> bool {
        match self {
            Self::Table(..) | Self::SmartTable(..) | Self::Aggregator(_) | Self::Signer => false,
            Self::Vector(elem) | Self::Option(elem) => elem.is_copyable(),
            // Local structs get their abilities from their fields; the
            // transformer consults the module for those, so plain `Struct`
            // is treated as copyable here and corrected at that level.
            _ => true,
        }
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => f.write_str("u8"),
            Self::U16 => f.write_str("u16"),
            Self::U32 => f.write_str("u32"),
            Self::U64 => f.write_str("u64"),
            Self::U128 => f.write_str("u128"),
            Self::U256 => f.write_str("u256"),
            Self::Bool => f.write_str("bool"),
            Self::Address => f.write_str("address"),
            Self::Signer => f.write_str("signer"),
            Self::Vector(elem) => write!(f, "vector<{elem}>"),
            Self::String => f.write_str("String"),
            Self::Table(k, v) => write!(f, "Table<{k}, {v}>"),
            Self::SmartTable(k, v) => write!(f, "SmartTable<{k}, {v}>"),
            Self::Aggregator(inner) => write!(f, "Aggregator<{inner}>"),
            Self::Option(inner) => write!(f, "Option<{inner}>"),
            Self::Struct(name) => f.write_str(name),
            Self::Ref(inner) => write!(f, "&{inner}"),
            Self::MutRef(inner) => write!(f, "&mut {inner}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Ability {
    Copy,
    Drop,
    Store,
    Key,
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Copy => "copy",
            Self::Drop => "drop",
            Self::Store => "store",
            Self::Key => "key",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveField {
    pub name: String,
    pub ty: MoveType,
}

/// A struct declaration; resource structs carry the `key` ability.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveStruct {
    pub name: String,
    pub abilities: Vec<Ability>,
    pub fields: Vec<MoveField>,
    /// Attribute names rendered as `#[...]` above the declaration.
    pub attributes: Vec<String>,
}

impl MoveStruct {
    pub fn is_resource(&self) -> bool {
        self.abilities.contains(&Ability::Key)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveEnum {
    pub name: String,
    pub abilities: Vec<Ability>,
    pub variants: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveConst {
    pub name: String,
    pub ty: MoveType,
    pub value: MoveExpr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveVisibility {
    Private,
    Public,
    PublicPackage,
    PublicFriend,
}

impl fmt::Display for MoveVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Private => "",
            Self::Public => "public ",
            Self::PublicPackage => "public(package) ",
            Self::PublicFriend => "public(friend) ",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveParam {
    pub name: String,
    pub ty: MoveType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveFunction {
    pub name: String,
    pub visibility: MoveVisibility,
    pub is_entry: bool,
    pub is_inline: bool,
    /// Attribute names rendered as `#[...]` (`view`, ...).
    pub attributes: Vec<String>,
    /// `//` comment lines placed right above the declaration.
    pub leading_comments: Vec<String>,
    pub params: Vec<MoveParam>,
    pub returns: Vec<MoveType>,
    pub acquires: Vec<String>,
    pub body: Vec<MoveStmt>,
}

impl MoveFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: MoveVisibility::Private,
            is_entry: false,
            is_inline: false,
            attributes: Vec::new(),
            leading_comments: Vec::new(),
            params: Vec::new(),
            returns: Vec::new(),
            acquires: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// A `use` declaration; the emitter deduplicates and orders these.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct UseDecl {
    /// e.g. `aptos_std::table::{Self, Table}`.
    pub path: String,
}

impl UseDecl {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// A raw MSL spec block attached to the module.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecBlock {
    /// `spec <target>` header, e.g. a function name or `module`.
    pub target: String,
    pub lines: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoveModule {
    /// Address literal or named address the module is published under.
    pub address: String,
    pub name: String,
    pub uses: Vec<UseDecl>,
    pub friends: Vec<String>,
    pub structs: Vec<MoveStruct>,
    pub enums: Vec<MoveEnum>,
    pub constants: Vec<MoveConst>,
    pub functions: Vec<MoveFunction>,
    pub specs: Vec<SpecBlock>,
}

impl MoveModule {
    pub fn struct_def(&self, name: &str) -> Option<&MoveStruct> {
        self.structs.iter().find(|s| s.name == name)
    }
}

/// The closed statement set of the emitted Move subset.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveStmt {
    Let {
        name: String,
        ty: Option<MoveType>,
        value: Option<MoveExpr>,
    },
    /// `let (a, b) = ...;`
    LetTuple {
        names: Vec<String>,
        value: MoveExpr,
    },
    Assign {
        target: MoveExpr,
        value: MoveExpr,
    },
    If {
        cond: MoveExpr,
        then_branch: Vec<MoveStmt>,
        else_branch: Option<Vec<MoveStmt>>,
    },
    While {
        cond: MoveExpr,
        body: Vec<MoveStmt>,
    },
    Loop {
        body: Vec<MoveStmt>,
    },
    /// `for (name in from..to)`.
    ForRange {
        name: String,
        from: MoveExpr,
        to: MoveExpr,
        body: Vec<MoveStmt>,
    },
    Break,
    Continue,
    Return(Option<MoveExpr>),
    Abort(MoveExpr),
    Expr(MoveExpr),
    /// A `//` comment line.
    Comment(String),
}

/// The closed expression set of the emitted Move subset.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveExpr {
    /// Integer literal; the optional suffix disambiguates width.
    Number {
        value: String,
        suffix: Option<&'static str>,
    },
    Bool(bool),
    /// `@0x...` address literal.
    Address(String),
    /// `b"..."` byte-string literal.
    ByteString(String),
    /// `x"..."` hex literal.
    HexString(String),
    Ident(String),
    /// Free or module-qualified call, e.g. `table::upsert`.
    Call {
        func: String,
        type_args: Vec<MoveType>,
        args: Vec<MoveExpr>,
    },
    /// Receiver-style call, e.g. `agg.add(1)`.
    MethodCall {
        receiver: Box<MoveExpr>,
        method: String,
        args: Vec<MoveExpr>,
    },
    Field {
        base: Box<MoveExpr>,
        field: String,
    },
    Borrow {
        mutable: bool,
        expr: Box<MoveExpr>,
    },
    Deref(Box<MoveExpr>),
    Unary {
        op: &'static str,
        expr: Box<MoveExpr>,
    },
    Binary {
        op: &'static str,
        lhs: Box<MoveExpr>,
        rhs: Box<MoveExpr>,
    },
    Cast {
        expr: Box<MoveExpr>,
        ty: MoveType,
    },
    /// Struct literal `Name { field: value, ... }`.
    Pack {
        name: String,
        fields: Vec<(String, MoveExpr)>,
    },
    /// `vector[...]`.
    VectorLit(Vec<MoveExpr>),
    Tuple(Vec<MoveExpr>),
    /// Expression-position `if`.
    IfElse {
        cond: Box<MoveExpr>,
        if_true: Box<MoveExpr>,
        if_false: Box<MoveExpr>,
    },
}

impl MoveExpr {
    pub fn number(value: impl Into<String>) -> Self {
        Self::Number { value: value.into(), suffix: None }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    pub fn call(func: impl Into<String>, args: Vec<MoveExpr>) -> Self {
        Self::Call { func: func.into(), type_args: Vec::new(), args }
    }

    pub fn field(base: MoveExpr, field: impl Into<String>) -> Self {
        Self::Field { base: Box::new(base), field: field.into() }
    }

    pub fn borrow_mut(expr: MoveExpr) -> Self {
        Self::Borrow { mutable: true, expr: Box::new(expr) }
    }

    pub fn borrow(expr: MoveExpr) -> Self {
        Self::Borrow { mutable: false, expr: Box::new(expr) }
    }

    pub fn binary(op: &'static str, lhs: MoveExpr, rhs: MoveExpr) -> Self {
        Self::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
    }

    pub fn zero() -> Self {
        Self::number("0")
    }
}

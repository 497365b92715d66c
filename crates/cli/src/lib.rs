//! CLI argument parsing and output writing for `solmove`.

pub mod opts;

//! CLI commands

pub mod crop;
pub mod translate;

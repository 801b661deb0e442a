//! CLI command implementations.

pub mod bootstrap;
pub mod import;
pub mod inspect;

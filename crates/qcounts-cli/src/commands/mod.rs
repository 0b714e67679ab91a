//! CLI command implementations.

pub mod common;
pub mod decode;
pub mod run;
pub mod version;

//! Command implementations.

pub mod bootstrap;
pub mod completions;
pub mod migrate;
pub mod status;
pub mod sync;
pub mod version;

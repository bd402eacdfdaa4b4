//! Common test utilities for netbackup integration tests

#[allow(dead_code)]
pub mod fake;
#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fake::*;
#[allow(unused_imports)]
pub use fixtures::*;

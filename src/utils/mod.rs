//! Shared utilities.

pub mod domain;
pub mod retry;

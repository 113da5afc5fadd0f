//! Core types and pipeline logic.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod policy;

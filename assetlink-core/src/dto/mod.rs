//! Data Transfer Objects
//!
//! Records handed from the bridge back to the orchestrator.

pub mod materialization;

//! Core domain types
//!
//! These types describe both sides of the bridge: the pipeline engine's
//! resources and run reports, and the orchestrator's asset keys and specs.
//! They carry structure only; derivation and execution logic lives in
//! `assetlink-bridge`.

pub mod asset;
pub mod metadata;
pub mod report;
pub mod resource;

//! Assetlink Core
//!
//! Core types shared by the Assetlink bridge, its connectors and the CLI.
//!
//! This crate contains:
//! - Domain types: pipeline resources, asset keys and specs, run reports,
//!   metadata values
//! - DTOs: completion records handed back to the orchestrator

pub mod domain;
pub mod dto;

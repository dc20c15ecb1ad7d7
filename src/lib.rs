//! # Skylift
//!
//! Turns a free-text deployment request plus a repository into running
//! cloud infrastructure, end to end: analyze the code and the request,
//! pick a deployment strategy, assemble a concrete configuration, render
//! infrastructure templates, and drive the provisioning tool.
//!
//! ## Modules
//!
//! - `analysis` - Codebase inspection and request intent extraction
//! - `strategy` - Deterministic deployment strategy selection
//! - `config` - Deployment configuration assembly
//! - `iac` - Infrastructure template and bootstrap script generation
//! - `provision` - Provisioning tool driver over a testable process layer
//! - `orchestrator` - Deployment lifecycle, records, and reconciliation
pub mod analysis;
pub mod config;
pub mod error;
pub mod iac;
pub mod orchestrator;
pub mod provision;
pub mod strategy;

pub use error::{Error, Result};

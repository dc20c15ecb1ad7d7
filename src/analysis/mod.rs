//! Collaborator contracts for codebase and intent inspection
//!
//! The orchestrator consumes two immutable snapshots per deployment: a
//! `CodeAnalysis` describing the application source and an `IntentAnalysis`
//! describing what the user asked for. Both are produced behind trait seams
//! so they can be swapped for richer implementations (or mocks in tests).

pub mod code;
pub mod intent;

pub use code::HeuristicInspector;
pub use intent::KeywordExtractor;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Characteristics of the application source code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeAnalysis {
    pub language: String,
    pub framework: String,
    pub app_type: String,
    pub port: Option<u16>,
    pub dependencies: Vec<String>,
    pub build_commands: Vec<String>,
    pub start_commands: Vec<String>,
    pub environment_variables: Vec<String>,
    pub database_requirements: Vec<String>,
    pub dockerized: bool,
    pub static_files: bool,
}

impl Default for CodeAnalysis {
    fn default() -> Self {
        Self {
            language: "unknown".to_string(),
            framework: "none".to_string(),
            app_type: "unknown".to_string(),
            port: None,
            dependencies: Vec::new(),
            build_commands: Vec::new(),
            start_commands: Vec::new(),
            environment_variables: Vec::new(),
            database_requirements: Vec::new(),
            dockerized: false,
            static_files: false,
        }
    }
}

/// Requirements extracted from the free-text deployment request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentAnalysis {
    pub cloud_provider: Option<String>,
    pub deployment_type: Option<String>,
    pub environment: String,
    pub scaling_requirements: String,
    pub estimated_traffic: String,
    pub database_needed: bool,
    pub storage_needed: bool,
    pub custom_domain: bool,
    pub https: bool,
    pub monitoring: bool,
    pub requirements: Vec<String>,
}

impl Default for IntentAnalysis {
    fn default() -> Self {
        Self {
            cloud_provider: None,
            deployment_type: None,
            environment: "production".to_string(),
            scaling_requirements: "medium".to_string(),
            estimated_traffic: "medium".to_string(),
            database_needed: false,
            storage_needed: false,
            custom_domain: false,
            https: false,
            monitoring: false,
            requirements: Vec::new(),
        }
    }
}

/// Inspects an application source reference and classifies it
#[async_trait]
pub trait CodeInspector: Send + Sync {
    async fn analyze(&self, source: &str) -> Result<CodeAnalysis>;
}

/// Extracts deployment requirements from a free-text description
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, description: &str) -> Result<IntentAnalysis>;
}

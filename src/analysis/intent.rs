//! Rule-based requirement extraction from free-text deployment requests

use super::{IntentAnalysis, IntentExtractor};
use crate::error::Result;
use async_trait::async_trait;

pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    fn contains_any(text: &str, needles: &[&str]) -> bool {
        needles.iter().any(|n| text.contains(n))
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentExtractor for KeywordExtractor {
    async fn extract(&self, description: &str) -> Result<IntentAnalysis> {
        let text = description.to_lowercase();
        let mut intent = IntentAnalysis::default();

        intent.cloud_provider = if text.contains("aws") || text.contains("amazon") {
            Some("aws".to_string())
        } else if text.contains("gcp") || text.contains("google cloud") {
            Some("gcp".to_string())
        } else if text.contains("azure") {
            Some("azure".to_string())
        } else {
            None
        };

        intent.deployment_type = if Self::contains_any(&text, &["kubernetes", "k8s"]) {
            Some("kubernetes".to_string())
        } else if Self::contains_any(&text, &["serverless", "lambda", "faas"]) {
            Some("serverless".to_string())
        } else if Self::contains_any(&text, &["static site", "static website"]) {
            Some("static".to_string())
        } else if Self::contains_any(&text, &["as a container", "containerized"]) {
            Some("container".to_string())
        } else if Self::contains_any(&text, &["virtual machine", "on a vm", "on an ec2"]) {
            Some("vm".to_string())
        } else {
            None
        };

        if Self::contains_any(&text, &["staging", "test environment", "dev environment"]) {
            intent.environment = "staging".to_string();
        }

        if Self::contains_any(&text, &["high traffic", "heavy traffic", "millions of"]) {
            intent.estimated_traffic = "high".to_string();
        } else if Self::contains_any(&text, &["low traffic", "small project", "hobby"]) {
            intent.estimated_traffic = "low".to_string();
        }

        if Self::contains_any(&text, &["auto-scal", "autoscal", "scale up", "high scal"]) {
            intent.scaling_requirements = "high".to_string();
        }

        intent.database_needed =
            Self::contains_any(&text, &["database", "postgres", "mysql", "mongodb"]);
        intent.storage_needed =
            Self::contains_any(&text, &["file storage", "object storage", "uploads", "s3"]);
        intent.custom_domain = Self::contains_any(&text, &["custom domain", "my domain"]);
        intent.https = Self::contains_any(&text, &["https", "ssl", "tls", "secure connection"]);
        intent.monitoring =
            Self::contains_any(&text, &["monitoring", "metrics", "alerting", "observability"]);

        if Self::contains_any(&text, &["high availability", "highly available", "fault tolerant"]) {
            intent.requirements.push("high-availability".to_string());
        }
        if intent.https {
            intent.requirements.push("https".to_string());
        }

        Ok(intent)
    }
}

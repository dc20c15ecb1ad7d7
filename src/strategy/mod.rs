//! Deployment strategy engine
//!
//! Pure decision logic: given the code and intent analyses, pick one of a
//! closed set of deployment shapes and derive its fixed sub-configuration.
//! The engine never fails; ambiguous input falls through to the `Vm`
//! default so a deployment always has a workable shape.

use crate::analysis::{CodeAnalysis, IntentAnalysis};
use serde::{Deserialize, Serialize};

/// Frameworks small enough to run well on a function platform.
const STATELESS_FRAMEWORKS: &[&str] = &["express", "fastapi", "koa", "fastify"];

/// Frameworks that expect a full long-lived runtime stack.
const FULL_RUNTIME_FRAMEWORKS: &[&str] = &["django", "rails", "spring", "laravel"];

const SERVERLESS_DEPENDENCY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Static,
    Serverless,
    Container,
    Vm,
    Kubernetes,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Static => "static",
            StrategyKind::Serverless => "serverless",
            StrategyKind::Container => "container",
            StrategyKind::Vm => "vm",
            StrategyKind::Kubernetes => "kubernetes",
        }
    }

    /// Parse an explicitly requested deployment type.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "static" => Some(StrategyKind::Static),
            "serverless" => Some(StrategyKind::Serverless),
            "container" => Some(StrategyKind::Container),
            "vm" => Some(StrategyKind::Vm),
            "kubernetes" => Some(StrategyKind::Kubernetes),
            _ => None,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Fixed per-kind infrastructure profile, filled from a static table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfrastructureProfile {
    pub resources: Vec<String>,
    pub cost_tier: Tier,
    pub complexity: Tier,
    pub scalability: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkingProfile {
    pub load_balanced: bool,
    pub cdn: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityProfile {
    pub tls_recommended: bool,
    pub waf_recommended: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoringProfile {
    pub enhanced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub reasoning: Vec<String>,
    pub infrastructure: InfrastructureProfile,
    pub networking: NetworkingProfile,
    pub security: SecurityProfile,
    pub monitoring: MonitoringProfile,
}

/// Decide the deployment shape. First matching rule wins; every match
/// records why it fired. Falls through to `Vm` on any ambiguity.
pub fn decide(code: &CodeAnalysis, intent: &IntentAnalysis, _description: &str) -> Strategy {
    let mut reasoning = Vec::new();

    // Rule 1: an explicitly requested type always wins.
    if let Some(requested) = intent.deployment_type.as_deref() {
        if let Some(kind) = StrategyKind::parse(requested) {
            reasoning.push(format!("deployment type '{requested}' explicitly requested"));
            return build(kind, reasoning);
        }
        reasoning.push(format!(
            "requested deployment type '{requested}' not recognized, falling back to heuristics"
        ));
    }

    // Rule 2: static content with no backend framework.
    if code.framework == "none" && code.static_files {
        reasoning.push("static assets with no backend framework detected".to_string());
        return build(StrategyKind::Static, reasoning);
    }

    // Rule 3: small stateless apps fit a function platform.
    if STATELESS_FRAMEWORKS.contains(&code.framework.as_str())
        && code.dependencies.len() < SERVERLESS_DEPENDENCY_LIMIT
        && code.database_requirements.is_empty()
        && intent.estimated_traffic != "high"
    {
        reasoning.push(format!(
            "stateless framework '{}' with few dependencies and no database",
            code.framework
        ));
        return build(StrategyKind::Serverless, reasoning);
    }

    // Rule 4: workloads that need a full runtime or already ship one.
    if code.dockerized
        || intent.database_needed
        || intent.scaling_requirements == "high"
        || FULL_RUNTIME_FRAMEWORKS.contains(&code.framework.as_str())
    {
        reasoning.push(
            "containerized source, database need, or full-runtime framework detected".to_string(),
        );
        return build(StrategyKind::Container, reasoning);
    }

    // Rule 5: heavy traffic or availability demands.
    if intent.estimated_traffic == "high"
        || intent.scaling_requirements == "high"
        || code.database_requirements.len() > 1
        || intent.requirements.iter().any(|r| r == "high-availability")
    {
        reasoning.push("high traffic, scaling, or availability requirements".to_string());
        return build(StrategyKind::Kubernetes, reasoning);
    }

    // Rule 6: default shape for everything else.
    reasoning.push("no specific signals detected, defaulting to a virtual machine".to_string());
    build(StrategyKind::Vm, reasoning)
}

fn build(kind: StrategyKind, reasoning: Vec<String>) -> Strategy {
    Strategy {
        kind,
        infrastructure: profile_for(kind),
        networking: networking_for(kind),
        security: security_for(kind),
        monitoring: MonitoringProfile {
            enhanced: matches!(kind, StrategyKind::Kubernetes | StrategyKind::Container),
        },
        reasoning,
    }
}

fn profile_for(kind: StrategyKind) -> InfrastructureProfile {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    match kind {
        StrategyKind::Static => InfrastructureProfile {
            resources: strings(&["cdn", "object-storage"]),
            cost_tier: Tier::VeryLow,
            complexity: Tier::Low,
            scalability: Tier::High,
        },
        StrategyKind::Serverless => InfrastructureProfile {
            resources: strings(&["function", "api-gateway"]),
            cost_tier: Tier::Low,
            complexity: Tier::Low,
            scalability: Tier::VeryHigh,
        },
        StrategyKind::Container => InfrastructureProfile {
            resources: strings(&["container-service", "load-balancer", "container-registry"]),
            cost_tier: Tier::Medium,
            complexity: Tier::Medium,
            scalability: Tier::High,
        },
        StrategyKind::Vm => InfrastructureProfile {
            resources: strings(&["compute-instance", "load-balancer"]),
            cost_tier: Tier::Medium,
            complexity: Tier::Medium,
            scalability: Tier::Medium,
        },
        StrategyKind::Kubernetes => InfrastructureProfile {
            resources: strings(&["kubernetes-cluster", "load-balancer", "container-registry"]),
            cost_tier: Tier::High,
            complexity: Tier::High,
            scalability: Tier::VeryHigh,
        },
    }
}

fn networking_for(kind: StrategyKind) -> NetworkingProfile {
    NetworkingProfile {
        load_balanced: !matches!(kind, StrategyKind::Static | StrategyKind::Serverless),
        cdn: matches!(kind, StrategyKind::Static),
    }
}

fn security_for(kind: StrategyKind) -> SecurityProfile {
    SecurityProfile {
        tls_recommended: true,
        waf_recommended: matches!(kind, StrategyKind::Kubernetes),
    }
}

//! Deployment configuration assembly
//!
//! Combines the strategy decision with the code and intent analyses into
//! one complete `DeploymentConfig`, the single input consumed by template
//! generation and provisioning. Pure and deterministic.

use crate::analysis::{CodeAnalysis, IntentAnalysis};
use crate::strategy::{Strategy, StrategyKind};
use serde::{Deserialize, Serialize};

/// Environment variable name fragments that indicate a secret.
const SECRET_KEYWORDS: &[&str] = &["password", "secret", "key", "token", "api"];

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub name: String,
    pub language: String,
    pub framework: String,
    pub port: u16,
    pub repository_url: String,
    pub dockerized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfrastructureConfig {
    pub strategy: StrategyKind,
    pub region: String,
    pub instance_type: String,
    pub instance_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkingConfig {
    pub vpc_cidr: String,
    pub public_subnet_cidr: String,
    pub private_subnet_cidr: String,
    pub ingress_ports: Vec<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityConfig {
    pub enable_tls: bool,
    pub use_secret_manager: bool,
    pub enable_waf: bool,
    pub secrets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitoringConfig {
    pub collect_logs: bool,
    pub collect_metrics: bool,
    pub alarms: bool,
    pub tracing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub engine: String,
    pub instance_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectStorageConfig {
    pub bucket_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentConfig {
    pub app: AppConfig,
    pub infrastructure: InfrastructureConfig,
    pub networking: NetworkingConfig,
    pub security: SecurityConfig,
    pub monitoring: MonitoringConfig,
    pub database: Option<DatabaseConfig>,
    pub object_storage: Option<ObjectStorageConfig>,
}

/// Assemble the complete deployment configuration for one deployment id.
pub fn assemble(
    strategy: &Strategy,
    code: &CodeAnalysis,
    intent: &IntentAnalysis,
    deployment_id: &str,
    repository_url: &str,
) -> DeploymentConfig {
    let port = code.port.unwrap_or_else(|| infer_port(&code.framework));
    let name_prefix: String = deployment_id.chars().take(8).collect();

    let app = AppConfig {
        name: format!("app-{name_prefix}"),
        language: code.language.clone(),
        framework: code.framework.clone(),
        port,
        repository_url: repository_url.to_string(),
        dockerized: code.dockerized,
    };

    let infrastructure = InfrastructureConfig {
        strategy: strategy.kind,
        region: DEFAULT_REGION.to_string(),
        instance_type: instance_type_for(strategy.kind).to_string(),
        instance_count: instance_count_for(strategy.kind),
    };

    let networking = NetworkingConfig {
        vpc_cidr: "10.0.0.0/16".to_string(),
        public_subnet_cidr: "10.0.1.0/24".to_string(),
        private_subnet_cidr: "10.0.2.0/24".to_string(),
        ingress_ports: ingress_ports(port),
    };

    let secrets = detect_secrets(&code.environment_variables);
    let security = SecurityConfig {
        enable_tls: intent.https || intent.custom_domain,
        use_secret_manager: !secrets.is_empty(),
        enable_waf: intent.requirements.iter().any(|r| r == "high-availability"),
        secrets,
    };

    let monitoring = MonitoringConfig {
        collect_logs: true,
        collect_metrics: true,
        alarms: intent.monitoring,
        tracing: intent.monitoring,
    };

    let database = if intent.database_needed || !code.database_requirements.is_empty() {
        Some(DatabaseConfig {
            engine: code
                .database_requirements
                .first()
                .cloned()
                .unwrap_or_else(|| "postgresql".to_string()),
            instance_class: "db.t3.micro".to_string(),
        })
    } else {
        None
    };

    let object_storage = if intent.storage_needed {
        Some(ObjectStorageConfig {
            bucket_name: format!("app-{name_prefix}-storage"),
        })
    } else {
        None
    };

    DeploymentConfig {
        app,
        infrastructure,
        networking,
        security,
        monitoring,
        database,
        object_storage,
    }
}

/// Default port by framework when the code analysis did not detect one.
fn infer_port(framework: &str) -> u16 {
    match framework {
        "flask" => 5000,
        "django" | "fastapi" => 8000,
        "spring" => 8080,
        "express" | "koa" | "fastify" | "node" => 3000,
        _ => DEFAULT_PORT,
    }
}

/// Web ports plus the application port, deduplicated, stable order.
fn ingress_ports(app_port: u16) -> Vec<u16> {
    let mut ports = vec![22, 80, 443];
    if !ports.contains(&app_port) {
        ports.push(app_port);
    }
    ports
}

fn instance_type_for(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::Static | StrategyKind::Serverless => "t3.micro",
        StrategyKind::Vm => "t3.small",
        StrategyKind::Container => "t3.medium",
        StrategyKind::Kubernetes => "t3.large",
    }
}

fn instance_count_for(kind: StrategyKind) -> u32 {
    match kind {
        StrategyKind::Kubernetes => 3,
        StrategyKind::Container => 2,
        _ => 1,
    }
}

/// Case-insensitive substring match over environment variable names.
fn detect_secrets(env_vars: &[String]) -> Vec<String> {
    env_vars
        .iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            SECRET_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy;

    fn assemble_for(code: CodeAnalysis, intent: IntentAnalysis) -> DeploymentConfig {
        let decision = strategy::decide(&code, &intent, "");
        assemble(&decision, &code, &intent, "abc12345-rest", "https://example/repo")
    }

    #[test]
    fn flask_defaults_to_port_5000() {
        let code = CodeAnalysis {
            language: "python".to_string(),
            framework: "flask".to_string(),
            port: None,
            ..CodeAnalysis::default()
        };
        let config = assemble_for(code, IntentAnalysis::default());
        assert_eq!(config.app.port, 5000);
        assert_eq!(config.app.name, "app-abc12345");
    }

    #[test]
    fn detected_port_wins_over_table() {
        let code = CodeAnalysis {
            framework: "flask".to_string(),
            port: Some(9000),
            ..CodeAnalysis::default()
        };
        let config = assemble_for(code, IntentAnalysis::default());
        assert_eq!(config.app.port, 9000);
        assert!(config.networking.ingress_ports.contains(&9000));
    }

    #[test]
    fn unknown_framework_defaults_to_8080() {
        let config = assemble_for(CodeAnalysis::default(), IntentAnalysis::default());
        assert_eq!(config.app.port, 8080);
    }

    #[test]
    fn secret_detection_matches_substrings_case_insensitively() {
        let secrets = detect_secrets(&[
            "DB_PASSWORD".to_string(),
            "DB_HOST".to_string(),
            "stripe_Api_endpoint".to_string(),
            "AUTH_TOKEN".to_string(),
        ]);
        assert!(secrets.contains(&"DB_PASSWORD".to_string()));
        assert!(secrets.contains(&"stripe_Api_endpoint".to_string()));
        assert!(secrets.contains(&"AUTH_TOKEN".to_string()));
        assert!(!secrets.contains(&"DB_HOST".to_string()));
    }

    #[test]
    fn secret_manager_flag_follows_detected_secrets() {
        let code = CodeAnalysis {
            environment_variables: vec!["DB_PASSWORD".to_string()],
            ..CodeAnalysis::default()
        };
        let config = assemble_for(code, IntentAnalysis::default());
        assert!(config.security.use_secret_manager);
        assert_eq!(config.security.secrets, vec!["DB_PASSWORD"]);
    }

    #[test]
    fn database_descriptor_from_intent_or_code() {
        let intent = IntentAnalysis {
            database_needed: true,
            ..IntentAnalysis::default()
        };
        let config = assemble_for(CodeAnalysis::default(), intent);
        assert_eq!(config.database.unwrap().engine, "postgresql");

        let code = CodeAnalysis {
            database_requirements: vec!["mysql".to_string()],
            ..CodeAnalysis::default()
        };
        let config = assemble_for(code, IntentAnalysis::default());
        assert_eq!(config.database.unwrap().engine, "mysql");

        let config = assemble_for(CodeAnalysis::default(), IntentAnalysis::default());
        assert!(config.database.is_none());
    }

    #[test]
    fn tls_follows_https_or_custom_domain() {
        let intent = IntentAnalysis {
            https: true,
            ..IntentAnalysis::default()
        };
        assert!(assemble_for(CodeAnalysis::default(), intent).security.enable_tls);

        let intent = IntentAnalysis {
            custom_domain: true,
            ..IntentAnalysis::default()
        };
        assert!(assemble_for(CodeAnalysis::default(), intent).security.enable_tls);

        assert!(
            !assemble_for(CodeAnalysis::default(), IntentAnalysis::default())
                .security
                .enable_tls
        );
    }

    #[test]
    fn ingress_never_duplicates_web_ports() {
        let code = CodeAnalysis {
            port: Some(443),
            ..CodeAnalysis::default()
        };
        let config = assemble_for(code, IntentAnalysis::default());
        assert_eq!(config.networking.ingress_ports, vec![22, 80, 443]);
    }
}

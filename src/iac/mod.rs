//! Infrastructure-as-code template generation
//!
//! Pure text synthesis: a `DeploymentConfig` in, a complete set of
//! terraform files plus a host bootstrap script out. The same config must
//! always produce byte-identical output so repeated plan/apply runs stay
//! idempotent and diff-able.

pub mod bootstrap;
pub mod template;

use crate::config::DeploymentConfig;
use crate::error::Result;

/// File names written into the per-deployment working directory. The
/// reconciliation logic keys off `STATE_FILE`, so these are a contract
/// between template generation and the provisioning driver.
pub const MAIN_TF_FILE: &str = "main.tf";
pub const VARIABLES_TF_FILE: &str = "variables.tf";
pub const OUTPUTS_TF_FILE: &str = "outputs.tf";
pub const BOOTSTRAP_FILE: &str = "user_data.sh";
pub const STATE_FILE: &str = "terraform.tfstate";

/// Generated infrastructure description for one deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct IacBundle {
    pub main_tf: String,
    pub variables_tf: String,
    pub outputs_tf: String,
    pub bootstrap_script: String,
}

/// Generate the full template bundle for a deployment configuration.
pub fn generate(config: &DeploymentConfig) -> Result<IacBundle> {
    let engine = template::TemplateEngine::new()?;
    Ok(IacBundle {
        main_tf: engine.render_main(config)?,
        variables_tf: engine.render_variables(config)?,
        outputs_tf: engine.render_outputs(config)?,
        bootstrap_script: bootstrap::script_for(config, &engine)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CodeAnalysis, IntentAnalysis};
    use crate::strategy;
    use pretty_assertions::assert_eq;

    fn flask_config() -> DeploymentConfig {
        let code = CodeAnalysis {
            language: "python".to_string(),
            framework: "flask".to_string(),
            app_type: "flask".to_string(),
            ..CodeAnalysis::default()
        };
        let intent = IntentAnalysis::default();
        let decision = strategy::decide(&code, &intent, "");
        crate::config::assemble(&decision, &code, &intent, "deadbeef01", "https://example/repo")
    }

    #[test]
    fn generation_is_deterministic() {
        let config = flask_config();
        let first = generate(&config).unwrap();
        let second = generate(&config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn main_template_contains_core_resources() {
        let bundle = generate(&flask_config()).unwrap();
        for resource in [
            "aws_vpc",
            "aws_subnet",
            "aws_internet_gateway",
            "aws_security_group",
            "aws_instance",
            "aws_eip",
        ] {
            assert!(bundle.main_tf.contains(resource), "missing {resource}");
        }
        // Detected application port must be opened.
        assert!(bundle.main_tf.contains("from_port   = 5000"));
        assert!(bundle.main_tf.contains("from_port   = 22"));
    }

    #[test]
    fn outputs_include_application_url() {
        let bundle = generate(&flask_config()).unwrap();
        assert!(bundle.outputs_tf.contains("output \"instance_id\""));
        assert!(bundle.outputs_tf.contains("output \"public_ip\""));
        assert!(bundle.outputs_tf.contains("output \"public_dns\""));
        assert!(bundle
            .outputs_tf
            .contains("http://${aws_eip.app.public_ip}:5000"));
    }

    #[test]
    fn variables_declare_ami_id() {
        let bundle = generate(&flask_config()).unwrap();
        assert!(bundle.variables_tf.contains("variable \"ami_id\""));
        assert!(bundle.variables_tf.contains("us-east-1"));
    }
}

//! Provisioning driver
//!
//! Writes generated templates to a per-deployment working directory and
//! drives the external provisioning tool through its
//! init → plan → apply → output (or destroy) lifecycle. All external
//! process execution goes through the `ProcessRunner` abstraction so the
//! whole driver is testable without real binaries.

pub mod builder;
pub mod error;
pub mod image;
pub mod mock;
pub mod runner;
pub mod terraform;

pub use builder::ProcessCommandBuilder;
pub use error::ProcessError;
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use terraform::TerraformCli;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::DeploymentConfig;
use crate::error::Result;
use crate::iac::{self, IacBundle};

#[derive(Clone)]
pub struct ProvisionManager {
    runner: Arc<dyn ProcessRunner>,
}

impl ProvisionManager {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub fn production() -> Self {
        Self::new(Arc::new(TokioProcessRunner))
    }

    #[cfg(test)]
    pub fn mock() -> (Self, MockProcessRunner) {
        let mock = MockProcessRunner::new();
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner), mock)
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    pub fn terraform(&self) -> TerraformCli {
        TerraformCli::new(Arc::clone(&self.runner))
    }
}

/// Captured output from one provisioning-tool invocation.
#[derive(Debug, Clone)]
pub struct CommandLog {
    pub label: String,
    pub output: String,
}

/// Result of a successful provision run.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub outputs: HashMap<String, String>,
    pub logs: Vec<CommandLog>,
}

pub struct Provisioner {
    manager: ProvisionManager,
    root: PathBuf,
}

impl Provisioner {
    pub fn new(manager: ProvisionManager, root: PathBuf) -> Self {
        Self { manager, root }
    }

    /// Per-deployment working directory.
    pub fn deployment_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// The on-disk artifact whose presence signals that infrastructure was
    /// provisioned for this id. Reconciliation keys off this exact path.
    pub fn state_file(&self, id: &str) -> PathBuf {
        self.deployment_dir(id).join(iac::STATE_FILE)
    }

    /// Run the full provision sequence for one deployment.
    pub async fn provision(
        &self,
        id: &str,
        config: &DeploymentConfig,
        bundle: &IacBundle,
    ) -> Result<ProvisionOutcome> {
        let dir = self.deployment_dir(id);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::create_dir_all(&dir).await?;
        self.write_bundle(&dir, bundle).await?;

        let region = &config.infrastructure.region;
        let ami = image::resolve_machine_image(&self.manager.runner(), region).await;
        let vars = vec![("ami_id".to_string(), ami)];

        let tf = self.manager.terraform();
        let mut logs = Vec::new();

        info!(deployment = id, "initializing provisioning workspace");
        let output = tf.init(&dir).await?;
        logs.push(CommandLog {
            label: "terraform init".to_string(),
            output: output.stdout,
        });

        info!(deployment = id, "planning infrastructure changes");
        let output = tf.plan(&dir, &vars).await?;
        logs.push(CommandLog {
            label: "terraform plan".to_string(),
            output: output.stdout,
        });

        info!(deployment = id, "applying infrastructure changes");
        let output = tf.apply(&dir, &vars).await?;
        logs.push(CommandLog {
            label: "terraform apply".to_string(),
            output: output.stdout,
        });

        let outputs = tf.outputs(&dir).await?;
        info!(deployment = id, outputs = outputs.len(), "provisioning complete");

        Ok(ProvisionOutcome { outputs, logs })
    }

    /// Tear down provisioned infrastructure. A missing state artifact means
    /// nothing was ever applied, so this is an idempotent no-op.
    pub async fn deprovision(&self, id: &str, region: &str) -> Result<()> {
        if !self.state_file(id).exists() {
            info!(deployment = id, "no provisioning state on disk, nothing to destroy");
            return Ok(());
        }

        // The destroy plan re-evaluates the template, so it needs the same
        // input variables as apply.
        let ami = image::resolve_machine_image(&self.manager.runner(), region).await;
        let vars = vec![("ami_id".to_string(), ami)];

        let dir = self.deployment_dir(id);
        self.manager.terraform().destroy(&dir, &vars).await?;
        info!(deployment = id, "infrastructure destroyed");
        Ok(())
    }

    /// Re-read tool outputs from an existing workspace (reconciliation).
    pub async fn read_outputs(&self, id: &str) -> Result<HashMap<String, String>> {
        self.manager.terraform().outputs(&self.deployment_dir(id)).await
    }

    async fn write_bundle(&self, dir: &Path, bundle: &IacBundle) -> Result<()> {
        tokio::fs::write(dir.join(iac::MAIN_TF_FILE), &bundle.main_tf).await?;
        tokio::fs::write(dir.join(iac::VARIABLES_TF_FILE), &bundle.variables_tf).await?;
        tokio::fs::write(dir.join(iac::OUTPUTS_TF_FILE), &bundle.outputs_tf).await?;
        tokio::fs::write(dir.join(iac::BOOTSTRAP_FILE), &bundle.bootstrap_script).await?;
        Ok(())
    }
}

/// Derive the user-facing URL from tool outputs, in fixed precedence:
/// the tool-reported `application_url`, then public address, then public
/// DNS name. The final placeholder should never appear in a real run.
pub fn derive_public_url(outputs: &HashMap<String, String>, port: u16) -> String {
    if let Some(url) = outputs.get("application_url").filter(|u| !u.is_empty()) {
        return url.clone();
    }
    if let Some(ip) = outputs.get("public_ip").filter(|v| !v.is_empty()) {
        return format!("http://{ip}:{port}");
    }
    if let Some(dns) = outputs.get("public_dns").filter(|v| !v.is_empty()) {
        return format!("http://{dns}:{port}");
    }
    format!("http://placeholder.invalid:{port}")
}

//! Thin typed wrapper over the terraform CLI
//!
//! One method per lifecycle step, all routed through the `ProcessRunner`
//! seam. Init, apply, and destroy failures are fatal and carry the tool's
//! captured stderr (or stdout when stderr is empty) as the error payload.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::builder::ProcessCommandBuilder;
use super::runner::{ProcessOutput, ProcessRunner};

pub struct TerraformCli {
    runner: Arc<dyn ProcessRunner>,
}

impl TerraformCli {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub async fn init(&self, dir: &Path) -> Result<ProcessOutput> {
        self.run_step(dir, "init", &["init", "-input=false", "-no-color"], &[])
            .await
    }

    /// Diagnostic only: a failed plan is fatal, a successful plan's output
    /// is discarded.
    pub async fn plan(&self, dir: &Path, vars: &[(String, String)]) -> Result<ProcessOutput> {
        self.run_step(dir, "plan", &["plan", "-input=false", "-no-color"], vars)
            .await
    }

    pub async fn apply(&self, dir: &Path, vars: &[(String, String)]) -> Result<ProcessOutput> {
        self.run_step(
            dir,
            "apply",
            &["apply", "-auto-approve", "-input=false", "-no-color"],
            vars,
        )
        .await
    }

    pub async fn destroy(&self, dir: &Path, vars: &[(String, String)]) -> Result<ProcessOutput> {
        self.run_step(
            dir,
            "destroy",
            &["destroy", "-auto-approve", "-input=false", "-no-color"],
            vars,
        )
        .await
    }

    /// Structured key→value outputs after a successful apply.
    pub async fn outputs(&self, dir: &Path) -> Result<HashMap<String, String>> {
        let output = self
            .run_step(dir, "output", &["output", "-json", "-no-color"], &[])
            .await?;
        parse_outputs(&output.stdout)
    }

    async fn run_step(
        &self,
        dir: &Path,
        label: &str,
        args: &[&str],
        vars: &[(String, String)],
    ) -> Result<ProcessOutput> {
        let mut builder = ProcessCommandBuilder::new("terraform")
            .args(args)
            .current_dir(dir);
        for (key, value) in vars {
            builder = builder.arg("-var").arg(&format!("{key}={value}"));
        }

        let output = self.runner.run(builder.build()).await?;
        if !output.status.success() {
            return Err(Error::Provisioning(format!(
                "terraform {label} failed: {}",
                output.error_payload().trim()
            )));
        }
        Ok(output)
    }
}

/// Parse `terraform output -json` into a flat string map.
fn parse_outputs(stdout: &str) -> Result<HashMap<String, String>> {
    let parsed: serde_json::Value = serde_json::from_str(stdout)?;
    let object = parsed
        .as_object()
        .ok_or_else(|| Error::Provisioning("terraform output was not a JSON object".to_string()))?;

    let mut outputs = HashMap::new();
    for (key, entry) in object {
        let value = entry.get("value").unwrap_or(entry);
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        outputs.insert(key.clone(), rendered);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::mock::MockProcessRunner;

    fn cli(mock: &MockProcessRunner) -> TerraformCli {
        TerraformCli::new(Arc::new(mock.clone()))
    }

    #[tokio::test]
    async fn init_failure_surfaces_stderr() {
        let mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .with_args(|args| args.first().map(|a| a == "init").unwrap_or(false))
            .returns_exit_code(1)
            .returns_stderr("Error: backend initialization failed")
            .finish();

        let err = cli(&mock).init(Path::new("/tmp")).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("terraform init failed"));
        assert!(message.contains("backend initialization failed"));
    }

    #[tokio::test]
    async fn apply_failure_falls_back_to_stdout_payload() {
        let mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .with_args(|args| args.first().map(|a| a == "apply").unwrap_or(false))
            .returns_exit_code(1)
            .returns_stdout("Error written to stdout only")
            .finish();

        let err = cli(&mock)
            .apply(Path::new("/tmp"), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("stdout only"));
    }

    #[tokio::test]
    async fn vars_are_passed_through() {
        let mock = MockProcessRunner::new();
        mock.expect_command("terraform").returns_stdout("ok").finish();

        cli(&mock)
            .apply(
                Path::new("/tmp"),
                &[("ami_id".to_string(), "ami-123".to_string())],
            )
            .await
            .unwrap();

        let history = mock.call_history();
        let args = &history[0].args;
        let var_pos = args.iter().position(|a| a == "-var").unwrap();
        assert_eq!(args[var_pos + 1], "ami_id=ami-123");
    }

    #[tokio::test]
    async fn outputs_parse_value_objects() {
        let json = r#"{
            "public_ip": {"sensitive": false, "type": "string", "value": "1.2.3.4"},
            "instance_id": {"sensitive": false, "type": "string", "value": "i-abc"},
            "count": {"sensitive": false, "type": "number", "value": 2}
        }"#;
        let mock = MockProcessRunner::new();
        mock.expect_command("terraform").returns_stdout(json).finish();

        let outputs = cli(&mock).outputs(Path::new("/tmp")).await.unwrap();
        assert_eq!(outputs["public_ip"], "1.2.3.4");
        assert_eq!(outputs["instance_id"], "i-abc");
        assert_eq!(outputs["count"], "2");
    }

    #[tokio::test]
    async fn malformed_output_json_is_an_error() {
        let mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .returns_stdout("not json")
            .finish();
        assert!(cli(&mock).outputs(Path::new("/tmp")).await.is_err());
    }
}

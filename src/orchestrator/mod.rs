//! Deployment orchestrator
//!
//! Owns the per-deployment record and sequences the phases:
//! analyze → strategize → configure → generate → provision → summarize.
//! Intake is fire-and-forget: the caller gets an id immediately and polls
//! the status API while the phase pipeline runs as a background task. When
//! a record is missing from memory the orchestrator reconciles it from the
//! on-disk provisioning artifacts, accepting that step and log history is
//! lost in that path.

pub mod instructions;
pub mod record;
pub mod store;

pub use record::{DeploymentRecord, DeploymentStatus, LogBlock, Step, StepStatus};
pub use store::{MemoryStore, RecordStore};

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::{CodeInspector, HeuristicInspector, IntentExtractor, KeywordExtractor};
use crate::config::{self, DEFAULT_REGION};
use crate::error::{Error, Result};
use crate::iac;
use crate::provision::{self, ProvisionManager, Provisioner};
use crate::strategy;

use record::{
    STEP_ANALYZE, STEP_CONFIGURE, STEP_HOST_SETUP, STEP_PROVISION, STEP_STRATEGY, STEP_SUMMARIZE,
    STEP_TEMPLATES,
};

#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub description: String,
    pub repository_url: String,
}

#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn RecordStore>,
    provisioner: Arc<Provisioner>,
    inspector: Arc<dyn CodeInspector>,
    extractor: Arc<dyn IntentExtractor>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        provisioner: Arc<Provisioner>,
        inspector: Arc<dyn CodeInspector>,
        extractor: Arc<dyn IntentExtractor>,
    ) -> Self {
        Self {
            store,
            provisioner,
            inspector,
            extractor,
        }
    }

    /// Production wiring: real process runner, heuristic collaborators,
    /// in-memory record store, working directories under `root`.
    pub fn production(root: PathBuf) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Provisioner::new(ProvisionManager::production(), root)),
            Arc::new(HeuristicInspector::new()),
            Arc::new(KeywordExtractor::new()),
        )
    }

    /// Validate the request, create the record, and kick off the phase
    /// pipeline in the background. Returns the new deployment id at once;
    /// callers poll `status` for completion.
    pub async fn submit(&self, request: DeployRequest) -> Result<String> {
        validate(&request)?;

        let id = short_id();
        self.store.set(DeploymentRecord::new(&id)).await;
        info!(deployment = %id, "deployment accepted");

        let orchestrator = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            if let Err(err) = orchestrator.execute(&task_id, &request).await {
                error!(deployment = %task_id, %err, "deployment failed");
            }
        });

        Ok(id)
    }

    /// Run the phase pipeline to completion for an already-created record.
    /// Exposed separately from `submit` so callers (and tests) can await
    /// the full run.
    pub async fn execute(&self, id: &str, request: &DeployRequest) -> Result<()> {
        self.begin_run(id).await?;
        match self.run_phases(id, request).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let message = err.to_string();
                self.update(id, |record| record.fail(&message)).await?;
                Err(err)
            }
        }
    }

    /// Per-id exclusive execution guard: only a freshly created record may
    /// start a run. Resubmitting an id mid-flight (or after it finished)
    /// is rejected rather than racing two pipelines against one record.
    async fn begin_run(&self, id: &str) -> Result<()> {
        let mut record = self
            .store
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("deployment {id} not found")))?;
        if record.status != DeploymentStatus::Initializing {
            return Err(Error::Validation(format!(
                "deployment {id} is already {}; submit a new deployment instead",
                record.status
            )));
        }
        record.set_status(DeploymentStatus::Analyzing);
        record.start_step(STEP_ANALYZE);
        self.store.set(record).await;
        Ok(())
    }

    async fn run_phases(&self, id: &str, request: &DeployRequest) -> Result<()> {
        // Phase: analyze. Collaborator snapshots are attached once and
        // never mutated afterwards.
        let code = self.inspector.analyze(&request.repository_url).await?;
        let intent = self.extractor.extract(&request.description).await?;
        {
            let code = code.clone();
            let intent = intent.clone();
            self.update(id, move |record| {
                let summary = format!("{} / {}", code.language, code.framework);
                record.code_analysis = Some(code);
                record.intent_analysis = Some(intent);
                record.complete_step(STEP_ANALYZE, Some(summary));
                record.start_step(STEP_STRATEGY);
            })
            .await?;
        }

        // Phase: strategize.
        let decision = strategy::decide(&code, &intent, &request.description);
        info!(deployment = %id, strategy = %decision.kind, "strategy selected");
        {
            let decision = decision.clone();
            self.update(id, move |record| {
                for reason in &decision.reasoning {
                    record.add_step_detail(STEP_STRATEGY, reason.clone());
                }
                let summary = format!("strategy: {}", decision.kind);
                record.strategy = Some(decision);
                record.complete_step(STEP_STRATEGY, Some(summary));
                record.set_status(DeploymentStatus::Deploying);
                record.start_step(STEP_CONFIGURE);
            })
            .await?;
        }

        // Phase: configure + generate.
        let config = config::assemble(&decision, &code, &intent, id, &request.repository_url);
        {
            let config = config.clone();
            self.update(id, move |record| {
                let summary = format!(
                    "{} on {} (port {})",
                    config.app.name, config.infrastructure.instance_type, config.app.port
                );
                record.config = Some(config);
                record.complete_step(STEP_CONFIGURE, Some(summary));
                record.start_step(STEP_TEMPLATES);
            })
            .await?;
        }

        let bundle = iac::generate(&config)?;
        self.update(id, |record| {
            record.complete_step(
                STEP_TEMPLATES,
                Some("terraform templates and bootstrap script generated".to_string()),
            );
            record.start_step(STEP_PROVISION);
        })
        .await?;

        // Phase: provision. The bootstrap script runs on the instance's
        // first boot; this process does not drive the host afterwards.
        let outcome = self.provisioner.provision(id, &config, &bundle).await?;
        {
            let outcome = outcome.clone();
            self.update(id, move |record| {
                record.provisioning_outputs = outcome.outputs;
                for log in outcome.logs {
                    record.logs.push(LogBlock {
                        source: log.label,
                        lines: log.output.lines().map(str::to_string).collect(),
                    });
                }
                record.complete_step(
                    STEP_PROVISION,
                    Some("infrastructure applied".to_string()),
                );
                record.complete_step(
                    STEP_HOST_SETUP,
                    Some(format!(
                        "host bootstrap runs on first boot; progress in {}",
                        iac::bootstrap::SETUP_LOG
                    )),
                );
                record.set_status(DeploymentStatus::Completing);
                record.start_step(STEP_SUMMARIZE);
            })
            .await?;
        }

        // Phase: summarize.
        let url = provision::derive_public_url(&outcome.outputs, config.app.port);
        let manual = instructions::for_config(&config);
        info!(deployment = %id, url = %url, "deployment complete");
        self.update(id, move |record| {
            record.public_url = Some(url.clone());
            record.instructions = manual;
            record.complete_step(STEP_SUMMARIZE, Some(url));
            record.set_status(DeploymentStatus::Deployed);
        })
        .await?;

        Ok(())
    }

    /// Current record for an id: memory first, then filesystem
    /// reconciliation, then not-found.
    pub async fn status(&self, id: &str) -> Result<DeploymentRecord> {
        if let Some(record) = self.store.get(id).await {
            return Ok(record);
        }
        self.reconcile(id).await
    }

    pub async fn steps(&self, id: &str) -> Result<Vec<Step>> {
        Ok(self.status(id).await?.steps)
    }

    pub async fn logs(&self, id: &str) -> Result<Vec<LogBlock>> {
        Ok(self.status(id).await?.logs)
    }

    pub async fn instructions(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.status(id).await?.instructions)
    }

    pub async fn list(&self) -> Vec<DeploymentRecord> {
        self.store.list().await
    }

    /// Tear down a deployment: deprovision, remove on-disk artifacts, then
    /// drop the record. A deprovision failure keeps the record so the
    /// caller can retry; destroy is never silently swallowed.
    pub async fn destroy(&self, id: &str) -> Result<()> {
        let record = self
            .store
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("deployment {id} not found")))?;

        let region = record
            .config
            .as_ref()
            .map(|c| c.infrastructure.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        self.provisioner.deprovision(id, &region).await?;

        let dir = self.provisioner.deployment_dir(id);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        self.store.delete(id).await;
        info!(deployment = %id, "deployment destroyed");
        Ok(())
    }

    /// Rebuild a record from on-disk provisioning artifacts. Lossy by
    /// design: true step and log history was never persisted, so the
    /// rebuilt record carries an approximation.
    async fn reconcile(&self, id: &str) -> Result<DeploymentRecord> {
        if !self.provisioner.state_file(id).exists() {
            return Err(Error::NotFound(format!("deployment {id} not found")));
        }
        info!(deployment = %id, "reconciling deployment from on-disk state");

        let mut record = DeploymentRecord::new(id);
        match self.provisioner.read_outputs(id).await {
            Ok(outputs) => {
                let url = provision::derive_public_url(&outputs, 80);
                record.provisioning_outputs = outputs;
                record.public_url = Some(url);
                for step in &mut record.steps {
                    step.status = StepStatus::Completed;
                }
                record.add_step_detail(
                    STEP_SUMMARIZE,
                    "reconstructed from on-disk provisioning state".to_string(),
                );
                record.instructions = instructions::reconciled();
                record.set_status(DeploymentStatus::Completed);
            }
            Err(err) => {
                // Evidence of provisioning exists but outputs are not
                // retrievable: report ambiguity, not success or failure.
                record.error = Some(format!("reconciliation incomplete: {err}"));
                record.set_status(DeploymentStatus::Unknown);
            }
        }

        self.store.set(record.clone()).await;
        Ok(record)
    }

    /// Load-modify-store against the record table.
    async fn update<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut DeploymentRecord),
    {
        let mut record = self
            .store
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("deployment {id} not found")))?;
        f(&mut record);
        self.store.set(record).await;
        Ok(())
    }
}

fn validate(request: &DeployRequest) -> Result<()> {
    if request.description.trim().is_empty() {
        return Err(Error::Validation("description must not be empty".to_string()));
    }
    if request.repository_url.trim().is_empty() {
        return Err(Error::Validation(
            "repository URL must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(12).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::MockProcessRunner;

    fn orchestrator_with(mock: &MockProcessRunner, root: PathBuf) -> Orchestrator {
        let manager = ProvisionManager::new(Arc::new(mock.clone()));
        Orchestrator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Provisioner::new(manager, root)),
            Arc::new(HeuristicInspector::new()),
            Arc::new(KeywordExtractor::new()),
        )
    }

    #[tokio::test]
    async fn empty_description_is_rejected_before_record_creation() {
        let mock = MockProcessRunner::new();
        let root = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(&mock, root.path().to_path_buf());

        let result = orchestrator
            .submit(DeployRequest {
                description: "   ".to_string(),
                repository_url: "https://example/repo".to_string(),
            })
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(orchestrator.list().await.is_empty());
    }

    #[tokio::test]
    async fn in_flight_deployment_cannot_be_resubmitted() {
        let mock = MockProcessRunner::new();
        let root = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(&mock, root.path().to_path_buf());

        let mut record = DeploymentRecord::new("busy-1");
        record.set_status(DeploymentStatus::Deploying);
        orchestrator.store.set(record).await;

        let request = DeployRequest {
            description: "deploy".to_string(),
            repository_url: "https://example/repo".to_string(),
        };
        let result = orchestrator.execute("busy-1", &request).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn phase_failure_marks_record_failed() {
        let mock = MockProcessRunner::new();
        // Image query falls back, init blows up.
        mock.expect_command("aws").returns_exit_code(1).finish();
        mock.expect_command("terraform")
            .returns_exit_code(1)
            .returns_stderr("no credentials")
            .finish();

        let root = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(&mock, root.path().to_path_buf());

        orchestrator.store.set(DeploymentRecord::new("fail-1")).await;
        let request = DeployRequest {
            description: "deploy my app".to_string(),
            repository_url: "https://example/repo".to_string(),
        };
        let err = orchestrator.execute("fail-1", &request).await.unwrap_err();
        assert!(err.to_string().contains("terraform init failed"));

        let record = orchestrator.status("fail-1").await.unwrap();
        assert_eq!(record.status, DeploymentStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("no credentials"));
        assert!(record.failed_at.is_some());
        assert_eq!(record.progress(), 100);
    }

    #[tokio::test]
    async fn unknown_id_with_no_disk_evidence_is_not_found() {
        let mock = MockProcessRunner::new();
        let root = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(&mock, root.path().to_path_buf());

        let result = orchestrator.status("ghost").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn destroy_requires_in_memory_record() {
        let mock = MockProcessRunner::new();
        let root = tempfile::tempdir().unwrap();
        let orchestrator = orchestrator_with(&mock, root.path().to_path_buf());

        let result = orchestrator.destroy("ghost").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}

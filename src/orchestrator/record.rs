//! Deployment record and status state machine

use crate::analysis::{CodeAnalysis, IntentAnalysis};
use crate::config::DeploymentConfig;
use crate::strategy::Strategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status values move only forward within a run; `Failed` is reachable
/// from any non-terminal state. `Completed` and `Deployed` are the same
/// terminal-success state reached by different call paths and every reader
/// must treat them identically. `Unknown` marks a record reconciled from
/// disk whose outputs could not be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Initializing,
    Analyzing,
    Deploying,
    Completing,
    Completed,
    Deployed,
    Unknown,
    Failed,
}

impl DeploymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Completed | DeploymentStatus::Deployed | DeploymentStatus::Failed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentStatus::Completed | DeploymentStatus::Deployed)
    }

    /// Coarse progress percentage. `Failed` reports 100: the process
    /// finished, even though unsuccessfully.
    pub fn progress(&self) -> u8 {
        match self {
            DeploymentStatus::Initializing => 0,
            DeploymentStatus::Analyzing => 25,
            DeploymentStatus::Deploying => 50,
            DeploymentStatus::Completing => 75,
            DeploymentStatus::Unknown => 60,
            DeploymentStatus::Completed | DeploymentStatus::Deployed | DeploymentStatus::Failed => {
                100
            }
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeploymentStatus::Initializing => "initializing",
            DeploymentStatus::Analyzing => "analyzing",
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Completing => "completing",
            DeploymentStatus::Completed => "completed",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Unknown => "unknown",
            DeploymentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Coarse user-facing phase narration, distinct from `DeploymentStatus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    pub details: Vec<String>,
}

impl Step {
    fn new(id: u32, title: &str, description: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            description: description.to_string(),
            status: StepStatus::Pending,
            details: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogBlock {
    pub source: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    pub status: DeploymentStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub code_analysis: Option<CodeAnalysis>,
    pub intent_analysis: Option<IntentAnalysis>,
    pub strategy: Option<Strategy>,
    pub config: Option<DeploymentConfig>,
    pub provisioning_outputs: HashMap<String, String>,
    pub public_url: Option<String>,
    pub steps: Vec<Step>,
    pub logs: Vec<LogBlock>,
    pub instructions: Vec<String>,
    pub error: Option<String>,
}

impl DeploymentRecord {
    pub fn new(id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            status: DeploymentStatus::Initializing,
            created_at: now,
            last_updated: now,
            completed_at: None,
            failed_at: None,
            code_analysis: None,
            intent_analysis: None,
            strategy: None,
            config: None,
            provisioning_outputs: HashMap::new(),
            public_url: None,
            steps: standard_steps(),
            logs: Vec::new(),
            instructions: Vec::new(),
            error: None,
        }
    }

    pub fn set_status(&mut self, status: DeploymentStatus) {
        let now = Utc::now();
        self.status = status;
        self.last_updated = now;
        match status {
            DeploymentStatus::Completed | DeploymentStatus::Deployed => {
                self.completed_at = Some(now)
            }
            DeploymentStatus::Failed => self.failed_at = Some(now),
            _ => {}
        }
    }

    pub fn fail(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.set_status(DeploymentStatus::Failed);
        if let Some(step) = self
            .steps
            .iter_mut()
            .find(|s| s.status == StepStatus::Running)
        {
            step.status = StepStatus::Failed;
            step.details.push(message.to_string());
        }
    }

    pub fn start_step(&mut self, id: u32) {
        self.update_step(id, |step| step.status = StepStatus::Running);
    }

    pub fn complete_step(&mut self, id: u32, detail: Option<String>) {
        self.update_step(id, |step| {
            step.status = StepStatus::Completed;
            if let Some(detail) = detail {
                step.details.push(detail);
            }
        });
    }

    pub fn add_step_detail(&mut self, id: u32, detail: String) {
        self.update_step(id, |step| step.details.push(detail));
    }

    pub fn progress(&self) -> u8 {
        self.status.progress()
    }

    /// Steps are updated in place by id, never removed.
    fn update_step<F: FnOnce(&mut Step)>(&mut self, id: u32, f: F) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.id == id) {
            f(step);
            self.last_updated = Utc::now();
        }
    }
}

pub const STEP_ANALYZE: u32 = 1;
pub const STEP_STRATEGY: u32 = 2;
pub const STEP_CONFIGURE: u32 = 3;
pub const STEP_TEMPLATES: u32 = 4;
pub const STEP_PROVISION: u32 = 5;
pub const STEP_HOST_SETUP: u32 = 6;
pub const STEP_SUMMARIZE: u32 = 7;

fn standard_steps() -> Vec<Step> {
    vec![
        Step::new(STEP_ANALYZE, "Analyze", "Inspect the codebase and deployment request"),
        Step::new(STEP_STRATEGY, "Strategize", "Choose a deployment strategy"),
        Step::new(STEP_CONFIGURE, "Configure", "Assemble the deployment configuration"),
        Step::new(STEP_TEMPLATES, "Generate", "Generate infrastructure templates"),
        Step::new(STEP_PROVISION, "Provision", "Create cloud infrastructure"),
        Step::new(
            STEP_HOST_SETUP,
            "Deploy",
            "Application host configures itself via the bootstrap script",
        ),
        Step::new(STEP_SUMMARIZE, "Summarize", "Finalize status and public URL"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_mapping_is_fixed() {
        assert_eq!(DeploymentStatus::Initializing.progress(), 0);
        assert_eq!(DeploymentStatus::Analyzing.progress(), 25);
        assert_eq!(DeploymentStatus::Deploying.progress(), 50);
        assert_eq!(DeploymentStatus::Completing.progress(), 75);
        assert_eq!(DeploymentStatus::Completed.progress(), 100);
        assert_eq!(DeploymentStatus::Deployed.progress(), 100);
        // Failed still reports 100: the run finished.
        assert_eq!(DeploymentStatus::Failed.progress(), 100);
        // Analyzing is the lowest non-zero bucket.
        assert!(DeploymentStatus::Analyzing.progress() > 0);
        assert!(DeploymentStatus::Analyzing.progress() < DeploymentStatus::Deploying.progress());
    }

    #[test]
    fn terminal_and_success_classification() {
        assert!(DeploymentStatus::Completed.is_terminal());
        assert!(DeploymentStatus::Deployed.is_terminal());
        assert!(DeploymentStatus::Failed.is_terminal());
        assert!(!DeploymentStatus::Deploying.is_terminal());

        assert!(DeploymentStatus::Completed.is_success());
        assert!(DeploymentStatus::Deployed.is_success());
        assert!(!DeploymentStatus::Failed.is_success());
    }

    #[test]
    fn fail_marks_running_step_and_stamps_time() {
        let mut record = DeploymentRecord::new("dep-1");
        record.set_status(DeploymentStatus::Analyzing);
        record.start_step(STEP_ANALYZE);
        record.fail("collaborator exploded");

        assert_eq!(record.status, DeploymentStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("collaborator exploded"));
        assert!(record.failed_at.is_some());
        let step = record.steps.iter().find(|s| s.id == STEP_ANALYZE).unwrap();
        assert_eq!(step.status, StepStatus::Failed);
    }

    #[test]
    fn steps_are_appended_and_updated_never_truncated() {
        let mut record = DeploymentRecord::new("dep-2");
        let before = record.steps.len();
        record.complete_step(STEP_ANALYZE, Some("python/flask".to_string()));
        record.complete_step(STEP_STRATEGY, None);
        assert_eq!(record.steps.len(), before);
        assert_eq!(
            record.steps[0].details,
            vec!["python/flask".to_string()]
        );
    }

    #[test]
    fn completion_stamps_completed_at() {
        let mut record = DeploymentRecord::new("dep-3");
        record.set_status(DeploymentStatus::Deployed);
        assert!(record.completed_at.is_some());
        assert!(record.failed_at.is_none());
    }
}

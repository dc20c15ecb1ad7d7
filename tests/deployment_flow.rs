//! End-to-end deployment flows against a mocked process layer.

use std::path::PathBuf;
use std::sync::Arc;

use skylift::analysis::{HeuristicInspector, KeywordExtractor};
use skylift::iac;
use skylift::orchestrator::{
    DeployRequest, DeploymentRecord, DeploymentStatus, MemoryStore, Orchestrator, RecordStore,
    StepStatus,
};
use skylift::provision::{MockProcessRunner, ProvisionManager, Provisioner};
use skylift::strategy::StrategyKind;

struct Harness {
    orchestrator: Orchestrator,
    store: MemoryStore,
    mock: MockProcessRunner,
    _root: tempfile::TempDir,
    root_path: PathBuf,
}

fn harness() -> Harness {
    let mock = MockProcessRunner::new();
    let store = MemoryStore::new();
    let root = tempfile::tempdir().unwrap();
    let root_path = root.path().to_path_buf();
    let orchestrator = Orchestrator::new(
        Arc::new(store.clone()),
        Arc::new(Provisioner::new(
            ProvisionManager::new(Arc::new(mock.clone())),
            root_path.clone(),
        )),
        Arc::new(HeuristicInspector::new()),
        Arc::new(KeywordExtractor::new()),
    );
    Harness {
        orchestrator,
        store,
        mock,
        _root: root,
        root_path,
    }
}

fn mock_happy_terraform(mock: &MockProcessRunner) {
    mock.expect_command("aws")
        .returns_stdout("ami-0123456789abcdef0\n")
        .finish();
    mock.expect_command("terraform")
        .with_args(|args| args.first().map(|a| a == "output").unwrap_or(false))
        .returns_stdout(
            r#"{
                "instance_id": {"value": "i-0abc"},
                "public_ip": {"value": "1.2.3.4"},
                "public_dns": {"value": "ec2-1-2-3-4.compute.amazonaws.com"}
            }"#,
        )
        .finish();
    mock.expect_command("terraform")
        .returns_stdout("Apply complete!")
        .finish();
}

fn flask_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("requirements.txt"), "flask==3.0\n").unwrap();
    std::fs::write(
        dir.path().join("app.py"),
        "from flask import Flask\napp = Flask(__name__)\n\n@app.route('/')\ndef index():\n    return 'ok'\n",
    )
    .unwrap();
    dir
}

#[tokio::test]
async fn flask_repo_deploys_to_vm_with_public_url() {
    let h = harness();
    mock_happy_terraform(&h.mock);
    let repo = flask_repo();

    h.store.set(DeploymentRecord::new("dep-flask")).await;
    let request = DeployRequest {
        description: "deploy my flask api on aws".to_string(),
        repository_url: repo.path().to_string_lossy().to_string(),
    };
    h.orchestrator.execute("dep-flask", &request).await.unwrap();

    let record = h.orchestrator.status("dep-flask").await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Deployed);
    assert_eq!(record.progress(), 100);
    assert_eq!(record.strategy.as_ref().unwrap().kind, StrategyKind::Vm);
    assert_eq!(record.public_url.as_deref(), Some("http://1.2.3.4:5000"));
    assert!(record.steps.iter().all(|s| s.status == StepStatus::Completed));
    assert!(!record.logs.is_empty());
    assert!(record.instructions.iter().any(|i| i.contains("5000")));

    // Templates landed in the per-deployment workspace.
    let dir = h.root_path.join("dep-flask");
    for file in [
        iac::MAIN_TF_FILE,
        iac::VARIABLES_TF_FILE,
        iac::OUTPUTS_TF_FILE,
        iac::BOOTSTRAP_FILE,
    ] {
        assert!(dir.join(file).exists(), "missing {file}");
    }

    // Provisioning ran the full sequence exactly once.
    let steps: Vec<String> = h
        .mock
        .call_history()
        .into_iter()
        .filter(|c| c.program == "terraform")
        .map(|c| c.args[0].clone())
        .collect();
    assert_eq!(steps, vec!["init", "plan", "apply", "output"]);
}

#[tokio::test]
async fn static_site_selects_static_strategy() {
    let h = harness();
    mock_happy_terraform(&h.mock);

    let repo = tempfile::tempdir().unwrap();
    std::fs::write(repo.path().join("index.html"), "<html><body>hi</body></html>").unwrap();
    std::fs::write(repo.path().join("style.css"), "body {}").unwrap();

    h.store.set(DeploymentRecord::new("dep-static")).await;
    let request = DeployRequest {
        description: "host my landing page".to_string(),
        repository_url: repo.path().to_string_lossy().to_string(),
    };
    h.orchestrator.execute("dep-static", &request).await.unwrap();

    let record = h.orchestrator.status("dep-static").await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Deployed);
    assert_eq!(record.strategy.as_ref().unwrap().kind, StrategyKind::Static);
}

#[tokio::test]
async fn status_reconciles_completed_deployment_from_disk() {
    let h = harness();
    h.mock
        .expect_command("terraform")
        .with_args(|args| args.first().map(|a| a == "output").unwrap_or(false))
        .returns_stdout(r#"{"application_url": {"value": "http://9.9.9.9:8080"}}"#)
        .finish();

    // Evidence from an earlier process: workspace with recorded state.
    let dir = h.root_path.join("dep-old");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(iac::STATE_FILE), "{}").unwrap();

    let record = h.orchestrator.status("dep-old").await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Completed);
    assert!(record.status.is_success());
    assert_eq!(record.public_url.as_deref(), Some("http://9.9.9.9:8080"));
    assert!(!record.instructions.is_empty());

    // The rebuilt record is cached; a second status call stays in memory.
    h.orchestrator.status("dep-old").await.unwrap();
    assert_eq!(h.mock.calls_to("terraform"), 1);
}

#[tokio::test]
async fn unreadable_outputs_reconcile_to_unknown() {
    let h = harness();
    h.mock
        .expect_command("terraform")
        .returns_exit_code(1)
        .returns_stderr("state lock held")
        .finish();

    let dir = h.root_path.join("dep-stuck");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(iac::STATE_FILE), "{}").unwrap();

    let record = h.orchestrator.status("dep-stuck").await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Unknown);
    assert_eq!(record.progress(), 60);
    assert!(record
        .error
        .as_deref()
        .unwrap()
        .contains("reconciliation incomplete"));
}

#[tokio::test]
async fn destroy_without_provisioned_state_is_a_noop() {
    let h = harness();

    h.store.set(DeploymentRecord::new("dep-fresh")).await;
    h.orchestrator.destroy("dep-fresh").await.unwrap();

    assert_eq!(h.mock.calls_to("terraform"), 0);
    assert_eq!(h.mock.calls_to("aws"), 0);
    assert!(h.orchestrator.list().await.is_empty());
}

#[tokio::test]
async fn failed_destroy_keeps_the_record() {
    let h = harness();
    h.mock
        .expect_command("aws")
        .returns_stdout("ami-0123456789abcdef0\n")
        .finish();
    h.mock
        .expect_command("terraform")
        .returns_exit_code(1)
        .returns_stderr("dependency violation")
        .finish();

    let dir = h.root_path.join("dep-stubborn");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(iac::STATE_FILE), "{}").unwrap();
    h.store.set(DeploymentRecord::new("dep-stubborn")).await;

    let err = h.orchestrator.destroy("dep-stubborn").await.unwrap_err();
    assert!(err.to_string().contains("terraform destroy failed"));

    // Record and on-disk state survive so the destroy can be retried.
    assert!(h.orchestrator.status("dep-stubborn").await.is_ok());
    assert!(dir.join(iac::STATE_FILE).exists());
}

#[tokio::test]
async fn submitted_deployment_reaches_a_terminal_state() {
    let h = harness();
    mock_happy_terraform(&h.mock);
    let repo = flask_repo();

    let id = h
        .orchestrator
        .submit(DeployRequest {
            description: "deploy this service".to_string(),
            repository_url: repo.path().to_string_lossy().to_string(),
        })
        .await
        .unwrap();

    // Intake returns immediately; the pipeline runs in the background.
    for _ in 0..100 {
        let record = h.orchestrator.status(&id).await.unwrap();
        if record.status.is_terminal() {
            assert_eq!(record.status, DeploymentStatus::Deployed);
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("deployment never reached a terminal state");
}

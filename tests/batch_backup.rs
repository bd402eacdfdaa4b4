//! Batch backups driven through the public service API

mod common;

use common::*;
use netbackup::{BackupOutcome, BackupService, BatchFormat, BatchOrigin, DeviceError, Event};
use std::sync::Arc;
use tempfile::TempDir;

fn service_with(connector: ScriptedConnector, temp: &TempDir) -> BackupService {
    BackupService::new(config_in(temp), Arc::new(connector)).unwrap()
}

#[tokio::test]
async fn one_bad_device_does_not_stop_the_batch() {
    let temp = TempDir::new().unwrap();
    let connector = ScriptedConnector::new(Behavior::Respond("config-text".into())).with(
        "10.0.0.1",
        Behavior::FailOnOpen(DeviceError::Authentication("auth failed".into())),
    );
    let service = service_with(connector.clone(), &temp);

    let report = service
        .backup_batch(&[record("10.0.0.1"), record("10.0.0.2")], BatchOrigin::Upload)
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].address(), "10.0.0.1");
    assert_eq!(report.outcomes[1].address(), "10.0.0.2");
    assert!(!report.outcomes[0].succeeded());
    assert!(report.outcomes[0].message().contains("auth failed"));
    assert!(report.outcomes[1].succeeded());
    assert_eq!((report.succeeded, report.failed), (1, 1));

    let files = cfg_files(&temp.path().join("backups"));
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("10.0.0.2_"));

    let BackupOutcome::Saved { path, .. } = &report.outcomes[1] else {
        panic!("expected saved outcome");
    };
    assert_eq!(std::fs::read_to_string(path).unwrap(), "config-text");
}

#[tokio::test]
async fn every_failure_stage_yields_a_failed_outcome() {
    let temp = TempDir::new().unwrap();
    let connector = ScriptedConnector::new(Behavior::Respond("ok".into()))
        .with(
            "10.0.1.1",
            Behavior::FailOnOpen(DeviceError::Connect("no route to host".into())),
        )
        .with(
            "10.0.1.2",
            Behavior::FailOnCommand(DeviceError::Command {
                command: "show running-config".into(),
                reason: "% Invalid input".into(),
            }),
        )
        .with(
            "10.0.1.3",
            Behavior::FailOnClose(DeviceError::Session("connection reset".into())),
        );
    let service = service_with(connector.clone(), &temp);

    let records = [record("10.0.1.1"), record("10.0.1.2"), record("10.0.1.3")];
    let report = service
        .backup_batch(&records, BatchOrigin::Upload)
        .await
        .unwrap();

    assert_eq!(report.failed, 3);
    for (outcome, needle) in report
        .outcomes
        .iter()
        .zip(["no route to host", "% Invalid input", "connection reset"])
    {
        let message = outcome.message();
        assert!(message.starts_with("Failed to backup "), "{message}");
        assert!(message.contains(outcome.address()));
        assert!(message.contains(needle), "{message}");
    }

    // The session that opened but failed is still closed
    assert_eq!(connector.opened(), 3);
    assert_eq!(connector.closed(), 2);
    assert!(cfg_files(&temp.path().join("backups")).is_empty());
}

#[tokio::test]
async fn upload_with_a_bad_row_backs_up_nothing() {
    let temp = TempDir::new().unwrap();
    let connector = ScriptedConnector::new(Behavior::Respond("ok".into()));
    let service = service_with(connector.clone(), &temp);

    let csv = "ip,username,password\n10.0.2.1,admin,pw\n10.0.2.2,,pw\n";
    let err = service
        .backup_upload(csv, BatchFormat::Csv)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("username"), "{err}");
    assert_eq!(connector.opened(), 0);
}

#[tokio::test]
async fn yaml_upload_reports_through_events() {
    let temp = TempDir::new().unwrap();
    let connector = ScriptedConnector::new(Behavior::Respond("hostname r1\n".into()));
    let service = service_with(connector, &temp);
    let mut events = service.subscribe();

    let yaml = "- ip: 10.0.3.1\n  username: admin\n  password: pw\n";
    let report = service
        .backup_upload(yaml, BatchFormat::Yaml)
        .await
        .unwrap();
    assert_eq!(report.succeeded, 1);

    let mut saw_completion = false;
    while let Ok(event) = events.try_recv() {
        if let Event::BatchCompleted {
            origin,
            succeeded,
            failed,
            ..
        } = event
        {
            assert_eq!(origin, BatchOrigin::Upload);
            assert_eq!((succeeded, failed), (1, 0));
            saw_completion = true;
        }
    }
    assert!(saw_completion);
}

#[tokio::test]
async fn operation_log_never_contains_the_password() {
    let temp = TempDir::new().unwrap();
    let config = config_in(&temp);
    let log_path = config.storage.log_path();

    let connector = ScriptedConnector::new(Behavior::Respond("ok".into())).with(
        "10.0.4.2",
        Behavior::FailOnOpen(DeviceError::Authentication("bad credentials".into())),
    );
    let service = BackupService::new(config.clone(), Arc::new(connector.clone())).unwrap();

    let (subscriber, guard) = netbackup::logging::file_subscriber(&config.storage, false).unwrap();
    {
        let _default = tracing::subscriber::set_default(subscriber);
        service
            .backup_batch(&[record("10.0.4.1"), record("10.0.4.2")], BatchOrigin::Upload)
            .await
            .unwrap();
    }
    drop(guard);

    // The connector did receive the secret, the log did not
    assert!(connector.passwords_seen().iter().all(|p| p == PASSWORD));

    let log = std::fs::read_to_string(log_path).unwrap();
    assert!(log.contains("10.0.4.1"));
    assert!(log.contains("10.0.4.2"));
    assert!(!log.contains(PASSWORD));
}

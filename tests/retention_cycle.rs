//! Reclamation cycle reporting: summary push only when files were deleted,
//! error push when a pass aborts, silence on quiet cycles.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use camera_service_monitor::monitor::retention::{RetentionPolicy, StorageReclaimer};
use camera_service_monitor::shipper::{LabelSet, LokiClient};
use filetime::FileTime;
use mockito::Matcher;

const DAY: Duration = Duration::from_secs(24 * 3600);

fn client_for(server: &mockito::Server) -> Arc<LokiClient> {
    Arc::new(
        LokiClient::new(
            format!("{}/loki/api/v1/push", server.url()),
            LabelSet::new().with("service", "mediamtx"),
        )
        .expect("client"),
    )
}

fn write_expired(dir: &std::path::Path, name: &str, bytes: usize) {
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; bytes]).expect("write fixture");
    let mtime = FileTime::from_system_time(SystemTime::now() - DAY * 2);
    filetime::set_file_mtime(&path, mtime).expect("set mtime");
}

#[test]
fn deleting_cycle_pushes_one_info_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_expired(dir.path(), "record_a.mp4", 1024);
    write_expired(dir.path(), "record_b.mp4", 1024);
    write_expired(dir.path(), "record_c.mp4", 1024);
    std::fs::write(dir.path().join("record_fresh.mp4"), b"new").expect("fresh file");

    let mut server = mockito::Server::new();
    let summary = server
        .mock("POST", "/loki/api/v1/push")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""level":"info""#.to_string()),
            Matcher::Regex(r#""action":"cleanup""#.to_string()),
            Matcher::Regex(r"removed 3 segments".to_string()),
        ]))
        .with_status(204)
        .expect(1)
        .create();

    let policy = RetentionPolicy::for_recordings(dir.path(), DAY);
    StorageReclaimer::new(client_for(&server), policy).run_cycle();

    summary.assert();
    assert!(dir.path().join("record_fresh.mp4").exists());
}

#[test]
fn quiet_cycle_pushes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("record_fresh.mp4"), b"new").expect("fresh file");

    let mut server = mockito::Server::new();
    let silent = server
        .mock("POST", "/loki/api/v1/push")
        .with_status(204)
        .expect(0)
        .create();

    let policy = RetentionPolicy::for_recordings(dir.path(), DAY);
    StorageReclaimer::new(client_for(&server), policy).run_cycle();

    silent.assert();
}

#[test]
fn missing_directory_cycle_pushes_nothing() {
    let mut server = mockito::Server::new();
    let silent = server
        .mock("POST", "/loki/api/v1/push")
        .with_status(204)
        .expect(0)
        .create();

    let policy = RetentionPolicy::for_recordings("/nonexistent/recordings", DAY);
    StorageReclaimer::new(client_for(&server), policy).run_cycle();

    silent.assert();
}

#[test]
fn aborted_cycle_pushes_one_error_entry() {
    // A regular file where the directory should be: exists() passes but the
    // listing fails, exercising the abort path.
    let dir = tempfile::tempdir().expect("tempdir");
    let bogus = dir.path().join("recordings");
    std::fs::write(&bogus, b"not a directory").expect("bogus file");

    let mut server = mockito::Server::new();
    let failure = server
        .mock("POST", "/loki/api/v1/push")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""level":"error""#.to_string()),
            Matcher::Regex(r"Storage maintenance failed".to_string()),
        ]))
        .with_status(204)
        .expect(1)
        .create();

    let policy = RetentionPolicy::for_recordings(&bogus, DAY);
    StorageReclaimer::new(client_for(&server), policy).run_cycle();

    failure.assert();
}

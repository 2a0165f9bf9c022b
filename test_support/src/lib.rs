//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Throw-away database URLs and fixture ids for all crates

use std::path::PathBuf;

/// Directory that holds throw-away test databases
pub fn temp_dir_path() -> PathBuf {
    std::env::temp_dir().join("tierlab-test")
}

/// Fresh SQLite file URL, created on first connect (`mode=rwc`).
/// Every call yields a distinct database so tests never share state.
pub fn sqlite_test_url(prefix: &str) -> String {
    let dir = temp_dir_path();
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join(format!("{}_{}.db", prefix, ulid::Ulid::new()));
    format!("sqlite://{}?mode=rwc", path.display())
}

/// URL of a store that can never be opened, for bootstrap failure tests
pub fn unreachable_sqlite_url() -> String {
    let path = temp_dir_path()
        .join(format!("missing-{}", ulid::Ulid::new()))
        .join("store.db");
    // no mode=rwc and a parent directory that does not exist
    format!("sqlite://{}", path.display())
}

//! CLI integration tests for prethesis admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use prethesis::store::{SqliteStore, Store};
use tempfile::TempDir;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn init(&self, username: &str) -> assert_cmd::assert::Assert {
        Command::cargo_bin("prethesis")
            .expect("failed to find binary")
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--admin-username",
                username,
            ])
            .assert()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("prethesis.db")).expect("open db")
    }
}

#[test]
fn test_init_creates_admin_user() {
    let ctx = TestContext::new();

    ctx.init("akorhone")
        .success()
        .stdout(predicate::str::contains("Created admin user 'akorhone'"));

    let store = ctx.store();
    assert!(store.has_admin_user().expect("query admin"));

    let user = store
        .get_user_by_username("akorhone")
        .expect("query user")
        .expect("user exists");
    assert!(user.is_admin);
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();

    ctx.init("akorhone").success();
    ctx.init("another")
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_init_rejects_blank_username() {
    let ctx = TestContext::new();

    ctx.init("  ")
        .failure()
        .stderr(predicate::str::contains("non-empty"));
}

#[test]
fn test_init_rejects_whitespace_username() {
    let ctx = TestContext::new();

    ctx.init("a korhone")
        .failure()
        .stderr(predicate::str::contains("whitespace"));
}

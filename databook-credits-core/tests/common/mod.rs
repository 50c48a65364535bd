//! Scratch git repositories for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

/// Runs git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=Databook Test",
            "-c",
            "user.email=test@example.org",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .status()
        .expect("git should be installed for integration tests");
    assert!(status.success(), "git {:?} failed with {}", args, status);
}

pub fn init_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
}

/// Adds `count` empty commits authored by `author` ("Name <email>").
pub fn commit_as(dir: &Path, author: &str, count: usize) {
    for i in 0..count {
        let message = format!("commit {i} by {author}");
        git(
            dir,
            &["commit", "-q", "--allow-empty", "--author", author, "-m", message.as_str()],
        );
    }
}

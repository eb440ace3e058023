//! Tests for the shared run context

use super::mock::*;
use shipwright_schema::{Artifact, ArtifactKind};
use temp_dir::TempDir;

use crate::context::{split_env, Registry};

#[test]
fn concurrent_registration_loses_nothing() {
    let dir = TempDir::new().unwrap();
    let ctx = mock_context(&temp_path(&dir));

    std::thread::scope(|s| {
        for worker in 0..8 {
            let ctx = &ctx;
            s.spawn(move || {
                for i in 0..100 {
                    let folder = format!("folder{worker}");
                    ctx.add_build(mock_build(&format!("bin{i}"), &folder, "linux", "amd64", ""));
                    ctx.add_artifact(mock_artifact(
                        &format!("{worker}-{i}"),
                        "dist/x",
                        ArtifactKind::Uploadable,
                    ));
                }
            });
        }
    });

    assert_eq!(ctx.builds().len(), 800);
    assert_eq!(ctx.artifacts().len(), 800);
    let groups = ctx.builds().grouped_by_folder();
    assert_eq!(groups.len(), 8);
    for builds in groups.values() {
        assert_eq!(builds.len(), 100);
        // within one worker, registration order is kept
        let names: Vec<_> = builds.iter().map(|b| b.name.clone()).collect();
        let expected: Vec<_> = (0..100).map(|i| format!("bin{i}")).collect();
        assert_eq!(names, expected);
    }
}

#[test]
fn grouping_is_a_partition() {
    let dir = TempDir::new().unwrap();
    let ctx = mock_context(&temp_path(&dir));
    ctx.add_build(build_linux_amd64());
    ctx.add_build(build_darwin_arm64());
    ctx.add_build(mock_build("helper", "linux_amd64", "linux", "amd64", ""));
    ctx.add_build(build_linux_armv7());

    let groups = ctx.builds().grouped_by_folder();
    let folders: Vec<_> = groups.keys().cloned().collect();
    assert_eq!(folders, vec!["darwin_arm64", "linux_amd64", "linux_armv7"]);
    let total: usize = groups.values().map(|g| g.len()).sum();
    assert_eq!(total, 4);
    let linux: Vec<_> = groups["linux_amd64"].iter().map(|b| b.name.as_str()).collect();
    assert_eq!(linux, vec![PROJECT, "helper"]);
}

#[test]
fn build_filters() {
    let dir = TempDir::new().unwrap();
    let ctx = mock_context(&temp_path(&dir));
    ctx.add_build(build_linux_amd64());
    ctx.add_build(build_linux_armv7());
    ctx.add_build(build_darwin_arm64());
    ctx.add_build(build_windows_amd64());

    let builds = ctx.builds();
    assert_eq!(builds.by_os("linux").len(), 2);
    assert_eq!(builds.by_arch("amd64").len(), 2);
    assert_eq!(builds.by_arm("7").len(), 1);
    assert_eq!(builds.by_os("linux").by_arch("arm").by_arm("7").len(), 1);
    assert!(builds.by_os("plan9").is_empty());
}

#[test]
fn artifact_filters() {
    let dir = TempDir::new().unwrap();
    let ctx = mock_context(&temp_path(&dir));
    ctx.add_artifact(mock_artifact("a.tar.gz", "dist/a.tar.gz", ArtifactKind::Uploadable));
    ctx.add_artifact(mock_artifact("axodotdev/axolotlsay:1.0.0", "", ArtifactKind::DockerImage));
    ctx.add_artifact(mock_artifact("checksums.txt", "dist/checksums.txt", ArtifactKind::Checksum));

    let artifacts = ctx.artifacts();
    assert_eq!(artifacts.uploadable().len(), 1);
    assert_eq!(artifacts.by_kind(ArtifactKind::DockerImage).len(), 1);
    assert_eq!(artifacts.uploadable()[0].name, "a.tar.gz");
}

#[test]
fn artifact_platform_filters() {
    let dir = TempDir::new().unwrap();
    let ctx = mock_context(&temp_path(&dir));
    let platform = |name: &str, os: &str, arch: &str, arm: &str| Artifact {
        os: os.to_owned(),
        arch: arch.to_owned(),
        arm: arm.to_owned(),
        ..mock_artifact(name, name, ArtifactKind::Uploadable)
    };
    ctx.add_artifact(platform("linux_amd64.tar.gz", "linux", "amd64", ""));
    ctx.add_artifact(platform("linux_armv6.tar.gz", "linux", "arm", "6"));
    ctx.add_artifact(platform("linux_armv7.tar.gz", "linux", "arm", "7"));
    ctx.add_artifact(platform("darwin_amd64.tar.gz", "darwin", "amd64", ""));

    let artifacts = ctx.artifacts();
    assert_eq!(artifacts.by_os("linux").len(), 3);
    assert_eq!(artifacts.by_os("windows").len(), 0);
    assert_eq!(artifacts.by_arch("amd64").len(), 2);
    let armv7 = artifacts.by_os("linux").by_arch("arm").by_arm("7");
    assert_eq!(armv7.len(), 1);
    assert_eq!(armv7[0].name, "linux_armv7.tar.gz");
}

#[test]
fn registry_snapshots_are_copies() {
    let registry = Registry::default();
    registry.push(1);
    let snapshot = registry.snapshot();
    registry.push(2);
    assert_eq!(snapshot, vec![1]);
    assert_eq!(registry.snapshot(), vec![1, 2]);
}

#[test]
fn env_splits_on_first_equals() {
    let env = split_env(["A=b=c", "EMPTY=", "NOEQUALS", "PATH=/usr/bin"]);
    assert_eq!(env.get("A").map(|s| s.as_str()), Some("b=c"));
    assert_eq!(env.get("EMPTY").map(|s| s.as_str()), Some(""));
    assert_eq!(env.get("PATH").map(|s| s.as_str()), Some("/usr/bin"));
    assert!(!env.contains_key("NOEQUALS"));
    assert_eq!(env.len(), 3);
}

#[test]
fn env_is_captured_at_creation() {
    let dir = TempDir::new().unwrap();
    let ctx = mock_context(&temp_path(&dir));
    assert_eq!(ctx.env.get("FLAVOR").map(|s| s.as_str()), Some("spicy"));
    assert_eq!(ctx.dist_dir, temp_path(&dir).join("dist"));
}

#[test]
fn short_commit() {
    let dir = TempDir::new().unwrap();
    let ctx = mock_context(&temp_path(&dir));
    assert_eq!(ctx.git.short_commit(), "4d0f6b1");
}

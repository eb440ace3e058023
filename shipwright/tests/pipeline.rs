//! End-to-end runs of the release pipeline through the public api
//!
//! These tests:
//!
//! * lay out a fake project (shipwright.toml, dist/builds.json, and "binaries")
//! * run every stage with a stand-in release host instead of GitHub
//! * check the report and what was handed to the host
//!
//! The tests that go through `load_context` need `git` on the PATH and quietly
//! pass without it.

use std::process::Command;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use shipwright::errors::{DistError, DistResult};
use shipwright::release::{ReleaseClient, ReleaseId, ReleaseRequest};
use shipwright::{config, do_release, pipeline, Cancellation, Context, RunOptions};
use shipwright_schema::{ArtifactKind, Build, Project};
use temp_dir::TempDir;

const CONFIG: &str = r#"
project_name = "axolotlsay"

[[archive.format_overrides]]
os = "windows"
format = "zip"

[release.github]
owner = "axodotdev"
name = "axolotlsay"
"#;

const BUILDS: &str = r#"[
  {"name": "axolotlsay", "folder": "linux_amd64", "os": "linux", "arch": "amd64"},
  {"name": "axolotlsay.exe", "folder": "windows_amd64", "os": "windows", "arch": "amd64"}
]"#;

#[derive(Default)]
struct RecordingHost {
    releases: Mutex<Vec<ReleaseRequest>>,
    uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl ReleaseClient for RecordingHost {
    async fn create_release(&self, request: &ReleaseRequest) -> DistResult<ReleaseId> {
        self.releases.lock().unwrap().push(request.clone());
        Ok(ReleaseId {
            id: 42,
            repo: request.repo.clone(),
        })
    }

    async fn upload(
        &self,
        _release: &ReleaseId,
        name: &str,
        _file: tokio::fs::File,
    ) -> DistResult<()> {
        self.uploads.lock().unwrap().push(name.to_owned());
        Ok(())
    }
}

fn temp_path(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap()
}

fn write_project(root: &Utf8Path) {
    std::fs::write(root.join("shipwright.toml"), CONFIG).unwrap();
    std::fs::write(root.join("README.md"), "# axolotlsay\n").unwrap();
    let dist = root.join("dist");
    std::fs::create_dir_all(&dist).unwrap();
    std::fs::write(dist.join("builds.json"), BUILDS).unwrap();
    let builds: Vec<Build> = serde_json::from_str(BUILDS).unwrap();
    for build in builds {
        let dir = dist.join(&build.folder);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(&build.name), "fake binary").unwrap();
    }
}

fn no_env() -> Vec<(String, String)> {
    Vec::new()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn releases_every_folder() {
    let dir = TempDir::new().unwrap();
    let root = temp_path(&dir);
    write_project(&root);

    let project = config::load_project(&root.join("shipwright.toml")).unwrap();
    let env = [("GITHUB_TOKEN".to_owned(), "t".to_owned())];
    let mut ctx = Context::with_env(project, root.clone(), env);
    ctx.version = "0.2.0".to_owned();
    ctx.git.current_tag = "v0.2.0".to_owned();
    for build in config::load_builds(&root.join("dist/builds.json")).unwrap() {
        ctx.add_build(build);
    }

    let host = Arc::new(RecordingHost::default());
    let client: Arc<dyn ReleaseClient> = host.clone();
    let rt = runtime();
    let _guard = rt.enter();
    let report = do_release(&mut ctx, &pipeline(Some(client)), &Cancellation::new()).unwrap();

    assert_eq!(report.version, "0.2.0");
    assert_eq!(report.tag, "v0.2.0");
    let mut names: Vec<_> = report.artifacts.iter().map(|a| a.name.clone()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "axolotlsay_0.2.0_linux_amd64.tar.gz",
            "axolotlsay_0.2.0_windows_amd64.zip",
        ]
    );
    assert!(report
        .artifacts
        .iter()
        .all(|a| a.kind == ArtifactKind::Uploadable && Utf8Path::new(&a.path).exists()));

    let releases = host.releases.lock().unwrap();
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].tag, "v0.2.0");
    assert_eq!(releases[0].name, "v0.2.0");
    assert!(!releases[0].prerelease);
    let mut uploads = host.uploads.lock().unwrap().clone();
    uploads.sort();
    assert_eq!(uploads, names);
}

#[test]
fn skip_publish_still_packages() {
    let dir = TempDir::new().unwrap();
    let root = temp_path(&dir);
    write_project(&root);

    let mut ctx = Context::with_env(Project::new("axolotlsay"), root.clone(), no_env());
    ctx.publish = false;
    ctx.version = "0.2.0".to_owned();
    for build in config::load_builds(&root.join("dist/builds.json")).unwrap() {
        ctx.add_build(build);
    }

    let host = Arc::new(RecordingHost::default());
    let client: Arc<dyn ReleaseClient> = host.clone();
    let report = do_release(&mut ctx, &pipeline(Some(client)), &Cancellation::new()).unwrap();
    assert_eq!(report.artifacts.len(), 2);
    assert!(host.releases.lock().unwrap().is_empty());
    assert!(host.uploads.lock().unwrap().is_empty());
}

#[test]
fn cancelled_runs_do_nothing() {
    let dir = TempDir::new().unwrap();
    let root = temp_path(&dir);
    write_project(&root);

    let mut ctx = Context::with_env(Project::new("axolotlsay"), root.clone(), no_env());
    for build in config::load_builds(&root.join("dist/builds.json")).unwrap() {
        ctx.add_build(build);
    }
    let cancel = Cancellation::new();
    cancel.cancel();
    let err = do_release(&mut ctx, &pipeline(None), &cancel).unwrap_err();
    assert!(matches!(err, DistError::Cancelled { .. }), "{err:?}");
    assert!(ctx.artifacts().is_empty());
}

fn has_git() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(root: &Utf8Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(root)
        .args(["-c", "user.name=axo", "-c", "user.email=axo@example.com"])
        .args(args)
        .output()
        .unwrap()
        .status;
    assert!(status.success(), "git {args:?}");
}

fn git_project(root: &Utf8Path, tag: Option<&str>) {
    write_project(root);
    git(root, &["init", "-q"]);
    git(root, &["add", "."]);
    git(root, &["commit", "-q", "-m", "initial"]);
    if let Some(tag) = tag {
        git(root, &["tag", tag]);
    }
}

#[test]
fn tagged_checkout() {
    if !has_git() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = temp_path(&dir);
    git_project(&root, Some("v1.0.0-rc.1"));

    let ctx = config::load_context(&root, &RunOptions::default()).unwrap();
    assert_eq!(ctx.git.current_tag, "v1.0.0-rc.1");
    assert_eq!(ctx.version, "1.0.0-rc.1");
    assert_eq!(ctx.git.commit.len(), 40);
    assert!(ctx.publish);
    assert_eq!(ctx.builds().len(), 2);
    assert_eq!(ctx.config.project_name, "axolotlsay");
}

#[test]
fn untagged_checkout_needs_snapshot() {
    if !has_git() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = temp_path(&dir);
    git_project(&root, None);

    let err = config::load_context(&root, &RunOptions::default()).unwrap_err();
    assert!(matches!(err, DistError::NoGitTag), "{err:?}");

    let opts = RunOptions {
        snapshot: true,
        ..RunOptions::default()
    };
    let ctx = config::load_context(&root, &opts).unwrap();
    assert!(ctx.version.starts_with("SNAPSHOT-"));
    assert!(!ctx.publish);
}

#[test]
fn dirty_checkout_is_rejected() {
    if !has_git() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = temp_path(&dir);
    git_project(&root, Some("v1.0.0"));
    std::fs::write(root.join("README.md"), "# changed\n").unwrap();

    let err = config::load_context(&root, &RunOptions::default()).unwrap_err();
    assert!(matches!(err, DistError::DirtyWorkingTree { .. }), "{err:?}");

    let opts = RunOptions {
        skip_validate: true,
        ..RunOptions::default()
    };
    assert!(config::load_context(&root, &opts).is_ok());
}

#[test]
fn not_a_repo() {
    if !has_git() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = temp_path(&dir);
    write_project(&root);
    let err = config::load_context(&root, &RunOptions::default()).unwrap_err();
    assert!(matches!(err, DistError::NotGitRepo { .. }), "{err:?}");
}

//! Asking git about the checkout we're releasing from

use axoprocess::{AxoprocessError, Cmd};
use camino::Utf8Path;

use crate::context::GitInfo;
use crate::errors::{DistError, DistResult};

/// Run git in `dir`, returning trimmed stdout, or `None` if git exited non-zero
fn git(dir: &Utf8Path, args: &[&str]) -> DistResult<Option<String>> {
    let mut cmd = Cmd::new("git", format!("run git {}", args.join(" ")));
    for arg in args {
        cmd.arg(arg);
    }
    cmd.current_dir(dir).check(false).log(None);
    let output = match cmd.output() {
        Ok(output) => output,
        Err(AxoprocessError::Exec { .. }) => {
            return Err(DistError::ToolNotFound {
                tool: "git".to_owned(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    if !output.status.success() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_owned()))
}

/// Whether `dir` is inside a git checkout
pub fn is_repo(dir: &Utf8Path) -> DistResult<bool> {
    Ok(git(dir, &["rev-parse", "--is-inside-work-tree"])?.as_deref() == Some("true"))
}

/// The most recent tag reachable from HEAD
pub fn current_tag(dir: &Utf8Path) -> DistResult<Option<String>> {
    Ok(git(dir, &["describe", "--tags", "--abbrev=0"])?.filter(|t| !t.is_empty()))
}

/// The full hash of HEAD
pub fn commit(dir: &Utf8Path) -> DistResult<Option<String>> {
    Ok(git(dir, &["rev-parse", "HEAD"])?.filter(|c| !c.is_empty()))
}

/// The url of the `origin` remote
pub fn remote_url(dir: &Utf8Path) -> DistResult<Option<String>> {
    Ok(git(dir, &["config", "--get", "remote.origin.url"])?.filter(|u| !u.is_empty()))
}

/// Uncommitted changes, as reported by `git status --porcelain` (empty when clean)
pub fn dirty_status(dir: &Utf8Path) -> DistResult<String> {
    Ok(git(dir, &["status", "--porcelain"])?.unwrap_or_default())
}

/// Gather everything we need to know about the checkout
pub fn git_info(dir: &Utf8Path) -> DistResult<GitInfo> {
    Ok(GitInfo {
        current_tag: current_tag(dir)?.unwrap_or_default(),
        commit: commit(dir)?.unwrap_or_default(),
    })
}

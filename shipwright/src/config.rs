//! Loading shipwright.toml and the builds input

use axoasset::{LocalAsset, SourceFile};
use camino::{Utf8Path, Utf8PathBuf};
use shipwright_schema::{Build, Project};
use tracing::debug;

use crate::context::{Context, GitInfo, DEFAULT_PARALLELISM};
use crate::errors::{DistError, DistResult};
use crate::git;

/// Name of the config file we look for in the project root
pub const CONFIG_FILE: &str = "shipwright.toml";

/// Name of the builds input we look for in the dist dir
pub const BUILDS_FILE: &str = "builds.json";

/// Run flags, as given on the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Path to the config file (defaults to `shipwright.toml` in the project root)
    pub config: Option<Utf8PathBuf>,
    /// Path to the builds input (defaults to `builds.json` in the dist dir)
    pub builds: Option<Utf8PathBuf>,
    /// Release the current commit without a tag, and don't publish
    pub snapshot: bool,
    /// Don't publish anything
    pub skip_publish: bool,
    /// Don't check the state of the git checkout
    pub skip_validate: bool,
    /// Maximum concurrent uploads
    pub parallelism: usize,
    /// File to read the release notes from
    pub release_notes: Option<Utf8PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config: None,
            builds: None,
            snapshot: false,
            skip_publish: false,
            skip_validate: false,
            parallelism: DEFAULT_PARALLELISM,
            release_notes: None,
        }
    }
}

/// Load a project config
pub fn load_project(path: &Utf8Path) -> DistResult<Project> {
    if !path.exists() {
        return Err(DistError::NoConfigFile {
            path: path.to_owned(),
        });
    }
    let src = SourceFile::load_local(path)?;
    Ok(src.deserialize_toml()?)
}

/// Load the builds input
pub fn load_builds(path: &Utf8Path) -> DistResult<Vec<Build>> {
    let src = SourceFile::load_local(path)?;
    let builds: Vec<Build> = src.deserialize_json()?;
    Ok(builds)
}

/// Set up the context for a run: config, flags, git metadata and builds
pub fn load_context(project_dir: &Utf8Path, opts: &RunOptions) -> DistResult<Context> {
    let config_path = opts
        .config
        .clone()
        .unwrap_or_else(|| project_dir.join(CONFIG_FILE));
    let project = load_project(&config_path)?;

    let mut ctx = Context::new(project, project_dir);
    ctx.snapshot = opts.snapshot;
    ctx.publish = !opts.skip_publish && !opts.snapshot;
    ctx.validate = !opts.skip_validate;
    ctx.parallelism = opts.parallelism.max(1);
    if let Some(notes) = &opts.release_notes {
        ctx.release_notes = Some(LocalAsset::load_string(notes)?);
    }

    apply_git(&mut ctx)?;

    let builds_path = opts
        .builds
        .clone()
        .unwrap_or_else(|| ctx.dist_dir.join(BUILDS_FILE));
    debug!("reading builds from {builds_path}");
    for build in load_builds(&builds_path)? {
        ctx.add_build(build);
    }
    Ok(ctx)
}

/// Fill in git metadata and the version, and validate the checkout
pub fn apply_git(ctx: &mut Context) -> DistResult<()> {
    if !git::is_repo(&ctx.project_dir)? {
        return Err(DistError::NotGitRepo {
            dir: ctx.project_dir.clone(),
        });
    }
    ctx.git = git::git_info(&ctx.project_dir)?;

    if ctx.snapshot {
        ctx.version = snapshot_version(&ctx.git);
        ctx.publish = false;
    } else {
        if ctx.git.current_tag.is_empty() {
            return Err(DistError::NoGitTag);
        }
        ctx.version = version_from_tag(&ctx.git.current_tag);
    }

    if ctx.validate && !ctx.snapshot {
        let status = git::dirty_status(&ctx.project_dir)?;
        if !status.is_empty() {
            return Err(DistError::DirtyWorkingTree { status });
        }
    }
    Ok(())
}

/// The version a snapshot run releases as
pub fn snapshot_version(git: &GitInfo) -> String {
    format!("SNAPSHOT-{}", git.short_commit())
}

/// The version a tag refers to (the tag minus any leading `v`)
pub fn version_from_tag(tag: &str) -> String {
    tag.strip_prefix('v').unwrap_or(tag).to_owned()
}

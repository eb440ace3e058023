//! The state shared by every stage of a run
//!
//! A [`Context`][] is created once before any stage runs, handed to each stage by
//! reference, and thrown away at exit. Config and run flags are fixed once the
//! stage defaults have been applied. The only things that grow during a run are
//! the two [`Registry`][]s of builds and artifacts, which any number of workers
//! may append to at once.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use shipwright_schema::{Artifact, ArtifactKind, Build, Project};
use tracing::{debug, info};

/// Default number of concurrent uploads
pub const DEFAULT_PARALLELISM: usize = 4;

/// An append-only list that can be pushed to from many threads
///
/// Only [`Registry::push`][] and [`Registry::snapshot`][] are exposed; nobody
/// gets to hold the lock or the backing storage.
#[derive(Debug)]
pub struct Registry<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Registry<T> {
    /// Append an item
    pub fn push(&self, item: T) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.push(item);
    }

    /// Copy out everything registered so far, in registration order
    pub fn snapshot(&self) -> Vec<T> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.clone()
    }
}

/// Info about the git checkout we're releasing from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitInfo {
    /// The tag on the current commit
    pub current_tag: String,
    /// Full hash of the current commit
    pub commit: String,
}

impl GitInfo {
    /// The abbreviated commit hash
    pub fn short_commit(&self) -> &str {
        let end = self
            .commit
            .char_indices()
            .nth(7)
            .map(|(idx, _)| idx)
            .unwrap_or(self.commit.len());
        &self.commit[..end]
    }
}

/// The shared state of a release run
#[derive(Debug)]
pub struct Context {
    /// The project config
    pub config: Project,
    /// Environment variables, captured when the context was created
    pub env: BTreeMap<String, String>,
    /// Root of the project, extra archive files are resolved relative to this
    pub project_dir: Utf8PathBuf,
    /// Where builds are read from and artifacts written to
    pub dist_dir: Utf8PathBuf,
    /// Git metadata
    pub git: GitInfo,
    /// The version being released
    pub version: String,
    /// Text to use as the body of the release
    pub release_notes: Option<String>,
    /// Whether to publish anything at all
    pub publish: bool,
    /// Whether this is a snapshot (untagged) run
    pub snapshot: bool,
    /// Whether to validate the state of the repo before releasing
    pub validate: bool,
    /// How many uploads may be in flight at once
    pub parallelism: usize,
    builds: Registry<Build>,
    artifacts: Registry<Artifact>,
}

impl Context {
    /// Create a new context, capturing the current process environment
    pub fn new(config: Project, project_dir: impl Into<Utf8PathBuf>) -> Self {
        Self::with_env(config, project_dir, std::env::vars())
    }

    /// Create a new context with an explicit environment
    pub fn with_env(
        config: Project,
        project_dir: impl Into<Utf8PathBuf>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let project_dir = project_dir.into();
        let dist_dir = project_dir.join(&config.dist);
        Self {
            config,
            env: env.into_iter().collect(),
            project_dir,
            dist_dir,
            git: GitInfo::default(),
            version: String::new(),
            release_notes: None,
            publish: true,
            snapshot: false,
            validate: true,
            parallelism: DEFAULT_PARALLELISM,
            builds: Registry::default(),
            artifacts: Registry::default(),
        }
    }

    /// Register a build
    pub fn add_build(&self, build: Build) {
        debug!("registered build {} ({})", build.path(), build.folder);
        self.builds.push(build);
    }

    /// Register an artifact
    pub fn add_artifact(&self, artifact: Artifact) {
        info!("registered artifact {artifact}");
        self.artifacts.push(artifact);
    }

    /// Every build registered so far
    pub fn builds(&self) -> Builds {
        Builds(self.builds.snapshot())
    }

    /// Every artifact registered so far
    pub fn artifacts(&self) -> Artifacts {
        Artifacts(self.artifacts.snapshot())
    }

    /// The full path of a build's binary
    pub fn build_path(&self, build: &Build) -> Utf8PathBuf {
        self.dist_dir.join(build.path())
    }

    /// Resolve a path relative to the project root
    pub fn project_path(&self, path: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        self.project_dir.join(path)
    }
}

/// Parse `KEY=VALUE` pairs, splitting on the first `=`
///
/// Entries with no `=` at all are ignored.
pub fn split_env<'a>(raw: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, String> {
    raw.into_iter()
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

/// A snapshot of registered builds, with some handy filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Builds(pub Vec<Build>);

impl Builds {
    /// Only builds for the given os
    pub fn by_os(&self, os: &str) -> Builds {
        self.filter(|b| b.os == os)
    }

    /// Only builds for the given arch
    pub fn by_arch(&self, arch: &str) -> Builds {
        self.filter(|b| b.arch == arch)
    }

    /// Only builds for the given arm variant
    pub fn by_arm(&self, arm: &str) -> Builds {
        self.filter(|b| b.arm == arm)
    }

    /// Builds partitioned by output folder
    ///
    /// Folders come out sorted, builds within a folder keep their registration order.
    pub fn grouped_by_folder(&self) -> BTreeMap<String, Vec<Build>> {
        let mut groups = BTreeMap::<String, Vec<Build>>::new();
        for build in &self.0 {
            groups
                .entry(build.folder.clone())
                .or_default()
                .push(build.clone());
        }
        groups
    }

    fn filter(&self, f: impl Fn(&Build) -> bool) -> Builds {
        Builds(self.0.iter().filter(|b| f(b)).cloned().collect())
    }
}

impl Deref for Builds {
    type Target = [Build];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A snapshot of registered artifacts, with some handy filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts(pub Vec<Artifact>);

impl Artifacts {
    /// Only artifacts of the given kind
    pub fn by_kind(&self, kind: ArtifactKind) -> Artifacts {
        self.filter(|a| a.kind == kind)
    }

    /// Only artifacts for the given os
    pub fn by_os(&self, os: &str) -> Artifacts {
        self.filter(|a| a.os == os)
    }

    /// Only artifacts for the given arch
    pub fn by_arch(&self, arch: &str) -> Artifacts {
        self.filter(|a| a.arch == arch)
    }

    /// Only artifacts for the given arm variant
    pub fn by_arm(&self, arm: &str) -> Artifacts {
        self.filter(|a| a.arm == arm)
    }

    /// Only artifacts that should be attached to the release
    pub fn uploadable(&self) -> Artifacts {
        self.by_kind(ArtifactKind::Uploadable)
    }

    fn filter(&self, f: impl Fn(&Artifact) -> bool) -> Artifacts {
        Artifacts(self.0.iter().filter(|a| f(a)).cloned().collect())
    }
}

impl Deref for Artifacts {
    type Target = [Artifact];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for Artifacts {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

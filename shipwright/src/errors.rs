//! Errors!

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// An alias for the common Result type for this crate
pub type DistResult<T> = std::result::Result<T, DistError>;

/// Errors shipwright can have
#[derive(Debug, Error, Diagnostic)]
pub enum DistError {
    /// random axoasset error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Asset(#[from] axoasset::AxoassetError),

    /// random axoprocess error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cmd(#[from] axoprocess::AxoprocessError),

    /// random i/o error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// random tokio join error
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    /// random serde_json error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A template failed to parse or render
    #[error("failed to render template `{template}`")]
    #[diagnostic(help(
        "the available variables are: os, arch, arm, version, tag, binary, project_name, env"
    ))]
    Template {
        /// the template
        template: String,
        /// what went wrong
        #[source]
        details: minijinja::Error,
    },

    /// A glob in `archive.files` couldn't be parsed
    #[error("invalid glob pattern in archive files: {pattern}")]
    Glob {
        /// the pattern
        pattern: String,
        /// what went wrong
        #[source]
        details: glob::PatternError,
    },

    /// A glob in `archive.files` couldn't be expanded
    #[error("failed to expand glob pattern in archive files: {pattern}")]
    GlobEntry {
        /// the pattern
        pattern: String,
        /// what went wrong
        #[source]
        details: glob::GlobError,
    },

    /// A path we needed to work with wasn't utf8
    #[error("path is not valid utf8: {path}")]
    NonUtf8Path {
        /// lossy rendering of the path
        path: String,
    },

    /// Couldn't create an archive file
    #[error("failed to create archive {path}")]
    ArchiveCreate {
        /// the archive
        path: Utf8PathBuf,
        /// what went wrong
        #[source]
        details: std::io::Error,
    },

    /// Couldn't add a file to an archive
    #[error("failed to add {name} to archive {path}")]
    ArchiveAdd {
        /// the archive
        path: Utf8PathBuf,
        /// name of the entry being added
        name: String,
        /// what went wrong
        #[source]
        details: std::io::Error,
    },

    /// Couldn't finish writing an archive
    #[error("failed to close archive {path}")]
    ArchiveClose {
        /// the archive
        path: Utf8PathBuf,
        /// what went wrong
        #[source]
        details: std::io::Error,
    },

    /// A tool we need isn't installed
    #[error("{tool} is not present in PATH")]
    #[diagnostic(help("install {tool} and make sure it can be found on your PATH"))]
    ToolNotFound {
        /// the tool
        tool: String,
    },

    /// Snapcraft is configured but a required field is empty
    #[error("snapcraft {field} is required")]
    #[diagnostic(help("set snapcraft.{field} in your config"))]
    SnapcraftMissingField {
        /// the missing field
        field: &'static str,
    },

    /// snapcraft ran and failed
    #[error("failed to generate snap package {snap}")]
    SnapcraftFailed {
        /// the package we were building
        snap: Utf8PathBuf,
        /// stdout and stderr of snapcraft
        #[help]
        output: Option<String>,
    },

    /// Couldn't write snap.yaml
    #[error("failed to serialize snap metadata")]
    SnapMetadata {
        /// what went wrong
        #[source]
        details: serde_yml::Error,
    },

    /// The release host refused to create the release
    #[error("failed to create release {tag} on {repo}")]
    CreateRelease {
        /// the repo
        repo: String,
        /// the release tag
        tag: String,
        /// what went wrong
        #[source]
        details: Box<DistError>,
    },

    /// A single upload failed
    #[error("failed to upload {artifact}")]
    Upload {
        /// the artifact we tried to upload
        artifact: String,
        /// what went wrong
        #[source]
        details: Box<DistError>,
    },

    /// Some uploads failed
    #[error("{} of {total} uploads failed", .errors.len())]
    UploadsFailed {
        /// how many uploads were attempted
        total: usize,
        /// every failure, in artifact order
        #[related]
        errors: Vec<DistError>,
    },

    /// We couldn't send a request to the release host at all
    #[error("failed to {operation}")]
    HostRequest {
        /// what we were trying to do
        operation: String,
        /// what went wrong
        #[source]
        details: reqwest::Error,
    },

    /// The release host sent back an error
    #[error("failed to {operation} (status: {status})")]
    HostResponse {
        /// what we were trying to do
        operation: String,
        /// the status code
        status: u16,
        /// the response body
        #[help]
        body: Option<String>,
    },

    /// A release host base url we can't build endpoints on
    #[error("invalid release host url {url}")]
    HostUrl {
        /// the url
        url: String,
    },

    /// An error parsing a repository URL
    #[error("failed to parse repository URL {repo}")]
    RepoParse {
        /// the url
        repo: String,
    },

    /// Repository is not hosted on GitHub
    #[error("repository {url} is not hosted on GitHub")]
    #[diagnostic(help("set release.github in your config to pick a repo explicitly"))]
    NotGitHub {
        /// the url
        url: String,
    },

    /// Repository URL is in an unknown format
    #[error("unknown repository URL format: {url}")]
    UnknownRepoStyle {
        /// the url
        url: String,
    },

    /// No remote to release to
    #[error("couldn't determine which repository to release to")]
    #[diagnostic(help(
        "either add an `origin` git remote or set release.github in your config"
    ))]
    NoRepository,

    /// Not running inside a git checkout
    #[error("{dir} is not a git repository")]
    #[diagnostic(help("releases are made from a git checkout, run `git init` and commit first"))]
    NotGitRepo {
        /// where we looked
        dir: Utf8PathBuf,
    },

    /// No tag on the current commit
    #[error("couldn't find a git tag for the current commit")]
    #[diagnostic(help("tag the commit you want to release, or pass --snapshot"))]
    NoGitTag,

    /// Working tree has uncommitted changes
    #[error("git working tree is dirty")]
    #[diagnostic(help("commit or stash these changes, or pass --skip-validate:\n{status}"))]
    DirtyWorkingTree {
        /// output of git status
        status: String,
    },

    /// No token for the release host
    #[error("GITHUB_TOKEN is not set")]
    #[diagnostic(help("export a GitHub token with permission to create releases"))]
    TokenMissing,

    /// No config file
    #[error("couldn't find config file {path}")]
    #[diagnostic(help("create a shipwright.toml in your project root or pass --config"))]
    NoConfigFile {
        /// where we looked
        path: Utf8PathBuf,
    },

    /// A stage's default step failed
    #[error("failed to set defaults for {stage}")]
    StageDefaults {
        /// the stage
        stage: &'static str,
        /// help carried over from the underlying error
        #[help]
        help: Option<String>,
        /// what went wrong
        #[source]
        details: Box<DistError>,
    },

    /// A stage's run step failed
    #[error("{stage} failed")]
    StageFailed {
        /// the stage
        stage: &'static str,
        /// help carried over from the underlying error
        #[help]
        help: Option<String>,
        /// what went wrong
        #[source]
        details: Box<DistError>,
    },

    /// The run was interrupted
    #[error("release was cancelled before {stage}")]
    Cancelled {
        /// the stage that didn't get to start
        stage: &'static str,
    },
}

#![deny(missing_docs)]

//! # shipwright-schema
//!
//! This crate exists to serialize and deserialize the files shipwright reads and writes:
//!
//! * `shipwright.toml`, the project config (root type [`Project`][])
//! * the builds input, a JSON array of [`Build`][]s produced by some earlier build system
//! * the release report printed at the end of a run ([`DistReport`][])
//!
//! Ideally these should be reasonably forward and backward compatible between versions.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A local system path on the machine shipwright was run.
///
/// This is a String because when deserializing this may be a path format from a different OS!
pub type LocalPath = String;

/// Name of the dist dir if none is configured
pub const DEFAULT_DIST_DIR: &str = "dist";

/// One compiled binary for one os/arch/arm combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Build {
    /// File name of the binary (e.g. `myapp` or `myapp.exe`)
    pub name: String,
    /// Output folder (relative to the dist dir), unique per os/arch/arm combination
    pub folder: LocalPath,
    /// Target operating system (e.g. `linux`, `darwin`, `windows`)
    pub os: String,
    /// Target architecture (e.g. `amd64`, `386`, `arm64`, `arm`)
    pub arch: String,
    /// ARM variant (e.g. `6`, `7`), empty when not applicable
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arm: String,
}

impl Build {
    /// Path of the binary relative to the dist dir (`folder/name`)
    pub fn path(&self) -> LocalPath {
        format!("{}/{}", self.folder, self.name)
    }
}

/// The kind of an [`Artifact`][]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Something that should be attached to the release (archives, packages, raw binaries)
    Uploadable,
    /// A docker image (pushed elsewhere, only mentioned in release notes)
    DockerImage,
    /// A checksums file
    Checksum,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactKind::Uploadable => "uploadable",
            ArtifactKind::DockerImage => "docker-image",
            ArtifactKind::Checksum => "checksum",
        };
        s.fmt(f)
    }
}

/// One produced output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// The name the artifact is published under (e.g. `myapp_1.0.0_linux_amd64.tar.gz`)
    pub name: String,
    /// Where the artifact is on the local system
    pub path: LocalPath,
    /// What kind of artifact this is
    pub kind: ArtifactKind,
    /// Target operating system, empty if not platform-specific
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub os: String,
    /// Target architecture, empty if not platform-specific
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arch: String,
    /// ARM variant, empty if not applicable
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arm: String,
}

impl Artifact {
    /// Whether this should be attached to the release
    pub fn is_uploadable(&self) -> bool {
        self.kind == ArtifactKind::Uploadable
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.kind, self.name, self.path)
    }
}

/// Contents of shipwright.toml
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    /// Name of the project, used in archive names and package metadata
    pub project_name: String,
    /// Directory the builds live in and artifacts are written to (default "dist")
    #[serde(default = "default_dist_dir")]
    pub dist: LocalPath,
    /// Settings for the archive stage
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Settings for the snapcraft stage
    #[serde(default)]
    pub snapcraft: SnapcraftConfig,
    /// Settings for the release stage
    #[serde(default)]
    pub release: ReleaseConfig,
}

fn default_dist_dir() -> LocalPath {
    DEFAULT_DIST_DIR.to_owned()
}

impl Project {
    /// A config with every optional setting left unset
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            dist: default_dist_dir(),
            archive: ArchiveConfig::default(),
            snapcraft: SnapcraftConfig::default(),
            release: ReleaseConfig::default(),
        }
    }
}

/// The container format of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ArchiveFormat {
    /// `.tar.gz`
    #[serde(rename = "tar.gz")]
    TarGz,
    /// `.tar.xz`
    #[serde(rename = "tar.xz")]
    TarXz,
    /// `.tar`
    #[serde(rename = "tar")]
    Tar,
    /// `.zip`
    #[serde(rename = "zip")]
    Zip,
    /// Don't archive at all, publish the raw binaries
    #[serde(rename = "binary")]
    Binary,
}

impl ArchiveFormat {
    /// Get the extension used for this kind of archive (without the leading dot)
    pub fn ext(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarXz => "tar.xz",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Binary => "binary",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ext().fmt(f)
    }
}

/// Use a different archive format for one os
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FormatOverride {
    /// The os this applies to (matched against [`Build::os`][])
    pub os: String,
    /// The format to use instead
    pub format: ArchiveFormat,
}

/// `[archive]` settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Template for archive names (without extension)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_template: Option<String>,
    /// Archive format (default tar.gz)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ArchiveFormat>,
    /// Per-os format overrides, checked before falling back to `format`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub format_overrides: Vec<FormatOverride>,
    /// Globs of extra files to put in every archive
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Exact-match replacements applied to os/arch/arm before templating
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub replacements: BTreeMap<String, String>,
    /// Whether archive contents should be put under a directory named after the folder
    pub wrap_in_directory: bool,
}

/// `[snapcraft]` settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SnapcraftConfig {
    /// Name of the snap (defaults to the project name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// One-line summary, required to build snaps
    pub summary: String,
    /// Longer description, required to build snaps
    pub description: String,
    /// `stable` or `devel`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    /// `strict`, `devmode` or `classic`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confinement: Option<String>,
    /// Per-binary app settings, keyed by binary name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub apps: BTreeMap<String, SnapcraftAppConfig>,
}

/// Settings for one binary inside a snap
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SnapcraftAppConfig {
    /// Interfaces the app plugs into
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugs: Vec<String>,
    /// Daemon type, if the app is a service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon: Option<String>,
}

/// `[release]` settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReleaseConfig {
    /// The GitHub repo to release to (defaults to the `origin` remote)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubRepoPair>,
    /// Template for the release title (default is the tag)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_template: Option<String>,
    /// Create the release as a draft
    pub draft: bool,
}

/// A GitHub repo like 'axodotdev/axolotlsay'
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GithubRepoPair {
    /// owner (axodotdev)
    pub owner: String,
    /// repo (axolotlsay)
    pub name: String,
}

impl fmt::Display for GithubRepoPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A report of what a shipwright run produced
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DistReport {
    /// The version of shipwright that generated this
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist_version: Option<String>,
    /// The version that was released
    pub version: String,
    /// The git tag the release is for
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag: String,
    /// Every artifact registered during the run, in registration order
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl DistReport {
    /// Get the JSON Schema for a DistReport
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DistReport)
    }
}

/// Get the JSON Schema for the builds input file
pub fn builds_json_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Vec<Build>)
}

/// Get the JSON Schema for shipwright.toml
pub fn project_json_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Project)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_path_joins_folder() {
        let build = Build {
            name: "myapp".to_owned(),
            folder: "myapp_linux_amd64".to_owned(),
            os: "linux".to_owned(),
            arch: "amd64".to_owned(),
            arm: String::new(),
        };
        assert_eq!(build.path(), "myapp_linux_amd64/myapp");
    }

    #[test]
    fn builds_input_arm_is_optional() {
        let input = r#"[
            {"name": "myapp", "folder": "linux_arm64", "os": "linux", "arch": "arm64"},
            {"name": "myapp", "folder": "linux_armv6", "os": "linux", "arch": "arm", "arm": "6"}
        ]"#;
        let builds: Vec<Build> = serde_json::from_str(input).unwrap();
        assert_eq!(builds.len(), 2);
        assert_eq!(builds[0].arm, "");
        assert_eq!(builds[1].arm, "6");
    }

    #[test]
    fn archive_formats_use_their_extension() {
        let format: ArchiveFormat = serde_json::from_str(r#""tar.gz""#).unwrap();
        assert_eq!(format, ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::Zip.ext(), "zip");
        assert!(serde_json::from_str::<ArchiveFormat>(r#""rar""#).is_err());
    }

    #[test]
    fn artifact_display() {
        let artifact = Artifact {
            name: "myapp.tar.gz".to_owned(),
            path: "dist/myapp.tar.gz".to_owned(),
            kind: ArtifactKind::Uploadable,
            os: String::new(),
            arch: String::new(),
            arm: String::new(),
        };
        assert_eq!(
            artifact.to_string(),
            "[uploadable] myapp.tar.gz (dist/myapp.tar.gz)"
        );
    }

    #[test]
    fn project_defaults() {
        let project: Project = serde_json::from_str(r#"{"project_name": "myapp"}"#).unwrap();
        assert_eq!(project.dist, DEFAULT_DIST_DIR);
        assert!(project.archive.name_template.is_none());
        assert!(project.release.github.is_none());
        assert!(!project.archive.wrap_in_directory);
    }
}

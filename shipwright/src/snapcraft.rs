//! The snapcraft stage: package linux builds as snaps
//!
//! For every linux folder we lay out a `prime` dir the way snapcraft expects
//! (`prime/meta/snap.yaml` plus the binaries) and ask `snapcraft snap` to pack it.

use std::collections::BTreeMap;

use axoasset::LocalAsset;
use axoprocess::Cmd;
use camino::Utf8Path;
use serde::Serialize;
use shipwright_schema::{Artifact, ArtifactKind, Build};
use tracing::{debug, info};

use crate::context::Context;
use crate::errors::{DistError, DistResult};
use crate::pipe::{for_each_folder, skip, Cancellation, Pipe, PipeResult};
use crate::platform::snap_arch;

/// Name of the snapcraft binary
pub const SNAPCRAFT: &str = "snapcraft";

/// Builds snap packages
#[derive(Debug)]
pub struct SnapcraftPipe {
    tool: String,
}

impl Default for SnapcraftPipe {
    fn default() -> Self {
        Self::with_tool(SNAPCRAFT)
    }
}

impl SnapcraftPipe {
    /// Use a specific snapcraft binary
    pub fn with_tool(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    fn check_tool(&self) -> DistResult<()> {
        let mut cmd = Cmd::new(&self.tool, format!("check for {}", self.tool));
        cmd.arg("--version").check(false).log(None);
        cmd.output().map_err(|_| DistError::ToolNotFound {
            tool: self.tool.clone(),
        })?;
        Ok(())
    }
}

impl Pipe for SnapcraftPipe {
    fn description(&self) -> &'static str {
        "creating linux packages with snapcraft"
    }

    fn run(&self, ctx: &Context, _cancel: &Cancellation) -> PipeResult {
        let config = &ctx.config.snapcraft;
        if config.summary.is_empty() && config.description.is_empty() {
            return skip("no summary nor description were provided");
        }
        if config.summary.is_empty() {
            return Err(DistError::SnapcraftMissingField { field: "summary" }.into());
        }
        if config.description.is_empty() {
            return Err(DistError::SnapcraftMissingField {
                field: "description",
            }
            .into());
        }
        self.check_tool()?;

        let groups = ctx.builds().by_os("linux").grouped_by_folder();
        for_each_folder(&groups, |folder, builds| self.create(ctx, folder, builds))?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SnapMetadata<'a> {
    name: &'a str,
    version: &'a str,
    summary: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    grade: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confinement: Option<&'a str>,
    architectures: Vec<&'a str>,
    apps: BTreeMap<&'a str, SnapApp<'a>>,
}

#[derive(Debug, Serialize)]
struct SnapApp<'a> {
    command: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    plugs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    daemon: Option<&'a str>,
}

impl SnapcraftPipe {
    fn create(&self, ctx: &Context, folder: &str, builds: &[Build]) -> DistResult<()> {
        let Some(platform) = builds.first() else {
            return Ok(());
        };
        let config = &ctx.config.snapcraft;
        let prime = ctx.dist_dir.join(folder).join("prime");
        let meta = prime.join("meta");
        LocalAsset::create_dir_all(&meta)?;

        let apps = builds
            .iter()
            .map(|build| {
                let app = config.apps.get(&build.name);
                let entry = SnapApp {
                    command: &build.name,
                    plugs: app.map(|a| a.plugs.clone()).unwrap_or_default(),
                    daemon: app.and_then(|a| a.daemon.as_deref()),
                };
                (build.name.as_str(), entry)
            })
            .collect();
        let metadata = SnapMetadata {
            name: config.name.as_deref().unwrap_or(&ctx.config.project_name),
            version: &ctx.version,
            summary: &config.summary,
            description: &config.description,
            grade: config.grade.as_deref(),
            confinement: config.confinement.as_deref(),
            architectures: vec![snap_arch(&platform.arch)],
            apps,
        };
        let yaml =
            serde_yml::to_string(&metadata).map_err(|details| DistError::SnapMetadata { details })?;
        let snap_yaml = meta.join("snap.yaml");
        debug!("  writing {snap_yaml}");
        LocalAsset::write_new(&yaml, &snap_yaml)?;

        for build in builds {
            link_or_copy(&ctx.build_path(build), &prime.join(&build.name))?;
        }

        let snap = ctx.dist_dir.join(format!("{folder}.snap"));
        info!("  creating {snap}");
        let mut cmd = Cmd::new(&self.tool, format!("build {snap}"));
        cmd.arg("snap")
            .arg(&prime)
            .arg("--output")
            .arg(&snap)
            .check(false);
        let output = cmd.output()?;
        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(DistError::SnapcraftFailed {
                snap,
                output: Some(combined),
            });
        }

        ctx.add_artifact(Artifact {
            name: format!("{folder}.snap"),
            path: snap.into_string(),
            kind: ArtifactKind::Uploadable,
            os: platform.os.clone(),
            arch: platform.arch.clone(),
            arm: platform.arm.clone(),
        });
        Ok(())
    }
}

/// Hard link `src` to `dest`, falling back to a copy
fn link_or_copy(src: &Utf8Path, dest: &Utf8Path) -> DistResult<()> {
    if std::fs::hard_link(src, dest).is_ok() {
        return Ok(());
    }
    debug!("  couldn't link {src}, copying instead");
    LocalAsset::copy_file_to_file(src, dest)?;
    Ok(())
}

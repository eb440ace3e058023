//! The archive stage: turn each folder of builds into one uploadable artifact

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use shipwright_schema::{ArchiveConfig, ArchiveFormat, Artifact, ArtifactKind, Build};
use tracing::{debug, info};

use crate::context::Context;
use crate::errors::{DistError, DistResult};
use crate::pipe::{for_each_folder, Cancellation, Pipe, PipeResult};
use crate::platform::{exe_suffix, strip_exe_suffix};

pub mod format;
pub mod name;

use format::{new_archive, Codec};
use name::{archive_name, DEFAULT_NAME_TEMPLATE};

/// Archive format used when none is configured
pub const DEFAULT_FORMAT: ArchiveFormat = ArchiveFormat::TarGz;

/// Extra files included when none are configured
pub const DEFAULT_FILES: &[&str] = &[
    "licence*",
    "LICENCE*",
    "license*",
    "LICENSE*",
    "readme*",
    "README*",
    "changelog*",
    "CHANGELOG*",
];

/// Packages builds into archives
#[derive(Debug, Default)]
pub struct ArchivePipe;

impl Pipe for ArchivePipe {
    fn description(&self) -> &'static str {
        "creating archives"
    }

    fn defaults(&self, ctx: &mut Context) -> DistResult<()> {
        let archive = &mut ctx.config.archive;
        if archive.name_template.is_none() {
            archive.name_template = Some(DEFAULT_NAME_TEMPLATE.to_owned());
        }
        if archive.format.is_none() {
            archive.format = Some(DEFAULT_FORMAT);
        }
        if archive.files.is_empty() {
            archive.files = DEFAULT_FILES.iter().map(|s| s.to_string()).collect();
        }
        Ok(())
    }

    fn run(&self, ctx: &Context, _cancel: &Cancellation) -> PipeResult {
        let groups = ctx.builds().grouped_by_folder();
        for_each_folder(&groups, |folder, builds| archive_folder(ctx, folder, builds))?;
        Ok(())
    }
}

/// The format to use for an os, taking overrides into account
pub fn format_for(config: &ArchiveConfig, os: &str) -> ArchiveFormat {
    config
        .format_overrides
        .iter()
        .find(|o| o.os == os)
        .map(|o| o.format)
        .or(config.format)
        .unwrap_or(DEFAULT_FORMAT)
}

fn archive_folder(ctx: &Context, folder: &str, builds: &[Build]) -> DistResult<()> {
    let Some(first) = builds.first() else {
        return Ok(());
    };
    let format = format_for(&ctx.config.archive, &first.os);
    match Codec::for_format(format) {
        None => register_binaries(ctx, builds),
        Some(codec) => create_archive(ctx, codec, format, folder, builds),
    }
}

/// The "binary" format: no archive, each binary gets published as-is
fn register_binaries(ctx: &Context, builds: &[Build]) -> DistResult<()> {
    for build in builds {
        let binary = strip_exe_suffix(&build.name, &build.os);
        let name = archive_name(ctx, build, binary)?;
        ctx.add_artifact(Artifact {
            name: format!("{name}{}", exe_suffix(&build.os)),
            path: ctx.build_path(build).into_string(),
            kind: ArtifactKind::Uploadable,
            os: build.os.clone(),
            arch: build.arch.clone(),
            arm: build.arm.clone(),
        });
    }
    Ok(())
}

fn create_archive(
    ctx: &Context,
    codec: Codec,
    format: ArchiveFormat,
    folder: &str,
    builds: &[Build],
) -> DistResult<()> {
    let platform = &builds[0];
    let name = archive_name(ctx, platform, &ctx.config.project_name)?;
    let filename = format!("{name}.{}", format.ext());
    let path = ctx.dist_dir.join(&filename);
    info!("  creating {path}");

    let wrap = ctx.config.archive.wrap_in_directory;
    let entry_name = |name: &str| {
        if wrap {
            format!("{folder}/{name}")
        } else {
            name.to_owned()
        }
    };

    let mut archive = new_archive(codec, &path)?;
    for (rel, src) in extra_files(ctx)? {
        debug!("    adding {rel}");
        archive.add(&entry_name(rel.as_str()), &src)?;
    }
    for build in builds {
        debug!("    adding {}", build.name);
        archive.add(&entry_name(&build.name), &ctx.build_path(build))?;
    }
    archive.close()?;

    ctx.add_artifact(Artifact {
        name: filename,
        path: path.into_string(),
        kind: ArtifactKind::Uploadable,
        os: platform.os.clone(),
        arch: platform.arch.clone(),
        arm: platform.arm.clone(),
    });
    Ok(())
}

/// Expand the configured globs against the project dir
///
/// Returns (path relative to the project dir, full path) pairs, sorted and deduplicated.
pub fn extra_files(ctx: &Context) -> DistResult<Vec<(Utf8PathBuf, Utf8PathBuf)>> {
    let patterns: Vec<&str> = if ctx.config.archive.files.is_empty() {
        DEFAULT_FILES.to_vec()
    } else {
        ctx.config.archive.files.iter().map(|s| s.as_str()).collect()
    };

    // the project dir is a literal prefix, only the configured part may match anything
    let root = glob::Pattern::escape(ctx.project_dir.as_str());
    let mut files = Vec::new();
    for pattern in patterns {
        let full_pattern = format!("{root}/{pattern}");
        let entries =
            glob::glob(&full_pattern).map_err(|details| DistError::Glob {
                pattern: pattern.to_owned(),
                details,
            })?;
        for entry in entries {
            let path = entry.map_err(|details| DistError::GlobEntry {
                pattern: pattern.to_owned(),
                details,
            })?;
            let path = Utf8PathBuf::from_path_buf(path).map_err(|p| DistError::NonUtf8Path {
                path: p.display().to_string(),
            })?;
            if !path.is_file() {
                continue;
            }
            let rel = relative_to(&path, &ctx.project_dir);
            files.push((rel, path));
        }
    }
    Ok(files.into_iter().sorted().dedup().collect())
}

fn relative_to(path: &Utf8Path, base: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(base)
        .map(|p| p.to_owned())
        .unwrap_or_else(|_| path.to_owned())
}

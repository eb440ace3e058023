#![deny(missing_docs)]
#![allow(clippy::result_large_err)]

//! # shipwright
//!
//! This is the library at the core of the `shipwright` CLI. Given binaries some other
//! build system already produced, it packages them up (archives, snaps) and publishes
//! them as a release.
//!
//! A run is a fixed list of stages ([`Pipe`][]s) executed in order against one shared
//! [`Context`][]. Stages fan their work out internally (one worker per build folder,
//! or one task per upload) but never overlap each other.
//!
//! It's currently not terribly well-suited to being used as a pure library because it happily
//! writes to stderr/stdout whenever it pleases. Suboptimal for a library.

use std::sync::Arc;

use shipwright_schema::DistReport;

pub mod archive;
pub mod config;
pub mod context;
pub mod errors;
pub mod git;
pub mod net;
pub mod pipe;
pub mod platform;
pub mod release;
pub mod repo;
pub mod snapcraft;
pub mod templates;
#[cfg(test)]
mod tests;

pub use config::RunOptions;
pub use context::Context;
use errors::DistResult;
pub use pipe::{execute, Cancellation, Pipe, PipeError, PipeResult};
use release::{ReleaseClient, ReleasePipe};

/// The stages of a release, in the order they run
///
/// With no client, releases go to GitHub.
pub fn pipeline(client: Option<Arc<dyn ReleaseClient>>) -> Vec<Box<dyn Pipe>> {
    let release = match client {
        Some(client) => ReleasePipe::with_client(client),
        None => ReleasePipe::new(),
    };
    vec![
        Box::new(archive::ArchivePipe),
        Box::new(snapcraft::SnapcraftPipe::default()),
        Box::new(release),
    ]
}

/// shipwright release -- package everything up and publish it!
pub fn do_release(
    ctx: &mut Context,
    pipes: &[Box<dyn Pipe>],
    cancel: &Cancellation,
) -> DistResult<DistReport> {
    execute(ctx, pipes, cancel)?;
    Ok(build_report(ctx))
}

/// Summarize what a run produced
pub fn build_report(ctx: &Context) -> DistReport {
    DistReport {
        dist_version: Some(env!("CARGO_PKG_VERSION").to_owned()),
        version: ctx.version.clone(),
        tag: ctx.git.current_tag.clone(),
        artifacts: ctx.artifacts().0,
    }
}

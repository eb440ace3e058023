//! Turning builds into archive names

use std::collections::BTreeMap;

use shipwright_schema::Build;

use crate::context::Context;
use crate::errors::DistResult;
use crate::templates::{render_name, Target};

/// Name template used when none is configured
pub const DEFAULT_NAME_TEMPLATE: &str =
    "{{ binary }}_{{ version }}_{{ os }}_{{ arch }}{% if arm %}v{{ arm }}{% endif %}";

/// Look a value up in the replacement table
///
/// Only exact matches are replaced, and an empty replacement counts as no replacement.
pub fn replace<'a>(replacements: &'a BTreeMap<String, String>, value: &'a str) -> &'a str {
    match replacements.get(value) {
        Some(replacement) if !replacement.is_empty() => replacement,
        _ => value,
    }
}

/// Render the archive name template for one build
///
/// The build's os/arch/arm go through the replacement table before rendering.
pub fn archive_name(ctx: &Context, build: &Build, binary: &str) -> DistResult<String> {
    let config = &ctx.config.archive;
    let template = config
        .name_template
        .as_deref()
        .unwrap_or(DEFAULT_NAME_TEMPLATE);
    let target = Target {
        os: replace(&config.replacements, &build.os),
        arch: replace(&config.replacements, &build.arch),
        arm: replace(&config.replacements, &build.arm),
    };
    render_name(ctx, template, binary, target)
}

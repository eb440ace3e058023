//! Logic for rendering the user-configured name templates
//!
//! Templates are jinja2 (via minijinja) rendered against a fixed set of variables:
//! `os`, `arch`, `arm`, `version`, `tag`, `binary`, `project_name` and `env`.
//! Referencing anything else is an error rather than an empty string.

use std::collections::BTreeMap;

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::context::Context;
use crate::errors::{DistError, DistResult};

/// The platform a name is being rendered for
///
/// Release-wide names (like the release title) use [`Target::none`][].
#[derive(Debug, Clone, Copy, Default)]
pub struct Target<'a> {
    /// os
    pub os: &'a str,
    /// arch
    pub arch: &'a str,
    /// arm variant
    pub arm: &'a str,
}

impl Target<'_> {
    /// Not rendering for any particular platform
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Serialize)]
struct TemplateVars<'a> {
    os: &'a str,
    arch: &'a str,
    arm: &'a str,
    version: &'a str,
    tag: &'a str,
    binary: &'a str,
    project_name: &'a str,
    env: &'a BTreeMap<String, String>,
}

/// Render a name template
///
/// `binary` is the name of the thing being packaged, it's exposed as both
/// `binary` and `project_name`.
pub fn render_name(
    ctx: &Context,
    template: &str,
    binary: &str,
    target: Target<'_>,
) -> DistResult<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_debug(true);

    let vars = TemplateVars {
        os: target.os,
        arch: target.arch,
        arm: target.arm,
        version: &ctx.version,
        tag: &ctx.git.current_tag,
        binary,
        project_name: binary,
        env: &ctx.env,
    };
    env.render_str(template, vars)
        .map_err(|details| DistError::Template {
            template: template.to_owned(),
            details,
        })
}

//! The release stage: create the release and upload every artifact to it

use std::sync::Arc;

use async_trait::async_trait;
use shipwright_schema::{Artifact, ArtifactKind, GithubRepoPair};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::context::{Artifacts, Context};
use crate::errors::{DistError, DistResult};
use crate::pipe::{skip, Cancellation, Pipe, PipeResult};
use crate::templates::{render_name, Target};

pub mod github;

pub use github::GithubClient;

/// Release name template used when none is configured
pub const DEFAULT_NAME_TEMPLATE: &str = "{{ tag }}";

/// Env var the GitHub token is read from
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";

/// A release that exists on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseId {
    /// The host's id for the release
    pub id: u64,
    /// The repo the release belongs to
    pub repo: GithubRepoPair,
}

/// Everything needed to create (or update) a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// Repo to release to
    pub repo: GithubRepoPair,
    /// Git tag of the release
    pub tag: String,
    /// Title of the release
    pub name: String,
    /// Body of the release
    pub body: String,
    /// Whether to create it as a draft
    pub draft: bool,
    /// Whether to mark it as a prerelease
    pub prerelease: bool,
}

/// Somewhere releases can be published
#[async_trait]
pub trait ReleaseClient: Send + Sync {
    /// Create a release for the tag, or update the one that already exists
    async fn create_release(&self, request: &ReleaseRequest) -> DistResult<ReleaseId>;
    /// Attach a file to a release under the given name
    async fn upload(&self, release: &ReleaseId, name: &str, file: tokio::fs::File)
        -> DistResult<()>;
}

/// Publishes the release
#[derive(Default)]
pub struct ReleasePipe {
    client: Option<Arc<dyn ReleaseClient>>,
}

impl ReleasePipe {
    /// Release with the GitHub client
    pub fn new() -> Self {
        Self::default()
    }

    /// Release with a specific client
    pub fn with_client(client: Arc<dyn ReleaseClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client(&self, ctx: &Context) -> DistResult<Arc<dyn ReleaseClient>> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let token = ctx
            .env
            .get(TOKEN_VAR)
            .filter(|t| !t.is_empty())
            .ok_or(DistError::TokenMissing)?;
        Ok(Arc::new(GithubClient::new(token.clone())?))
    }
}

impl Pipe for ReleasePipe {
    fn description(&self) -> &'static str {
        "releasing"
    }

    fn defaults(&self, ctx: &mut Context) -> DistResult<()> {
        if ctx.config.release.name_template.is_none() {
            ctx.config.release.name_template = Some(DEFAULT_NAME_TEMPLATE.to_owned());
        }
        // nothing will be published, so don't insist on finding a repo
        if ctx.config.release.github.is_some() || !ctx.publish {
            return Ok(());
        }
        let url = crate::git::remote_url(&ctx.project_dir)?.ok_or(DistError::NoRepository)?;
        let repo = crate::repo::parse_github_repo(&url)?;
        debug!("releasing to {repo} (from git remote)");
        ctx.config.release.github = Some(repo);
        Ok(())
    }

    fn run(&self, ctx: &Context, _cancel: &Cancellation) -> PipeResult {
        if !ctx.publish {
            return skip("publishing disabled");
        }
        let client = self.client(ctx)?;
        tokio::runtime::Handle::current().block_on(publish(ctx, client))?;
        Ok(())
    }
}

/// Build the request for the release described by the context
pub fn release_request(ctx: &Context) -> DistResult<ReleaseRequest> {
    let repo = ctx
        .config
        .release
        .github
        .clone()
        .ok_or(DistError::NoRepository)?;
    let template = ctx
        .config
        .release
        .name_template
        .as_deref()
        .unwrap_or(DEFAULT_NAME_TEMPLATE);
    let name = render_name(ctx, template, &ctx.config.project_name, Target::none())?;
    let prerelease = semver::Version::parse(&ctx.version)
        .map(|v| !v.pre.is_empty())
        .unwrap_or(false);
    Ok(ReleaseRequest {
        repo,
        tag: ctx.git.current_tag.clone(),
        name,
        body: release_body(ctx),
        draft: ctx.config.release.draft,
        prerelease,
    })
}

/// The release notes, followed by any docker images that were produced
pub fn release_body(ctx: &Context) -> String {
    let mut body = ctx.release_notes.clone().unwrap_or_default();
    let images = ctx.artifacts().by_kind(ArtifactKind::DockerImage);
    if !images.is_empty() {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str("## Docker images\n");
        for image in images.iter() {
            body.push_str(&format!("\n- `docker pull {}`", image.name));
        }
        body.push('\n');
    }
    body
}

/// Create the release and upload everything uploadable to it
pub async fn publish(ctx: &Context, client: Arc<dyn ReleaseClient>) -> DistResult<()> {
    let request = release_request(ctx)?;
    info!("  creating or updating release {} on {}", request.tag, request.repo);
    let release = client
        .create_release(&request)
        .await
        .map_err(|e| DistError::CreateRelease {
            repo: request.repo.to_string(),
            tag: request.tag.clone(),
            details: Box::new(e),
        })?;
    upload_all(client, release, ctx.artifacts().uploadable(), ctx.parallelism).await
}

/// Upload artifacts with at most `parallelism` uploads in flight
///
/// Every upload is attempted. If any fail they're all reported together,
/// in the order the artifacts were given.
pub async fn upload_all(
    client: Arc<dyn ReleaseClient>,
    release: ReleaseId,
    artifacts: Artifacts,
    parallelism: usize,
) -> DistResult<()> {
    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let release = Arc::new(release);

    let mut uploads = Vec::new();
    for artifact in artifacts {
        let client = client.clone();
        let semaphore = semaphore.clone();
        let release = release.clone();
        let name = artifact.name.clone();
        uploads.push((
            name,
            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("upload semaphore closed!?");
                upload(client.as_ref(), &release, &artifact).await
            }),
        ));
    }

    let total = uploads.len();
    let mut errors = Vec::new();
    for (name, handle) in uploads {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(DistError::from(e)),
        };
        if let Err(e) = result {
            errors.push(DistError::Upload {
                artifact: name,
                details: Box::new(e),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(DistError::UploadsFailed { total, errors })
    }
}

async fn upload(
    client: &dyn ReleaseClient,
    release: &ReleaseId,
    artifact: &Artifact,
) -> DistResult<()> {
    info!("  uploading {}", artifact.name);
    let file = tokio::fs::File::open(&artifact.path).await?;
    // the file is closed when the client drops it, whatever happened
    client.upload(release, &artifact.name, file).await
}

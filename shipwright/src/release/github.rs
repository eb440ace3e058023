//! A [`ReleaseClient`][] that talks to the GitHub REST API

use async_trait::async_trait;
use reqwest::{header, Body, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{ReleaseClient, ReleaseId, ReleaseRequest};
use crate::errors::{DistError, DistResult};
use crate::net::{create_reqwest_client, ClientSettings};

const API_URL: &str = "https://api.github.com";
const UPLOADS_URL: &str = "https://uploads.github.com";

/// GitHub Releases
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    token: String,
    api_url: String,
    uploads_url: String,
}

#[derive(Serialize)]
struct ReleaseBody<'a> {
    tag_name: &'a str,
    name: &'a str,
    body: &'a str,
    draft: bool,
    prerelease: bool,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    id: u64,
}

impl GithubClient {
    /// Make a client that authenticates with the given token
    pub fn new(token: impl Into<String>) -> DistResult<Self> {
        Ok(Self {
            client: create_reqwest_client(&ClientSettings::new())?,
            token: token.into(),
            api_url: API_URL.to_owned(),
            uploads_url: UPLOADS_URL.to_owned(),
        })
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

/// `base` with each of `segments` appended as its own (escaped) path segment
pub fn endpoint(base: &str, segments: &[&str]) -> DistResult<Url> {
    let bad_url = || DistError::HostUrl {
        url: base.to_owned(),
    };
    let mut url = Url::parse(base).map_err(|_| bad_url())?;
    url.path_segments_mut()
        .map_err(|_| bad_url())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Send a request, turning transport failures and error statuses into DistErrors
async fn send(req: reqwest::RequestBuilder, operation: &str) -> DistResult<Response> {
    let res = req.send().await.map_err(|details| DistError::HostRequest {
        operation: operation.to_owned(),
        details,
    })?;
    check_status(res, operation).await
}

async fn check_status(res: Response, operation: &str) -> DistResult<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.ok().filter(|b| !b.is_empty());
    Err(DistError::HostResponse {
        operation: operation.to_owned(),
        status: status.as_u16(),
        body,
    })
}

async fn parse_release(res: Response, operation: &str) -> DistResult<ReleaseResponse> {
    res.json()
        .await
        .map_err(|details| DistError::HostRequest {
            operation: operation.to_owned(),
            details,
        })
}

#[async_trait]
impl ReleaseClient for GithubClient {
    async fn create_release(&self, request: &ReleaseRequest) -> DistResult<ReleaseId> {
        let repo = &request.repo;
        let body = ReleaseBody {
            tag_name: &request.tag,
            name: &request.name,
            body: &request.body,
            draft: request.draft,
            prerelease: request.prerelease,
        };

        // update the release if one already exists for this tag
        let lookup = format!("look up release {} on {repo}", request.tag);
        let url = endpoint(
            &self.api_url,
            &["repos", &repo.owner, &repo.name, "releases", "tags", &request.tag],
        )?;
        let existing = self.authed(self.client.get(url)).send().await.map_err(|details| {
            DistError::HostRequest {
                operation: lookup.clone(),
                details,
            }
        })?;

        let release = if existing.status() == StatusCode::NOT_FOUND {
            let operation = format!("create release {} on {repo}", request.tag);
            let url = endpoint(&self.api_url, &["repos", &repo.owner, &repo.name, "releases"])?;
            let res = send(self.authed(self.client.post(url)).json(&body), &operation).await?;
            parse_release(res, &operation).await?
        } else {
            let existing = check_status(existing, &lookup).await?;
            let found = parse_release(existing, &lookup).await?;
            debug!("updating existing release {}", found.id);
            let operation = format!("update release {} on {repo}", request.tag);
            let id = found.id.to_string();
            let url = endpoint(
                &self.api_url,
                &["repos", &repo.owner, &repo.name, "releases", &id],
            )?;
            let res = send(self.authed(self.client.patch(url)).json(&body), &operation).await?;
            parse_release(res, &operation).await?
        };
        Ok(ReleaseId {
            id: release.id,
            repo: repo.clone(),
        })
    }

    async fn upload(
        &self,
        release: &ReleaseId,
        name: &str,
        file: tokio::fs::File,
    ) -> DistResult<()> {
        let operation = format!("upload {name}");
        let len = file.metadata().await?.len();
        let id = release.id.to_string();
        let repo = &release.repo;
        let url = endpoint(
            &self.uploads_url,
            &["repos", &repo.owner, &repo.name, "releases", &id, "assets"],
        )?;
        let req = self
            .authed(self.client.post(url))
            .query(&[("name", name)])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, len)
            .body(Body::from(file));
        send(req, &operation).await?;
        Ok(())
    }
}

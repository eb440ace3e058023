//! Figuring out which GitHub repo a git remote points at

use shipwright_schema::GithubRepoPair;
use url::Url;

use crate::errors::{DistError, DistResult};

const SSH_PREFIX: &str = "git@github.com:";

/// Parse a remote url (`https://github.com/owner/name(.git)` or
/// `git@github.com:owner/name(.git)`) into an owner/name pair
pub fn parse_github_repo(repo: &str) -> DistResult<GithubRepoPair> {
    // git+https is just https
    if repo.starts_with("https") || repo.starts_with("git+https") {
        parse_url(repo)
    } else if repo.starts_with("git@") {
        parse_ssh(repo)
    } else {
        Err(DistError::UnknownRepoStyle {
            url: repo.to_owned(),
        })
    }
}

fn parse_url(repo: &str) -> DistResult<GithubRepoPair> {
    let parse_err = || DistError::RepoParse {
        repo: repo.to_owned(),
    };
    let parsed = Url::parse(repo).map_err(|_| parse_err())?;
    if parsed.domain() != Some("github.com") {
        return Err(DistError::NotGitHub {
            url: repo.to_owned(),
        });
    }
    let segments: Vec<&str> = parsed.path_segments().ok_or_else(parse_err)?.collect();
    pair_from_segments(&segments).ok_or_else(parse_err)
}

fn parse_ssh(repo: &str) -> DistResult<GithubRepoPair> {
    let Some(core) = repo.strip_prefix(SSH_PREFIX) else {
        return Err(DistError::NotGitHub {
            url: repo.to_owned(),
        });
    };
    let segments: Vec<&str> = core.split('/').collect();
    pair_from_segments(&segments).ok_or_else(|| DistError::RepoParse {
        repo: repo.to_owned(),
    })
}

/// `owner`, `name`, and then nothing but empty segments (trailing slashes)
fn pair_from_segments(segments: &[&str]) -> Option<GithubRepoPair> {
    let [owner, name, rest @ ..] = segments else {
        return None;
    };
    let (owner, name): (&str, &str) = (owner, name);
    let name = name.strip_suffix(".git").unwrap_or(name);
    if owner.is_empty() || name.is_empty() || rest.iter().any(|s| !s.trim().is_empty()) {
        return None;
    }
    Some(GithubRepoPair {
        owner: owner.to_owned(),
        name: name.to_owned(),
    })
}

//! reqwest-based GitHub REST client

use async_trait::async_trait;
use regex::Regex;
use reqwest::{RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use url::Url;
use vendor_core::{Asset, Release, RepoId, SearchHit, Sink, SourceProvider};

use crate::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const API_URL_ENV: &str = "GITHUB_API_URL";

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const BINARY_MEDIA_TYPE: &str = "application/octet-stream";

/// Where to reach the API and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

impl GitHubConfig {
    /// Read `GITHUB_API_URL` and `GITHUB_TOKEN`. Empty values count as unset.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_url: non_empty(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: non_empty(TOKEN_ENV),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseBody {
    tag_name: String,
    #[serde(default)]
    assets: Vec<AssetBody>,
}

#[derive(Debug, Deserialize)]
struct AssetBody {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    items: Vec<RepositoryBody>,
}

#[derive(Debug, Deserialize)]
struct RepositoryBody {
    name: String,
    html_url: String,
    owner: OwnerBody,
}

#[derive(Debug, Deserialize)]
struct OwnerBody {
    login: String,
}

impl From<ReleaseBody> for Release {
    fn from(body: ReleaseBody) -> Self {
        Self {
            tag: body.tag_name,
            assets: body
                .assets
                .into_iter()
                .map(|a| Asset {
                    name: a.name,
                    id: a.id,
                })
                .collect(),
        }
    }
}

/// GitHub implementation of [`SourceProvider`].
pub struct GitHubClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let base = Url::parse(&config.api_url).map_err(|source| Error::InvalidBaseUrl {
            url: config.api_url.clone(),
            source,
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::UnsupportedBaseUrl(config.api_url));
        }
        if config.token.is_none() {
            tracing::warn!(
                "{TOKEN_ENV} is not set; GitHub requests are anonymous and may be rate limited"
            );
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("vendorfiles/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base,
            token: config.token,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GitHubConfig::from_env())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL plus path segments; each segment is percent-encoded on its own.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn repo_endpoint<'a>(&self, repo: &'a RepoId, rest: &[&'a str]) -> Url {
        self.endpoint(
            ["repos", repo.owner.as_str(), repo.name.as_str()]
                .into_iter()
                .chain(rest.iter().copied()),
        )
    }

    fn get(&self, url: Url, accept: &str) -> RequestBuilder {
        let request = self
            .http
            .get(url)
            .header(header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and check the status; 404 becomes `NotFound { artifact }`.
    async fn send(
        &self,
        request: RequestBuilder,
        repository: &str,
        artifact: impl FnOnce() -> String,
    ) -> vendor_core::Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| provider_error(repository, e.to_string()))?;
        let status = response.status();
        tracing::debug!(url = %response.url(), %status, "GitHub request");

        if status == StatusCode::NOT_FOUND {
            return Err(vendor_core::Error::not_found(artifact(), repository));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let hint = if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
                && self.token.is_none()
            {
                format!(" (set {TOKEN_ENV} to raise the rate limit)")
            } else {
                String::new()
            };
            return Err(provider_error(
                repository,
                format!("HTTP {}: {}{hint}", status.as_u16(), body.trim()),
            ));
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        repository: &str,
        artifact: impl FnOnce() -> String,
    ) -> vendor_core::Result<T> {
        self.send(request, repository, artifact)
            .await?
            .json()
            .await
            .map_err(|e| provider_error(repository, format!("invalid response: {e}")))
    }

    async fn stream(
        mut response: Response,
        repository: &str,
        sink: &mut Sink<'_>,
    ) -> vendor_core::Result<()> {
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| provider_error(repository, e.to_string()))?
        {
            sink.write_all(&chunk)
                .await
                .map_err(|e| provider_error(repository, format!("write failed: {e}")))?;
        }
        Ok(())
    }
}

fn provider_error(repository: &str, message: String) -> vendor_core::Error {
    vendor_core::Error::Provider {
        repository: repository.to_string(),
        message,
    }
}

#[async_trait]
impl SourceProvider for GitHubClient {
    async fn get_file_content(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: &str,
        sink: &mut Sink<'_>,
    ) -> vendor_core::Result<()> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let mut url = self.repo_endpoint(repo, &segments);
        if !git_ref.is_empty() {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }

        let label = repo.url();
        let response = self
            .send(self.get(url, RAW_MEDIA_TYPE), &label, || {
                format!("File \"{path}\" at {git_ref}")
            })
            .await?;
        Self::stream(response, &label, sink).await
    }

    async fn get_latest_release(
        &self,
        repo: &RepoId,
        tag_pattern: Option<&Regex>,
    ) -> vendor_core::Result<Release> {
        let label = repo.url();
        let Some(pattern) = tag_pattern else {
            let url = self.repo_endpoint(repo, &["releases", "latest"]);
            let body: ReleaseBody = self
                .json(self.get(url, JSON_MEDIA_TYPE), &label, || {
                    "Latest release".to_string()
                })
                .await?;
            return Ok(body.into());
        };

        let mut url = self.repo_endpoint(repo, &["releases"]);
        url.query_pairs_mut().append_pair("per_page", "100");
        let releases: Vec<ReleaseBody> = self
            .json(self.get(url, JSON_MEDIA_TYPE), &label, || "Releases".to_string())
            .await?;
        releases
            .into_iter()
            .find(|release| pattern.is_match(&release.tag_name))
            .map(Release::from)
            .ok_or_else(|| {
                vendor_core::Error::not_found(
                    format!("Release matching /{}/", pattern.as_str()),
                    label,
                )
            })
    }

    async fn get_release_by_tag(&self, repo: &RepoId, tag: &str) -> vendor_core::Result<Release> {
        let url = self.repo_endpoint(repo, &["releases", "tags", tag]);
        let body: ReleaseBody = self
            .json(self.get(url, JSON_MEDIA_TYPE), &repo.url(), || {
                format!("Release \"{tag}\"")
            })
            .await?;
        Ok(body.into())
    }

    async fn get_file_commit_hash(&self, repo: &RepoId, path: &str) -> vendor_core::Result<String> {
        let label = repo.url();
        let mut url = self.repo_endpoint(repo, &["commits"]);
        url.query_pairs_mut()
            .append_pair("path", path)
            .append_pair("per_page", "1");
        let commits: Vec<CommitBody> = self
            .json(self.get(url, JSON_MEDIA_TYPE), &label, || {
                format!("Commits for \"{path}\"")
            })
            .await?;
        commits
            .into_iter()
            .next()
            .map(|commit| commit.sha)
            .ok_or_else(|| vendor_core::Error::not_found(format!("File \"{path}\""), label))
    }

    async fn download_release_asset(
        &self,
        repo: &RepoId,
        asset_id: u64,
        sink: &mut Sink<'_>,
    ) -> vendor_core::Result<()> {
        let id = asset_id.to_string();
        let url = self.repo_endpoint(repo, &["releases", "assets", &id]);
        let label = repo.url();
        let response = self
            .send(self.get(url, BINARY_MEDIA_TYPE), &label, || {
                format!("Release asset {asset_id}")
            })
            .await?;
        Self::stream(response, &label, sink).await
    }

    async fn search_repository(&self, name: &str) -> vendor_core::Result<SearchHit> {
        const SEARCH: &str = "GitHub search";
        let mut url = self.endpoint(["search", "repositories"]);
        url.query_pairs_mut()
            .append_pair("q", name)
            .append_pair("per_page", "1");
        let body: SearchBody = self
            .json(self.get(url, JSON_MEDIA_TYPE), SEARCH, || {
                format!("Repository \"{name}\"")
            })
            .await?;

        let Some(item) = body.items.into_iter().next() else {
            return Err(vendor_core::Error::not_found(
                format!("Repository \"{name}\""),
                SEARCH,
            ));
        };
        if !item.name.eq_ignore_ascii_case(name) {
            return Err(vendor_core::Error::not_found(
                format!("Repository \"{name}\" (did you mean {}?)", item.name),
                SEARCH,
            ));
        }
        Ok(SearchHit {
            owner: item.owner.login,
            name: item.name,
            url: item.html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> GitHubClient {
        GitHubClient::new(GitHubConfig {
            api_url: api_url.to_string(),
            token: Some("t".into()),
        })
        .unwrap()
    }

    #[test]
    fn endpoint_encodes_each_segment() {
        let client = client("https://api.github.com");
        let repo = RepoId::new("acme", "widget");
        let url = client.repo_endpoint(&repo, &["contents", "docs", "a b.md"]);
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/widget/contents/docs/a%20b.md"
        );
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = client("http://localhost:8080/api/v3/");
        let url = client.endpoint(["search", "repositories"]);
        assert_eq!(url.as_str(), "http://localhost:8080/api/v3/search/repositories");
    }

    #[test]
    fn rejects_bad_base_url() {
        let result = GitHubClient::new(GitHubConfig {
            api_url: "not a url".into(),
            token: None,
        });
        assert!(matches!(result, Err(Error::InvalidBaseUrl { .. })));

        let result = GitHubClient::new(GitHubConfig {
            api_url: "mailto:someone@example.com".into(),
            token: None,
        });
        assert!(matches!(result, Err(Error::UnsupportedBaseUrl(_))));
    }
}

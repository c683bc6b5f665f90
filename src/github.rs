use anyhow::{anyhow, Context};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::env;
use std::future::Future;
use std::process::Command;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::remote::{ForkRemote, MergeKind, MergeOutcome, RemoteError, RepositoryRef};
use crate::sync::DEFAULT_PER_PAGE;

/// GitHub client wrapper implementing the fork remote facade
pub struct GitHubClient {
    client: Octocrab,
}

/// GitHub authentication strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Token passed on the command line
    CommandLine,
    /// Token from the configuration file
    ConfigFile,
    /// Use GitHub CLI authentication
    GitHubCLI,
    /// Use environment variable token
    EnvironmentToken,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct OrganizationPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    name: String,
    owner: OwnerPayload,
    #[serde(default)]
    fork: bool,
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MergeUpstreamPayload {
    message: Option<String>,
    merge_type: Option<MergeKind>,
    base_branch: Option<String>,
}

#[derive(Debug, Serialize)]
struct PageParams {
    page: u32,
    per_page: u8,
}

#[derive(Debug, Serialize)]
struct MergeUpstreamRequest<'a> {
    branch: &'a str,
}

impl From<RepositoryPayload> for RepositoryRef {
    fn from(repo: RepositoryPayload) -> Self {
        Self {
            owner: repo.owner.login,
            name: repo.name,
            default_branch: repo.default_branch.unwrap_or_default(),
            is_fork: repo.fork,
        }
    }
}

impl From<MergeUpstreamPayload> for MergeOutcome {
    fn from(payload: MergeUpstreamPayload) -> Self {
        Self {
            kind: payload.merge_type,
            message: payload.message.unwrap_or_default(),
            base_branch: payload.base_branch,
        }
    }
}

impl GitHubClient {
    /// Create a token-authenticated client.
    ///
    /// `api_url` overrides the GitHub API base (GitHub Enterprise, tests).
    pub fn new(token: &str, api_url: Option<&str>) -> Result<Self> {
        if token.is_empty() {
            return Err(SyncError::MissingToken);
        }

        let mut builder = Octocrab::builder().personal_token(token.to_string());

        if let Some(url) = api_url {
            debug!("Using GitHub API base: {}", url);
            builder = builder.base_uri(url).map_err(SyncError::Client)?;
        }

        let client = builder.build().map_err(SyncError::Client)?;

        Ok(Self { client })
    }

    /// Pick the token for this run.
    ///
    /// `--auth` wins, then `github.token` from the config file, then the sources
    /// allowed by `github.auth_method`.
    pub fn resolve_token(
        explicit: Option<&str>,
        config: &Config,
    ) -> anyhow::Result<(AuthStrategy, String)> {
        if let Some(token) = explicit.filter(|t| !t.is_empty()) {
            return Ok((AuthStrategy::CommandLine, token.to_string()));
        }

        if let Some(token) = config.github.token.as_deref().filter(|t| !t.is_empty()) {
            return Ok((AuthStrategy::ConfigFile, token.to_string()));
        }

        let fallbacks: &[AuthStrategy] = match config.github.auth_method.as_str() {
            "auto" => &[AuthStrategy::GitHubCLI, AuthStrategy::EnvironmentToken],
            "gh_cli" => &[AuthStrategy::GitHubCLI],
            "token" => &[AuthStrategy::EnvironmentToken],
            other => {
                return Err(anyhow!(
                    "Unknown auth method {:?} (expected auto, gh_cli or token)",
                    other
                ))
            }
        };

        let mut tried = Vec::new();

        for strategy in fallbacks {
            let attempt = match strategy {
                AuthStrategy::GitHubCLI => token_from_gh(),
                _ => token_from_env(),
            };

            match attempt {
                Ok(token) => return Ok((strategy.clone(), token)),
                Err(e) => {
                    debug!("No token from {:?}: {:#}", strategy, e);
                    tried.push(format!("{:#}", e));
                }
            }
        }

        Err(anyhow!(
            "No GitHub token: pass --auth <TOKEN> or set github.token in the config file ({})",
            tried.join("; ")
        ))
    }

    /// One page of organizations `user` belongs to; empty means the authenticated user
    pub async fn list_organizations(
        &self,
        user: &str,
        page: u32,
        per_page: u8,
    ) -> std::result::Result<Vec<String>, RemoteError> {
        validate_identity(user)?;

        let route = if user.is_empty() {
            "/user/orgs".to_string()
        } else {
            format!("/users/{}/orgs", user)
        };
        let params = PageParams { page, per_page };

        let orgs: Vec<OrganizationPayload> = self.client.get(route, Some(&params)).await?;

        Ok(orgs.into_iter().map(|org| org.login).collect())
    }

    /// One page of the forks of `owner/repo`
    pub async fn list_forks(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        per_page: u8,
    ) -> std::result::Result<Vec<RepositoryRef>, RemoteError> {
        validate_repository(owner, repo)?;

        let params = PageParams { page, per_page };

        let forks: Vec<RepositoryPayload> = self
            .client
            .get(format!("/repos/{}/{}/forks", owner, repo), Some(&params))
            .await?;

        Ok(forks.into_iter().map(RepositoryRef::from).collect())
    }

    /// Every organization `user` belongs to
    pub async fn all_organizations(
        &self,
        user: &str,
    ) -> std::result::Result<Vec<String>, RemoteError> {
        collect_pages(|page| self.list_organizations(user, page, DEFAULT_PER_PAGE)).await
    }

    /// Every fork of `owner/repo`
    pub async fn all_forks(
        &self,
        owner: &str,
        repo: &str,
    ) -> std::result::Result<Vec<RepositoryRef>, RemoteError> {
        collect_pages(|page| self.list_forks(owner, repo, page, DEFAULT_PER_PAGE)).await
    }
}

/// Token printed by `gh auth token`
fn token_from_gh() -> anyhow::Result<String> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("gh is not installed")?;

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();

    if !output.status.success() || token.is_empty() {
        return Err(anyhow!("gh has no token (run: gh auth login)"));
    }

    Ok(token)
}

/// Token from the GITHUB_TOKEN environment variable
fn token_from_env() -> anyhow::Result<String> {
    env::var("GITHUB_TOKEN")
        .ok()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| anyhow!("GITHUB_TOKEN is not set"))
}

/// Walk 1-based pages until the first empty one
async fn collect_pages<T, F, Fut>(mut fetch: F) -> std::result::Result<Vec<T>, RemoteError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<Vec<T>, RemoteError>>,
{
    let mut items = Vec::new();
    let mut page = 1u32;

    loop {
        let batch = fetch(page).await?;
        if batch.is_empty() {
            break;
        }

        items.extend(batch);
        page += 1;
    }

    Ok(items)
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient").finish_non_exhaustive()
    }
}

/// GitHub logins are ASCII alphanumerics, hyphens and (on Enterprise) underscores
fn validate_identity(identity: &str) -> std::result::Result<(), RemoteError> {
    if identity
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(RemoteError::InvalidIdentity(identity.to_string()))
    }
}

/// Owner must be a valid login; repository names may also contain dots
fn validate_repository(owner: &str, repo: &str) -> std::result::Result<(), RemoteError> {
    let repo_ok = !repo.is_empty()
        && repo
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');

    if owner.is_empty() || validate_identity(owner).is_err() || !repo_ok {
        return Err(RemoteError::InvalidIdentity(format!("{}/{}", owner, repo)));
    }

    Ok(())
}

#[async_trait]
impl ForkRemote for GitHubClient {
    async fn get_user(&self, identity: &str) -> std::result::Result<String, RemoteError> {
        validate_identity(identity)?;

        let route = if identity.is_empty() {
            "/user".to_string()
        } else {
            format!("/users/{}", identity)
        };

        debug!("Looking up GitHub user via {}", route);
        let user: UserPayload = self.client.get(route, None::<&()>).await?;

        info!("Authenticated as GitHub user: {}", user.login);
        Ok(user.login)
    }

    async fn list_repositories(
        &self,
        username: &str,
        page: u32,
        per_page: u8,
    ) -> std::result::Result<Vec<RepositoryRef>, RemoteError> {
        let params = PageParams { page, per_page };

        let repos: Vec<RepositoryPayload> = self
            .client
            .get(format!("/users/{}/repos", username), Some(&params))
            .await?;

        Ok(repos.into_iter().map(RepositoryRef::from).collect())
    }

    async fn merge_upstream(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> std::result::Result<MergeOutcome, RemoteError> {
        let body = MergeUpstreamRequest { branch };

        let payload: MergeUpstreamPayload = self
            .client
            .post(format!("/repos/{}/{}/merge-upstream", owner, repo), Some(&body))
            .await?;

        Ok(payload.into())
    }
}

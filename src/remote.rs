//! Remote facade contract
//!
//! The fork synchronizer only ever talks to GitHub through [`ForkRemote`]. The
//! octocrab-backed implementation lives in [`crate::github`]; tests supply their
//! own in-memory implementations.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// A repository as returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    /// Owner login (e.g., "octocat")
    pub owner: String,

    /// Repository name (e.g., "hello-world")
    pub name: String,

    /// Default branch name
    pub default_branch: String,

    /// Whether the repository is a fork of another repository
    pub is_fork: bool,
}

impl RepositoryRef {
    pub fn new(owner: &str, name: &str, default_branch: &str, is_fork: bool) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            default_branch: default_branch.to_string(),
            is_fork,
        }
    }

    /// Get display name (owner/name format)
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Split an `OWNER/NAME` slug; both halves must be non-empty
pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    let (owner, name) = full_name.split_once('/')?;

    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }

    Some((owner, name))
}

/// How GitHub brought a fork up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeKind {
    /// Branch was already up to date
    None,
    /// Branch pointer was advanced
    FastForward,
    /// A merge commit was created
    Merge,
    /// A merge type this tool does not know about
    #[serde(other)]
    Unknown,
}

/// Result of a merge-upstream request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Absent when GitHub did not report a merge type
    pub kind: Option<MergeKind>,

    /// Human readable message, reported verbatim
    pub message: String,

    /// Upstream branch reference, e.g. "upstream:main"
    pub base_branch: Option<String>,
}

impl MergeOutcome {
    pub fn new(kind: Option<MergeKind>, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
            base_branch: None,
        }
    }

    /// True when the fork's branch actually moved
    pub fn is_update(&self) -> bool {
        !matches!(self.kind, None | Some(MergeKind::None))
    }
}

/// Failures reported by a remote facade
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Identity cannot be used as a GitHub login
    #[error("invalid GitHub identity: {0:?}")]
    InvalidIdentity(String),

    /// GitHub API or transport failure
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Failure reported by a non-octocrab remote
    #[error("{0}")]
    Other(String),
}

/// The three remote operations the synchronizer depends on
#[async_trait]
pub trait ForkRemote: Send + Sync {
    /// Resolve an identity to a canonical login.
    ///
    /// An empty identity means the authenticated user.
    async fn get_user(&self, identity: &str) -> Result<String, RemoteError>;

    /// Fetch one page (1-based) of repositories owned by `username`
    async fn list_repositories(
        &self,
        username: &str,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<RepositoryRef>, RemoteError>;

    /// Ask GitHub to merge the upstream repository into `branch` of the fork
    async fn merge_upstream(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<MergeOutcome, RemoteError>;
}

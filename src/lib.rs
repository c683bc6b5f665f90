//! github-fork-update - keep forked repositories in sync with their upstreams
//!
//! Enumerates every repository owned by a GitHub user and, for each fork, asks
//! GitHub to merge the upstream parent into the fork's default branch.
//!
//! ## Modules
//!
//! - [`remote`]: Remote facade contract and data model
//! - [`github`]: octocrab-backed facade and authentication
//! - [`sync`]: Fork synchronization engine
//! - [`config`]: Configuration management and parsing

pub mod config;
pub mod error;
pub mod github;
pub mod remote;
pub mod sync;
pub mod version;

pub use config::Config;
pub use error::SyncError;
pub use github::GitHubClient;
pub use remote::{ForkRemote, MergeKind, MergeOutcome, RemoteError, RepositoryRef};
pub use sync::{ForkSync, SyncOptions, SyncSummary};

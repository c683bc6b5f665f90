//! Error types for fork synchronization

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type for fork synchronization
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that abort a sync run
#[derive(Error, Debug)]
pub enum SyncError {
    /// No token was supplied, so no client can be built
    #[error("GitHub client unavailable: no auth token supplied")]
    MissingToken,

    /// Building the octocrab client failed
    #[error("failed to create GitHub client")]
    Client(#[source] octocrab::Error),

    /// The identity could not be resolved to a login
    #[error("GetUser error: could not resolve identity {identity:?}")]
    UserLookup {
        identity: String,
        #[source]
        source: RemoteError,
    },

    /// A repository page could not be fetched
    #[error("ListRepositories error: page {page} for user {user}")]
    RepositoryList {
        user: String,
        page: u32,
        #[source]
        source: RemoteError,
    },

    /// GitHub refused or failed to merge upstream into a fork
    #[error("MergeUpstream error: repo '{repository} {branch}'")]
    Merge {
        repository: String,
        branch: String,
        #[source]
        source: RemoteError,
    },

    /// Writing a report line failed
    #[error("failed to write report output")]
    Output(#[from] std::io::Error),
}

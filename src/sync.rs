//! Fork Sync Engine - walks a user's repositories and merges upstream into forks
//!
//! Everything runs sequentially: one page at a time, one merge at a time, in the
//! order GitHub returns repositories. The first remote failure ends the run and
//! is returned to the caller; merges already performed are not rolled back.

use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::remote::{ForkRemote, MergeOutcome, RepositoryRef};

/// Page size used for repository listing
pub const DEFAULT_PER_PAGE: u8 = 30;

/// Knobs for a single sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Report up-to-date forks and skipped repositories
    pub verbose: bool,

    /// Debug mode also reports skipped repositories
    pub debug: bool,

    /// Repositories requested per page
    pub per_page: u8,

    /// Stop after this many pages (unbounded when None)
    pub max_pages: Option<u32>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            debug: false,
            per_page: DEFAULT_PER_PAGE,
            max_pages: None,
        }
    }
}

/// Totals from a completed sync run
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub pages_fetched: u32,
    pub repositories_seen: usize,
    pub forks_updated: usize,
    pub forks_up_to_date: usize,
    pub repositories_skipped: usize,
    pub duration: Duration,
}

/// Drives fork synchronization against a remote facade
pub struct ForkSync<'a, R: ForkRemote + ?Sized> {
    remote: &'a R,
    options: SyncOptions,
}

impl<'a, R: ForkRemote + ?Sized> ForkSync<'a, R> {
    pub fn new(remote: &'a R, options: SyncOptions) -> Self {
        Self { remote, options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Merge upstream into every fork owned by `identity`.
    ///
    /// An empty identity means the authenticated user. Report lines are written
    /// to `out`.
    pub async fn sync_forks<W: Write>(&self, identity: &str, out: &mut W) -> Result<SyncSummary> {
        let start_time = Instant::now();
        let user = self.resolve_user(identity).await?;

        info!("Synchronizing forks owned by {}", user);

        let mut summary = SyncSummary::default();
        let mut page = 1u32;

        loop {
            if self.page_limit_reached(page) {
                break;
            }

            let repositories = self.fetch_page(&user, page).await?;
            summary.pages_fetched += 1;

            if repositories.is_empty() {
                break;
            }

            for repo in &repositories {
                summary.repositories_seen += 1;

                if repo.is_fork {
                    let outcome = self
                        .merge_upstream_fork(&repo.owner, &repo.name, &repo.default_branch, out)
                        .await?;

                    if outcome.is_update() {
                        summary.forks_updated += 1;
                    } else {
                        summary.forks_up_to_date += 1;
                    }
                } else {
                    summary.repositories_skipped += 1;

                    if self.options.verbose || self.options.debug {
                        writeln!(out, "{}", skip_line(repo))?;
                    }
                }
            }

            page += 1;
        }

        summary.duration = start_time.elapsed();

        info!(
            "Fork sync completed in {:.2}s: {} updated, {} up to date, {} skipped across {} pages",
            summary.duration.as_secs_f64(),
            summary.forks_updated,
            summary.forks_up_to_date,
            summary.repositories_skipped,
            summary.pages_fetched
        );

        Ok(summary)
    }

    /// Merge upstream into one fork branch and report the outcome.
    ///
    /// Real updates are always reported; up-to-date forks only in verbose mode.
    pub async fn merge_upstream_fork<W: Write>(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        out: &mut W,
    ) -> Result<MergeOutcome> {
        debug!("Merging upstream into {}/{} {}", owner, name, branch);

        let outcome = self
            .remote
            .merge_upstream(owner, name, branch)
            .await
            .map_err(|source| SyncError::Merge {
                repository: format!("{}/{}", owner, name),
                branch: branch.to_string(),
                source,
            })?;

        debug!(
            "Merge result for {}/{}: {:?} (base {:?})",
            owner, name, outcome.kind, outcome.base_branch
        );

        if outcome.is_update() || self.options.verbose {
            writeln!(out, "{}", report_line(owner, name, branch, &outcome.message))?;
        }

        Ok(outcome)
    }

    /// List every fork owned by `identity` without merging anything
    pub async fn list_forks(&self, identity: &str) -> Result<Vec<RepositoryRef>> {
        let user = self.resolve_user(identity).await?;

        let mut forks = Vec::new();
        let mut page = 1u32;

        loop {
            if self.page_limit_reached(page) {
                break;
            }

            let repositories = self.fetch_page(&user, page).await?;
            if repositories.is_empty() {
                break;
            }

            forks.extend(repositories.into_iter().filter(|repo| repo.is_fork));
            page += 1;
        }

        info!("Found {} forks owned by {}", forks.len(), user);
        Ok(forks)
    }

    async fn resolve_user(&self, identity: &str) -> Result<String> {
        let user = self
            .remote
            .get_user(identity)
            .await
            .map_err(|source| SyncError::UserLookup {
                identity: identity.to_string(),
                source,
            })?;

        debug!("Resolved identity {:?} to {}", identity, user);
        Ok(user)
    }

    async fn fetch_page(&self, user: &str, page: u32) -> Result<Vec<RepositoryRef>> {
        debug!("Fetching repositories page {} for {}", page, user);

        let repositories = self
            .remote
            .list_repositories(user, page, self.options.per_page)
            .await
            .map_err(|source| SyncError::RepositoryList {
                user: user.to_string(),
                page,
                source,
            })?;

        debug!("Page {} returned {} repositories", page, repositories.len());
        Ok(repositories)
    }

    fn page_limit_reached(&self, page: u32) -> bool {
        match self.options.max_pages {
            Some(max) if page > max => {
                warn!("Reached page limit ({} pages), stopping early", max);
                true
            }
            _ => false,
        }
    }
}

/// Report line for a merge outcome
pub fn report_line(owner: &str, name: &str, branch: &str, message: &str) -> String {
    format!("-> Repo '{}/{} {}' {}", owner, name, branch, message)
}

fn skip_line(repo: &RepositoryRef) -> String {
    format!(
        "-> Repo '{}/{} {}' is not a fork, skipping...",
        repo.owner, repo.name, repo.default_branch
    )
}

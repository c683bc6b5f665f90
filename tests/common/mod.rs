/// Common test utilities and fakes for github-fork-update tests
use async_trait::async_trait;
use github_fork_update::{ForkRemote, MergeKind, MergeOutcome, RemoteError, RepositoryRef};
use std::collections::HashMap;
use std::sync::Mutex;

/// A remote call observed by [`FakeRemote`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetUser(String),
    List { user: String, page: u32, per_page: u8 },
    Merge { owner: String, repo: String, branch: String },
}

/// In-memory remote facade with a per-instance call log
#[derive(Default)]
pub struct FakeRemote {
    login: String,
    pages: Vec<Vec<RepositoryRef>>,
    outcomes: HashMap<String, MergeOutcome>,
    fail_list_on_page: Option<u32>,
    fail_merge_for: Option<String>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            ..Default::default()
        }
    }

    /// Append a page of repositories; pages past the last one are empty
    pub fn with_page(mut self, repos: Vec<RepositoryRef>) -> Self {
        self.pages.push(repos);
        self
    }

    pub fn with_outcome(mut self, full_name: &str, outcome: MergeOutcome) -> Self {
        self.outcomes.insert(full_name.to_string(), outcome);
        self
    }

    pub fn failing_list_on(mut self, page: u32) -> Self {
        self.fail_list_on_page = Some(page);
        self
    }

    pub fn failing_merge_for(mut self, full_name: &str) -> Self {
        self.fail_merge_for = Some(full_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Pages requested, in order
    pub fn list_calls(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::List { page, .. } => Some(page),
                _ => None,
            })
            .collect()
    }

    /// Repositories merged, as owner/name, in order
    pub fn merge_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Merge { owner, repo, .. } => Some(format!("{}/{}", owner, repo)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ForkRemote for FakeRemote {
    async fn get_user(&self, identity: &str) -> Result<String, RemoteError> {
        self.record(Call::GetUser(identity.to_string()));

        if identity.contains('%') {
            return Err(RemoteError::InvalidIdentity(identity.to_string()));
        }

        if identity.is_empty() {
            Ok(self.login.clone())
        } else {
            Ok(identity.to_string())
        }
    }

    async fn list_repositories(
        &self,
        username: &str,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<RepositoryRef>, RemoteError> {
        self.record(Call::List {
            user: username.to_string(),
            page,
            per_page,
        });

        if self.fail_list_on_page == Some(page) {
            return Err(RemoteError::Other("HTTP 422 Unprocessable Entity".to_string()));
        }

        let index = page.saturating_sub(1) as usize;
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    async fn merge_upstream(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<MergeOutcome, RemoteError> {
        self.record(Call::Merge {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        });

        let full_name = format!("{}/{}", owner, repo);

        if self.fail_merge_for.as_deref() == Some(full_name.as_str()) {
            return Err(RemoteError::Other("HTTP 409 merge conflict".to_string()));
        }

        Ok(self.outcomes.get(&full_name).cloned().unwrap_or_else(|| {
            MergeOutcome::new(
                Some(MergeKind::None),
                "This branch is not behind the upstream",
            )
        }))
    }
}

pub fn fork(owner: &str, name: &str) -> RepositoryRef {
    RepositoryRef::new(owner, name, "main", true)
}

pub fn source(owner: &str, name: &str) -> RepositoryRef {
    RepositoryRef::new(owner, name, "main", false)
}

/// Captured report output, one entry per line
pub fn lines(out: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(out)
        .lines()
        .map(str::to_string)
        .collect()
}

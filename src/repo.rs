//! RepoClient: source retrieval and Publisher commit/branch operations
//! against the code host.
//!
//! Repository resolution is a fuzzy-ratio best match (same tie-break discipline as
//! [`crate::parser::SourceParser::resolve_endpoint`]) gated on both pull
//! and push permission; a `NotFound` here is fatal at startup, not a
//! per-tick failure.

use crate::error::{AioptimError, Result};
use crate::fuzzy;
use crate::model::File;
use crate::technology::{row_for_language, Language};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// The repo-host contract the pipeline's FaultLineExtractor and Publisher
/// stages need: list a language's source files, and publish a rewrite on a
/// fresh branch. Repository resolution (`RepoClient::resolve`) is a
/// startup-only concern and stays outside this trait.
#[async_trait]
pub trait RepoBackend: Send + Sync {
    async fn files_by_language(&self, language: Language) -> Result<Vec<Arc<File>>>;
    async fn publish(&self, path: &str, old_fragment: &str, new_body: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct RepoListItem {
    name: String,
    full_name: String,
    permissions: RepoPermissions,
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct RepoPermissions {
    pull: bool,
    push: bool,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    content: Option<String>,
}

pub struct RepoClient {
    http: Client,
    token: String,
    full_name: String,
    default_branch: String,
}

impl RepoClient {
    /// Resolve `repository` against every repo the token can see, ranked
    /// by fuzzy similarity of its name, gated on pull+push permission.
    /// `NotFound` if nothing qualifies.
    pub async fn resolve(base_url: &str, token: &str, repository: &str) -> Result<Self> {
        let http = Client::new();
        let url = format!("{base_url}/user/repos");
        let resp = http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AioptimError::ConnectionError(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AioptimError::ConnectionError(format!(
                "code host returned status {}",
                resp.status()
            )));
        }
        let repos: Vec<RepoListItem> = resp
            .json()
            .await
            .map_err(|e| AioptimError::InvalidResponse(e.to_string()))?;

        let mut best: Option<(RepoListItem, u32)> = None;
        for repo in repos {
            if !repo.permissions.pull || !repo.permissions.push {
                continue;
            }
            let score = fuzzy::ratio(&repo.name, repository);
            if best.as_ref().map_or(true, |(_, best_score)| score > *best_score) {
                best = Some((repo, score));
            }
        }

        let (repo, _) = best.ok_or_else(|| {
            AioptimError::NotFound(format!(
                "no repository matching '{repository}' with pull and push access"
            ))
        })?;

        Ok(Self {
            http,
            token: token.to_string(),
            full_name: repo.full_name,
            default_branch: repo.default_branch,
        })
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            http: Client::new(),
            token: "test-token".to_string(),
            full_name: "test-org/test-repo".to_string(),
            default_branch: "main".to_string(),
        }
    }
}

#[async_trait]
impl RepoBackend for RepoClient {
    /// Breadth-first walk of the repository tree, collecting every file
    /// whose path ends in the extension for `language`, base64-decoded.
    async fn files_by_language(&self, language: Language) -> Result<Vec<Arc<File>>> {
        let extension = row_for_language(language).extension;
        let mut files = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(String::new());

        while let Some(dir) = queue.pop_front() {
            let url = format!(
                "https://api.github.com/repos/{}/contents/{}",
                self.full_name, dir
            );
            let resp = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .header("User-Agent", "aioptim")
                .send()
                .await
                .map_err(|e| AioptimError::ConnectionError(e.to_string()))?;
            let items: Vec<ContentItem> = resp
                .json()
                .await
                .map_err(|e| AioptimError::InvalidResponse(e.to_string()))?;
            for item in items {
                match item.kind.as_str() {
                    "dir" => queue.push_back(item.path),
                    "file" if item.path.ends_with(&format!(".{extension}")) => {
                        let content = item
                            .content
                            .map(|encoded| {
                                base64::engine::general_purpose::STANDARD
                                    .decode(encoded.replace('\n', ""))
                                    .ok()
                                    .and_then(|bytes| String::from_utf8(bytes).ok())
                            })
                            .flatten()
                            .unwrap_or_default();
                        files.push(File::new(item.path, language, content));
                    }
                    _ => {}
                }
            }
        }
        Ok(files)
    }

    /// Commit the rewritten file on a freshly created branch, off the
    /// repository's default branch. No-op if `new_body` is empty — a
    /// Regenerator candidate that never produced usable output must not
    /// be published.
    ///
    /// The branch name is `YYYY-MM-DD/HH-MM-SS` with a random suffix
    /// appended to avoid collisions between two publishes landing in the
    /// same second (see the parallel-publish Open Question).
    async fn publish(&self, path: &str, old_fragment: &str, new_body: &str) -> Result<()> {
        if new_body.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now();
        let branch = format!(
            "{}-{:04x}",
            now.format("%Y-%m-%d/%H-%M-%S"),
            fastrand::u16(..)
        );

        let ref_url = format!("https://api.github.com/repos/{}/git/refs/heads/{}", self.full_name, self.default_branch);
        let base_sha = self
            .http
            .get(&ref_url)
            .bearer_auth(&self.token)
            .header("User-Agent", "aioptim")
            .send()
            .await
            .map_err(|e| AioptimError::ConnectionError(e.to_string()))?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AioptimError::InvalidResponse(e.to_string()))?["object"]["sha"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let create_ref_url = format!("https://api.github.com/repos/{}/git/refs", self.full_name);
        self.http
            .post(&create_ref_url)
            .bearer_auth(&self.token)
            .header("User-Agent", "aioptim")
            .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": base_sha }))
            .send()
            .await
            .map_err(|e| AioptimError::ConnectionError(e.to_string()))?;

        let contents_url = format!(
            "https://api.github.com/repos/{}/contents/{}",
            self.full_name, path
        );
        let existing = self
            .http
            .get(&contents_url)
            .bearer_auth(&self.token)
            .header("User-Agent", "aioptim")
            .query(&[("ref", branch.as_str())])
            .send()
            .await
            .map_err(|e| AioptimError::ConnectionError(e.to_string()))?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| AioptimError::InvalidResponse(e.to_string()))?;

        let existing_content = existing["content"]
            .as_str()
            .map(|s| s.replace('\n', ""))
            .and_then(|encoded| base64::engine::general_purpose::STANDARD.decode(encoded).ok())
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_default();
        let sha = existing["sha"].as_str().unwrap_or_default().to_string();

        let updated_content = existing_content.replacen(old_fragment, new_body, 1);
        let encoded = base64::engine::general_purpose::STANDARD.encode(updated_content.as_bytes());

        self.http
            .put(&contents_url)
            .bearer_auth(&self.token)
            .header("User-Agent", "aioptim")
            .json(&json!({
                "message": "Automated performance rewrite",
                "content": encoded,
                "sha": sha,
                "branch": branch,
            }))
            .send()
            .await
            .map_err(|e| AioptimError::ConnectionError(e.to_string()))?;

        Ok(())
    }
}

/// Canned [`RepoBackend`] for driving [`crate::pipeline::PipelineRunner`]
/// in tests without a live code host. `files_by_language` returns a fixed
/// file set regardless of `language`; `publish` records each call's
/// arguments for assertion and never touches the network.
#[cfg(test)]
pub struct MockRepoBackend {
    files: Result<Vec<Arc<File>>>,
    pub published: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockRepoBackend {
    pub fn new(files: Vec<Arc<File>>) -> Self {
        Self {
            files: Ok(files),
            published: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            files: Err(AioptimError::ConnectionError(message.to_string())),
            published: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl RepoBackend for MockRepoBackend {
    async fn files_by_language(&self, _language: Language) -> Result<Vec<Arc<File>>> {
        match &self.files {
            Ok(files) => Ok(files.clone()),
            Err(e) => Err(AioptimError::ConnectionError(e.to_string())),
        }
    }

    async fn publish(&self, path: &str, _old_fragment: &str, new_body: &str) -> Result<()> {
        if new_body.is_empty() {
            return Ok(());
        }
        self.published
            .lock()
            .expect("published lock poisoned")
            .push((path.to_string(), new_body.to_string()));
        Ok(())
    }
}

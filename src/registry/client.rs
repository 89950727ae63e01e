//! Blocking HTTP client for the stack registry.
//!
//! Two addressing modes: a plain base URL (static hosting, tests) and a
//! GitLab raw-file API (host + project path + branch, files rooted at
//! `stacks/` in the repository). An in-process TTL cache keeps one command
//! invocation from fetching the same document twice.

use std::collections::HashMap;
use std::io::Read;
use std::time::{Duration, Instant};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

use super::types::{RegistryIndex, StackManifest};

/// Hard cap on response bodies. Stack files are markdown; anything bigger
/// than this is a broken registry or the wrong URL.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Keep `-`, `_` and `.` literal; everything else (notably `/`) is escaped,
/// as the GitLab files API requires for project and file path segments.
const URL_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.');

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry index not found (is the registry URL correct?)")]
    IndexNotFound,

    #[error("stack '{stack}' not found in registry")]
    StackNotFound { stack: String },

    #[error("file '{path}' not found for stack '{stack}'")]
    FileNotFound { stack: String, path: String },

    #[error("registry returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("registry request failed: {0}")]
    Transport(String),

    #[error("invalid registry response: {0}")]
    Decode(String),

    #[error("registry response for {url} exceeds {MAX_BODY_BYTES} bytes")]
    TooLarge { url: String },

    #[error("registry returned an HTML page for {url} (captive portal or wrong URL?)")]
    Html { url: String },
}

/// How documents are addressed on the remote side.
#[derive(Debug, Clone)]
enum Endpoint {
    /// `<base>/registry.json`, `<base>/<id>/stack.json`, `<base>/<id>/<file>`.
    Base(String),
    /// GitLab raw-file API; repository-side paths are rooted at `stacks/`.
    GitLab {
        host: String,
        project: String,
        branch: String,
    },
}

impl Endpoint {
    fn url_for(&self, repo_path: &str) -> String {
        match self {
            Endpoint::Base(base) => format!("{}/{repo_path}", base.trim_end_matches('/')),
            Endpoint::GitLab {
                host,
                project,
                branch,
            } => {
                let project = utf8_percent_encode(project, URL_SEGMENT);
                let repo_file = format!("stacks/{repo_path}");
                let file = utf8_percent_encode(&repo_file, URL_SEGMENT);
                format!(
                    "{}/api/v4/projects/{project}/repository/files/{file}/raw?ref={branch}",
                    host.trim_end_matches('/')
                )
            }
        }
    }
}

struct Cache {
    index: Option<(Instant, RegistryIndex)>,
    manifests: HashMap<String, (Instant, StackManifest)>,
}

impl Cache {
    fn new() -> Self {
        Self {
            index: None,
            manifests: HashMap::new(),
        }
    }
}

pub struct RegistryClient {
    agent: ureq::Agent,
    endpoint: Endpoint,
    token: Option<String>,
    cache: Cache,
}

impl RegistryClient {
    /// `project = Some(..)` selects GitLab mode with `registry` as the host;
    /// otherwise `registry` is used as a plain base URL.
    pub fn new(registry: &str, project: Option<&str>, branch: &str, token: Option<&str>) -> Self {
        Self::with_timeout(registry, project, branch, token, REQUEST_TIMEOUT)
    }

    /// Same as [`RegistryClient::new`] with an explicit timeout. Used by
    /// `doctor` for its quick reachability probe.
    pub fn with_timeout(
        registry: &str,
        project: Option<&str>,
        branch: &str,
        token: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        let endpoint = match project {
            Some(project) => Endpoint::GitLab {
                host: registry.to_string(),
                project: project.to_string(),
                branch: branch.to_string(),
            },
            None => Endpoint::Base(registry.to_string()),
        };

        Self {
            agent,
            endpoint,
            token: token.map(str::to_string),
            cache: Cache::new(),
        }
    }

    pub fn fetch_index(&mut self) -> Result<RegistryIndex, RegistryError> {
        if let Some((at, index)) = &self.cache.index {
            if at.elapsed() < CACHE_TTL {
                return Ok(index.clone());
            }
        }

        let body = match self.get("registry.json") {
            Ok(body) => body,
            Err(RegistryError::Status { status: 404, .. }) => {
                return Err(RegistryError::IndexNotFound)
            }
            Err(e) => return Err(e),
        };
        let index: RegistryIndex =
            serde_json::from_slice(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;

        self.cache.index = Some((Instant::now(), index.clone()));
        Ok(index)
    }

    pub fn fetch_manifest(&mut self, stack: &str) -> Result<StackManifest, RegistryError> {
        if let Some((at, manifest)) = self.cache.manifests.get(stack) {
            if at.elapsed() < CACHE_TTL {
                return Ok(manifest.clone());
            }
        }

        let body = match self.get(&format!("{stack}/stack.json")) {
            Ok(body) => body,
            Err(RegistryError::Status { status: 404, .. }) => {
                return Err(RegistryError::StackNotFound {
                    stack: stack.to_string(),
                })
            }
            Err(e) => return Err(e),
        };
        let manifest: StackManifest =
            serde_json::from_slice(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;

        self.cache
            .manifests
            .insert(stack.to_string(), (Instant::now(), manifest.clone()));
        Ok(manifest)
    }

    pub fn download_file(&self, stack: &str, path: &str) -> Result<Vec<u8>, RegistryError> {
        match self.get(&format!("{stack}/{path}")) {
            Err(RegistryError::Status { status: 404, .. }) => Err(RegistryError::FileNotFound {
                stack: stack.to_string(),
                path: path.to_string(),
            }),
            other => other,
        }
    }

    fn get(&self, repo_path: &str) -> Result<Vec<u8>, RegistryError> {
        let url = self.endpoint.url_for(repo_path);

        let mut req = self.agent.get(&url);
        if let Some(ref token) = self.token {
            req = req.header("PRIVATE-TOKEN", token);
        }

        let resp = match req.call() {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(RegistryError::Status { status, url })
            }
            Err(e) => return Err(RegistryError::Transport(e.to_string())),
        };

        let status = resp.status().as_u16();
        if status == 404 || status >= 400 {
            return Err(RegistryError::Status { status, url });
        }

        let is_html = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));
        if is_html {
            return Err(RegistryError::Html { url });
        }

        let mut body = Vec::new();
        resp.into_body()
            .into_reader()
            .take(MAX_BODY_BYTES as u64 + 1)
            .read_to_end(&mut body)
            .map_err(|e| RegistryError::Transport(e.to_string()))?;
        if body.len() > MAX_BODY_BYTES {
            return Err(RegistryError::TooLarge { url });
        }

        Ok(body)
    }
}

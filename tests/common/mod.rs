//! Common test utilities for stackpack integration tests.
//!
//! Provides `TestEnv` (isolated tempdir project plus CLI runner) and
//! `MockRegistry` (in-process HTTP server backed by editable stack
//! fixtures).

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

/// One stack as the mock registry serves it.
#[derive(Debug, Clone)]
pub struct StackDef {
    pub version: String,
    pub description: String,
    pub category: String,
    pub depends: Vec<String>,
    /// (relative path, content)
    pub files: Vec<(String, String)>,
    /// (claude_md, agents_md, cursorrules)
    pub tools: Option<(bool, bool, bool)>,
}

impl StackDef {
    pub fn new(version: &str, depends: &[&str], files: &[(&str, &str)]) -> Self {
        Self {
            version: version.to_string(),
            description: String::new(),
            category: "general".to_string(),
            depends: depends.iter().map(|d| d.to_string()).collect(),
            files: files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
            tools: None,
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn categorized(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_tools(mut self, claude_md: bool, agents_md: bool, cursorrules: bool) -> Self {
        self.tools = Some((claude_md, agents_md, cursorrules));
        self
    }
}

type SharedStacks = Arc<Mutex<BTreeMap<String, StackDef>>>;

/// In-process registry server. Responses are generated per request from the
/// shared stack map, so tests can publish new versions mid-test.
pub struct MockRegistry {
    url: String,
    stacks: SharedStacks,
    _handle: std::thread::JoinHandle<()>,
}

impl MockRegistry {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock registry");
        let url = format!("http://{}", listener.local_addr().unwrap());
        let stacks: SharedStacks = Arc::new(Mutex::new(BTreeMap::new()));

        let stacks_clone = Arc::clone(&stacks);
        let handle = std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let stacks = Arc::clone(&stacks_clone);

                std::thread::spawn(move || {
                    let mut reader = BufReader::new(stream.try_clone().unwrap());
                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        return;
                    }
                    let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
                    if parts.len() < 2 {
                        return;
                    }
                    let path = parts[1].to_owned();

                    // Drain headers.
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                            break;
                        }
                    }

                    let data = stacks.lock().unwrap();
                    let response = respond(&data, &path);
                    drop(data);

                    match response {
                        Some((content_type, body)) => {
                            let head = format!(
                                "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                body.len()
                            );
                            let _ = stream.write_all(head.as_bytes());
                            let _ = stream.write_all(&body);
                        }
                        None => {
                            let _ = stream.write_all(
                                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            );
                        }
                    }
                    let _ = stream.flush();
                });
            }
        });

        Self {
            url,
            stacks,
            _handle: handle,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn publish(&self, id: &str, stack: StackDef) {
        self.stacks.lock().unwrap().insert(id.to_string(), stack);
    }

    pub fn unpublish(&self, id: &str) {
        self.stacks.lock().unwrap().remove(id);
    }

    /// Bump a stack's version and replace its files.
    pub fn republish(&self, id: &str, version: &str, files: &[(&str, &str)]) {
        let mut stacks = self.stacks.lock().unwrap();
        if let Some(stack) = stacks.get_mut(id) {
            stack.version = version.to_string();
            stack.files = files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect();
        }
    }
}

fn respond(stacks: &BTreeMap<String, StackDef>, path: &str) -> Option<(String, Vec<u8>)> {
    if path == "/registry.json" {
        let mut entries = serde_json::Map::new();
        for (id, stack) in stacks {
            entries.insert(
                id.clone(),
                serde_json::json!({
                    "name": id,
                    "description": stack.description,
                    "version": stack.version,
                    "hash": "",
                    "category": stack.category,
                    "depends": stack.depends,
                }),
            );
        }
        let index = serde_json::json!({
            "version": 1,
            "generated_at": "2026-01-01T00:00:00Z",
            "stacks": entries,
        });
        return Some(("application/json".to_string(), index.to_string().into_bytes()));
    }

    let rest = path.strip_prefix('/')?;
    let (id, file) = rest.split_once('/')?;
    let stack = stacks.get(id)?;

    if file == "stack.json" {
        let mut manifest = serde_json::json!({
            "name": id,
            "version": stack.version,
            "description": stack.description,
            "category": stack.category,
            "depends": stack.depends,
            "files": stack.files.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>(),
        });
        if let Some((claude_md, agents_md, cursorrules)) = stack.tools {
            manifest["tools"] = serde_json::json!({
                "claude_md": claude_md,
                "agents_md": agents_md,
                "cursorrules": cursorrules,
            });
        }
        return Some((
            "application/json".to_string(),
            manifest.to_string().into_bytes(),
        ));
    }

    stack
        .files
        .iter()
        .find(|(p, _)| p == file)
        .map(|(_, content)| ("text/markdown".to_string(), content.clone().into_bytes()))
}

/// Result of running the stackpack CLI.
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated project directory plus a mock registry.
pub struct TestEnv {
    pub project: TempDir,
    pub registry: MockRegistry,
    bin: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            project: TempDir::new().expect("create project tempdir"),
            registry: MockRegistry::start(),
            bin: PathBuf::from(env!("CARGO_BIN_EXE_stackpack")),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.project.path().join(relative)
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("failed to read {relative}: {e}"))
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, content).expect("write project file");
    }

    /// Run stackpack in the project directory against the mock registry.
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_from(self.project.path(), args)
    }

    pub fn run_from(&self, cwd: &Path, args: &[&str]) -> TestResult {
        let output = Command::new(&self.bin)
            .current_dir(cwd)
            .args(args)
            .env("NO_COLOR", "1")
            .env("STACKPACK_REGISTRY", self.registry.url())
            .env_remove("STACKPACK_PROJECT")
            .env_remove("STACKPACK_BRANCH")
            .env_remove("STACKPACK_TOKEN")
            .env_remove("STACKPACK_DEBUG")
            .output()
            .expect("failed to execute stackpack");
        to_result(output)
    }
}

fn to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// A three-stack fixture used across tests: `nuxt-ui -> nuxt -> vue`.
pub fn seed_nuxt_chain(registry: &MockRegistry) {
    registry.publish("vue", StackDef::new("1.0.0", &[], &[("vue.md", "# Vue")]));
    registry.publish("nuxt", StackDef::new("2.0.0", &["vue"], &[("nuxt.md", "# Nuxt")]));
    registry.publish(
        "nuxt-ui",
        StackDef::new("3.0.0", &["nuxt"], &[("nuxt-ui.md", "# Nuxt UI")]),
    );
}

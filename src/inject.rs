//! Managed-block injection into assistant entry-point files.
//!
//! Each entry-point file (`CLAUDE.md`, `AGENTS.md`, `.cursorrules`) carries
//! one marker-delimited block owned by stackpack. Everything outside the
//! markers belongs to the user and is never touched.

use std::io;
use std::path::Path;

use crate::config::MANAGED_DIR;
use crate::error::StackpackResult;
use crate::fs::atomic_write;
use crate::lockfile::Lockfile;
use crate::registry::ToolFlags;

pub const MARKER_START: &str = "<!-- STACKPACK:START - managed by stackpack, do not edit -->";
pub const MARKER_END: &str = "<!-- STACKPACK:END -->";

pub const ENTRY_POINTS: [&str; 3] = ["CLAUDE.md", "AGENTS.md", ".cursorrules"];

/// Entry-point files a stack opts into via its tool flags.
pub fn entry_points(tools: &ToolFlags) -> Vec<&'static str> {
    let mut files = Vec::new();
    if tools.claude_md {
        files.push("CLAUDE.md");
    }
    if tools.agents_md {
        files.push("AGENTS.md");
    }
    if tools.cursorrules {
        files.push(".cursorrules");
    }
    files
}

/// Render the managed block for one entry-point file.
pub fn build_block(stacks: &[String], files: &[String], stacks_dir: &str) -> String {
    let mut block = String::new();
    block.push_str(MARKER_START);
    block.push('\n');
    block.push_str("# AI Instruction Stacks\n\n");
    block.push_str(
        "If any referenced file is missing or inaccessible, stop and ask for it before proceeding.\n\n",
    );
    block.push_str(&format!(
        "This project uses the following stacks: {}\n\n",
        stacks.join(", ")
    ));
    block.push_str(&format!(
        "Read and follow ALL files under `{stacks_dir}/{MANAGED_DIR}/`:\n"
    ));
    for file in files {
        block.push_str(&format!("- {file}\n"));
    }
    block.push_str("\nThese are mandatory standards. Follow them strictly.\n");
    block.push_str(MARKER_END);
    block
}

/// Create or update the managed block in one file.
///
/// Both markers present: replace inclusively. One marker (manual damage):
/// strip it and prepend a fresh block. No markers: prepend the block plus a
/// blank separator line.
pub fn inject_file(path: &Path, block: &str) -> io::Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return atomic_write(path, format!("{block}\n").as_bytes());
        }
        Err(e) => return Err(e),
    };

    let start = content.find(MARKER_START);
    let end = content.find(MARKER_END);

    let updated = match (start, end) {
        (Some(start), Some(end)) if end > start => {
            let after = end + MARKER_END.len();
            format!("{}{block}{}", &content[..start], &content[after..])
        }
        (None, None) => format!("{block}\n\n{content}"),
        _ => {
            let cleaned = content
                .replacen(MARKER_START, "", 1)
                .replacen(MARKER_END, "", 1);
            format!("{block}\n\n{}", cleaned.trim_start_matches('\n'))
        }
    };

    atomic_write(path, updated.as_bytes())
}

/// Remove the managed block from a file. The file itself is never deleted;
/// a missing file or a file without markers is left alone.
pub fn clear_file(path: &Path) -> io::Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let (Some(start), Some(end)) = (content.find(MARKER_START), content.find(MARKER_END)) else {
        return Ok(());
    };
    if end < start {
        return Ok(());
    }

    let mut after = end + MARKER_END.len();
    // Swallow the blank separator line that injection added.
    for _ in 0..2 {
        if content[after..].starts_with('\n') {
            after += 1;
        }
    }

    atomic_write(path, format!("{}{}", &content[..start], &content[after..]).as_bytes())
}

/// Whether a file currently carries a complete managed block.
pub fn has_block(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(content) => content.contains(MARKER_START) && content.contains(MARKER_END),
        Err(_) => false,
    }
}

/// Re-render the managed block in every entry-point file.
///
/// `order` is the resolved install order; each stack participates in the
/// entry points its recorded tool flags opt into. Entry points with no
/// participating stack get their block cleared instead, and are only ever
/// created when some stack opts in.
pub fn inject_all(
    root: &Path,
    stacks_dir: &str,
    order: &[String],
    lockfile: &Lockfile,
) -> StackpackResult<()> {
    for entry in ENTRY_POINTS {
        let mut stacks = Vec::new();
        let mut files = Vec::new();
        for id in order {
            let Some(state) = lockfile.stacks.get(id) else {
                continue;
            };
            if !entry_points(&state.tools).contains(&entry) {
                continue;
            }
            stacks.push(id.clone());
            for file in &state.files {
                files.push(format!("{stacks_dir}/{MANAGED_DIR}/{id}/{file}"));
            }
        }

        let path = root.join(entry);
        if stacks.is_empty() {
            clear_file(&path)?;
        } else {
            inject_file(&path, &build_block(&stacks, &files, stacks_dir))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn block() -> String {
        build_block(
            &["php".to_string()],
            &["ai-stacks/managed/php/conventions.md".to_string()],
            "ai-stacks",
        )
    }

    #[test]
    fn block_lists_stacks_and_files() {
        let block = block();
        assert!(block.starts_with(MARKER_START));
        assert!(block.ends_with(MARKER_END));
        assert!(block.contains("This project uses the following stacks: php"));
        assert!(block.contains("- ai-stacks/managed/php/conventions.md"));
    }

    #[test]
    fn injecting_into_missing_file_creates_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CLAUDE.md");
        inject_file(&path, &block()).unwrap();

        assert!(has_block(&path));
    }

    #[test]
    fn injecting_prepends_above_user_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CLAUDE.md");
        std::fs::write(&path, "# My project notes\n").unwrap();
        inject_file(&path, &block()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(MARKER_START));
        assert!(content.contains("\n\n# My project notes\n"));
    }

    #[test]
    fn injecting_twice_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CLAUDE.md");
        std::fs::write(&path, "user text\n").unwrap();

        inject_file(&path, &block()).unwrap();
        let once = std::fs::read_to_string(&path).unwrap();
        inject_file(&path, &block()).unwrap();
        let twice = std::fs::read_to_string(&path).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.matches(MARKER_START).count(), 1);
    }

    #[test]
    fn updated_block_replaces_old_content_between_markers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CLAUDE.md");
        inject_file(&path, &block()).unwrap();

        let updated = build_block(&["vue".to_string()], &[], "ai-stacks");
        inject_file(&path, &updated).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("stacks: vue"));
        assert!(!content.contains("stacks: php"));
    }

    #[test]
    fn lone_marker_is_stripped_and_block_prepended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CLAUDE.md");
        std::fs::write(&path, format!("{MARKER_START}\nleftovers\nuser text\n")).unwrap();

        inject_file(&path, &block()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(MARKER_START).count(), 1);
        assert_eq!(content.matches(MARKER_END).count(), 1);
        assert!(content.contains("user text"));
    }

    #[test]
    fn clearing_removes_block_but_keeps_user_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CLAUDE.md");
        std::fs::write(&path, "# My project notes\n").unwrap();
        inject_file(&path, &block()).unwrap();

        clear_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# My project notes\n");
        assert!(path.exists());
    }

    #[test]
    fn clearing_a_missing_file_is_ok() {
        let dir = tempdir().unwrap();
        clear_file(&dir.path().join("CLAUDE.md")).unwrap();
        assert!(!dir.path().join("CLAUDE.md").exists());
    }

    #[test]
    fn inject_all_honors_tool_flags() {
        use crate::integrity::ContentHash;
        use crate::lockfile::StackState;

        let dir = tempdir().unwrap();
        let mut lockfile = Lockfile::default();
        lockfile.stacks.insert(
            "php".into(),
            StackState {
                version: "1.0.0".into(),
                hash: ContentHash::new("abc"),
                files: vec!["conventions.md".into()],
                tools: ToolFlags {
                    claude_md: true,
                    agents_md: false,
                    cursorrules: false,
                },
                explicit: true,
                ..Default::default()
            },
        );

        inject_all(dir.path(), "ai-stacks", &["php".to_string()], &lockfile).unwrap();

        assert!(has_block(&dir.path().join("CLAUDE.md")));
        // Not opted into, and nothing to clear: must not be created.
        assert!(!dir.path().join("AGENTS.md").exists());
        assert!(!dir.path().join(".cursorrules").exists());
    }
}

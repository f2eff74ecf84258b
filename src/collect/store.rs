//! On-disk layout of harvested metadata
//!
//! ```text
//! <root>/
//! ├── system_prompt.md
//! └── tools/
//!     ├── Bash.md
//!     └── Read.md
//! ```

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::error::{CollectError, CollectResult};
use crate::capture::{CapturedPayload, ToolDefinition};

pub const SYSTEM_PROMPT_FILE: &str = "system_prompt.md";
pub const TOOLS_DIR: &str = "tools";

/// Placeholder written in place of per-run install directories
pub const TEMP_DIR_PLACEHOLDER: &str = "/tmp/claude-code-VERSION";

/// Install directories show up in the prompt's environment section, as
/// `/tmp/...` on Linux and `/private/tmp/...` on macOS.
static TEMP_DIR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/private)?/tmp/claude-code-[^/\s]+").expect("temp dir pattern is valid")
});

/// Replace ephemeral install paths with [`TEMP_DIR_PLACEHOLDER`]
///
/// Idempotent: the placeholder itself maps to itself.
pub fn normalize_system_prompt(prompt: &str) -> String {
    TEMP_DIR_PATTERN
        .replace_all(prompt, TEMP_DIR_PLACEHOLDER)
        .into_owned()
}

/// File name for a tool, with path separators neutralized
pub fn tool_file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    let safe = match safe.as_str() {
        "" | "." | ".." => format!("_{safe}"),
        _ => safe,
    };
    format!("{safe}.md")
}

/// Markdown document describing one tool
pub fn render_tool(tool: &ToolDefinition) -> String {
    let schema = serde_json::to_string_pretty(&tool.input_schema)
        .unwrap_or_else(|_| tool.input_schema.to_string());
    format!(
        "# {}\n\n{}\n\n## Input Schema\n\n```json\n{}\n```\n",
        tool.name, tool.description, schema
    )
}

/// Writes captured payloads under a root directory
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn system_prompt_path(&self) -> PathBuf {
        self.root.join(SYSTEM_PROMPT_FILE)
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.root.join(TOOLS_DIR)
    }

    pub async fn save(&self, payload: &CapturedPayload) -> CollectResult<()> {
        self.save_system_prompt(&payload.system_prompt).await?;
        self.save_tools(&payload.tools).await
    }

    pub async fn save_system_prompt(&self, prompt: &str) -> CollectResult<()> {
        let path = self.system_prompt_path();
        tokio::fs::write(&path, normalize_system_prompt(prompt))
            .await
            .map_err(|source| CollectError::Persist {
                path: path.clone(),
                source,
            })?;
        log::info!("Saved {}", path.display());
        Ok(())
    }

    /// Replace the tools directory with one file per tool
    ///
    /// Files from a previous capture are removed first so renamed or dropped
    /// tools do not linger.
    pub async fn save_tools(&self, tools: &[ToolDefinition]) -> CollectResult<()> {
        let dir = self.tools_dir();
        let persist_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CollectError::Persist { path, source }
        };

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(persist_error(&dir)(e)),
        }
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(persist_error(&dir))?;

        for tool in tools {
            let path = dir.join(tool_file_name(&tool.name));
            tokio::fs::write(&path, render_tool(tool))
                .await
                .map_err(persist_error(&path))?;
        }

        log::info!("Saved {} tool definitions", tools.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: format!("The {name} tool"),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn normalizes_macos_temp_dir() {
        assert_eq!(
            normalize_system_prompt("Working directory: /private/tmp/claude-code-abc123/foo"),
            "Working directory: /tmp/claude-code-VERSION/foo"
        );
    }

    #[test]
    fn normalizes_linux_temp_dir() {
        assert_eq!(
            normalize_system_prompt("Working directory: /tmp/claude-code-1.0.3-Xy9z\nIs git repo: no"),
            "Working directory: /tmp/claude-code-VERSION\nIs git repo: no"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_system_prompt("cwd /private/tmp/claude-code-abc123/foo and /tmp/claude-code-x");
        assert_eq!(normalize_system_prompt(&once), once);
    }

    #[test]
    fn unrelated_paths_untouched() {
        let text = "Working directory: /home/me/project";
        assert_eq!(normalize_system_prompt(text), text);
    }

    #[test]
    fn tool_names_cannot_escape_directory() {
        assert_eq!(tool_file_name("Bash"), "Bash.md");
        assert_eq!(tool_file_name("mcp__ide__getDiagnostics"), "mcp__ide__getDiagnostics.md");
        assert_eq!(tool_file_name("../evil"), ".._evil.md");
        assert_eq!(tool_file_name(".."), "_...md");
    }

    #[test]
    fn renders_tool_markdown() {
        let rendered = render_tool(&tool("Read"));
        assert_eq!(
            rendered,
            "# Read\n\nThe Read tool\n\n## Input Schema\n\n```json\n{\n  \"type\": \"object\"\n}\n```\n"
        );
    }

    #[tokio::test]
    async fn save_tools_clears_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        std::fs::create_dir_all(store.tools_dir()).unwrap();
        std::fs::write(store.tools_dir().join("old-tool.md"), "stale").unwrap();

        store.save_tools(&[tool("new-tool")]).await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(store.tools_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["new-tool.md"]);
    }

    #[tokio::test]
    async fn save_writes_normalized_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        let payload = CapturedPayload {
            system_prompt: "Working directory: /private/tmp/claude-code-1.0.0/".to_string(),
            tools: vec![tool("Bash")],
        };

        store.save(&payload).await.unwrap();

        let prompt = std::fs::read_to_string(store.system_prompt_path()).unwrap();
        assert_eq!(prompt, "Working directory: /tmp/claude-code-VERSION/");
        assert!(store.tools_dir().join("Bash.md").exists());
    }
}

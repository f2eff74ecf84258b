use regex::bytes::Regex;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::error::{CollectError, CollectResult};
use super::process::{failure_message, run_captured};

/// Version control holding one commit per harvested version
#[allow(async_fn_in_trait)]
pub trait VersionControl {
    /// Whether a commit already records `version`
    async fn is_recorded(&self, version: &str) -> CollectResult<bool>;

    /// Stage everything and commit it as the harvest of `version`
    async fn record(&self, version: &str) -> CollectResult<()>;
}

/// Commit message marking `package@version` as harvested
pub fn commit_message(package: &str, version: &str) -> String {
    format!("Add metadata for {package}@{version}")
}

/// Pattern matching a message line that ends with the commit message
///
/// Anchored at line end so `1.2.3` never matches a record of `1.2.30`.
pub fn record_pattern(package: &str, version: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        "(?m){}$",
        regex::escape(&commit_message(package, version))
    ))
}

/// Git repository at the output root
///
/// History is read in-process with gix; staging and committing go through
/// the `git` CLI so hooks and user identity behave as they would by hand.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
    package: String,
    git: PathBuf,
}

impl GitRepo {
    pub fn new(root: impl Into<PathBuf>, package: impl Into<String>) -> anyhow::Result<Self> {
        let git = which::which("git").map_err(|e| anyhow::anyhow!("git not found in PATH: {e}"))?;
        Ok(Self {
            root: root.into(),
            package: package.into(),
            git,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan every commit reachable from HEAD for a matching message
    fn history_contains(&self, pattern: &Regex) -> CollectResult<bool> {
        let repo = gix::discover(&self.root).map_err(history_error)?;
        let head = match repo.head_commit() {
            Ok(commit) => commit,
            // Unborn HEAD: nothing recorded yet
            Err(e) => {
                log::debug!("No HEAD commit in {}: {e}", self.root.display());
                return Ok(false);
            }
        };

        let walk = head.ancestors().all().map_err(history_error)?;
        for info in walk {
            let commit = info.map_err(history_error)?.object().map_err(history_error)?;
            let message = commit.message_raw().map_err(history_error)?;
            if pattern.is_match(message) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn git(&self, args: &[&str]) -> CollectResult<std::process::Output> {
        let command = args.first().copied().unwrap_or_default().to_string();
        run_captured(Command::new(&self.git).args(args).current_dir(&self.root))
            .await
            .map_err(|e| CollectError::Commit {
                command,
                message: e.to_string(),
            })
    }
}

fn history_error(e: impl std::fmt::Display) -> CollectError {
    CollectError::History(e.to_string())
}

/// `git commit` exits non-zero when the tree is unchanged
pub fn is_nothing_to_commit(output: &std::process::Output) -> bool {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    stdout.contains("nothing to commit") || stderr.contains("nothing to commit")
}

impl VersionControl for GitRepo {
    /// The walk runs on the blocking pool: the capture server shares this
    /// single-threaded runtime.
    async fn is_recorded(&self, version: &str) -> CollectResult<bool> {
        let pattern = record_pattern(&self.package, version).map_err(history_error)?;
        let repo = self.clone();
        tokio::task::spawn_blocking(move || repo.history_contains(&pattern))
            .await
            .map_err(history_error)?
    }

    async fn record(&self, version: &str) -> CollectResult<()> {
        let add = self.git(&["add", "-A"]).await?;
        if !add.status.success() {
            return Err(CollectError::Commit {
                command: "add".to_string(),
                message: failure_message(&add),
            });
        }

        let message = commit_message(&self.package, version);
        let commit = self.git(&["commit", "-m", &message]).await?;
        if commit.status.success() {
            log::info!("Committed: {message}");
            Ok(())
        } else if is_nothing_to_commit(&commit) {
            log::info!("No changes to commit");
            Ok(())
        } else {
            Err(CollectError::Commit {
                command: "commit".to_string(),
                message: failure_message(&commit),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE: &str = "@anthropic-ai/claude-code";

    #[test]
    fn pattern_is_anchored_at_line_end() {
        let recorded = commit_message(PACKAGE, "1.2.3");
        let pattern = |version| record_pattern(PACKAGE, version).unwrap();
        assert!(pattern("1.2.3").is_match(recorded.as_bytes()));
        assert!(!pattern("1.2.30").is_match(recorded.as_bytes()));

        let longer = commit_message(PACKAGE, "1.2.30");
        assert!(!pattern("1.2.3").is_match(longer.as_bytes()));
    }

    #[test]
    fn pattern_escapes_version_dots() {
        let recorded = commit_message(PACKAGE, "1x2x3");
        assert!(!record_pattern(PACKAGE, "1.2.3").unwrap().is_match(recorded.as_bytes()));
    }

    #[test]
    fn pattern_matches_any_message_line() {
        let message = format!("{}\n\nBody text\n", commit_message(PACKAGE, "0.2.9"));
        assert!(record_pattern(PACKAGE, "0.2.9").unwrap().is_match(message.as_bytes()));
    }

    #[test]
    fn pattern_accepts_regex_metacharacters() {
        let version = "1.0.0-beta+(build)[1]*";
        let recorded = commit_message(PACKAGE, version);
        let pattern = record_pattern(PACKAGE, version).unwrap();
        assert!(pattern.is_match(recorded.as_bytes()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn records_and_finds_versions() {
        use std::process::Command as StdCommand;

        let dir = tempfile::tempdir().unwrap();
        let git = |args: &[&str]| {
            let status = StdCommand::new("git")
                .args(args)
                .current_dir(dir.path())
                .status()
                .unwrap();
            assert!(status.success(), "git {args:?} failed");
        };
        git(&["init", "-q"]);
        git(&["config", "user.email", "harvest@example.com"]);
        git(&["config", "user.name", "Harvest"]);
        git(&["config", "commit.gpgsign", "false"]);

        let repo = GitRepo::new(dir.path(), PACKAGE).unwrap();
        assert!(!repo.is_recorded("1.2.3").await.unwrap());

        std::fs::write(dir.path().join("system_prompt.md"), "prompt").unwrap();
        repo.record("1.2.3").await.unwrap();

        assert!(repo.is_recorded("1.2.3").await.unwrap());
        assert!(!repo.is_recorded("1.2.30").await.unwrap());

        // Same tree again: "nothing to commit" counts as success
        repo.record("1.2.4").await.unwrap();
        assert!(!repo.is_recorded("1.2.4").await.unwrap());
    }
}

use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::error::{CollectError, CollectResult};
use super::process::{failure_message, run_captured};

/// Package registry the target is published to
#[allow(async_fn_in_trait)]
pub trait Registry {
    /// All published versions, oldest first
    async fn versions(&self) -> CollectResult<Vec<String>>;

    /// Install exactly `version` as a dependency inside `dir`
    async fn install(&self, version: &str, dir: &Path) -> CollectResult<()>;
}

/// `npm view --json` prints a bare string when only one version exists
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionList {
    Many(Vec<String>),
    One(String),
}

impl From<VersionList> for Vec<String> {
    fn from(list: VersionList) -> Self {
        match list {
            VersionList::Many(versions) => versions,
            VersionList::One(version) => vec![version],
        }
    }
}

pub fn parse_versions(json: &str) -> serde_json::Result<Vec<String>> {
    serde_json::from_str::<VersionList>(json).map(Into::into)
}

/// npm-backed registry driven through the `npm` CLI
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    package: String,
    npm: PathBuf,
}

impl NpmRegistry {
    /// Locate `npm` in PATH
    pub fn new(package: impl Into<String>) -> anyhow::Result<Self> {
        let npm = which::which("npm")
            .map_err(|e| anyhow::anyhow!("npm not found in PATH: {e}"))?;
        Ok(Self {
            package: package.into(),
            npm,
        })
    }

    pub fn package(&self) -> &str {
        &self.package
    }
}

impl Registry for NpmRegistry {
    async fn versions(&self) -> CollectResult<Vec<String>> {
        let registry_error = |message: String| CollectError::Registry {
            package: self.package.clone(),
            message,
        };

        let output = run_captured(
            Command::new(&self.npm)
                .args(["view", &self.package, "versions", "--json"])
                .env("npm_config_loglevel", "error"),
        )
        .await
        .map_err(|e| registry_error(e.to_string()))?;

        if !output.status.success() {
            return Err(registry_error(failure_message(&output)));
        }

        parse_versions(&String::from_utf8_lossy(&output.stdout))
            .map_err(|e| registry_error(format!("unexpected `npm view` output: {e}")))
    }

    async fn install(&self, version: &str, dir: &Path) -> CollectResult<()> {
        let install_error = |message: String| CollectError::Install {
            version: version.to_string(),
            message,
        };

        log::info!("Installing {}@{version} in {}...", self.package, dir.display());

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| install_error(e.to_string()))?;

        let manifest = json!({ "name": "temp", "version": "1.0.0" });
        let manifest = serde_json::to_string_pretty(&manifest)
            .map_err(|e| install_error(e.to_string()))?;
        tokio::fs::write(dir.join("package.json"), manifest)
            .await
            .map_err(|e| install_error(e.to_string()))?;

        let output = run_captured(
            Command::new(&self.npm)
                .arg("install")
                .arg(format!("{}@{version}", self.package))
                .current_dir(dir)
                .env("npm_config_loglevel", "error"),
        )
        .await
        .map_err(|e| install_error(e.to_string()))?;

        if !output.status.success() {
            return Err(install_error(failure_message(&output)));
        }

        Ok(())
    }
}

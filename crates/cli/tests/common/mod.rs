//! Command execution helpers for integration tests
//!
//! Every command runs with its own settings file and state directory so
//! tests never touch the real user configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Isolated settings file, state directory and watch root
pub struct TestEnv {
    temp: TempDir,
}

impl TestEnv {
    pub fn new() -> Result<Self> {
        let env = Self {
            temp: TempDir::new()?,
        };
        std::fs::create_dir_all(env.games())?;
        Ok(env)
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config/config.toml")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.temp.path().join("state")
    }

    /// Watch root holding `<appid>/<file>` fixtures
    pub fn games(&self) -> PathBuf {
        self.temp.path().join("games")
    }

    /// Write a fixture file under the watch root
    pub fn write_game_file(&self, rel: &str, content: &str) -> Result<PathBuf> {
        let path = self.games().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Settings file with only the watch root configured
    pub fn write_settings(&self) -> Result<()> {
        let path = self.config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cache = self.temp.path().join("cache");
        std::fs::write(
            &path,
            format!(
                "folders = [{:?}]\n\n[notify]\ndesktop = false\n\n[cache]\ndir = {:?}\n",
                self.games().display().to_string(),
                cache.display().to_string(),
            ),
        )?;
        Ok(())
    }

    pub fn cheevo(&self, args: &[&str]) -> CheevoCommand {
        CheevoCommand {
            args: args.iter().map(|s| s.to_string()).collect(),
            config: self.config_path(),
            state: self.state_dir(),
            working_dir: self.temp.path().to_path_buf(),
        }
    }
}

/// One invocation of the `cheevo` binary
pub struct CheevoCommand {
    args: Vec<String>,
    config: PathBuf,
    state: PathBuf,
    working_dir: PathBuf,
}

impl CheevoCommand {
    pub fn execute(&self) -> Result<CommandResult> {
        let output = Command::new(env!("CARGO_BIN_EXE_cheevo"))
            .args(&self.args)
            .current_dir(&self.working_dir)
            .env("CHEEVO_CONFIG", &self.config)
            .env("CHEEVO_STATE_DIR", &self.state)
            .env("RUST_LOG", "warn")
            .output()
            .context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Captured output of one command
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

use std::path::{Path, PathBuf};

use crate::error::RunnerError;

use super::types::AppConfig;

/// Files that live next to the wrapper executable, named after its stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperPaths {
    /// `<stem>.conf`: the command to launch.
    pub command: PathBuf,
    /// `<stem>.log`: the stream transcript.
    pub transcript: PathBuf,
    /// `<stem>.toml`: optional settings.
    pub settings: PathBuf,
}

impl WrapperPaths {
    pub fn beside(exe: &Path) -> anyhow::Result<Self> {
        let dir = exe
            .parent()
            .ok_or_else(|| anyhow::anyhow!("executable has no parent dir: {}", exe.display()))?;
        let stem = exe
            .file_stem()
            .ok_or_else(|| anyhow::anyhow!("executable has no file name: {}", exe.display()))?
            .to_string_lossy()
            .to_string();

        Ok(Self {
            command: dir.join(format!("{stem}.conf")),
            transcript: dir.join(format!("{stem}.log")),
            settings: dir.join(format!("{stem}.toml")),
        })
    }

    /// Paths beside the running executable, with symlinks resolved.
    pub fn current() -> anyhow::Result<Self> {
        let exe = std::env::current_exe()?;
        let exe = std::fs::canonicalize(&exe).unwrap_or(exe);
        Self::beside(&exe)
    }
}

/// Reads the command file. Its whole content, trimmed, is the program to run.
pub fn read_command(path: &Path) -> Result<String, RunnerError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| RunnerError::Config(format!("read {} failed: {e}", path.display())))?;
    let cmd = raw.trim();
    if cmd.is_empty() {
        return Err(RunnerError::Config(format!(
            "command file is empty: {}",
            path.display()
        )));
    }
    Ok(cmd.to_string())
}

pub fn load_from(path: &Path) -> anyhow::Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse {} failed: {e}", path.display()))?;
    Ok(cfg)
}

pub fn load_settings(paths: &WrapperPaths) -> anyhow::Result<AppConfig> {
    // Priority 1: LOGPIPE_SETTINGS
    // Priority 2: <stem>.toml beside the executable
    let path = match std::env::var("LOGPIPE_SETTINGS") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => paths.settings.clone(),
    };

    let mut cfg = load_from(&path)?;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority).
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("LOGPIPE_LOG_LEVEL") {
        cfg.logging.level = v.trim().to_string();
    }
    if let Some(v) = get("LOGPIPE_EXIT_STATUS") {
        cfg.relay.exit_status = v.parse().map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = get("LOGPIPE_INTERRUPT") {
        cfg.relay.interrupt = v.parse().map_err(anyhow::Error::msg)?;
    }

    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Defaults read from config files, in the same syntax as the CLI flags.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub server: Option<String>,
    pub theme: Option<ThemeMode>,
}

impl ConfigFlags {
    /// Merge two flag sets; values in `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            host: other.host.clone().or_else(|| self.host.clone()),
            port: other.port.or(self.port),
            data_dir: other.data_dir.clone().or_else(|| self.data_dir.clone()),
            templates_dir: other
                .templates_dir
                .clone()
                .or_else(|| self.templates_dir.clone()),
            static_dir: other.static_dir.clone().or_else(|| self.static_dir.clone()),
            server: other.server.clone().or_else(|| self.server.clone()),
            theme: other.theme.or(self.theme),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("markcv").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("markcv")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("markcv").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join("markcv").join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".markcvrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# markcv defaults (saved with --save)".to_string());
    if let Some(host) = &flags.host {
        lines.push(format!("--host {host}"));
    }
    if let Some(port) = flags.port {
        lines.push(format!("--port {port}"));
    }
    if let Some(dir) = &flags.data_dir {
        lines.push(format!("--data-dir {}", dir.display()));
    }
    if let Some(dir) = &flags.templates_dir {
        lines.push(format!("--templates-dir {}", dir.display()));
    }
    if let Some(dir) = &flags.static_dir {
        lines.push(format!("--static-dir {}", dir.display()));
    }
    if let Some(server) = &flags.server {
        lines.push(format!("--server {server}"));
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of a token list; anything else is ignored.
///
/// Both `--flag value` and `--flag=value` are accepted.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        let mut value = || {
            inline.map(ToOwned::to_owned).or_else(|| {
                let next = tokens.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            })
        };
        match name {
            "--host" => flags.host = value(),
            "--port" => match value().map(|v| v.parse::<u16>()) {
                Some(Ok(port)) => flags.port = Some(port),
                Some(Err(err)) => tracing::warn!(%err, "ignoring invalid --port"),
                None => {}
            },
            "--data-dir" => flags.data_dir = value().map(PathBuf::from),
            "--templates-dir" => flags.templates_dir = value().map(PathBuf::from),
            "--static-dir" => flags.static_dir = value().map(PathBuf::from),
            "--server" => flags.server = value(),
            "--theme" => flags.theme = value().as_deref().and_then(parse_theme),
            _ => {}
        }
        i += 1;
    }
    flags
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Configuration loaded from a TOML file.
//!
//! Lookup order for the configuration directory:
//! 1. `$CONFIG_PATH`
//! 2. `$XDG_CONFIG_HOME/picochat`
//! 3. `~/.config/picochat`
//! 4. The directory of the executable
//!
//! The file is `config.toml` in that directory unless `--config` names
//! another one. `--config @work` selects `<config dir>/work.toml`.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::output::OutputFormat;
use crate::session::{MAX_CONTEXT, MIN_CONTEXT};

const APP_DIR: &str = "picochat";
const CONFIG_FILE: &str = "config.toml";
const HISTORY_DIR: &str = "history";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub(crate) struct Config {
    #[serde(alias = "URL")]
    pub url: String,

    #[serde(alias = "Model")]
    pub model: String,

    /// Maximum number of retained messages, 0 for unbounded.
    #[serde(default, alias = "Context")]
    pub context: usize,

    #[serde(alias = "Prompt")]
    pub prompt: String,

    #[serde(default, alias = "Temperature", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, alias = "TopP", skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Ask the server to stream reasoning separately.
    #[serde(default, alias = "Reasoning")]
    pub reasoning: bool,

    /// Suppress the spinner and the statistics line.
    #[serde(default, alias = "Quiet")]
    pub quiet: bool,

    #[serde(default, alias = "Format")]
    pub format: OutputFormat,

    /// Image to attach to the next user message.
    #[serde(skip)]
    pub image_path: Option<PathBuf>,
}

impl Config {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub(crate) fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.model.trim().is_empty() {
            missing.push("model");
        }
        if self.prompt.trim().is_empty() {
            missing.push("prompt");
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "required fields missing: {}",
                missing.join(", ")
            )));
        }

        if self.context != 0 && !(MIN_CONTEXT..=MAX_CONTEXT).contains(&self.context) {
            return Err(Error::ContextSize {
                min: MIN_CONTEXT,
                max: MAX_CONTEXT,
                got: self.context,
            });
        }
        if let Some(t) = self.temperature {
            check_range("temperature", t, 0.0, 2.0)?;
        }
        if let Some(p) = self.top_p {
            check_range("top_p", p, 0.0, 1.0)?;
        }
        Ok(())
    }

    /// Apply a parsed `/set` value. Ranges are checked before mutation.
    pub(crate) fn apply(&mut self, setting: Setting) -> Result<()> {
        match setting {
            Setting::Model(model) => {
                if model.is_empty() {
                    return Err(Error::Config("model must not be empty".into()));
                }
                self.model = model;
            }
            Setting::Context(n) => {
                if !(MIN_CONTEXT..=MAX_CONTEXT).contains(&n) {
                    return Err(Error::ContextSize {
                        min: MIN_CONTEXT,
                        max: MAX_CONTEXT,
                        got: n,
                    });
                }
                self.context = n;
            }
            Setting::Temperature(t) => {
                check_range("temperature", t, 0.0, 2.0)?;
                self.temperature = Some(t);
            }
            Setting::TopP(p) => {
                check_range("top_p", p, 0.0, 1.0)?;
                self.top_p = Some(p);
            }
            Setting::Reasoning(enabled) => self.reasoning = enabled,
        }
        Ok(())
    }

    /// Current values of all settable keys, for display.
    pub(crate) fn settings(&self) -> Vec<(&'static str, String)> {
        fn opt(v: Option<f64>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "default".to_string())
        }

        vec![
            ("model", self.model.clone()),
            ("context", self.context.to_string()),
            ("temperature", opt(self.temperature)),
            ("top_p", opt(self.top_p)),
            ("reasoning", self.reasoning.to_string()),
        ]
    }
}

fn check_range(key: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(Error::Config(format!(
            "{key} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

/// A key that can be changed at runtime with `/set key=value`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Setting {
    Model(String),
    Context(usize),
    Temperature(f64),
    TopP(f64),
    Reasoning(bool),
}

impl Setting {
    pub(crate) const KEYS: &'static [&'static str] =
        &["model", "context", "temperature", "top_p", "reasoning"];

    pub(crate) fn parse(input: &str) -> Result<Self> {
        let Some((key, value)) = input.split_once('=') else {
            return Err(Error::Config(format!(
                "expected key=value, got '{input}'"
            )));
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        let invalid = |kind: &str| Error::Config(format!("{key}: '{value}' is not a valid {kind}"));

        match key.as_str() {
            "model" => Ok(Setting::Model(value.to_string())),
            "context" => value
                .parse()
                .map(Setting::Context)
                .map_err(|_| invalid("number")),
            "temperature" => value
                .parse()
                .map(Setting::Temperature)
                .map_err(|_| invalid("number")),
            "top_p" | "topp" => value
                .parse()
                .map(Setting::TopP)
                .map_err(|_| invalid("number")),
            "reasoning" => match value.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(Setting::Reasoning(true)),
                "false" | "off" | "no" | "0" => Ok(Setting::Reasoning(false)),
                _ => Err(invalid("boolean")),
            },
            _ => Err(Error::Config(format!(
                "unknown key '{key}', expected one of: {}",
                Self::KEYS.join(", ")
            ))),
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Model(v) => write!(f, "model = {v}"),
            Setting::Context(v) => write!(f, "context = {v}"),
            Setting::Temperature(v) => write!(f, "temperature = {v}"),
            Setting::TopP(v) => write!(f, "top_p = {v}"),
            Setting::Reasoning(v) => write!(f, "reasoning = {v}"),
        }
    }
}

/// Resolve the configuration directory from its candidate sources, in
/// priority order.
fn resolve_config_dir(
    config_path: Option<OsString>,
    xdg_config_home: Option<OsString>,
    home: Option<PathBuf>,
    exe: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(dir) = config_path.filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    if let Some(xdg) = xdg_config_home.filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(xdg).join(APP_DIR));
    }
    if let Some(home) = home {
        return Some(home.join(".config").join(APP_DIR));
    }
    exe.and_then(|exe| exe.parent().map(Path::to_path_buf))
}

pub(crate) fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(
        env::var_os("CONFIG_PATH"),
        env::var_os("XDG_CONFIG_HOME"),
        dirs::home_dir(),
        env::current_exe().ok(),
    )
    .ok_or_else(|| Error::Config("no usable configuration directory found".into()))
}

/// Path of the configuration file. `arg` is the value of `--config`.
pub(crate) fn config_file(dir: &Path, arg: Option<&str>) -> PathBuf {
    match arg {
        Some(arg) => match arg.strip_prefix('@') {
            Some(name) if name.ends_with(".toml") => dir.join(name),
            Some(name) => dir.join(format!("{name}.toml")),
            None => PathBuf::from(arg),
        },
        None => dir.join(CONFIG_FILE),
    }
}

pub(crate) fn history_dir(dir: &Path) -> PathBuf {
    dir.join(HISTORY_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
url = "http://localhost:11434"
model = "llama3"
prompt = "You are a helpful assistant."
"#;

    #[test]
    fn test_parse_minimal() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.url, "http://localhost:11434");
        assert_eq!(config.context, 0);
        assert_eq!(config.temperature, None);
        assert!(!config.reasoning);
        assert_eq!(config.format, OutputFormat::Plain);
    }

    #[test]
    fn test_parse_capitalized_keys() {
        let config = Config::parse(
            r#"
URL = "http://host:11434/api"
Model = "qwen3"
Prompt = "Be brief."
Context = 20
Temperature = 0.7
TopP = 0.9
Reasoning = true
Quiet = true
"#,
        )
        .unwrap();
        assert_eq!(config.model, "qwen3");
        assert_eq!(config.context, 20);
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.top_p, Some(0.9));
        assert!(config.reasoning);
        assert!(config.quiet);
    }

    #[test]
    fn test_missing_required_fields() {
        let err = Config::parse("url = \"http://x\"\nmodel = \"\"\nprompt = \"p\"").unwrap_err();
        assert!(err.to_string().contains("model"));

        assert!(Config::parse("url = \"http://x\"").is_err());
    }

    #[test]
    fn test_ranges_are_validated() {
        let bad_context = format!("{MINIMAL}context = 2\n");
        assert!(matches!(
            Config::parse(&bad_context),
            Err(Error::ContextSize { got: 2, .. })
        ));

        let bad_temp = format!("{MINIMAL}temperature = 3.5\n");
        assert!(Config::parse(&bad_temp).is_err());

        let bad_top_p = format!("{MINIMAL}top_p = -0.1\n");
        assert!(Config::parse(&bad_top_p).is_err());
    }

    #[test]
    fn test_setting_parse() {
        assert_eq!(
            Setting::parse("model = mistral").unwrap(),
            Setting::Model("mistral".into())
        );
        assert_eq!(Setting::parse("context=12").unwrap(), Setting::Context(12));
        assert_eq!(Setting::parse("TopP=0.5").unwrap(), Setting::TopP(0.5));
        assert_eq!(
            Setting::parse("reasoning=off").unwrap(),
            Setting::Reasoning(false)
        );
        assert!(Setting::parse("context=many").is_err());
        assert!(Setting::parse("color=blue").is_err());
        assert!(Setting::parse("model").is_err());
    }

    #[test]
    fn test_apply_checks_ranges_before_mutation() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.apply(Setting::Temperature(1.2)).unwrap();
        assert_eq!(config.temperature, Some(1.2));

        assert!(config.apply(Setting::Temperature(9.0)).is_err());
        assert_eq!(config.temperature, Some(1.2));

        assert!(config.apply(Setting::Context(101)).is_err());
        assert_eq!(config.context, 0);

        config.apply(Setting::Reasoning(true)).unwrap();
        assert!(config.reasoning);
    }

    #[test]
    fn test_resolve_config_dir_priority() {
        let home = Some(PathBuf::from("/home/me"));
        let exe = Some(PathBuf::from("/opt/picochat/bin/picochat"));

        assert_eq!(
            resolve_config_dir(
                Some("/etc/pc".into()),
                Some("/xdg".into()),
                home.clone(),
                exe.clone()
            ),
            Some(PathBuf::from("/etc/pc"))
        );
        assert_eq!(
            resolve_config_dir(None, Some("/xdg".into()), home.clone(), exe.clone()),
            Some(PathBuf::from("/xdg/picochat"))
        );
        assert_eq!(
            resolve_config_dir(Some("".into()), None, home.clone(), exe.clone()),
            Some(PathBuf::from("/home/me/.config/picochat"))
        );
        assert_eq!(
            resolve_config_dir(None, None, None, exe),
            Some(PathBuf::from("/opt/picochat/bin"))
        );
        assert_eq!(resolve_config_dir(None, None, None, None), None);
    }

    #[test]
    fn test_config_file() {
        let dir = Path::new("/cfg");
        assert_eq!(config_file(dir, None), PathBuf::from("/cfg/config.toml"));
        assert_eq!(
            config_file(dir, Some("@work")),
            PathBuf::from("/cfg/work.toml")
        );
        assert_eq!(
            config_file(dir, Some("@work.toml")),
            PathBuf::from("/cfg/work.toml")
        );
        assert_eq!(
            config_file(dir, Some("./local.toml")),
            PathBuf::from("./local.toml")
        );
        assert_eq!(history_dir(dir), PathBuf::from("/cfg/history"));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        assert!(Config::load(&path).unwrap_err().to_string().contains("config.toml"));

        fs::write(&path, MINIMAL).unwrap();
        assert_eq!(Config::load(&path).unwrap().model, "llama3");
    }
}

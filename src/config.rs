// ABOUTME: TOML configuration for output locations, schema versions and the formatter
// ABOUTME: Every field has a default so an absent or partial file is valid

use crate::paste::FormatOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "npconv.toml";

/// Placeholder in `formatter.args` replaced by the generated options file
pub const CONFIG_PLACEHOLDER: &str = "{config}";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub backup: BackupConfig,
    pub formatter: FormatterConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BackupConfig {
    /// Directory that receives converted and merged images
    pub output_dir: PathBuf,
    /// `user_version` stamped on freshly built NewPipe images
    pub newpipe_user_version: i64,
    /// `user_version` stamped on freshly built LibreTube images, if any
    pub libretube_user_version: Option<i64>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            newpipe_user_version: 9,
            libretube_user_version: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FormatterConfig {
    /// Executable name or path of the Markdown formatter
    pub command: String,
    /// Arguments passed to the formatter; `{config}` is substituted
    pub args: Vec<String>,
    pub options: FormatOptions,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            command: "hongdown".to_string(),
            args: vec![
                "--stdin".to_string(),
                "--config".to_string(),
                CONFIG_PLACEHOLDER.to_string(),
            ],
            options: FormatOptions::default(),
        }
    }
}

/// Parse configuration from TOML text
pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).context("Failed to parse configuration")
}

/// Load configuration
///
/// With an explicit path the file must exist. Without one,
/// `npconv.toml` in the working directory is used when present and the
/// built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default_path.exists() {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                return Ok(Config::default());
            }
            default_path
        }
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = parse_config(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backup.newpipe_user_version, 9);
        assert_eq!(config.formatter.command, "hongdown");
        assert!(config.formatter.args.iter().any(|a| a == CONFIG_PLACEHOLDER));
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config = parse_config(
            r#"
            [backup]
            output_dir = "/tmp/out"

            [formatter.options]
            line_width = 80
            em_dash = true
            "#,
        )
        .unwrap();

        assert_eq!(config.backup.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.backup.newpipe_user_version, 9);
        assert_eq!(config.formatter.options.line_width, 80);
        assert!(config.formatter.options.em_dash);
        assert_eq!(config.formatter.options.indent_width, 4);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(parse_config("[backup]\noutput_directory = \"x\"\n").is_err());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let result = load_config(Some(Path::new("/nonexistent/npconv.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backup]\nlibretube_user_version = 21").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.backup.libretube_user_version, Some(21));
    }
}

// ABOUTME: Markdown formatter seam and the external hongdown-backed implementation
// ABOUTME: Options are explicit fields written to a temp config file for the formatter

use crate::config::{FormatterConfig, CONFIG_PLACEHOLDER};
use crate::error::ConversionError;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Formatting options passed to the Markdown formatter
///
/// Defaults keep the text as close to the paste as possible: effectively no
/// wrapping, ATX headings, backtick fences, and no typographic substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatOptions {
    pub line_width: u32,
    pub setext_h1: bool,
    pub setext_h2: bool,
    pub fence_char: char,
    pub min_fence_length: u32,
    pub space_after_fence: bool,
    pub thematic_break_style: String,
    pub thematic_break_leading_spaces: u32,
    pub indent_width: u32,
    pub curly_double_quotes: bool,
    pub curly_single_quotes: bool,
    pub curly_apostrophes: bool,
    pub ellipsis: bool,
    pub en_dash: bool,
    pub em_dash: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            line_width: 9999,
            setext_h1: false,
            setext_h2: false,
            fence_char: '`',
            min_fence_length: 3,
            space_after_fence: false,
            thematic_break_style: "-----".to_string(),
            thematic_break_leading_spaces: 0,
            indent_width: 4,
            curly_double_quotes: false,
            curly_single_quotes: false,
            curly_apostrophes: false,
            ellipsis: false,
            en_dash: false,
            em_dash: false,
        }
    }
}

/// Formatter output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub output: String,
    pub warnings: Vec<String>,
}

/// Formats Markdown text
pub trait MarkdownFormatter: Send + Sync {
    fn format(&self, text: &str, options: &FormatOptions) -> Result<Formatted>;
}

/// Formatter that runs an external executable
///
/// Text goes in on stdin, formatted text comes back on stdout, and each
/// non-empty stderr line is a warning.
#[derive(Debug, Clone)]
pub struct ExternalFormatter {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalFormatter {
    /// Locate the configured formatter executable
    ///
    /// # Errors
    ///
    /// Returns `EngineLoadFailure` if the executable is not found in PATH.
    pub fn locate(config: &FormatterConfig) -> std::result::Result<Self, ConversionError> {
        let program = which::which(&config.command).map_err(|e| {
            ConversionError::EngineLoadFailure(format!(
                "Markdown formatter '{}' not found: {}\n\
                 \n\
                 Install it with: cargo install hongdown\n\
                 or point [formatter] command in npconv.toml at another executable",
                config.command, e
            ))
        })?;
        tracing::info!("✓ Markdown formatter ready ({})", program.display());
        Ok(Self {
            program,
            args: config.args.clone(),
        })
    }

    fn build_args(&self, config_path: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(CONFIG_PLACEHOLDER, config_path))
            .collect()
    }
}

impl MarkdownFormatter for ExternalFormatter {
    fn format(&self, text: &str, options: &FormatOptions) -> Result<Formatted> {
        let mut options_file = tempfile::Builder::new()
            .prefix("npconv-format-")
            .suffix(".toml")
            .tempfile()
            .context("Failed to create formatter options file")?;
        let rendered = toml::to_string(options).context("Failed to serialize format options")?;
        options_file
            .write_all(rendered.as_bytes())
            .context("Failed to write formatter options file")?;

        let config_path = options_file.path().to_string_lossy().into_owned();
        let args = self.build_args(&config_path);
        tracing::debug!("Running {} {:?}", self.program.display(), args);

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;

        // Feed stdin from a separate thread so a large stdout cannot block us
        let mut stdin = child.stdin.take().context("Formatter stdin unavailable")?;
        let input = text.to_string();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .context("Failed to wait for formatter")?;
        let sent = writer
            .join()
            .map_err(|_| anyhow::anyhow!("Formatter input thread panicked"))?;

        // A formatter that exits early closes its stdin; its own error comes first
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            bail!(
                "Formatter exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        let mut warnings: Vec<String> = stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        match sent {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                tracing::warn!("⚠ Formatter stopped reading its input early");
                warnings.push("formatter did not read the whole input".to_string());
            }
            Err(e) => return Err(e).context("Failed to send text to formatter"),
        }

        Ok(Formatted {
            output: String::from_utf8(output.stdout).context("Formatter output is not UTF-8")?,
            warnings,
        })
    }
}

// ABOUTME: One paste operation: extract images, decode them, optionally format the text
// ABOUTME: Undecodable images are skipped with a warning instead of failing the paste

use super::{decode_image, extract_images, image_file_name, DecodedImage, Formatted};
use crate::session::Session;
use crate::utils::sanitize_for_display;
use anyhow::{Context, Result};

/// An extracted image ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub label: String,
    pub file_name: String,
    pub image: DecodedImage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteOutput {
    pub text: String,
    pub images: Vec<SavedImage>,
    /// Labels whose payload did not decode
    pub skipped: Vec<String>,
    /// Formatter warnings, empty when not formatting
    pub warnings: Vec<String>,
}

/// Process pasted Markdown
///
/// With `format` set, the cleaned text goes through the session's Markdown
/// formatter using the configured options. Empty input produces empty
/// output without touching the formatter.
pub async fn process_paste(session: &Session, pasted: &str, format: bool) -> Result<PasteOutput> {
    let _operation = session.begin_operation().await;

    let extraction = extract_images(pasted);
    let mut output = PasteOutput::default();

    for embedded in extraction.images {
        let label = sanitize_for_display(&embedded.label);
        match decode_image(&embedded.base64_data) {
            Some(image) => {
                tracing::debug!("Decoded {} ({}, {} bytes)", label, image.kind.mime_type(), image.bytes.len());
                output.images.push(SavedImage {
                    file_name: image_file_name(&embedded.label, image.kind),
                    label: embedded.label,
                    image,
                });
            }
            None => {
                tracing::warn!("⚠ Skipping image '{}': payload is not valid base64", label);
                output.skipped.push(embedded.label);
            }
        }
    }

    if format && !extraction.cleaned.is_empty() {
        let formatter = session.formatter().await?;
        let options = session.config().formatter.options.clone();
        let text = extraction.cleaned.clone();
        let Formatted { output: formatted, warnings } =
            tokio::task::spawn_blocking(move || formatter.format(&text, &options))
                .await
                .context("Formatter task failed")??;
        for warning in &warnings {
            tracing::warn!("Formatter: {}", warning);
        }
        output.text = formatted;
        output.warnings = warnings;
    } else {
        output.text = extraction.cleaned;
    }

    tracing::info!(
        "✓ Processed paste: {} image(s), {} skipped",
        output.images.len(),
        output.skipped.len()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::paste::{FormatOptions, ImageKind, MarkdownFormatter};
    use std::sync::Arc;

    struct Shouting;

    impl MarkdownFormatter for Shouting {
        fn format(&self, text: &str, options: &FormatOptions) -> Result<Formatted> {
            Ok(Formatted {
                output: text.to_uppercase(),
                warnings: vec![format!("line width {}", options.line_width)],
            })
        }
    }

    const PASTE: &str = "# Notes\r\n\r\n![][image1]\r\n\r\n\r\nText\r\n\r\n\
                         [image1]: <data:image/png;base64,iVBORw0KGgo=>\r\n\
                         [image2]: <data:image/gif;base64,R0lGODlh>";

    #[tokio::test]
    async fn test_images_are_separated_from_text() {
        let session = Session::new(Config::default());
        let output = process_paste(&session, PASTE, false).await.unwrap();
        assert_eq!(output.text, "# Notes\n\nText");
        assert_eq!(output.images.len(), 2);
        assert_eq!(output.images[0].file_name, "image1.png");
        assert_eq!(output.images[1].image.kind, ImageKind::Gif);
        assert!(output.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_formatting_uses_configured_options() {
        let session = Session::with_formatter(Config::default(), Arc::new(Shouting));
        let output = process_paste(&session, PASTE, true).await.unwrap();
        assert_eq!(output.text, "# NOTES\n\nTEXT");
        assert_eq!(output.warnings, vec!["line width 9999".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_paste_skips_formatter() {
        let mut config = Config::default();
        config.formatter.command = "npconv-no-such-formatter".to_string();
        let session = Session::new(config);
        let output = process_paste(&session, "  \n ", true).await.unwrap();
        assert_eq!(output, PasteOutput::default());
    }
}

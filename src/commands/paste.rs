// ABOUTME: Paste command: reads pasted Markdown, saves its images and writes the cleaned text
// ABOUTME: Input defaults to stdin and output to stdout so the command works in a pipe

use crate::paste::{process_paste, PasteOutput};
use crate::session::Session;
use crate::utils::{unique_path, write_atomically};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Debug, Clone, Default)]
pub struct PasteArgs {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Images are only saved when a directory is given
    pub images_dir: Option<PathBuf>,
    pub format: bool,
}

async fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Save each decoded image under a free name in `dir`
fn save_images(dir: &std::path::Path, output: &PasteOutput) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create images directory {}", dir.display()))?;
    output
        .images
        .iter()
        .map(|saved| {
            let path = unique_path(dir, &saved.file_name);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| saved.file_name.clone());
            write_atomically(dir, &name, &saved.image.bytes)
        })
        .collect()
}

/// Process a paste and write its outputs
pub async fn paste(session: &Session, args: PasteArgs) -> Result<PasteOutput> {
    let pasted = read_input(args.input.as_ref()).await?;
    if pasted.trim().is_empty() {
        tracing::warn!("⚠ Input is empty, nothing to process");
    }

    let output = process_paste(session, &pasted, args.format).await?;

    match &args.images_dir {
        Some(dir) => {
            let paths = save_images(dir, &output)?;
            for path in &paths {
                tracing::info!("✓ Saved {}", path.display());
            }
        }
        None if !output.images.is_empty() => {
            tracing::info!(
                "{} image(s) found; pass --images-dir to save them",
                output.images.len()
            );
        }
        None => {}
    }

    let mut text = output.text.clone();
    if !text.is_empty() {
        text.push('\n');
    }

    match &args.output {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .with_context(|| format!("Output path {} has no file name", path.display()))?
                .to_string_lossy()
                .into_owned();
            write_atomically(&dir, &name, text.as_bytes())?;
            tracing::info!("✓ Wrote cleaned text to {}", path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(text.as_bytes())
                .await
                .context("Failed to write stdout")?;
            stdout.flush().await.context("Failed to flush stdout")?;
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_paste_writes_text_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pasted.md");
        std::fs::write(
            &input,
            "Hello ![][image1]\n\n[image1]: <data:image/png;base64,iVBORw0KGgo=>",
        )
        .unwrap();
        let images = dir.path().join("images");
        let output = dir.path().join("clean.md");

        let session = Session::new(Config::default());
        let result = paste(
            &session,
            PasteArgs {
                input: Some(input),
                output: Some(output.clone()),
                images_dir: Some(images.clone()),
                format: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(result.images.len(), 1);
        assert_eq!(std::fs::read_to_string(output).unwrap(), "Hello\n");
        assert_eq!(
            std::fs::read(images.join("image1.png")).unwrap(),
            [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']
        );
    }

    #[tokio::test]
    async fn test_existing_image_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pasted.md");
        std::fs::write(&input, "[image1]: <data:image/gif;base64,R0lGODlh>").unwrap();
        std::fs::write(dir.path().join("image1.gif"), b"keep").unwrap();

        let session = Session::new(Config::default());
        paste(
            &session,
            PasteArgs {
                input: Some(input),
                output: Some(dir.path().join("out.md")),
                images_dir: Some(dir.path().to_path_buf()),
                format: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(dir.path().join("image1.gif")).unwrap(), b"keep");
        assert!(dir.path().join("image1-1.gif").exists());
    }
}

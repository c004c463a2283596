// ABOUTME: Decoding of extracted base64 images and sniffing of their type
// ABOUTME: Unknown payloads default to PNG, undecodable payloads are skipped

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Standard alphabet that tolerates missing padding, like a browser's atob
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
}

impl ImageKind {
    /// Sniff the type from the start of the base64 payload
    pub fn sniff(base64_data: &str) -> Self {
        if base64_data.starts_with("/9j/") {
            ImageKind::Jpeg
        } else if base64_data.starts_with("R0lGOD") {
            ImageKind::Gif
        } else {
            ImageKind::Png
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

/// Decode a base64 payload into image bytes
///
/// Whitespace inside the payload is ignored. Returns `None` when the
/// payload is not valid base64.
pub fn decode_image(base64_data: &str) -> Option<DecodedImage> {
    let clean: String = base64_data.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = FORGIVING.decode(clean.as_bytes()).ok()?;
    Some(DecodedImage {
        kind: ImageKind::sniff(&clean),
        bytes,
    })
}

/// File name for an extracted image, derived from its label
pub fn image_file_name(label: &str, kind: ImageKind) -> String {
    let stem: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "image".to_string() } else { stem };
    format!("{}.{}", stem, kind.extension())
}

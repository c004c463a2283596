// ABOUTME: Extraction of base64 image reference definitions from pasted Markdown
// ABOUTME: Returns the images by label together with the text stripped of image markup

use regex::Regex;
use std::sync::LazyLock;

/// `[label]: <data:image/png;base64,....>`
static REFERENCE_DEFINITION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]:\s*<[^>]*base64,[^>]+>").expect("Invalid reference definition regex")
});

static BASE64_PAYLOAD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"base64,([A-Za-z0-9+/=]+)").expect("Invalid base64 payload regex"));

/// `![][label]` and `![alt][label]`
static INLINE_REFERENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\[[^\]]*\]").expect("Invalid inline reference regex"));

static EXCESS_NEWLINES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid newline regex"));

/// An image found in a reference definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub label: String,
    /// Raw base64 payload, not yet decoded
    pub base64_data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub images: Vec<EmbeddedImage>,
    pub cleaned: String,
}

/// Separate embedded images from pasted Markdown
///
/// Every base64 reference definition is collected and replaced by a
/// newline, and every inline image reference is replaced by a newline so
/// the surrounding text is not glued together. CRLF becomes LF, runs of
/// three or more newlines collapse to one blank line, and the result is
/// trimmed.
///
/// # Examples
///
/// ```
/// # use npconv::paste::extract_images;
/// let pasted = "Intro ![][image1] outro\n\n[image1]: <data:image/png;base64,iVBORw0KGgo=>";
/// let extraction = extract_images(pasted);
/// assert_eq!(extraction.images[0].label, "image1");
/// assert_eq!(extraction.images[0].base64_data, "iVBORw0KGgo=");
/// assert_eq!(extraction.cleaned, "Intro \n outro");
/// ```
pub fn extract_images(markdown: &str) -> Extraction {
    let text = markdown.trim();
    if text.is_empty() {
        return Extraction::default();
    }

    let images = REFERENCE_DEFINITION_REGEX
        .captures_iter(text)
        .filter_map(|captures| {
            let full = captures.get(0)?.as_str();
            let label = captures.get(1)?.as_str();
            let payload = BASE64_PAYLOAD_REGEX.captures(full)?.get(1)?.as_str();
            Some(EmbeddedImage {
                label: label.to_string(),
                base64_data: payload.to_string(),
            })
        })
        .collect();

    let cleaned = REFERENCE_DEFINITION_REGEX.replace_all(text, "\n");
    let cleaned = INLINE_REFERENCE_REGEX.replace_all(&cleaned, "\n");
    let cleaned = cleaned.replace("\r\n", "\n");
    let cleaned = EXCESS_NEWLINES_REGEX.replace_all(&cleaned, "\n\n");

    Extraction {
        images,
        cleaned: cleaned.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_empty_input() {
        assert_eq!(extract_images("   \n  "), Extraction::default());
    }

    #[test]
    fn test_text_without_images_is_untouched() {
        let extraction = extract_images("# Title\n\nSome *text*.");
        assert!(extraction.images.is_empty());
        assert_eq!(extraction.cleaned, "# Title\n\nSome *text*.");
    }

    #[test]
    fn test_collects_every_definition_in_order() {
        let pasted = format!(
            "A\n\n![][image1]\n\nB\n\n![diagram][image2]\n\n[image1]: <data:image/png;base64,{png}>\n\n[image2]: <data:image/jpeg;base64,/9j/4AAQ>\n",
            png = PNG
        );
        let extraction = extract_images(&pasted);

        let labels: Vec<_> = extraction.images.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["image1", "image2"]);
        assert_eq!(extraction.images[0].base64_data, PNG);
        assert_eq!(extraction.images[1].base64_data, "/9j/4AAQ");
        assert_eq!(extraction.cleaned, "A\n\nB");
    }

    #[test]
    fn test_normalizes_crlf_and_blank_runs() {
        let pasted = "One\r\n\r\n\r\n\r\nTwo ![][x] three\r\n[x]: <data:image/gif;base64,R0lGODlh>";
        let extraction = extract_images(pasted);
        assert_eq!(extraction.images.len(), 1);
        assert_eq!(extraction.cleaned, "One\n\nTwo \n three");
    }

    #[test]
    fn test_non_image_reference_links_survive() {
        let pasted = "See [docs][d].\n\n[d]: <https://example.com/docs>";
        let extraction = extract_images(pasted);
        assert!(extraction.images.is_empty());
        assert!(extraction.cleaned.contains("[d]: <https://example.com/docs>"));
    }
}

// ABOUTME: Paste processor for Markdown copied out of Google Docs
// ABOUTME: Splits embedded base64 images from the text and optionally reformats the text

pub mod extract;
pub mod formatter;
pub mod image;
pub mod process;

pub use extract::{extract_images, EmbeddedImage, Extraction};
pub use formatter::{ExternalFormatter, FormatOptions, Formatted, MarkdownFormatter};
pub use image::{decode_image, image_file_name, DecodedImage, ImageKind};
pub use process::{process_paste, PasteOutput, SavedImage};

//! Managed copies of user-supplied files, currently only the business logo.
//!
//! Assets are referenced as `media://<file>`. Only the basename of a reference is ever used to
//! locate the file, so a reference cannot point outside the uploads directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose};
use chrono::Utc;
use tracing::info;

use crate::error::AddContext;

/// Scheme prefix of every asset reference.
pub const MEDIA_SCHEME: &str = "media://";

/// Copy `source` into `uploads_dir` as `<unix-millis>_<basename>` and return its reference.
///
/// `uploads_dir` is created if it does not exist yet.
pub fn save_asset(source: &Path, uploads_dir: &Path) -> Result<String, crate::Error> {
    let context = format!("saving asset '{}'", source.display());
    let basename = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| crate::Error::from(String::from("source has no file name")))
        .add_context(&context)?;

    fs::create_dir_all(uploads_dir)
        .map_err(crate::Error::from)
        .add_context("creating uploads directory")
        .add_context(&context)?;

    let file_name = format!("{}_{}", Utc::now().timestamp_millis(), basename);
    fs::copy(source, uploads_dir.join(&file_name))
        .map_err(crate::Error::from)
        .add_context("copying file")
        .add_context(&context)?;

    info!(asset = %file_name, "saved asset");
    Ok(format!("{MEDIA_SCHEME}{file_name}"))
}

/// Map a `media://` reference to its file inside `uploads_dir`.
///
/// Any directory components in the reference are discarded.
pub fn resolve_asset(reference: &str, uploads_dir: &Path) -> Result<PathBuf, crate::Error> {
    let raw = reference.strip_prefix(MEDIA_SCHEME).unwrap_or(reference);
    let basename = Path::new(raw)
        .file_name()
        .ok_or_else(|| crate::Error::from(format!("'{reference}' does not name a file")))
        .add_context("resolving asset")?;
    Ok(uploads_dir.join(basename))
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Read the referenced asset and encode it as a base64 `data:` URL, so a rendered page carries
/// the image with it when loaded in a browser that cannot see the uploads directory.
pub fn asset_data_url(reference: &str, uploads_dir: &Path) -> Result<String, crate::Error> {
    let path = resolve_asset(reference, uploads_dir)?;
    let bytes = fs::read(&path)
        .map_err(crate::Error::from)
        .add_context(&format!("reading asset '{}'", path.display()))?;
    let encoded = general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{encoded}", mime_type(&path)))
}

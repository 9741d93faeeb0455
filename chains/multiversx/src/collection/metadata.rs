//! Metadata file name extraction from item attributes
//!
//! Attributes are a base64 string such as `tags:art,rare;metadata:QmHash/7.json`.
//! The file name is the part after the folder, without extension: `7`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Derives the metadata file name from base64 attributes.
///
/// Returns an empty string when attributes are missing, not base64, or carry
/// no segment mentioning `metadata`.
pub fn metadata_file_name(attributes: Option<&str>) -> String {
    attributes
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .map(|bytes| file_name_from_decoded(&String::from_utf8_lossy(&bytes)))
        .unwrap_or_default()
}

fn file_name_from_decoded(decoded: &str) -> String {
    let Some(segment) = decoded.split(';').find(|s| s.contains("metadata")) else {
        return String::new();
    };

    // `metadata:<folder>/<file>.<ext>`
    let Some((_, path)) = segment.split_once('/') else {
        return String::new();
    };

    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, _ext)) => stem.to_string(),
        None => file.to_string(),
    }
}

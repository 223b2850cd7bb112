// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Decides whether a new file is a screenshot worth answering

use image::ImageFormat;
use std::path::Path;

/// Lowercase filename prefixes used by common screenshot tools
const SCREENSHOT_PREFIXES: &[&str] = &["screenshot", "screen shot", "screen"];

/// Formats every provider accepts as inline image input
const SUPPORTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Media type inferred from the file extension, only for supported image formats
pub fn mime_type(path: &Path) -> Option<&'static str> {
    ImageFormat::from_path(path)
        .ok()
        .filter(|f| SUPPORTED_FORMATS.contains(f))
        .map(|f| f.to_mime_type())
        .filter(|m| m.starts_with("image/"))
}

/// Name and media type check, applied as soon as a file appears
pub fn is_screenshot(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    if mime_type(path).is_none() {
        return false;
    }

    let lower = filename.to_lowercase();
    SCREENSHOT_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Full check, applied after the file has had time to settle
pub fn is_candidate(path: &Path, size_bytes: u64) -> bool {
    size_bytes > 0 && is_screenshot(path)
}

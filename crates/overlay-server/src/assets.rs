//! Static asset lookup for the overlay document and its resources.

use jamdeck_core::ASSETS_DIR_ENV;
use std::path::{Component, Path, PathBuf};

/// File served for `/` (and `/index.html`).
pub const OVERLAY_DOCUMENT: &str = "overlay.html";

/// Where the overlay's static files live: the `JAMDECK_ASSETS_DIR`
/// override, else `assets/` next to the executable, else `assets/` under
/// the working directory.
pub fn resolve_asset_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(ASSETS_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join("assets");
            if candidate.is_dir() {
                return candidate;
            }
        }
    }
    PathBuf::from("assets")
}

/// Map a request path to a relative file path under the asset root.
/// Returns `None` for anything that tries to leave the root (traversal,
/// absolute paths); those are treated as plain 404s.
pub fn sanitize_asset_path(request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed == "index.html" {
        return Some(PathBuf::from(OVERLAY_DOCUMENT));
    }
    let path = Path::new(trimmed);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            // "." is harmless but anything else escapes the root.
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    Some(clean)
}

/// Content type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        _ => "application/octet-stream",
    }
}

/// Cache policy: fonts and images are immutable-enough to cache hard; the
/// document, styles and scripts must re-fetch so overlay edits show up on
/// the next OBS refresh.
pub fn cache_control_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") | Some("jpg") | Some("jpeg") | Some("gif") | Some("svg") | Some("ico")
        | Some("webp") | Some("woff") | Some("woff2") | Some("ttf") | Some("otf") => {
            "public, max-age=31536000"
        }
        _ => "no-store, no-cache, must-revalidate",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_maps_to_overlay_document() {
        assert_eq!(
            sanitize_asset_path("/"),
            Some(PathBuf::from(OVERLAY_DOCUMENT))
        );
        assert_eq!(
            sanitize_asset_path("/index.html"),
            Some(PathBuf::from(OVERLAY_DOCUMENT))
        );
    }

    #[test]
    fn nested_asset_paths_pass_through() {
        assert_eq!(
            sanitize_asset_path("/fonts/overlay.woff2"),
            Some(PathBuf::from("fonts/overlay.woff2"))
        );
        assert_eq!(
            sanitize_asset_path("overlay.js"),
            Some(PathBuf::from("overlay.js"))
        );
    }

    #[test]
    fn traversal_is_rejected() {
        assert_eq!(sanitize_asset_path("/../etc/passwd"), None);
        assert_eq!(sanitize_asset_path("/fonts/../../secret"), None);
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(
            content_type_for(Path::new("overlay.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(content_type_for(Path::new("a.woff2")), "font/woff2");
        assert_eq!(content_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(
            content_type_for(Path::new("mystery.bin")),
            "application/octet-stream"
        );
    }

    #[test]
    fn cache_policy_splits_assets_from_document() {
        assert_eq!(
            cache_control_for(Path::new("fonts/a.woff2")),
            "public, max-age=31536000"
        );
        assert_eq!(
            cache_control_for(Path::new("overlay.html")),
            "no-store, no-cache, must-revalidate"
        );
        assert_eq!(
            cache_control_for(Path::new("overlay.js")),
            "no-store, no-cache, must-revalidate"
        );
    }
}

//! File and path helpers

use std::path::{Path, PathBuf};

/// Longest file extension kept from an uploaded file name
const MAX_EXTENSION_LEN: usize = 10;

/// Expand a path string to an absolute path.
///
/// Handles `~` and `~/path` (home directory), relative paths resolved against
/// the current directory, and absolute paths passed through unchanged.
///
/// ```text
/// expand_path("~/.qatrack") // -> /home/user/.qatrack
/// expand_path("uploads")    // -> /current/dir/uploads
/// expand_path("/srv/data")  // -> /srv/data
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Extension for a stored upload, lowercased and free of path characters.
///
/// Taken from the client file name when it is short and alphanumeric,
/// otherwise guessed from the declared content type, preferring the
/// extension that matches the MIME subtype (`image/jpeg` -> `jpeg`).
pub fn upload_extension(file_name: Option<&str>, content_type: Option<&str>) -> Option<String> {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase());

    from_name.or_else(|| content_type.and_then(extension_for_mime))
}

fn extension_for_mime(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let exts = mime_guess::get_mime_extensions_str(essence)?;
    let subtype = essence.rsplit('/').next().unwrap_or_default();

    exts.iter()
        .find(|ext| ext.eq_ignore_ascii_case(subtype))
        .or_else(|| exts.first())
        .map(|ext| ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_path_relative_becomes_absolute() {
        let result = expand_path("uploads");
        assert!(result.is_absolute());
        assert!(result.ends_with("uploads"));
    }

    #[test]
    fn test_expand_path_tilde() {
        let result = expand_path("~/.qatrack");
        assert!(result.is_absolute());
        assert!(!result.to_string_lossy().contains('~'));
        assert!(result.ends_with(".qatrack"));
    }

    #[test]
    fn test_expand_path_trims_whitespace() {
        assert_eq!(expand_path("  /srv/data  "), PathBuf::from("/srv/data"));
    }

    #[test]
    fn test_upload_extension_from_file_name() {
        assert_eq!(
            upload_extension(Some("Screen Shot.PNG"), Some("image/png")).as_deref(),
            Some("png")
        );
    }

    #[test]
    fn test_upload_extension_rejects_path_tricks() {
        assert_eq!(upload_extension(Some("evil.p/hp"), None), None);
        assert_eq!(upload_extension(Some("noext"), None), None);
    }

    #[test]
    fn test_upload_extension_falls_back_to_content_type() {
        assert_eq!(
            upload_extension(Some("blob"), Some("image/jpeg")).as_deref(),
            Some("jpeg")
        );
        assert_eq!(
            upload_extension(None, Some("image/png; charset=binary")).as_deref(),
            Some("png")
        );
    }

    #[test]
    fn test_upload_extension_unknown_content_type() {
        assert_eq!(upload_extension(None, Some("application/x-nothing-known")), None);
        assert_eq!(upload_extension(None, None), None);
    }
}

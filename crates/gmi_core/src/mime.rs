//! Static extension → MIME type table.

/// Fallback when no type can be determined.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const EXTENSIONS: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("wav", "audio/wav"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("zip", "application/zip"),
];

/// Guess a MIME type from a file name, path or URI.
///
/// Query strings and fragments are ignored. Unknown or missing extensions
/// yield [`DEFAULT_MIME_TYPE`], so the result is never empty.
pub fn mime_from_name(name: &str) -> &'static str {
    let path = name.split(['?', '#']).next().unwrap_or(name);
    let file = path.rsplit('/').next().unwrap_or(path);

    let Some((stem, ext)) = file.rsplit_once('.') else {
        return DEFAULT_MIME_TYPE;
    };
    if stem.is_empty() {
        return DEFAULT_MIME_TYPE;
    }

    let ext = ext.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(mime_from_name("brief.pdf"), "application/pdf");
        assert_eq!(mime_from_name("notes.TXT"), "text/plain");
        assert_eq!(mime_from_name("/tmp/photo.jpeg"), "image/jpeg");
    }

    #[test]
    fn test_uri_with_query() {
        assert_eq!(
            mime_from_name("https://example.com/files/deck.pptx?sig=abc#p2"),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        );
    }

    #[test]
    fn test_unknown_falls_back() {
        assert_eq!(mime_from_name("archive.xyz"), DEFAULT_MIME_TYPE);
        assert_eq!(mime_from_name("README"), DEFAULT_MIME_TYPE);
        assert_eq!(mime_from_name(".bashrc"), DEFAULT_MIME_TYPE);
        assert_eq!(mime_from_name(""), DEFAULT_MIME_TYPE);
    }
}

//! Utility functions for artifact naming and directory handling

use crate::error::{Error, Result};
use crate::transport::io_context;
use std::path::Path;

/// Local file name for a manifest URL: the final path segment, percent-decoded
///
/// The query string and fragment never contribute to the name. URLs that are not absolute
/// (a bare path handed out by the API) are split on `/` directly.
///
/// # Examples
///
/// ```
/// use hawqs_builder::utils::artifact_file_name;
///
/// let name = artifact_file_name("https://api.example.com/files/42/hru%20data.csv?sig=abc").unwrap();
/// assert_eq!(name, "hru data.csv");
/// ```
pub fn artifact_file_name(url: &str) -> Result<String> {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default().to_string()
        }
    };

    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);

    // A decoded separator would escape the target directory
    if decoded.is_empty()
        || decoded == "."
        || decoded == ".."
        || decoded.contains('/')
        || decoded.contains('\\')
    {
        return Err(Error::protocol(
            format!("output URL has no usable file name: {}", url),
            url,
        ));
    }

    Ok(decoded)
}

/// Create a directory and its parents if they don't exist
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| io_context(e, "create directory", path))
}

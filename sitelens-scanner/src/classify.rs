use url::Url;

pub const HOMEPAGE: &str = "Homepage";
pub const OTHERS: &str = "Others";

/// Bucket a page URL by its top-level directory.
///
/// `/` or an empty path is `Homepage`, a single segment such as `/about`
/// is `Others`, anything deeper is named after its first segment
/// (`/blog/post` is `blog`). Unparseable input is classified from its raw
/// text as if it were a path.
pub fn top_level_directory(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };

    if path.is_empty() || path == "/" {
        return HOMEPAGE.to_string();
    }

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() <= 2 {
        return OTHERS.to_string();
    }

    parts
        .iter()
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| OTHERS.to_string())
}

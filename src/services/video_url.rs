//! Video page recognition and timestamp formatting.

/// URL fragments that identify a supported video page.
const VIDEO_URL_PATTERNS: [&str; 3] = ["youtube.com/watch", "youtu.be/", "youtube.com/embed/"];

/// Returns true if `url` points at a supported video page.
pub fn is_supported_video_url(url: &str) -> bool {
    VIDEO_URL_PATTERNS.iter().any(|pattern| url.contains(pattern))
}

/// Extracts the video identifier from a video page URL.
///
/// Understands the `v` query parameter, `/embed/<id>` paths and `youtu.be/<id>`
/// short links, in that order.
pub fn extract_video_id(url: &str) -> Option<String> {
    query_param(url, "v")
        .or_else(|| segment_after(url, "/embed/"))
        .or_else(|| segment_after(url, "youtu.be/"))
        .map(|id| clean_id(&id))
        .filter(|id| !id.is_empty())
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or("");
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

fn segment_after(url: &str, marker: &str) -> Option<String> {
    let start = url.find(marker)? + marker.len();
    let rest = &url[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(rest[..end].to_string()).filter(|s| !s.is_empty())
}

fn clean_id(id: &str) -> String {
    id.split(['&', '?', '#']).next().unwrap_or("").to_string()
}

/// Formats whole seconds as `M:SS`, or `H:MM:SS` from one hour up.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

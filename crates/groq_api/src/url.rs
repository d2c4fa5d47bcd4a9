/// Default base URL for Groq transport requests.
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com";

const ENDPOINT_SEGMENTS: [&str; 4] = ["openai", "v1", "chat", "completions"];

/// Completes a base URL into the chat completions endpoint.
///
/// Whatever leading part of `/openai/v1/chat/completions` the base path already
/// ends with is kept and only the missing segments are appended, so
/// `https://api.groq.com`, `.../openai` and `.../openai/v1` all resolve to the
/// same endpoint. A blank input falls back to [`DEFAULT_GROQ_BASE_URL`].
pub fn normalize_chat_completions_url(input: &str) -> String {
    let base = match input.trim().trim_end_matches('/') {
        "" => DEFAULT_GROQ_BASE_URL,
        trimmed => trimmed,
    };

    let mut url = base.to_string();
    for segment in &ENDPOINT_SEGMENTS[endpoint_segments_present(base)..] {
        url.push('/');
        url.push_str(segment);
    }
    url
}

fn endpoint_segments_present(base: &str) -> usize {
    let without_scheme = base.split_once("://").map_or(base, |(_, rest)| rest);
    // First segment is the authority.
    let path: Vec<&str> = without_scheme.split('/').skip(1).collect();

    (1..=ENDPOINT_SEGMENTS.len())
        .rev()
        .find(|&count| path.ends_with(&ENDPOINT_SEGMENTS[..count]))
        .unwrap_or(0)
}

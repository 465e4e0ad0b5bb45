use std::collections::HashSet;

pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "is", "are", "was", "were", "be", "been", "being", "that", "this",
    "with", "from", "have", "has", "had", "they", "their", "there", "than", "then", "into",
    "about", "which", "what", "when", "where", "will", "would",
];

/// Lowercased words longer than three characters that are not stop words, in text order.
pub fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

pub fn keyword_set(text: &str) -> HashSet<String> {
    keywords(text).into_iter().collect()
}

/// Four-digit tokens that read as years (1900 to 2099).
pub fn mentioned_years(text: &str) -> Vec<i32> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|t| t.len() == 4 && (t.starts_with("19") || t.starts_with("20")))
        .filter_map(|t| t.parse().ok())
        .collect()
}

/// Host of a URL without scheme, port, path or a leading `www.`.
pub fn url_host(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    let host = host.split(':').next().unwrap_or_default().to_lowercase();
    host.trim_start_matches("www.").to_string()
}

use crate::ranking::text::keywords;

/// Search queries for a claim: the claim itself, then its keywords when that differs.
pub fn build_queries(claim_text: &str, max_queries: usize) -> Vec<String> {
    let mut queries = Vec::with_capacity(2);

    let full = claim_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !full.is_empty() {
        queries.push(full);
    }

    let mut seen = std::collections::HashSet::new();
    let reduced = keywords(claim_text)
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect::<Vec<_>>()
        .join(" ");
    if !reduced.is_empty() && !queries.iter().any(|q| q.eq_ignore_ascii_case(&reduced)) {
        queries.push(reduced);
    }

    queries.truncate(max_queries.max(1));
    queries
}

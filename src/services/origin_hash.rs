use regex::Regex;
use std::sync::OnceLock;

fn trailer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\(cherry picked from commit ([0-9a-f]+)\)").expect("valid regex")
    })
}

/// Extracts the content-addressed origin hash of a commit from its body.
/// If `body` contains one or more `(cherry picked from commit <hex>)`
/// trailers, returns the hash from the last occurrence (the deepest relay
/// hop). Otherwise returns `hash` itself.
pub fn resolve_origin_hash(hash: &str, body: &str) -> String {
    trailer_pattern()
        .captures_iter(body)
        .last()
        .map(|caps| caps[1].to_lowercase())
        .unwrap_or_else(|| hash.to_string())
}

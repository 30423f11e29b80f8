/// Normalize a raw table cell into the domain form used everywhere else
pub fn normalize_domain(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Check the structural rules a takedown domain must satisfy.
///
/// A domain is malformed if it carries a scheme or a path, has no dot or an
/// empty label, starts or ends with a hyphen, or is shorter than 3 characters.
/// Every rule is checked; the result is true if any of them fires.
pub fn is_malformed(domain: &str) -> bool {
    domain.contains("http://")
        || domain.contains('/')
        || !domain.contains('.')
        || domain.contains("..")
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.chars().count() < 3
}

/// The label after the final dot; the whole string when there is no dot
pub fn tld_of(domain: &str) -> &str {
    domain.rsplit('.').next().unwrap_or(domain)
}

/// Normalize a TLD reference entry ("COM", ".com", " com ") to "com"
pub fn normalize_tld(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}

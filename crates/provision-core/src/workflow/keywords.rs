//! Keyword phrase cleanup before entry into the remote UI.

/// Normalize raw phrase lines into the newline-separated block the keyword
/// control expects.
///
/// Every input is split on line breaks; each line has surrounding whitespace
/// and quote characters (`"` and `'`) stripped; empty results are dropped;
/// exact duplicates keep their first occurrence. Applying the function to its
/// own output returns that output unchanged.
pub fn sanitize_keywords<S: AsRef<str>>(phrases: &[S]) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut kept: Vec<&str> = Vec::new();
    for raw in phrases {
        for line in raw.as_ref().lines() {
            let phrase = line.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');
            if phrase.is_empty() {
                continue;
            }
            if seen.insert(phrase) {
                kept.push(phrase);
            }
        }
    }
    kept.join("\n")
}

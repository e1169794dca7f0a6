use crate::text::stopwords::is_stop_word;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z]{3,}\b").expect("word pattern is a valid regex")
});

/// Extracts the most frequent keywords from page text
///
/// The text is lower-cased and split into whole words of at least three ASCII
/// letters. Words shorter than `min_length` and stop words are dropped, the
/// rest are counted and the `max_keywords` most frequent are returned.
/// Ties are broken alphabetically so the output is deterministic.
///
/// # Arguments
///
/// * `text` - Visible page text
/// * `min_length` - Minimum keyword length
/// * `max_keywords` - Maximum number of keywords returned
///
/// # Returns
///
/// `(keyword, frequency)` pairs, most frequent first
///
/// # Example
///
/// ```
/// use netsift::text::extract_keywords;
///
/// let keywords = extract_keywords("Router login. Router status and the router admin", 3, 2);
/// assert_eq!(keywords[0], ("router".to_string(), 3));
/// ```
pub fn extract_keywords(text: &str, min_length: usize, max_keywords: usize) -> Vec<(String, u32)> {
    let lowered = text.to_lowercase();

    let mut counts: HashMap<&str, u32> = HashMap::new();
    for word in WORD_PATTERN.find_iter(&lowered).map(|m| m.as_str()) {
        if word.len() < min_length || is_stop_word(word) {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }

    let mut keywords: Vec<(String, u32)> = counts
        .into_iter()
        .map(|(word, count)| (word.to_string(), count))
        .collect();
    keywords.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    keywords.truncate(max_keywords);
    keywords
}

//! Text processing shared by the crawler and the search engine
//!
//! - Keyword extraction from page text (per-page term frequency)
//! - The stop-word set
//! - Query tokenization

mod keywords;
mod stopwords;

pub use keywords::extract_keywords;
pub use stopwords::is_stop_word;

/// Splits a search query into lookup terms
///
/// Terms are whitespace-separated, lower-cased and stripped of surrounding
/// punctuation. Terms shorter than `min_length`, stop words and repeats are
/// dropped. Order of first appearance is preserved.
///
/// # Example
///
/// ```
/// use netsift::text::tokenize_query;
///
/// assert_eq!(tokenize_query("Apache, the SERVER apache", 3), vec!["apache", "server"]);
/// ```
pub fn tokenize_query(query: &str, min_length: usize) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();

    for raw in query.split_whitespace() {
        let term = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        if term.chars().count() < min_length || is_stop_word(&term) {
            continue;
        }
        if !terms.contains(&term) {
            terms.push(term);
        }
    }

    terms
}

//! Classifier collaborator contract
//!
//! Categorization itself lives outside this engine; the router only needs a
//! pure text-to-category function with a guaranteed `"general"` fallback.

use crate::types::GENERAL_CATEGORY;

/// Maps free text to a routing category
///
/// Implementations must be pure and must return a category from a fixed
/// closed set; [`GENERAL_CATEGORY`] is always a member of that set.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Classify `text` into a category
    fn classify(&self, text: &str) -> String;
}

/// Fallback classifier that files everything under the general category
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralClassifier;

impl Classifier for GeneralClassifier {
    fn classify(&self, _text: &str) -> String {
        GENERAL_CATEGORY.to_string()
    }
}

/// Keyword-table classifier
///
/// First matching keyword wins; unmatched text falls back to the general
/// category. Matching is case-insensitive on the haystack side.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    rules: Vec<(String, String)>,
}

impl KeywordClassifier {
    /// Create an empty keyword table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword-to-category rule
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, keyword: impl Into<String>, category: impl Into<String>) -> Self {
        self.rules
            .push((keyword.into().to_lowercase(), category.into()));
        self
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> String {
        let haystack = text.to_lowercase();
        self.rules
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword))
            .map(|(_, category)| category.clone())
            .unwrap_or_else(|| GENERAL_CATEGORY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_fallback() {
        let classifier = GeneralClassifier;
        assert_eq!(classifier.classify("anything at all"), GENERAL_CATEGORY);
    }

    #[test]
    fn keyword_rules() {
        let classifier = KeywordClassifier::new()
            .with_rule("invoice", "billing")
            .with_rule("password", "account");

        assert_eq!(classifier.classify("My INVOICE is wrong"), "billing");
        assert_eq!(classifier.classify("reset my password"), "account");
        assert_eq!(classifier.classify("hello"), GENERAL_CATEGORY);
    }
}

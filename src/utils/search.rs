// Thu Jan 16 2026 - Alex

use crate::memory::Address;
use regex::{Regex, RegexBuilder};

/// Visibility predicate over (name, class, address). Never changes the model.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    tokens: Vec<String>,
    pattern: Option<Regex>,
}

impl SearchFilter {
    /// Whitespace-separated tokens; a node matches when any token appears in it.
    pub fn new(query: &str) -> Self {
        Self {
            tokens: query.split_whitespace().map(str::to_lowercase).collect(),
            pattern: None,
        }
    }

    /// Case-insensitive regular expression over the same haystack.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            tokens: Vec::new(),
            pattern: Some(regex),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.pattern.is_none()
    }

    pub fn matches(&self, name: &str, class_name: &str, address: Address) -> bool {
        if self.is_empty() {
            return true;
        }
        let haystack = format!("{} {} 0x{:x}", name, class_name, address).to_lowercase();
        match &self.pattern {
            Some(regex) => regex.is_match(&haystack),
            None => self.tokens.iter().any(|token| haystack.contains(token.as_str())),
        }
    }
}

// Lexical fast-path matcher — the cheap gate in front of the classifier.
//
// A term list compiles into one case-insensitive, whole-word alternation.
// Compiled matchers are immutable; MatcherHandle swaps in a freshly built one
// atomically, so a concurrent `find` sees either the old list or the new one.

pub mod terms;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use regex::{Regex, RegexBuilder};

/// A compiled term list.
#[derive(Debug)]
pub struct TermMatcher {
    /// None when the term list is empty — matches nothing.
    pattern: Option<Regex>,
    terms: Vec<String>,
}

impl TermMatcher {
    /// A matcher that never matches.
    pub fn empty() -> Self {
        Self {
            pattern: None,
            terms: Vec::new(),
        }
    }

    /// Compile `terms` into a single whole-word pattern.
    ///
    /// Terms are trimmed; blank terms and case-insensitive duplicates are
    /// dropped. Regex metacharacters are escaped so every term matches
    /// literally. Order is preserved.
    pub fn compile<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let mut seen = HashSet::new();
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.to_lowercase()))
            .map(str::to_string)
            .collect();

        if terms.is_empty() {
            return Ok(Self::empty());
        }

        let alternation = terms
            .iter()
            .map(|t| format!("({})", bounded(t)))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Failed to compile matcher for {} terms", terms.len()))?;

        Ok(Self {
            pattern: Some(pattern),
            terms,
        })
    }

    /// Return the first term found in `text`, as it appears in the term list.
    pub fn find(&self, text: &str) -> Option<&str> {
        let caps = self.pattern.as_ref()?.captures(text)?;
        // One capture group per term, in term-list order
        let index = caps.iter().skip(1).position(|group| group.is_some())?;
        self.terms.get(index).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escape `term` and anchor it as a whole word.
///
/// `\b` only holds next to a word character, so a side that starts or ends
/// with punctuation (`$pepe`, `(free)`) is anchored with `\B` instead: the
/// neighbouring character must be a non-word character or the edge of the text.
fn bounded(term: &str) -> String {
    let edge = |c: Option<char>| match c {
        Some(c) if is_word_char(c) => r"\b",
        _ => r"\B",
    };
    format!(
        "{}{}{}",
        edge(term.chars().next()),
        regex::escape(term),
        edge(term.chars().last())
    )
}

/// Shared, swappable handle to the current matcher.
pub struct MatcherHandle {
    inner: ArcSwap<TermMatcher>,
}

impl MatcherHandle {
    pub fn new(initial: TermMatcher) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(initial)),
        }
    }

    /// Compile `terms` and replace the current matcher. On a compile error
    /// the previous matcher stays in place.
    pub fn rebuild<S: AsRef<str>>(&self, terms: &[S]) -> Result<usize> {
        let matcher = TermMatcher::compile(terms)?;
        let count = matcher.len();
        self.inner.store(Arc::new(matcher));
        Ok(count)
    }

    /// Match against whichever matcher is current right now.
    pub fn find(&self, text: &str) -> Option<String> {
        self.inner.load().find(text).map(str::to_string)
    }
}

impl Default for MatcherHandle {
    fn default() -> Self {
        Self::new(TermMatcher::empty())
    }
}

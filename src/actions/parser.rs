//! actions::parser
//!
//! Maps free-text phrases ("save", "publish", "create repo") onto action
//! names. Used by the action list when the user types instead of picking.

/// Phrase to action name.
const SYNONYMS: &[(&str, &str)] = &[
    ("create repo", "init"),
    ("init repo", "init"),
    ("initialize", "init"),
    ("new repo", "init"),
    ("show status", "status"),
    ("what changed", "status"),
    ("stage", "add"),
    ("save", "commit"),
    ("publish", "push"),
    ("upload", "push"),
    ("download", "clone"),
    ("undo commit", "undo"),
    ("uncommit", "undo"),
    ("raw git", "raw"),
    ("expert", "raw"),
    ("history", "log"),
    ("shelve", "stash"),
    ("sync", "pull"),
];

/// Phrase-to-action resolver.
#[derive(Debug, Clone)]
pub struct VerbParser {
    lookup: Vec<(String, String)>,
}

impl Default for VerbParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VerbParser {
    /// Create a parser seeded with the built-in synonyms.
    pub fn new() -> Self {
        let mut parser = Self { lookup: Vec::new() };
        for (phrase, action) in SYNONYMS {
            parser.map_synonym(phrase, action);
        }
        parser
    }

    /// Add (or replace) a synonym.
    pub fn map_synonym(&mut self, phrase: &str, action: &str) {
        let phrase = phrase.trim().to_lowercase();
        self.lookup.retain(|(p, _)| *p != phrase);
        self.lookup.push((phrase, action.to_string()));
        self.lookup
            .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    }

    /// The action an exact synonym names, if `input` is one.
    pub fn synonym(&self, input: &str) -> Option<&str> {
        let input = input.trim().to_lowercase();
        self.lookup
            .iter()
            .find(|(p, _)| *p == input)
            .map(|(_, action)| action.as_str())
    }

    /// Resolve a phrase.
    ///
    /// Exact synonym first, then the longest synonym contained in the
    /// phrase, then the first word if `is_action` accepts it.
    pub fn parse(&self, input: &str, is_action: impl Fn(&str) -> bool) -> Option<String> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return None;
        }
        if let Some((_, action)) = self.lookup.iter().find(|(p, _)| *p == input) {
            return Some(action.clone());
        }
        if is_action(&input) {
            return Some(input);
        }
        if let Some((_, action)) = self
            .lookup
            .iter()
            .find(|(p, _)| contains_phrase(&input, p))
        {
            return Some(action.clone());
        }
        input
            .split_whitespace()
            .next()
            .filter(|word| is_action(word))
            .map(str::to_string)
    }
}

/// Word-boundary containment: "save" matches "save my work" but not "unsaved".
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let words: Vec<&str> = haystack.split_whitespace().collect();
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    !needle.is_empty() && words.windows(needle.len()).any(|w| w == needle.as_slice())
}

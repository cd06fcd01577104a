use crate::models::{EntryKey, IndexEntry};
use crate::text::tokenize;
use dashmap::DashMap;
use std::collections::HashMap;

/// Which weighted field a term occurrence came from
#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Content,
    Excerpt,
}

/// Per-field term frequencies for one entry under one token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldHits {
    pub title: u32,
    pub content: u32,
    pub excerpt: u32,
}

impl FieldHits {
    fn bump(&mut self, field: Field) {
        match field {
            Field::Title => self.title += 1,
            Field::Content => self.content += 1,
            Field::Excerpt => self.excerpt += 1,
        }
    }
}

/// In-process inverted index: token -> (entry -> per-field term frequencies).
/// Postings for one entry are always added/removed as a unit by the owning
/// store while it holds that entry's key lock.
pub struct TextIndex {
    postings: DashMap<String, HashMap<EntryKey, FieldHits>>,
    min_token_len: usize,
}

impl TextIndex {
    pub fn new(min_token_len: usize) -> Self {
        Self {
            postings: DashMap::new(),
            min_token_len,
        }
    }

    /// Add all of an entry's field tokens to the postings
    pub fn add_entry(&self, entry: &IndexEntry) {
        let key = entry.key();
        self.add_field(key, &entry.title, Field::Title);
        self.add_field(key, &entry.content, Field::Content);
        self.add_field(key, &entry.excerpt, Field::Excerpt);
    }

    /// Remove all of an entry's field tokens from the postings. The entry
    /// must be the same version that was added.
    pub fn remove_entry(&self, entry: &IndexEntry) {
        let key = entry.key();
        for text in [&entry.title, &entry.content, &entry.excerpt] {
            for token in tokenize(text, self.min_token_len) {
                let emptied = self
                    .postings
                    .get_mut(&token)
                    .map(|mut hits| {
                        hits.remove(&key);
                        hits.is_empty()
                    })
                    .unwrap_or(false);
                if emptied {
                    self.postings.remove_if(&token, |_, hits| hits.is_empty());
                }
            }
        }
    }

    fn add_field(&self, key: EntryKey, text: &str, field: Field) {
        for token in tokenize(text, self.min_token_len) {
            self.postings
                .entry(token)
                .or_default()
                .entry(key)
                .or_default()
                .bump(field);
        }
    }

    /// Snapshot of the postings for one token, if any
    pub fn lookup(&self, token: &str) -> Option<HashMap<EntryKey, FieldHits>> {
        self.postings.get(token).map(|hits| hits.clone())
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.postings.contains_key(token)
    }

    /// All indexed tokens; used by the fuzzy-match vocabulary scan
    pub fn vocabulary(&self) -> Vec<String> {
        self.postings.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of distinct tokens
    pub fn token_count(&self) -> usize {
        self.postings.len()
    }
}

//! Shared text utilities: tokenization, query normalization, edit distance.
//!
//! The same tokenizer is used when indexing document fields and when parsing
//! queries so that postings and query tokens always agree.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Common English stopwords excluded from both indexing and queries
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
        "if", "in", "into", "is", "it", "its", "of", "on", "or", "that", "the", "their", "then",
        "there", "these", "they", "this", "to", "was", "were", "will", "with",
    ]
    .into_iter()
    .collect()
});

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Split text into lowercase alphanumeric tokens, dropping stopwords and
/// tokens shorter than `min_len`
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= min_len && !is_stopword(t))
        .collect()
}

/// Normalize free text for case/whitespace-insensitive comparison:
/// trim, lowercase, collapse internal whitespace runs
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein distance bounded by `max`: returns `None` as soon as the
/// distance is known to exceed the bound, so vocabulary scans stay cheap
pub fn bounded_levenshtein(a: &str, b: &str, max: u32) -> Option<u32> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let (n, m) = (a.len(), b.len());
    if n.abs_diff(m) > max as usize {
        return None;
    }
    if n == 0 {
        return Some(m as u32);
    }
    if m == 0 {
        return Some(n as u32);
    }

    let mut prev: Vec<u32> = (0..=m as u32).collect();
    let mut curr = vec![0u32; m + 1];

    for i in 1..=n {
        curr[0] = i as u32;
        let mut row_min = curr[0];
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let dist = prev[m];
    (dist <= max).then_some(dist)
}

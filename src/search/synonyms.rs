use crate::text::normalize;
use std::collections::HashMap;

/// Configured synonym dictionary. Expansion broadens a query token to the
/// union of the token and its mapped terms; the mapping is directional and
/// not applied transitively.
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    map: HashMap<String, Vec<String>>,
}

impl SynonymMap {
    /// Build from configuration, normalizing keys and values
    pub fn from_config(config: &HashMap<String, Vec<String>>) -> Self {
        let mut map = HashMap::new();
        for (token, synonyms) in config {
            let key = normalize(token);
            if key.is_empty() {
                continue;
            }
            let values: Vec<String> = synonyms
                .iter()
                .map(|s| normalize(s))
                .filter(|s| !s.is_empty() && *s != key)
                .collect();
            if !values.is_empty() {
                map.insert(key, values);
            }
        }
        Self { map }
    }

    /// The token itself followed by its synonyms, in configured order
    pub fn expand(&self, token: &str) -> Vec<String> {
        let mut out = vec![token.to_string()];
        if let Some(synonyms) = self.map.get(token) {
            for s in synonyms {
                if !out.contains(s) {
                    out.push(s.clone());
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

//! URL and query-string construction.
//!
//! # Design
//! `Query` is an insertion-ordered list of key/value pairs with map-like
//! `set` semantics, so a merged query renders defaults first and overrides
//! in place, and the emitted URL is deterministic. Values are stored as text;
//! anything `Display` can be passed in.
//!
//! Keys and values are percent-encoded with `application/x-www-form-urlencoded`
//! rules and are otherwise passed through untouched.

use std::fmt::Display;

use url::form_urlencoded;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Display) {
        let key = key.into();
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `key=value` pairs joined with `&`, percent-encoded.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::new();
        for (k, v) in iter {
            query.set(k, v);
        }
        query
    }
}

/// Lay `overrides` over `defaults`. On a key collision the override wins.
pub fn merge_query(defaults: &Query, overrides: Option<&Query>) -> Query {
    let mut merged = defaults.clone();
    if let Some(overrides) = overrides {
        for (k, v) in overrides.iter() {
            merged.set(k, v);
        }
    }
    merged
}

/// Join `base_url` and `path` with exactly one `/`, appending `?query` when
/// the query is non-empty.
///
/// Only a single trailing slash is trimmed from the base and a single leading
/// slash from the path.
pub fn build_url(base_url: &str, path: &str, query: Option<&Query>) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    let path = path.strip_prefix('/').unwrap_or(path);
    let mut url = format!("{base}/{path}");
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(&query.encode());
    }
    url
}

//! Static credential allow-list.
//!
//! The table is built once at startup and never mutated afterwards; the
//! server shares it read-only between all connection tasks.

use std::collections::HashMap;

/// Identifier → password mapping of every user allowed to log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialTable {
    entries: HashMap<String, String>,
}

impl CredentialTable {
    /// Builds a table from `(identifier, password)` pairs.
    ///
    /// A later pair with the same identifier replaces an earlier one.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(id, password)| (id.into(), password.into()))
                .collect(),
        }
    }

    /// Returns `true` if `identifier` exists and `password` matches it.
    pub fn verify(&self, identifier: &str, password: &str) -> bool {
        self.entries
            .get(identifier)
            .is_some_and(|expected| expected == password)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CredentialTable {
    /// The built-in allow-list used when no configuration overrides it.
    fn default() -> Self {
        Self::from_pairs([("ken", "12345"), ("andy", "12345")])
    }
}

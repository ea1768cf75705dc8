//! Parsed `stats` reply

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat stats map from a `stats` reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    fields: BTreeMap<String, String>,
}

impl StatsResponse {
    /// Parse lines of the form `STAT <key> <value>`
    ///
    /// A line is kept only when it splits into exactly three whitespace
    /// tokens and the first one is the literal `STAT`. Stats are
    /// informational only, so lines of any other shape are skipped.
    pub fn parse(response: &str) -> Self {
        let mut fields = BTreeMap::new();

        for line in response.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if let ["STAT", key, value] = parts.as_slice() {
                fields.insert(key.to_string(), value.to_string());
            }
        }

        Self { fields }
    }

    /// Cache engine version (the `version` stat)
    pub fn version(&self) -> Option<&str> {
        self.get("version")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

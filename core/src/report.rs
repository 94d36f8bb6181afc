/// Change report of a merge pass and catalog completion statistics
use crate::catalog::{Catalog, MessageKey, MessageStatus};
use serde::{Deserialize, Serialize};

/// An edited source string whose old translation was carried forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuzzyMatch {
    pub context: String,
    pub old_source: String,
    pub new_source: String,
    pub score: f64,
}

/// A numerus message whose stored form count did not fit the language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumerusMismatch {
    pub key: MessageKey,
    pub found: usize,
    pub expected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    pub language: String,
    pub exact_matches: usize,
    pub fuzzy_matches: Vec<FuzzyMatch>,
    pub new_entries: usize,
    pub newly_obsolete: Vec<MessageKey>,
    pub numerus_mismatches: Vec<NumerusMismatch>,
    /// Obsolete or vanished entries brought back by an exact match
    pub revived: usize,
    pub newly_vanished: usize,
    /// Unclaimed entries removed because they had no translation
    pub dropped: usize,
}

impl ChangeReport {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    /// Messages seen in the extraction pass.
    pub fn total_messages(&self) -> usize {
        self.exact_matches + self.fuzzy_matches.len() + self.new_entries
    }

    /// Nothing happened besides exact matches.
    pub fn is_noop(&self) -> bool {
        self.fuzzy_matches.is_empty()
            && self.new_entries == 0
            && self.newly_obsolete.is_empty()
            && self.numerus_mismatches.is_empty()
            && self.revived == 0
            && self.newly_vanished == 0
            && self.dropped == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} exact, {} fuzzy, {} new, {} obsolete, {} vanished, {} dropped, {} numerus mismatches",
            self.language,
            self.exact_matches,
            self.fuzzy_matches.len(),
            self.new_entries,
            self.newly_obsolete.len(),
            self.newly_vanished,
            self.dropped,
            self.numerus_mismatches.len(),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatistics {
    pub language: String,
    pub translated: usize,
    pub unfinished: usize,
    pub obsolete: usize,
    pub vanished: usize,
}

impl CatalogStatistics {
    pub fn collect(catalog: &Catalog) -> Self {
        let mut stats = Self {
            language: catalog.language().to_string(),
            ..Self::default()
        };
        for entry in catalog.entries() {
            match entry.status {
                MessageStatus::Translated => stats.translated += 1,
                MessageStatus::Unfinished => stats.unfinished += 1,
                MessageStatus::Obsolete => stats.obsolete += 1,
                MessageStatus::Vanished => stats.vanished += 1,
            }
        }
        stats
    }

    pub fn live(&self) -> usize {
        self.translated + self.unfinished
    }

    /// Share of live messages that are translated; obsolete and vanished
    /// entries do not count.
    pub fn completion_ratio(&self) -> f64 {
        if self.live() == 0 {
            return 1.0;
        }
        self.translated as f64 / self.live() as f64
    }
}

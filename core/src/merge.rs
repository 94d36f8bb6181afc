/// Merge resolver: reconciles one extraction pass with an existing catalog
///
/// Matching always runs against the existing catalog, never against the
/// catalog being built, so verdicts do not depend on output order.
/// The existing catalog is only borrowed; a failed pass returns no catalog.
use crate::catalog::{Catalog, Location, MessageEntry, MessageKey, MessageStatus};
use crate::extraction::ExtractedMessage;
use crate::matcher::{Candidate, MatchVerdict, Matcher};
use crate::plural::PluralRules;
use crate::report::{ChangeReport, FuzzyMatch, NumerusMismatch};
use crate::similarity::{EditDistanceRatio, SimilarityPolicy};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("Malformed input: record {index} ({key}) {reason}")]
    MalformedInput {
        key: MessageKey,
        index: usize,
        reason: &'static str,
    },

    #[error("Inconsistent numerus: record {index} ({key}) is extracted both as plural and as non-plural")]
    InconsistentNumerus { key: MessageKey, index: usize },

    #[error("Unsupported language: no plural rule for '{0}'")]
    UnsupportedLanguage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Passes an entry may stay obsolete before it becomes vanished
    pub vanish_after_passes: u32,
    /// Fail with `UnsupportedLanguage` instead of falling back to one plural form
    pub strict_language: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            vanish_after_passes: 1,
            strict_language: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub catalog: Catalog,
    pub report: ChangeReport,
}

/// All occurrences of one key in the extraction pass.
struct PendingMessage<'e> {
    key: MessageKey,
    numerus: bool,
    locations: Vec<Location>,
    extra_comment: Option<&'e str>,
}

pub struct MergeResolver<'a> {
    plural: &'a dyn PluralRules,
    policy: &'a dyn SimilarityPolicy,
    options: MergeOptions,
}

impl<'a> MergeResolver<'a> {
    pub fn new(plural: &'a dyn PluralRules, policy: &'a dyn SimilarityPolicy) -> Self {
        Self {
            plural,
            policy,
            options: MergeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    pub fn merge(
        &self,
        extracted: &[ExtractedMessage],
        existing: &Catalog,
    ) -> Result<MergeOutcome, MergeError> {
        let language = existing.language();
        let language_known = self.plural.rule_for(language).is_some();
        if !language_known {
            if self.options.strict_language {
                return Err(MergeError::UnsupportedLanguage(language.to_string()));
            }
            warn!(
                "no plural rule for language '{}'; numerus messages fall back to one form",
                language
            );
        }
        let form_count = self.plural.form_count(language);

        let pending = collect_pending(extracted, existing)?;
        let matcher = Matcher::new(existing, self.policy, pending.iter().map(|m| &m.key));

        let mut report = ChangeReport::new(language);
        let mut catalog = Catalog::with_header(existing.header().clone());
        let mut fuzzy_sources: HashSet<&MessageKey> = HashSet::new();

        for message in &pending {
            let candidate = Candidate {
                key: &message.key,
                numerus: message.numerus,
                locations: &message.locations,
            };

            let mut entry = match matcher.find(&candidate) {
                MatchVerdict::Exact(old) => {
                    report.exact_matches += 1;
                    reuse(old, &mut report)
                }
                MatchVerdict::Fuzzy { entry: old, score } => {
                    debug!(
                        "fuzzy match in {}: {:?} -> {:?} (score {:.2})",
                        message.key.context,
                        old.source_text(),
                        message.key.source_text,
                        score
                    );
                    fuzzy_sources.insert(old.key());
                    report.fuzzy_matches.push(FuzzyMatch {
                        context: message.key.context.clone(),
                        old_source: old.source_text().to_string(),
                        new_source: message.key.source_text.clone(),
                        score,
                    });
                    carry_forward(old, &message.key)
                }
                MatchVerdict::New => {
                    report.new_entries += 1;
                    MessageEntry::new(message.key.clone(), message.numerus, form_count)
                }
            };

            entry.locations = message
                .locations
                .iter()
                .map(|location| with_known_attributes(location, &entry.locations))
                .collect();
            entry.extra_comment = message.extra_comment.map(str::to_string);
            entry.unclaimed_passes = 0;
            if entry.numerus != message.numerus {
                entry.numerus = message.numerus;
                entry.status = MessageStatus::Unfinished;
            }
            conform(&mut entry, form_count, language_known, &mut report);
            catalog.insert(entry);
        }

        for old in existing.entries() {
            if matcher.is_exactly_claimed(old.key()) || fuzzy_sources.contains(old.key()) {
                continue;
            }
            if let Some(mut entry) = self.retire(old, &mut report) {
                conform(&mut entry, form_count, language_known, &mut report);
                catalog.insert(entry);
            }
        }

        info!("{}", report.summary());
        Ok(MergeOutcome { catalog, report })
    }

    /// Merge the same extraction pass into several catalogs, one isolated
    /// task per catalog. Results keep the order of `catalogs`.
    pub fn merge_many(
        &self,
        extracted: &[ExtractedMessage],
        catalogs: &[Catalog],
    ) -> Vec<Result<MergeOutcome, MergeError>> {
        catalogs
            .par_iter()
            .map(|catalog| self.merge(extracted, catalog))
            .collect()
    }

    /// Unclaimed existing entry: obsolete, vanished, or dropped (`None`).
    fn retire(&self, old: &MessageEntry, report: &mut ChangeReport) -> Option<MessageEntry> {
        let mut entry = old.clone();
        entry.locations.clear();
        match old.status {
            MessageStatus::Vanished => Some(entry),
            MessageStatus::Obsolete => {
                let passes = old.unclaimed_passes.max(1) + 1;
                if passes > self.options.vanish_after_passes {
                    entry.status = MessageStatus::Vanished;
                    entry.unclaimed_passes = 0;
                    report.newly_vanished += 1;
                } else {
                    entry.unclaimed_passes = passes;
                }
                Some(entry)
            }
            MessageStatus::Translated | MessageStatus::Unfinished => {
                if !old.has_translation() {
                    debug!("dropping untranslated message {}", old.key());
                    report.dropped += 1;
                    return None;
                }
                entry.status = MessageStatus::Obsolete;
                entry.unclaimed_passes = 1;
                report.newly_obsolete.push(old.key().clone());
                Some(entry)
            }
        }
    }
}

/// Merge with the builtin similarity policy and default options.
pub fn merge(
    extracted: &[ExtractedMessage],
    existing: &Catalog,
    plural: &dyn PluralRules,
) -> Result<MergeOutcome, MergeError> {
    let policy = EditDistanceRatio::default();
    MergeResolver::new(plural, &policy).merge(extracted, existing)
}

fn collect_pending<'e>(
    extracted: &'e [ExtractedMessage],
    existing: &Catalog,
) -> Result<Vec<PendingMessage<'e>>, MergeError> {
    let mut pending: Vec<PendingMessage<'e>> = Vec::new();
    let mut positions: HashMap<MessageKey, usize> = HashMap::new();

    for (index, record) in extracted.iter().enumerate() {
        let key = record.key();
        if record.location.line_number == 0 {
            return Err(MergeError::MalformedInput {
                key,
                index,
                reason: "has line number 0; lines start at 1",
            });
        }
        if record.location.file_path.is_empty() && !existing.contains(&key) {
            return Err(MergeError::MalformedInput {
                key,
                index,
                reason: "has an empty file path and is not in the catalog",
            });
        }

        match positions.get(&key) {
            Some(&slot) => {
                let message = &mut pending[slot];
                if message.numerus != record.numerus {
                    return Err(MergeError::InconsistentNumerus { key, index });
                }
                message.locations.push(record.location.clone());
                if message.extra_comment.is_none() {
                    message.extra_comment = record.extra_comment.as_deref();
                }
            }
            None => {
                positions.insert(key.clone(), pending.len());
                pending.push(PendingMessage {
                    key,
                    numerus: record.numerus,
                    locations: vec![record.location.clone()],
                    extra_comment: record.extra_comment.as_deref(),
                });
            }
        }
    }

    Ok(pending)
}

fn reuse(old: &MessageEntry, report: &mut ChangeReport) -> MessageEntry {
    let mut entry = old.clone();
    if !old.status.is_live() {
        entry.status = if old.is_complete() {
            MessageStatus::Translated
        } else {
            MessageStatus::Unfinished
        };
        report.revived += 1;
    }
    entry
}

/// A location keeps the extra attributes (such as `column`) it had in the catalog.
fn with_known_attributes(location: &Location, previous: &[Location]) -> Location {
    let mut location = location.clone();
    if location.extra_attributes.is_empty() {
        if let Some(known) = previous.iter().find(|old| {
            old.file_path == location.file_path && old.line_number == location.line_number
        }) {
            location.extra_attributes = known.extra_attributes.clone();
        }
    }
    location
}

fn carry_forward(old: &MessageEntry, key: &MessageKey) -> MessageEntry {
    let previous = old.key();
    let mut entry = old.rekeyed(key.clone());
    entry.status = MessageStatus::Unfinished;
    entry.old_source =
        (previous.source_text != key.source_text).then(|| previous.source_text.clone());
    entry.old_comment = (previous.has_disambiguation()
        && previous.disambiguation != key.disambiguation)
        .then(|| previous.disambiguation.clone());
    entry
}

/// Fit the translation array to the form count of the catalog language.
fn conform(
    entry: &mut MessageEntry,
    form_count: usize,
    language_known: bool,
    report: &mut ChangeReport,
) {
    let expected = if entry.numerus { form_count } else { 1 };
    let found = entry.translation.len();
    if found != expected {
        entry.translation.resize(expected, String::new());
        if entry.numerus {
            warn!(
                "{} has {} plural forms, language '{}' needs {}",
                entry.key(),
                found,
                report.language,
                expected
            );
            report.numerus_mismatches.push(NumerusMismatch {
                key: entry.key().clone(),
                found,
                expected,
            });
        }
        if entry.status.is_live() {
            entry.status = MessageStatus::Unfinished;
        }
    }
    if entry.numerus && !language_known && entry.status.is_live() {
        entry.status = MessageStatus::Unfinished;
    }
}

/// Exact and fuzzy lookup of extracted messages in an existing catalog
use crate::catalog::{Catalog, Location, MessageEntry, MessageKey, MessageStatus};
use crate::similarity::SimilarityPolicy;
use std::cmp::Ordering;
use std::collections::HashSet;

/// A message from the current extraction pass, with all of its occurrences.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'m> {
    pub key: &'m MessageKey,
    pub numerus: bool,
    pub locations: &'m [Location],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchVerdict<'a> {
    Exact(&'a MessageEntry),
    Fuzzy { entry: &'a MessageEntry, score: f64 },
    New,
}

pub struct Matcher<'a> {
    catalog: &'a Catalog,
    policy: &'a dyn SimilarityPolicy,
    /// Keys of the current pass that exist verbatim in `catalog`
    exact_claims: HashSet<&'a MessageKey>,
}

struct Ranked<'a> {
    entry: &'a MessageEntry,
    score: f64,
    same_file: bool,
    line_distance: u32,
}

impl<'a> Matcher<'a> {
    /// `pass_keys` are all keys of the extraction pass; existing entries they
    /// name exactly are never offered as fuzzy candidates.
    pub fn new<'k, I>(catalog: &'a Catalog, policy: &'a dyn SimilarityPolicy, pass_keys: I) -> Self
    where
        I: IntoIterator<Item = &'k MessageKey>,
    {
        let exact_claims = pass_keys
            .into_iter()
            .filter_map(|key| catalog.get(key).map(MessageEntry::key))
            .collect();
        Self {
            catalog,
            policy,
            exact_claims,
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn is_exactly_claimed(&self, key: &MessageKey) -> bool {
        self.exact_claims.contains(key)
    }

    pub fn find(&self, candidate: &Candidate<'_>) -> MatchVerdict<'a> {
        if let Some(entry) = self.catalog.get(candidate.key) {
            return MatchVerdict::Exact(entry);
        }

        let Some(group) = self.catalog.context(&candidate.key.context) else {
            return MatchVerdict::New;
        };

        let mut best: Option<Ranked<'a>> = None;
        for entry in &group.entries {
            if !self.is_fuzzy_candidate(entry, candidate) {
                continue;
            }
            let score = self
                .policy
                .score(entry.source_text(), &candidate.key.source_text);
            if !self.policy.is_similar(score) {
                continue;
            }
            let (same_file, line_distance) = proximity(&entry.locations, candidate.locations);
            let ranked = Ranked {
                entry,
                score,
                same_file,
                line_distance,
            };
            // Strictly better only: earlier catalog entries win remaining ties
            let replace = match &best {
                None => true,
                Some(current) => rank(&ranked, current) == Ordering::Greater,
            };
            if replace {
                best = Some(ranked);
            }
        }

        match best {
            Some(ranked) => MatchVerdict::Fuzzy {
                entry: ranked.entry,
                score: ranked.score,
            },
            None => MatchVerdict::New,
        }
    }

    fn is_fuzzy_candidate(&self, entry: &MessageEntry, candidate: &Candidate<'_>) -> bool {
        if entry.numerus != candidate.numerus {
            return false;
        }
        let old = entry.key();
        if old.has_disambiguation()
            && candidate.key.has_disambiguation()
            && old.disambiguation != candidate.key.disambiguation
        {
            return false;
        }
        entry.status != MessageStatus::Vanished
            && entry.has_translation()
            && !self.exact_claims.contains(old)
    }
}

/// Whether any old location shares a file with a new one, and the smallest
/// line gap among those shared files.
fn proximity(old: &[Location], new: &[Location]) -> (bool, u32) {
    let mut distance: Option<u32> = None;
    for before in old {
        for after in new.iter().filter(|loc| loc.file_path == before.file_path) {
            let gap = before.line_number.abs_diff(after.line_number);
            distance = Some(distance.map_or(gap, |d| d.min(gap)));
        }
    }
    match distance {
        Some(gap) => (true, gap),
        None => (false, u32::MAX),
    }
}

fn rank(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then(a.same_file.cmp(&b.same_file))
        .then(b.line_distance.cmp(&a.line_distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::EditDistanceRatio;

    fn translated(context: &str, source: &str, text: &str, file: &str, line: u32) -> MessageEntry {
        MessageEntry::translated(MessageKey::new(context, source, ""), text)
            .with_locations(vec![Location::new(file, line)])
    }

    fn catalog_of(entries: Vec<MessageEntry>) -> Catalog {
        let mut catalog = Catalog::new("es");
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    fn verdict_source(verdict: MatchVerdict<'_>) -> Option<String> {
        match verdict {
            MatchVerdict::Fuzzy { entry, .. } => Some(entry.source_text().to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_exact_match() {
        let catalog = catalog_of(vec![translated("Dialog", "Save", "Guardar", "a.cpp", 1)]);
        let policy = EditDistanceRatio::default();
        let key = MessageKey::new("Dialog", "Save", "");
        let matcher = Matcher::new(&catalog, &policy, [&key]);
        let locations = [Location::new("a.cpp", 3)];
        let candidate = Candidate { key: &key, numerus: false, locations: &locations };

        match matcher.find(&candidate) {
            MatchVerdict::Exact(entry) => assert_eq!(entry.translation, vec!["Guardar"]),
            other => panic!("expected exact match, got {other:?}"),
        }
    }

    #[test]
    fn test_fuzzy_match_same_context_only() {
        let catalog = catalog_of(vec![translated("Other", "Save file", "Guardar", "a.cpp", 1)]);
        let policy = EditDistanceRatio::default();
        let key = MessageKey::new("Dialog", "Save the file", "");
        let matcher = Matcher::new(&catalog, &policy, [&key]);
        let candidate = Candidate { key: &key, numerus: false, locations: &[] };
        assert_eq!(matcher.find(&candidate), MatchVerdict::New);
    }

    #[test]
    fn test_fuzzy_respects_numerus_and_disambiguation() {
        let mut plural = translated("Dialog", "%n files", "%n archivos", "a.cpp", 1);
        plural.numerus = true;
        let commented = MessageEntry::translated(MessageKey::new("Dialog", "Open", "menu"), "Abrir")
            .with_locations(vec![Location::new("a.cpp", 2)]);
        let catalog = catalog_of(vec![plural, commented]);
        let policy = EditDistanceRatio::default();

        let files = MessageKey::new("Dialog", "%n file", "");
        let open = MessageKey::new("Dialog", "Open", "toolbar");
        let matcher = Matcher::new(&catalog, &policy, [&files, &open]);

        let not_plural = Candidate { key: &files, numerus: false, locations: &[] };
        assert_eq!(matcher.find(&not_plural), MatchVerdict::New);
        let plural = Candidate { key: &files, numerus: true, locations: &[] };
        assert_eq!(verdict_source(matcher.find(&plural)).as_deref(), Some("%n files"));

        let other_comment = Candidate { key: &open, numerus: false, locations: &[] };
        assert_eq!(matcher.find(&other_comment), MatchVerdict::New);

        let uncommented = MessageKey::new("Dialog", "Open", "");
        let candidate = Candidate { key: &uncommented, numerus: false, locations: &[] };
        assert_eq!(verdict_source(matcher.find(&candidate)).as_deref(), Some("Open"));
    }

    #[test]
    fn test_untranslated_and_vanished_entries_are_not_fuzzy_sources() {
        let empty = MessageEntry::new(MessageKey::new("Dialog", "Save file", ""), false, 1);
        let mut gone = translated("Dialog", "Save files", "Guardar", "a.cpp", 1);
        gone.status = MessageStatus::Vanished;
        let catalog = catalog_of(vec![empty, gone]);
        let policy = EditDistanceRatio::default();
        let key = MessageKey::new("Dialog", "Save the file", "");
        let matcher = Matcher::new(&catalog, &policy, [&key]);
        let candidate = Candidate { key: &key, numerus: false, locations: &[] };
        assert_eq!(matcher.find(&candidate), MatchVerdict::New);
    }

    #[test]
    fn test_exactly_claimed_entries_are_not_fuzzy_sources() {
        let catalog = catalog_of(vec![translated("Dialog", "Save file", "Guardar", "a.cpp", 1)]);
        let policy = EditDistanceRatio::default();
        let kept = MessageKey::new("Dialog", "Save file", "");
        let edited = MessageKey::new("Dialog", "Save the file", "");
        let matcher = Matcher::new(&catalog, &policy, [&kept, &edited]);
        let candidate = Candidate { key: &edited, numerus: false, locations: &[] };
        assert_eq!(matcher.find(&candidate), MatchVerdict::New);
        assert!(matcher.is_exactly_claimed(&kept));
    }

    #[test]
    fn test_tie_break_prefers_same_file_then_nearest_line() {
        let catalog = catalog_of(vec![
            translated("Dialog", "Save filA", "uno", "other.cpp", 10),
            translated("Dialog", "Save filB", "dos", "dialog.cpp", 90),
            translated("Dialog", "Save filC", "tres", "dialog.cpp", 12),
        ]);
        let policy = EditDistanceRatio::default();
        let key = MessageKey::new("Dialog", "Save filX", "");
        let matcher = Matcher::new(&catalog, &policy, [&key]);
        let locations = [Location::new("dialog.cpp", 10)];
        let candidate = Candidate { key: &key, numerus: false, locations: &locations };
        assert_eq!(verdict_source(matcher.find(&candidate)).as_deref(), Some("Save filC"));

        let elsewhere = [Location::new("new.cpp", 10)];
        let candidate = Candidate { key: &key, numerus: false, locations: &elsewhere };
        assert_eq!(verdict_source(matcher.find(&candidate)).as_deref(), Some("Save filA"));
    }

    #[test]
    fn test_tie_break_prefers_highest_score() {
        let catalog = catalog_of(vec![
            translated("Dialog", "Save the fila", "uno", "other.cpp", 10),
            translated("Dialog", "Save the filb", "dos", "dialog.cpp", 10),
        ]);
        let policy = EditDistanceRatio::default();
        let key = MessageKey::new("Dialog", "Save the file", "");
        let matcher = Matcher::new(&catalog, &policy, [&key]);
        let locations = [Location::new("dialog.cpp", 10)];
        let candidate = Candidate { key: &key, numerus: false, locations: &locations };
        // Both are one substitution away; same-file wins the tie
        assert_eq!(verdict_source(matcher.find(&candidate)).as_deref(), Some("Save the filb"));

        let catalog = catalog_of(vec![
            translated("Dialog", "Save a fil", "uno", "dialog.cpp", 10),
            translated("Dialog", "Save the files", "dos", "other.cpp", 10),
        ]);
        let matcher = Matcher::new(&catalog, &policy, [&key]);
        assert_eq!(
            verdict_source(matcher.find(&candidate)).as_deref(),
            Some("Save the files")
        );
    }
}

/// Similarity policies used for fuzzy matching of edited source strings
///
/// Strings are normalised before comparison: whitespace runs collapse to a
/// single space, Qt placeholders (`%1`, `%L2`, `%n`) become one canonical
/// token and single `&` mnemonic markers are dropped (`&&` is a literal).
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

// Qt arg placeholders: %1..%99, localized %L1, plural %n / %Ln
static QT_PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%L?(?:[1-9][0-9]?|n)").expect("valid Qt placeholder regex"));

// A single ampersand marks the mnemonic character; "&&" is an escaped ampersand
static MNEMONIC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&&|&").expect("valid mnemonic regex"));

const PLACEHOLDER_TOKEN: &str = "\u{1}";

/// Pure scoring function plus the threshold a score must reach to count as similar.
pub trait SimilarityPolicy: Send + Sync {
    /// Score in `[0.0, 1.0]`; 1.0 means equivalent.
    fn score(&self, old_source: &str, new_source: &str) -> f64;

    fn threshold(&self) -> f64;

    fn is_similar(&self, score: f64) -> bool {
        score >= self.threshold()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    #[default]
    EditDistance,
    NormalizedEquality,
}

/// Normalised Levenshtein ratio: `1 - distance / max(len)`.
#[derive(Debug, Clone, Copy)]
pub struct EditDistanceRatio {
    threshold: f64,
}

impl EditDistanceRatio {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for EditDistanceRatio {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityPolicy for EditDistanceRatio {
    fn score(&self, old_source: &str, new_source: &str) -> f64 {
        let old: Vec<char> = normalize(old_source).chars().collect();
        let new: Vec<char> = normalize(new_source).chars().collect();
        let longest = old.len().max(new.len());
        if longest == 0 {
            return 1.0;
        }
        let distance = levenshtein(&old, &new);
        1.0 - distance as f64 / longest as f64
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Similar only when both strings are equal after normalisation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedEquality;

impl SimilarityPolicy for NormalizedEquality {
    fn score(&self, old_source: &str, new_source: &str) -> f64 {
        if normalize(old_source) == normalize(new_source) {
            1.0
        } else {
            0.0
        }
    }

    fn threshold(&self) -> f64 {
        1.0
    }
}

pub fn policy_for(kind: SimilarityKind, threshold: f64) -> Box<dyn SimilarityPolicy> {
    match kind {
        SimilarityKind::EditDistance => Box::new(EditDistanceRatio::new(threshold)),
        SimilarityKind::NormalizedEquality => Box::new(NormalizedEquality),
    }
}

pub fn normalize(text: &str) -> String {
    let unmarked = MNEMONIC_REGEX.replace_all(text, |caps: &regex::Captures| {
        if &caps[0] == "&&" {
            "&".to_string()
        } else {
            String::new()
        }
    });
    let tokens = QT_PLACEHOLDER_REGEX.replace_all(&unmarked, PLACEHOLDER_TOKEN);
    WHITESPACE_REGEX.replace_all(tokens.trim(), " ").into_owned()
}

/// Edit distance over Unicode scalar values, two-row table.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            let deletion = previous[j + 1] + 1;
            let insertion = current[j] + 1;
            current[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Plural rule table consumed by the merge resolver
///
/// Rule families follow the numerus forms Qt Linguist uses for `.ts` files:
/// the order of forms is fixed per family and is the order of the
/// `<numerusform>` elements in a catalog.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A family of languages sharing the same cardinal plural selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PluralRule {
    /// No plural distinction (Japanese, Chinese, Turkish, ...)
    Single,
    /// `n == 1` / other (English, German, Spanish, ...)
    OneOther,
    /// `n <= 1` / other (French, Brazilian Portuguese)
    ZeroOneOther,
    /// one / few / many by last digits (Russian, Ukrainian, Serbian, ...)
    EastSlavic,
    /// `n == 1` / few by last digits / many
    Polish,
    /// `n == 1` / 2..=4 / other (Czech, Slovak)
    Czech,
    Lithuanian,
    Latvian,
    Romanian,
    Slovenian,
    /// one / two / other
    Irish,
    /// zero / one / two / few / many / other
    Arabic,
}

impl PluralRule {
    /// Number of `<numerusform>` slots a numerus message carries.
    pub fn form_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::OneOther | Self::ZeroOneOther => 2,
            Self::EastSlavic
            | Self::Polish
            | Self::Czech
            | Self::Lithuanian
            | Self::Latvian
            | Self::Romanian
            | Self::Irish => 3,
            Self::Slovenian => 4,
            Self::Arabic => 6,
        }
    }

    /// Select the form index for a cardinal number. Always `< form_count()`.
    pub fn form_index(self, n: u64) -> usize {
        let n10 = n % 10;
        let n100 = n % 100;
        match self {
            Self::Single => 0,
            Self::OneOther => usize::from(n != 1),
            Self::ZeroOneOther => usize::from(n > 1),
            Self::EastSlavic => {
                if n10 == 1 && n100 != 11 {
                    0
                } else if (2..=4).contains(&n10) && !(12..=14).contains(&n100) {
                    1
                } else {
                    2
                }
            }
            Self::Polish => {
                if n == 1 {
                    0
                } else if (2..=4).contains(&n10) && !(12..=14).contains(&n100) {
                    1
                } else {
                    2
                }
            }
            Self::Czech => match n {
                1 => 0,
                2..=4 => 1,
                _ => 2,
            },
            Self::Lithuanian => {
                if n10 == 1 && n100 != 11 {
                    0
                } else if n10 >= 2 && !(10..20).contains(&n100) {
                    1
                } else {
                    2
                }
            }
            Self::Latvian => {
                if n10 == 1 && n100 != 11 {
                    0
                } else if n != 0 {
                    1
                } else {
                    2
                }
            }
            Self::Romanian => {
                if n == 1 {
                    0
                } else if n == 0 || (1..=19).contains(&n100) {
                    1
                } else {
                    2
                }
            }
            Self::Slovenian => match n100 {
                1 => 0,
                2 => 1,
                3 | 4 => 2,
                _ => 3,
            },
            Self::Irish => match n {
                1 => 0,
                2 => 1,
                _ => 2,
            },
            Self::Arabic => match n {
                0 => 0,
                1 => 1,
                2 => 2,
                _ if (3..=10).contains(&n100) => 3,
                _ if (11..=99).contains(&n100) => 4,
                _ => 5,
            },
        }
    }
}

/// Read-only lookup the merge resolver consults for every numerus message.
pub trait PluralRules: Send + Sync {
    fn rule_for(&self, language: &str) -> Option<PluralRule>;

    /// Unknown languages get a single form.
    fn form_count(&self, language: &str) -> usize {
        self.rule_for(language)
            .map(PluralRule::form_count)
            .unwrap_or(1)
    }

    fn form_index(&self, language: &str, n: u64) -> usize {
        self.rule_for(language)
            .map(|rule| rule.form_index(n))
            .unwrap_or(0)
    }
}

/// Language tag → rule family, with tag normalisation and fallback to the
/// primary subtag (`pt_BR` → `pt_br`, then `pt`).
#[derive(Debug, Clone, Default)]
pub struct PluralTable {
    rules: HashMap<String, PluralRule>,
}

const BUILTIN_RULES: &[(&[&str], PluralRule)] = &[
    (
        &[
            "ja", "zh", "ko", "vi", "th", "id", "ms", "tr", "hu", "fa", "my", "lo", "km", "bo",
            "dz", "jv", "su", "yo",
        ],
        PluralRule::Single,
    ),
    (
        &[
            "en", "de", "nl", "sv", "da", "no", "nb", "nn", "fi", "et", "it", "es", "pt", "el",
            "he", "bg", "ca", "eu", "gl", "eo", "af", "sq", "az", "ka", "kk", "hi", "bn", "ur",
            "ta", "te", "ml", "mr", "gu", "sw", "fy", "fo", "is", "lb", "ast",
        ],
        PluralRule::OneOther,
    ),
    (&["fr", "pt_br", "hy", "br", "oc"], PluralRule::ZeroOneOther),
    (&["ru", "uk", "be", "sr", "hr", "bs"], PluralRule::EastSlavic),
    (&["pl"], PluralRule::Polish),
    (&["cs", "sk"], PluralRule::Czech),
    (&["lt"], PluralRule::Lithuanian),
    (&["lv"], PluralRule::Latvian),
    (&["ro", "mo"], PluralRule::Romanian),
    (&["sl"], PluralRule::Slovenian),
    (&["ga"], PluralRule::Irish),
    (&["ar"], PluralRule::Arabic),
];

impl PluralTable {
    /// Empty table: every language is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (languages, rule) in BUILTIN_RULES {
            for language in *languages {
                table.rules.insert((*language).to_string(), *rule);
            }
        }
        table
    }

    pub fn with_rule(mut self, language: &str, rule: PluralRule) -> Self {
        self.insert(language, rule);
        self
    }

    pub fn insert(&mut self, language: &str, rule: PluralRule) {
        self.rules.insert(normalize_tag(language), rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl PluralRules for PluralTable {
    fn rule_for(&self, language: &str) -> Option<PluralRule> {
        let tag = normalize_tag(language);
        if tag.is_empty() {
            return None;
        }
        if let Some(rule) = self.rules.get(&tag) {
            return Some(*rule);
        }
        let primary = tag.split('_').next().unwrap_or(&tag);
        self.rules.get(primary).copied()
    }
}

fn normalize_tag(language: &str) -> String {
    language.trim().to_ascii_lowercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_form_counts() {
        let table = PluralTable::builtin();
        assert_eq!(table.form_count("ja"), 1);
        assert_eq!(table.form_count("en"), 2);
        assert_eq!(table.form_count("ru"), 3);
        assert_eq!(table.form_count("sl"), 4);
        assert_eq!(table.form_count("ar"), 6);
    }

    #[test]
    fn test_unknown_language_defaults_to_single_form() {
        let table = PluralTable::builtin();
        assert!(table.rule_for("tlh").is_none());
        assert_eq!(table.form_count("tlh"), 1);
        assert_eq!(table.form_index("tlh", 42), 0);
        assert_eq!(table.form_count(""), 1);
    }

    #[test]
    fn test_tag_normalisation_and_fallback() {
        let table = PluralTable::builtin();
        assert_eq!(table.rule_for("pt_BR"), Some(PluralRule::ZeroOneOther));
        assert_eq!(table.rule_for("pt-BR"), Some(PluralRule::ZeroOneOther));
        assert_eq!(table.rule_for("pt_PT"), Some(PluralRule::OneOther));
        assert_eq!(table.rule_for("de-AT"), Some(PluralRule::OneOther));
        assert_eq!(table.rule_for("AR"), Some(PluralRule::Arabic));
    }

    #[test]
    fn test_override_replaces_builtin() {
        let table = PluralTable::builtin().with_rule("pt", PluralRule::Polish);
        assert_eq!(table.form_count("pt"), 3);
    }

    #[test]
    fn test_east_slavic_indices() {
        let rule = PluralRule::EastSlavic;
        assert_eq!(rule.form_index(1), 0);
        assert_eq!(rule.form_index(21), 0);
        assert_eq!(rule.form_index(11), 2);
        assert_eq!(rule.form_index(3), 1);
        assert_eq!(rule.form_index(13), 2);
        assert_eq!(rule.form_index(5), 2);
    }

    #[test]
    fn test_arabic_indices() {
        let rule = PluralRule::Arabic;
        let got: Vec<usize> = [0, 1, 2, 3, 10, 11, 99, 100, 102, 103]
            .iter()
            .map(|n| rule.form_index(*n))
            .collect();
        assert_eq!(got, vec![0, 1, 2, 3, 3, 4, 4, 5, 5, 3]);
    }

    #[test]
    fn test_form_index_is_always_in_range() {
        let rules = [
            PluralRule::Single,
            PluralRule::OneOther,
            PluralRule::ZeroOneOther,
            PluralRule::EastSlavic,
            PluralRule::Polish,
            PluralRule::Czech,
            PluralRule::Lithuanian,
            PluralRule::Latvian,
            PluralRule::Romanian,
            PluralRule::Slovenian,
            PluralRule::Irish,
            PluralRule::Arabic,
        ];
        for rule in rules {
            for n in 0..250 {
                assert!(rule.form_index(n) < rule.form_count(), "{rule:?} n={n}");
            }
        }
    }
}

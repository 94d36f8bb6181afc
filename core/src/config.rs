/// Configuration for the merge engine
use crate::merge::MergeOptions;
use crate::plural::{PluralRule, PluralTable};
use crate::similarity::{policy_for, SimilarityKind, SimilarityPolicy, DEFAULT_SIMILARITY_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherOptions {
    #[serde(default)]
    pub policy: SimilarityKind,
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
}

fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            policy: SimilarityKind::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObsoleteOptions {
    /// obsolete 상태로 유지할 최대 패스 수 (이후 vanished)
    #[serde(default = "default_vanish_after")]
    pub vanish_after_passes: u32,
}

fn default_vanish_after() -> u32 {
    1
}

impl Default for ObsoleteOptions {
    fn default() -> Self {
        Self {
            vanish_after_passes: default_vanish_after(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOptions {
    /// Fail the merge when a catalog language has no plural rule
    #[serde(default)]
    pub strict: bool,

    /// Language tag → plural rule, applied on top of the builtin table
    #[serde(default)]
    pub plural_overrides: BTreeMap<String, PluralRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    /// 덮어쓰기 전에 기존 카탈로그 백업
    #[serde(default = "default_true")]
    pub backup: bool,

    /// Keep BOM and newline style of the catalog file being replaced
    #[serde(default = "default_true")]
    pub preserve_encoding: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            backup: true,
            preserve_encoding: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConfig {
    #[serde(default)]
    pub matcher: MatcherOptions,
    #[serde(default)]
    pub obsolete: ObsoleteOptions,
    #[serde(default)]
    pub language: LanguageOptions,
    #[serde(default)]
    pub output: OutputOptions,
}

impl MergeConfig {
    /// Load from a `.json` file, or YAML for any other extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.matcher.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "matcher.similarityThreshold must be in (0, 1], got {threshold}"
            )));
        }
        if self.obsolete.vanish_after_passes == 0 {
            return Err(ConfigError::Invalid(
                "obsolete.vanishAfterPasses must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn similarity_policy(&self) -> Box<dyn SimilarityPolicy> {
        policy_for(self.matcher.policy, self.matcher.similarity_threshold)
    }

    pub fn plural_table(&self) -> PluralTable {
        let mut table = PluralTable::builtin();
        for (language, rule) in &self.language.plural_overrides {
            table.insert(language, *rule);
        }
        table
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            vanish_after_passes: self.obsolete.vanish_after_passes,
            strict_language: self.language.strict,
        }
    }
}

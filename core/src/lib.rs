pub mod backup;
pub mod catalog;
pub mod catalog_file;
pub mod config;
pub mod encoding;
pub mod extraction;
pub mod formats;
pub mod matcher;
pub mod merge;
pub mod plural;
pub mod report;
pub mod similarity;

pub use catalog::{
    Catalog, CatalogHeader, ContextGroup, FormExtras, Location, MessageEntry, MessageKey,
    MessageStatus, OpaqueExtras, RawAttribute, RawMarkup,
};
pub use catalog_file::{language_from_file_name, read_extraction, CatalogFile, CatalogFileError};
pub use config::{ConfigError, MergeConfig};
pub use encoding::{Encoding, FileMetadata, Newline};
pub use extraction::{parse_extraction, ExtractedMessage};
pub use formats::ts::{emit_catalog, parse_catalog};
pub use formats::{FileFormat, FormatError, ParseError};
pub use matcher::{Candidate, MatchVerdict, Matcher};
pub use merge::{merge, MergeError, MergeOptions, MergeOutcome, MergeResolver};
pub use plural::{PluralRule, PluralRules, PluralTable};
pub use report::{CatalogStatistics, ChangeReport, FuzzyMatch, NumerusMismatch};
pub use similarity::{EditDistanceRatio, NormalizedEquality, SimilarityKind, SimilarityPolicy};

/// In-memory catalog store: message keys, entries and context groups
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_FORMAT_VERSION: &str = "2.1";
pub const DEFAULT_XML_ENCODING: &str = "utf-8";

/// Identity of a translatable message across extraction passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub context: String,
    pub source_text: String,
    /// Empty when the message carries no disambiguation comment
    #[serde(default)]
    pub disambiguation: String,
}

impl MessageKey {
    pub fn new(
        context: impl Into<String>,
        source_text: impl Into<String>,
        disambiguation: impl Into<String>,
    ) -> Self {
        Self {
            context: context.into(),
            source_text: source_text.into(),
            disambiguation: disambiguation.into(),
        }
    }

    pub fn has_disambiguation(&self) -> bool {
        !self.disambiguation.is_empty()
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{:?}", self.context, self.source_text)?;
        if self.has_disambiguation() {
            write!(f, " [{}]", self.disambiguation)?;
        }
        Ok(())
    }
}

/// One occurrence of a message in the localized sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file_path: String,
    pub line_number: u32,
    /// Other `<location>` attributes such as `column`, as read from a catalog
    #[serde(skip)]
    pub extra_attributes: Vec<RawAttribute>,
}

impl Location {
    pub fn new(file_path: impl Into<String>, line_number: u32) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
            extra_attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Translated,
    Unfinished,
    Obsolete,
    Vanished,
}

impl MessageStatus {
    /// Value of the `type` attribute on `<translation>`; translated has none.
    pub fn type_attr(self) -> Option<&'static str> {
        match self {
            Self::Translated => None,
            Self::Unfinished => Some("unfinished"),
            Self::Obsolete => Some("obsolete"),
            Self::Vanished => Some("vanished"),
        }
    }

    pub fn from_type_attr(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(Self::Translated),
            Some("unfinished") => Some(Self::Unfinished),
            Some("obsolete") => Some(Self::Obsolete),
            Some("vanished") => Some(Self::Vanished),
            Some(_) => None,
        }
    }

    /// Translated or unfinished: the message exists in the current sources.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Translated | Self::Unfinished)
    }
}

/// An attribute kept exactly as it appeared in the document (value still escaped).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawAttribute {
    pub name: String,
    pub raw_value: String,
}

impl RawAttribute {
    pub fn new(name: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_value: raw_value.into(),
        }
    }
}

/// Inner XML of a translation slot that held child elements, kept together
/// with the text decoded from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMarkup {
    pub inner: String,
    pub text: String,
}

/// Uninterpreted content of one translation slot: attributes of its
/// `<numerusform>` and markup such as `<lengthvariant>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormExtras {
    pub attributes: Vec<RawAttribute>,
    pub markup: Option<RawMarkup>,
}

impl FormExtras {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.markup.is_none()
    }
}

/// Document content this crate does not interpret, re-emitted verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpaqueExtras {
    pub message_attributes: Vec<RawAttribute>,
    pub translation_attributes: Vec<RawAttribute>,
    /// Indexed like `MessageEntry::translation`; empty when no slot has extras
    pub forms: Vec<FormExtras>,
    /// Raw XML of unknown child elements of a numerus `<translation>`
    pub translation_elements: Vec<String>,
    /// The message had a `<comment>` element with no text
    pub empty_comment: bool,
    /// Raw XML of unknown child elements, one element per string
    pub elements: Vec<String>,
}

impl OpaqueExtras {
    pub fn is_empty(&self) -> bool {
        self.message_attributes.is_empty()
            && self.translation_attributes.is_empty()
            && self.forms.is_empty()
            && self.translation_elements.is_empty()
            && !self.empty_comment
            && self.elements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageEntry {
    key: MessageKey,
    pub locations: Vec<Location>,
    pub translation: Vec<String>,
    pub status: MessageStatus,
    pub numerus: bool,
    /// Source text this entry was fuzzy-matched from
    pub old_source: Option<String>,
    pub old_comment: Option<String>,
    pub extra_comment: Option<String>,
    pub translator_comment: Option<String>,
    /// Consecutive passes an obsolete entry has gone unclaimed
    pub unclaimed_passes: u32,
    pub extras: OpaqueExtras,
}

impl MessageEntry {
    /// A fresh, untranslated entry with `form_count` empty slots.
    pub fn new(key: MessageKey, numerus: bool, form_count: usize) -> Self {
        let slots = if numerus { form_count.max(1) } else { 1 };
        Self {
            key,
            locations: Vec::new(),
            translation: vec![String::new(); slots],
            status: MessageStatus::Unfinished,
            numerus,
            old_source: None,
            old_comment: None,
            extra_comment: None,
            translator_comment: None,
            unclaimed_passes: 0,
            extras: OpaqueExtras::default(),
        }
    }

    pub fn translated(key: MessageKey, text: impl Into<String>) -> Self {
        let mut entry = Self::new(key, false, 1);
        entry.translation = vec![text.into()];
        entry.status = MessageStatus::Translated;
        entry
    }

    pub fn key(&self) -> &MessageKey {
        &self.key
    }

    pub fn context(&self) -> &str {
        &self.key.context
    }

    pub fn source_text(&self) -> &str {
        &self.key.source_text
    }

    /// Same entry data under another key (used when a fuzzy match renames it).
    pub fn rekeyed(&self, key: MessageKey) -> Self {
        let mut entry = self.clone();
        entry.key = key;
        entry
    }

    /// At least one translation string is non-empty.
    pub fn has_translation(&self) -> bool {
        self.translation.iter().any(|text| !text.is_empty())
    }

    /// Every translation slot is filled.
    pub fn is_complete(&self) -> bool {
        !self.translation.is_empty() && self.translation.iter().all(|text| !text.is_empty())
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextGroup {
    pub name: String,
    pub entries: Vec<MessageEntry>,
    /// Raw XML of unknown child elements of `<context>`
    pub extras: Vec<String>,
}

impl ContextGroup {
    fn new(name: String) -> Self {
        Self {
            name,
            entries: Vec::new(),
            extras: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogHeader {
    /// Encoding named by the XML declaration
    pub xml_encoding: String,
    pub version: String,
    pub language: String,
    pub source_language: Option<String>,
    pub extra_attributes: Vec<RawAttribute>,
    /// Raw XML of unknown child elements of `<TS>`
    pub extra_elements: Vec<String>,
}

impl CatalogHeader {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            xml_encoding: DEFAULT_XML_ENCODING.to_string(),
            version: DEFAULT_FORMAT_VERSION.to_string(),
            language: language.into(),
            source_language: None,
            extra_attributes: Vec::new(),
            extra_elements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryPosition {
    context: usize,
    slot: usize,
}

/// All messages of one language, grouped by context in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    header: CatalogHeader,
    contexts: IndexMap<String, ContextGroup>,
    index: HashMap<MessageKey, EntryPosition>,
}

impl Catalog {
    pub fn new(language: impl Into<String>) -> Self {
        Self::with_header(CatalogHeader::new(language))
    }

    pub fn with_header(header: CatalogHeader) -> Self {
        Self {
            header,
            contexts: IndexMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn header(&self) -> &CatalogHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut CatalogHeader {
        &mut self.header
    }

    pub fn language(&self) -> &str {
        &self.header.language
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &MessageKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &MessageKey) -> Option<&MessageEntry> {
        let pos = self.index.get(key)?;
        self.contexts
            .get_index(pos.context)
            .and_then(|(_, group)| group.entries.get(pos.slot))
    }

    pub fn get_mut(&mut self, key: &MessageKey) -> Option<&mut MessageEntry> {
        let pos = *self.index.get(key)?;
        self.contexts
            .get_index_mut(pos.context)
            .and_then(|(_, group)| group.entries.get_mut(pos.slot))
    }

    pub fn context(&self, name: &str) -> Option<&ContextGroup> {
        self.contexts.get(name)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &ContextGroup> {
        self.contexts.values()
    }

    /// Get or create a context group; new groups go after existing ones.
    pub fn context_mut(&mut self, name: &str) -> &mut ContextGroup {
        self.contexts
            .entry(name.to_string())
            .or_insert_with(|| ContextGroup::new(name.to_string()))
    }

    /// All entries in document order.
    pub fn entries(&self) -> impl Iterator<Item = &MessageEntry> {
        self.contexts.values().flat_map(|group| group.entries.iter())
    }

    /// Append an entry to its context group. An entry with the same key is
    /// replaced in place and returned.
    pub fn insert(&mut self, entry: MessageEntry) -> Option<MessageEntry> {
        if let Some(existing) = self.get_mut(entry.key()) {
            return Some(std::mem::replace(existing, entry));
        }

        let key = entry.key().clone();
        let slot_entry = self.contexts.entry(key.context.clone());
        let context = slot_entry.index();
        let group = slot_entry.or_insert_with(|| ContextGroup::new(key.context.clone()));
        group.entries.push(entry);
        let slot = group.entries.len() - 1;
        self.index.insert(key, EntryPosition { context, slot });
        None
    }

    pub fn count_by_status(&self, status: MessageStatus) -> usize {
        self.entries().filter(|entry| entry.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(context: &str, source: &str) -> MessageKey {
        MessageKey::new(context, source, "")
    }

    #[test]
    fn test_key_identity_uses_all_components() {
        let a = MessageKey::new("Dialog", "Open", "");
        let b = MessageKey::new("Dialog", "Open", "menu");
        let c = MessageKey::new("Window", "Open", "");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, MessageKey::new("Dialog", "Open", ""));
    }

    #[test]
    fn test_key_display_includes_disambiguation() {
        let k = MessageKey::new("Dialog", "Open", "menu");
        assert_eq!(k.to_string(), "Dialog::\"Open\" [menu]");
        assert_eq!(key("Dialog", "Open").to_string(), "Dialog::\"Open\"");
    }

    #[test]
    fn test_insert_groups_by_context_in_first_seen_order() {
        let mut catalog = Catalog::new("pt");
        catalog.insert(MessageEntry::translated(key("B", "one"), "um"));
        catalog.insert(MessageEntry::translated(key("A", "two"), "dois"));
        catalog.insert(MessageEntry::translated(key("B", "three"), "três"));

        let names: Vec<&str> = catalog.contexts().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        let sources: Vec<&str> = catalog.entries().map(|e| e.source_text()).collect();
        assert_eq!(sources, vec!["one", "three", "two"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_insert_replaces_existing_key_in_place() {
        let mut catalog = Catalog::new("pt");
        catalog.insert(MessageEntry::translated(key("A", "one"), "um"));
        catalog.insert(MessageEntry::translated(key("A", "two"), "dois"));
        let previous = catalog.insert(MessageEntry::translated(key("A", "one"), "uno"));

        assert_eq!(previous.map(|e| e.translation), Some(vec!["um".to_string()]));
        assert_eq!(catalog.len(), 2);
        let first = catalog.entries().next().unwrap();
        assert_eq!(first.translation, vec!["uno".to_string()]);
    }

    #[test]
    fn test_lookup_by_key() {
        let mut catalog = Catalog::new("pt");
        catalog.insert(MessageEntry::translated(key("A", "one"), "um"));
        catalog.insert(MessageEntry::translated(key("B", "two"), "dois"));

        let entry = catalog.get(&key("B", "two")).unwrap();
        assert_eq!(entry.translation, vec!["dois".to_string()]);
        assert!(catalog.get(&key("A", "two")).is_none());
    }

    #[test]
    fn test_new_numerus_entry_has_one_slot_per_form() {
        let entry = MessageEntry::new(key("A", "%n files"), true, 3);
        assert_eq!(entry.translation.len(), 3);
        assert_eq!(entry.status, MessageStatus::Unfinished);
        assert!(!entry.has_translation());

        let plain = MessageEntry::new(key("A", "file"), false, 3);
        assert_eq!(plain.translation.len(), 1);
    }

    #[test]
    fn test_completeness() {
        let mut entry = MessageEntry::new(key("A", "%n files"), true, 2);
        entry.translation = vec!["%n ficheiro".into(), String::new()];
        assert!(entry.has_translation());
        assert!(!entry.is_complete());
        entry.translation[1] = "%n ficheiros".into();
        assert!(entry.is_complete());
    }

    #[test]
    fn test_status_type_attr_roundtrip() {
        for status in [
            MessageStatus::Translated,
            MessageStatus::Unfinished,
            MessageStatus::Obsolete,
            MessageStatus::Vanished,
        ] {
            assert_eq!(MessageStatus::from_type_attr(status.type_attr()), Some(status));
        }
        assert_eq!(MessageStatus::from_type_attr(Some("finished")), None);
    }
}

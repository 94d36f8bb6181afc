//! Merge passes over whole catalogs: status transitions and invariants

use tsmerge_core::{
    emit_catalog, merge, parse_catalog, Catalog, ExtractedMessage, MergeResolver, MessageEntry,
    MessageKey, MessageStatus, PluralRule, PluralRules, PluralTable, SimilarityKind,
};

const FIXTURE_AR: &str = include_str!("fixtures/sample_ar.ts");

fn key(context: &str, source: &str) -> MessageKey {
    MessageKey::new(context, source, "")
}

fn catalog_with(language: &str, entries: Vec<MessageEntry>) -> Catalog {
    let mut catalog = Catalog::new(language);
    for entry in entries {
        catalog.insert(entry);
    }
    catalog
}

/// Extraction pass matching the live messages of the fixture.
fn fixture_pass() -> Vec<ExtractedMessage> {
    vec![
        ExtractedMessage::new("FileDialog", "%n file(s) selected", "../src/filedialog.cpp", 42)
            .plural()
            .with_extra_comment("Shown in the status bar"),
        ExtractedMessage::new("FileDialog", "&Open", "../src/filedialog.cpp", 57)
            .with_disambiguation("menu entry"),
        ExtractedMessage::new("FileDialog", "&Open", "../src/filedialog.cpp", 91)
            .with_disambiguation("menu entry"),
        ExtractedMessage::new("FileDialog", "&Open", "../src/filedialog.cpp", 60)
            .with_disambiguation("toolbar button"),
        ExtractedMessage::new("FileDialog", "Overwrite \"%1\"?", "../src/filedialog.cpp", 120),
        ExtractedMessage::new("MainWindow", "Don't ask again", "../src/mainwindow.cpp", 18),
    ]
}

#[test]
fn scenario_a_identical_message_is_an_exact_match() {
    let existing = catalog_with(
        "es",
        vec![MessageEntry::translated(key("Dialog", "Save"), "Guardar")],
    );
    let extracted = vec![ExtractedMessage::new("Dialog", "Save", "dialog.cpp", 12)];

    let outcome = merge(&extracted, &existing, &PluralTable::builtin()).unwrap();
    let entry = outcome.catalog.get(&key("Dialog", "Save")).unwrap();
    assert_eq!(entry.translation, vec!["Guardar".to_string()]);
    assert_eq!(entry.status, MessageStatus::Translated);
    assert_eq!(outcome.report.exact_matches, 1);
    assert_eq!(outcome.catalog.len(), 1);
}

#[test]
fn scenario_b_edited_source_is_a_fuzzy_match() {
    let existing = catalog_with(
        "es",
        vec![MessageEntry::translated(key("Dialog", "Save file"), "Guardar archivo")],
    );
    let extracted = vec![ExtractedMessage::new("Dialog", "Save the file", "dialog.cpp", 12)];

    let outcome = merge(&extracted, &existing, &PluralTable::builtin()).unwrap();
    let entry = outcome.catalog.get(&key("Dialog", "Save the file")).unwrap();
    assert_eq!(entry.translation, vec!["Guardar archivo".to_string()]);
    assert_eq!(entry.status, MessageStatus::Unfinished);
    assert_eq!(outcome.report.fuzzy_matches.len(), 1);
    assert!(outcome.report.fuzzy_matches[0].score >= 0.6);
    assert_eq!(outcome.catalog.len(), 1);
}

#[test]
fn scenario_c_unclaimed_entry_goes_obsolete_then_vanished() {
    let existing = catalog_with(
        "es",
        vec![MessageEntry::translated(key("Dialog", "Print"), "Imprimir")],
    );
    let plural = PluralTable::builtin();

    let first = merge(&[], &existing, &plural).unwrap();
    let entry = first.catalog.get(&key("Dialog", "Print")).unwrap();
    assert_eq!(entry.status, MessageStatus::Obsolete);
    assert_eq!(entry.translation, vec!["Imprimir".to_string()]);

    let second = merge(&[], &first.catalog, &plural).unwrap();
    let entry = second.catalog.get(&key("Dialog", "Print")).unwrap();
    assert_eq!(entry.status, MessageStatus::Vanished);
    assert_eq!(second.report.newly_vanished, 1);
}

#[test]
fn scenario_c_survives_a_save_between_passes() {
    let existing = catalog_with(
        "es",
        vec![MessageEntry::translated(key("Dialog", "Print"), "Imprimir")],
    );
    let plural = PluralTable::builtin();
    let first = merge(&[], &existing, &plural).unwrap();
    let reloaded = parse_catalog(&emit_catalog(&first.catalog)).unwrap();
    let second = merge(&[], &reloaded, &plural).unwrap();
    assert_eq!(
        second.catalog.get(&key("Dialog", "Print")).unwrap().status,
        MessageStatus::Vanished
    );
}

#[test]
fn scenario_d_plural_forms_are_padded_to_the_language() {
    let mut old = MessageEntry::new(key("Dialog", "%n files"), true, 2);
    old.translation = vec!["%n ficheiro".into(), "%n ficheiros".into()];
    old.status = MessageStatus::Translated;
    let existing = catalog_with("pt", vec![old]);
    let plural = PluralTable::builtin().with_rule("pt", PluralRule::EastSlavic);
    let extracted = vec![ExtractedMessage::new("Dialog", "%n files", "dialog.cpp", 3).plural()];

    let outcome = merge(&extracted, &existing, &plural).unwrap();
    let entry = outcome.catalog.get(&key("Dialog", "%n files")).unwrap();
    assert_eq!(
        entry.translation,
        vec!["%n ficheiro".to_string(), "%n ficheiros".to_string(), String::new()]
    );
    assert_eq!(entry.status, MessageStatus::Unfinished);
    assert_eq!(outcome.report.numerus_mismatches.len(), 1);
    assert_eq!(outcome.report.numerus_mismatches[0].expected, 3);
}

#[test]
fn merging_the_same_pass_twice_is_idempotent() {
    let existing = parse_catalog(FIXTURE_AR).unwrap();
    let plural = PluralTable::builtin();
    let extracted = fixture_pass();

    let once = merge(&extracted, &existing, &plural).unwrap();
    let twice = merge(&extracted, &once.catalog, &plural).unwrap();
    assert_eq!(twice.catalog, once.catalog);
    assert_eq!(emit_catalog(&twice.catalog), emit_catalog(&once.catalog));
    assert_eq!(twice.report.exact_matches, 5);
    assert!(twice.report.fuzzy_matches.is_empty());
}

#[test]
fn exact_matches_keep_translations_untouched() {
    let existing = parse_catalog(FIXTURE_AR).unwrap();
    let outcome = merge(&fixture_pass(), &existing, &PluralTable::builtin()).unwrap();

    for message in fixture_pass() {
        let before = existing.get(&message.key()).unwrap();
        let after = outcome.catalog.get(&message.key()).unwrap();
        assert_eq!(after.translation, before.translation, "{}", message.key());
        assert_eq!(after.status, before.status, "{}", message.key());
        assert_eq!(after.translator_comment, before.translator_comment);
    }
    assert_eq!(outcome.report.exact_matches, 5);
    assert_eq!(outcome.report.new_entries, 0);
}

#[test]
fn fixture_retirement_follows_the_unclaimed_count() {
    let existing = parse_catalog(FIXTURE_AR).unwrap();
    let outcome = merge(&fixture_pass(), &existing, &PluralTable::builtin()).unwrap();

    let updates = outcome.catalog.get(&key("MainWindow", "Check for updates")).unwrap();
    assert_eq!(updates.status, MessageStatus::Vanished);
    let legacy = outcome.catalog.get(&key("MainWindow", "Legacy mode")).unwrap();
    assert_eq!(legacy.status, MessageStatus::Vanished);
    assert_eq!(outcome.report.newly_vanished, 1);
    assert!(outcome.report.newly_obsolete.is_empty());
}

#[test]
fn output_lists_live_messages_in_extraction_order() {
    let existing = catalog_with(
        "de",
        vec![
            MessageEntry::translated(key("B", "Old"), "Alt"),
            MessageEntry::translated(key("A", "Kept"), "Behalten"),
        ],
    );
    let extracted = vec![
        ExtractedMessage::new("A", "Kept", "a.cpp", 1),
        ExtractedMessage::new("C", "Fresh", "c.cpp", 1),
    ];
    let outcome = merge(&extracted, &existing, &PluralTable::builtin()).unwrap();

    let order: Vec<(&str, MessageStatus)> = outcome
        .catalog
        .entries()
        .map(|entry| (entry.source_text(), entry.status))
        .collect();
    assert_eq!(
        order,
        vec![
            ("Kept", MessageStatus::Translated),
            ("Fresh", MessageStatus::Unfinished),
            ("Old", MessageStatus::Obsolete),
        ]
    );
}

#[test]
fn numerus_entries_always_match_the_language_form_count() {
    let existing = parse_catalog(FIXTURE_AR).unwrap();
    let plural = PluralTable::builtin();
    let mut extracted = fixture_pass();
    extracted.push(
        ExtractedMessage::new("MainWindow", "%n window(s)", "../src/mainwindow.cpp", 30).plural(),
    );

    let outcome = merge(&extracted, &existing, &plural).unwrap();
    let expected = plural.form_count("ar");
    for entry in outcome.catalog.entries().filter(|entry| entry.numerus) {
        assert_eq!(entry.translation.len(), expected, "{}", entry.key());
    }
    for entry in outcome.catalog.entries().filter(|entry| !entry.numerus) {
        assert_eq!(entry.translation.len(), 1, "{}", entry.key());
    }
}

#[test]
fn normalized_equality_policy_only_absorbs_cosmetic_edits() {
    let existing = catalog_with(
        "es",
        vec![
            MessageEntry::translated(key("Dialog", "&Save  file"), "&Guardar archivo"),
            MessageEntry::translated(key("Dialog", "Print"), "Imprimir"),
        ],
    );
    let extracted = vec![
        ExtractedMessage::new("Dialog", "Save file", "dialog.cpp", 1),
        ExtractedMessage::new("Dialog", "Prints", "dialog.cpp", 2),
    ];
    let plural = PluralTable::builtin();
    let policy = tsmerge_core::similarity::policy_for(SimilarityKind::NormalizedEquality, 1.0);
    let outcome = MergeResolver::new(&plural, policy.as_ref())
        .merge(&extracted, &existing)
        .unwrap();

    assert_eq!(outcome.report.fuzzy_matches.len(), 1);
    assert_eq!(outcome.report.new_entries, 1);
    assert_eq!(
        outcome.catalog.get(&key("Dialog", "Print")).unwrap().status,
        MessageStatus::Obsolete
    );
}

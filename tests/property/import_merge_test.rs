//! Property-based tests for the import merge.
//!
//! Importing a document keeps every video id not mentioned in it and replaces
//! the ones it carries.

use proptest::prelude::*;
use vidmark::managers::bookmark_manager::build_bookmark;
use vidmark::services::data_transfer::merge_import;
use vidmark::types::bookmark::{Bookmark, BookmarkCollection};
use vidmark::types::export::ImportDocument;
use vidmark::types::settings::VideoSettingsMap;

fn arb_bookmarks() -> impl Strategy<Value = Vec<Bookmark>> {
    proptest::collection::vec((0u32..10_000, "[a-z ]{0,12}"), 1..4).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(time, note)| build_bookmark(time as f64, &note, "Video", 1).unwrap())
            .collect()
    })
}

fn arb_collection(prefix: &'static str) -> impl Strategy<Value = BookmarkCollection> {
    proptest::collection::btree_map("[a-z0-9]{3,6}", arb_bookmarks(), 0..5).prop_map(move |map| {
        map.into_iter()
            .map(|(id, list)| (format!("{}{}", prefix, id), list))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn import_keeps_untouched_ids_and_replaces_imported(
        existing in arb_collection(""),
        imported in arb_collection(""),
        prompt in any::<bool>(),
    ) {
        let mut bookmarks = existing.clone();
        let mut settings = VideoSettingsMap::new();
        let mut prompt_enabled = prompt;

        merge_import(
            &mut bookmarks,
            &mut settings,
            &mut prompt_enabled,
            ImportDocument {
                bookmarks: Some(imported.clone()),
                ..ImportDocument::default()
            },
        );

        for (id, list) in &imported {
            prop_assert_eq!(&bookmarks[id], list);
        }
        for (id, list) in &existing {
            if !imported.contains_key(id) {
                prop_assert_eq!(&bookmarks[id], list);
            }
        }
        prop_assert!(bookmarks.keys().all(|id| existing.contains_key(id) || imported.contains_key(id)));
        prop_assert_eq!(prompt_enabled, prompt);
    }

    /// Importing `v1` into `{v2}` keeps both; re-importing `v2` changes only `v2`.
    #[test]
    fn reimport_changes_only_reimported_id(
        v1 in arb_bookmarks(),
        v2 in arb_bookmarks(),
        v2_new in arb_bookmarks(),
    ) {
        let mut bookmarks = BookmarkCollection::from([("v2".to_string(), v2)]);
        let mut settings = VideoSettingsMap::new();
        let mut prompt = true;

        let import_v1 = ImportDocument {
            bookmarks: Some(BookmarkCollection::from([("v1".to_string(), v1.clone())])),
            ..ImportDocument::default()
        };
        merge_import(&mut bookmarks, &mut settings, &mut prompt, import_v1);
        prop_assert_eq!(bookmarks.len(), 2);

        let import_v2 = ImportDocument {
            bookmarks: Some(BookmarkCollection::from([("v2".to_string(), v2_new.clone())])),
            ..ImportDocument::default()
        };
        merge_import(&mut bookmarks, &mut settings, &mut prompt, import_v2);
        prop_assert_eq!(&bookmarks["v1"], &v1);
        prop_assert_eq!(&bookmarks["v2"], &v2_new);
    }
}

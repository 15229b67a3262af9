use std::collections::BTreeSet;

use proptest::prelude::*;
use vendor_core::files::{ExtractItem, flatten, normalize, substitute_version};
use vendor_core::{FileSpec, ReleaseOutput};

fn segment() -> impl Strategy<Value = String> {
    "[a-z]{1,6}(-\\{version\\})?(\\.[a-z]{1,3})?"
}

fn extract_item() -> impl Strategy<Value = ExtractItem> {
    prop_oneof![
        segment().prop_map(ExtractItem::Keep),
        prop::collection::vec((segment(), segment()), 1..3).prop_map(ExtractItem::Rename),
    ]
}

fn file_spec() -> impl Strategy<Value = FileSpec> {
    prop_oneof![
        segment().prop_map(|remote| FileSpec::Path(format!("src/{remote}"))),
        (segment(), segment()).prop_map(|(remote, local)| FileSpec::Rename { remote, local }),
        // a small pool of remotes so several specs share one
        (prop::sample::select(vec!["README.md", "LICENSE"]), segment()).prop_map(
            |(remote, local)| FileSpec::Rename {
                remote: remote.to_string(),
                local,
            }
        ),
        (segment(), prop::collection::vec((segment(), segment()), 1..4)).prop_map(
            |(asset, pairs)| FileSpec::Release {
                remote: format!("{{release}}/{asset}.zip"),
                output: ReleaseOutput::Extract(pairs),
            }
        ),
        (segment(), prop::collection::vec(extract_item(), 1..4)).prop_map(|(asset, items)| {
            FileSpec::Release {
                remote: format!("{{release}}/{asset}.tar.gz"),
                output: ReleaseOutput::ExtractList(items),
            }
        }),
    ]
}

fn version() -> impl Strategy<Value = String> {
    "v{0,2}[0-9]\\.[0-9]{1,2}\\.[0-9]"
}

proptest! {
    #[test]
    fn test_normalize_is_deterministic(specs in prop::collection::vec(file_spec(), 0..6), v in version()) {
        let first = normalize(&specs, &v);
        let second = normalize(&specs, &v);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_stored_shape_round_trips(specs in prop::collection::vec(file_spec(), 0..6), v in version()) {
        let stored = serde_json::to_string(&normalize(&specs, &v).lock_shape).unwrap();
        let reloaded: vendor_core::LockShape = serde_json::from_str(&stored).unwrap();
        prop_assert_eq!(reloaded, normalize(&specs, &v).lock_shape);
    }

    #[test]
    fn test_leading_v_never_matters(specs in prop::collection::vec(file_spec(), 0..6), v in version()) {
        let bare = v.trim_start_matches('v').to_string();
        prop_assert_eq!(normalize(&specs, &v), normalize(&specs, &bare));
    }

    #[test]
    fn test_no_placeholder_survives(specs in prop::collection::vec(file_spec(), 0..6), v in version()) {
        let shape = normalize(&specs, &v);
        for (remote, _) in &shape.lock_shape {
            prop_assert!(!remote.contains("{version}"), "remote still contains {{version}}");
        }
        for name in &shape.flat_names {
            prop_assert!(!name.contains("{version}"), "name still contains {{version}}");
        }
    }

    #[test]
    fn test_flat_names_match_lock_shape(specs in prop::collection::vec(file_spec(), 0..8), v in version()) {
        let shape = normalize(&specs, &v);
        let flat: BTreeSet<String> = shape.flat_names.iter().cloned().collect();
        let locked: BTreeSet<String> = flatten(&shape.lock_shape).into_iter().collect();
        prop_assert_eq!(flat.len(), shape.flat_names.len());
        prop_assert_eq!(flat, locked);
    }

    #[test]
    fn test_substitution_strips_all_leading_vs(prefix in "v{0,3}", rest in "[0-9]\\.[0-9]") {
        let v = format!("{prefix}{rest}");
        prop_assert_eq!(substitute_version("a-{version}-{version}", &v), format!("a-{rest}-{rest}"));
    }
}

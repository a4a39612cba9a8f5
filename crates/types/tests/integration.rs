//! Integration tests for types

#[cfg(test)]
mod tests {
    use osup_types::*;
    use proptest::prelude::*;

    fn record(name: &str, deleted: bool, dir: bool) -> FileRecord {
        let mut f = if dir {
            FileRecord::directory(name, "h")
        } else {
            FileRecord::regular(name, "h")
        };
        f.is_deleted = deleted;
        f
    }

    #[test]
    fn test_parent_before_child() {
        let mut files = vec![record("/a/b.txt", false, false), record("/a", false, true)];
        sort_for_install(&mut files);
        assert_eq!(files[0].filename, "/a");
        assert_eq!(files[1].filename, "/a/b.txt");
    }

    #[test]
    fn test_subscription_needs_pack() {
        assert!(Subscription::new("os-core", Version(10), Version(11)).needs_pack());
        assert!(!Subscription::new("os-core", Version(11), Version(11)).needs_pack());
        assert!(!Subscription::new("os-core", Version(12), Version(11)).needs_pack());
    }

    fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-c]{1,2}", 1..4).prop_map(|parts| format!("/{}", parts.join("/")))
    }

    proptest! {
        #[test]
        fn install_order_puts_ancestors_first(
            mut entries in prop::collection::vec((arb_path(), any::<bool>()), 1..24)
        ) {
            entries.sort();
            entries.dedup();
            let mut files: Vec<FileRecord> =
                entries.iter().map(|(p, del)| record(p, *del, false)).collect();
            files.reverse();
            sort_for_install(&mut files);

            prop_assert!(is_install_ordered(&files));
            for (i, first) in files.iter().enumerate() {
                for second in &files[i + 1..] {
                    // a record never precedes one of its ancestors
                    let prefix = format!("{}/", second.filename);
                    prop_assert!(!first.filename.starts_with(&prefix));
                }
            }
        }
    }
}

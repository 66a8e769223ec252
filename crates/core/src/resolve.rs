//! Picks one canonical descriptor per content hash.
//!
//! Preference between two filenames, first decisive rule wins:
//! 1. a name whose stem does not end in a copy-like suffix beats one that does;
//! 2. the shorter name (in characters) wins;
//! 3. the lexicographically smaller name wins.
//!
//! Identical names (the same file in two directories) fall back to the smaller
//! original path, so the order is total and independent of scan order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::SourceDescriptor;

/// Stem suffixes that mark a likely duplicate, compared case-insensitively.
pub const COPY_SUFFIXES: &[&str] = &[" copy", " (1)", " (2)", " (3)", "_1", "_2", "_3"];

/// Whether the filename's stem ends in one of [`COPY_SUFFIXES`].
pub fn is_copy_like(filename: &str) -> bool {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    COPY_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix))
}

/// `Ordering::Less` when `a` is the preferred filename.
pub fn compare_filenames(a: &str, b: &str) -> Ordering {
    is_copy_like(a)
        .cmp(&is_copy_like(b))
        .then_with(|| a.chars().count().cmp(&b.chars().count()))
        .then_with(|| a.cmp(b))
}

/// Whether `candidate` should replace `current` as the preferred filename.
pub fn is_better_filename(candidate: &str, current: &str) -> bool {
    compare_filenames(candidate, current) == Ordering::Less
}

fn compare_descriptors(a: &SourceDescriptor, b: &SourceDescriptor) -> Ordering {
    compare_filenames(&a.filename, &b.filename).then_with(|| a.path.cmp(&b.path))
}

/// One winner per content hash, sorted by hash for stable downstream order.
pub fn resolve_winners(descriptors: Vec<SourceDescriptor>) -> Vec<SourceDescriptor> {
    let mut winners: HashMap<String, SourceDescriptor> = HashMap::new();
    for candidate in descriptors {
        match winners.get(&candidate.hash) {
            Some(current) if compare_descriptors(&candidate, current) != Ordering::Less => {}
            _ => {
                winners.insert(candidate.hash.clone(), candidate);
            }
        }
    }

    let mut winners: Vec<SourceDescriptor> = winners.into_values().collect();
    winners.sort_by(|a, b| a.hash.cmp(&b.hash));
    winners
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn descriptor(path: &str, hash: &str) -> SourceDescriptor {
        let path = PathBuf::from(path);
        SourceDescriptor {
            filename: path.file_name().unwrap().to_string_lossy().into_owned(),
            file_type: "JPG".into(),
            path,
            created: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            hash: hash.into(),
            sidecars: vec![],
        }
    }

    #[test]
    fn test_copy_like_suffixes() {
        for name in [
            "IMG_0001 copy.JPG",
            "IMG_0001 COPY.jpg",
            "IMG_0001 (1).JPG",
            "IMG_0001 (2).heic",
            "IMG_0001 (3).png",
            "IMG_0001_1.JPG",
            "IMG_0001_2.JPG",
            "IMG_0001_3.JPG",
        ] {
            assert!(is_copy_like(name), "{name} should be copy-like");
        }
        for name in ["IMG_0001.JPG", "IMG_0001 (4).JPG", "IMG_0001_4.JPG", "copy.JPG", "copy"] {
            assert!(!is_copy_like(name), "{name} should not be copy-like");
        }
    }

    #[test]
    fn test_suffix_is_checked_on_stem_only() {
        // The extension is not part of the match.
        assert!(!is_copy_like("photo.copy"));
        assert!(is_copy_like("photo copy"));
    }

    #[test]
    fn test_original_beats_copy() {
        assert!(is_better_filename("IMG_0001.JPG", "IMG_0001 copy.JPG"));
        assert!(!is_better_filename("IMG_0001 copy.JPG", "IMG_0001.JPG"));
        // Even when the copy is shorter.
        assert!(is_better_filename("a_long_original.JPG", "b_1.JPG"));
    }

    #[test]
    fn test_shorter_then_lexicographic() {
        assert!(is_better_filename("IMG.JPG", "IMG_A.JPG"));
        assert!(is_better_filename("A.JPG", "B.JPG"));
        assert!(!is_better_filename("B.JPG", "A.JPG"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // "é" is two bytes but one character.
        assert_eq!(compare_filenames("é.jpg", "ab.jpg"), Ordering::Less);
    }

    #[test]
    fn test_comparator_is_antisymmetric_and_reflexive() {
        let names = [
            "IMG_0001.JPG",
            "IMG_0001 copy.JPG",
            "IMG_0001 (1).JPG",
            "IMG_0001_2.JPG",
            "A.JPG",
            "B.JPG",
            "zz.jpg",
            "é.jpg",
        ];
        for a in names {
            assert_eq!(compare_filenames(a, a), Ordering::Equal);
            for b in names {
                assert_eq!(compare_filenames(a, b), compare_filenames(b, a).reverse());
            }
        }
    }

    #[test]
    fn test_comparator_is_transitive() {
        let names = [
            "IMG_0001.JPG",
            "IMG_0001 copy.JPG",
            "IMG_0001 (1).JPG",
            "IMG_0001_2.JPG",
            "A.JPG",
            "B.JPG",
            "zz.jpg",
        ];
        for a in names {
            for b in names {
                for c in names {
                    if compare_filenames(a, b) == Ordering::Less
                        && compare_filenames(b, c) == Ordering::Less
                    {
                        assert_eq!(compare_filenames(a, c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn test_resolve_picks_original_regardless_of_order() {
        let a = descriptor("/src/IMG_0001.JPG", "h1");
        let b = descriptor("/src/dup/IMG_0001 copy.JPG", "h1");
        let c = descriptor("/src/other/IMG_0001 (1).JPG", "h1");

        let orders = vec![
            vec![a.clone(), b.clone(), c.clone()],
            vec![c.clone(), b.clone(), a.clone()],
            vec![b.clone(), a.clone(), c.clone()],
        ];
        for order in orders {
            let winners = resolve_winners(order);
            assert_eq!(winners.len(), 1);
            assert_eq!(winners[0].filename, "IMG_0001.JPG");
        }
    }

    #[test]
    fn test_identical_names_prefer_smaller_path() {
        let a = descriptor("/src/a/IMG.JPG", "h1");
        let b = descriptor("/src/b/IMG.JPG", "h1");
        assert_eq!(
            resolve_winners(vec![b.clone(), a.clone()])[0].path,
            PathBuf::from("/src/a/IMG.JPG")
        );
        assert_eq!(
            resolve_winners(vec![a, b])[0].path,
            PathBuf::from("/src/a/IMG.JPG")
        );
    }

    #[test]
    fn test_one_winner_per_hash_sorted() {
        let winners = resolve_winners(vec![
            descriptor("/s/b.jpg", "h2"),
            descriptor("/s/a.jpg", "h1"),
            descriptor("/s/c.jpg", "h3"),
            descriptor("/s/a copy.jpg", "h1"),
        ]);
        let hashes: Vec<_> = winners.iter().map(|w| w.hash.as_str()).collect();
        assert_eq!(hashes, vec!["h1", "h2", "h3"]);
    }
}

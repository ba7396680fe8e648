//! Header synonym catalog: raw header text -> canonical field.
//!
//! Keys are stored trimmed and lowercased. Lookup walks progressively looser
//! normalizations of the input and finally a longest-key-first substring
//! scan, so `"TXN ID"`, `"txn_id"` and `"Txn.Id"` all land on the same field.
//! English and Bengali labels are plain entries side by side.

use mfs_core::CanonicalField;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// Which lookup stage produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStage {
    Exact,
    Compacted,
    SingleSpaced,
    Underscored,
    Substring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<CanonicalField, Vec<String>>",
    into = "BTreeMap<CanonicalField, Vec<String>>"
)]
pub struct HeaderCatalog {
    exact: HashMap<String, CanonicalField>,
    /// `(key, compacted key, field)`, sorted longest key first (stable)
    by_length: Vec<(String, String, CanonicalField)>,
}

impl HeaderCatalog {
    /// Build from `(synonym, field)` pairs. The first field seen for a key wins.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, CanonicalField)>,
        S: AsRef<str>,
    {
        let mut exact = HashMap::new();
        let mut by_length = Vec::new();

        for (synonym, field) in entries {
            let key = synonym.as_ref().trim().to_lowercase();
            if key.is_empty() || exact.contains_key(&key) {
                continue;
            }
            exact.insert(key.clone(), field);
            by_length.push((key.clone(), compact(&key), field));
        }

        by_length.sort_by_key(|(key, _, _)| Reverse(key.chars().count()));
        Self { exact, by_length }
    }

    pub fn from_synonyms(synonyms: &BTreeMap<CanonicalField, Vec<String>>) -> Self {
        Self::new(
            synonyms
                .iter()
                .flat_map(|(field, words)| words.iter().map(move |w| (w.as_str(), *field))),
        )
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn resolve(&self, raw: &str) -> Option<CanonicalField> {
        self.resolve_with_stage(raw).map(|(field, _)| field)
    }

    pub fn resolve_with_stage(&self, raw: &str) -> Option<(CanonicalField, MatchStage)> {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }

        let staged = [
            (lowered.clone(), MatchStage::Exact),
            (compact(&lowered), MatchStage::Compacted),
            (single_spaced(&lowered), MatchStage::SingleSpaced),
            (underscored(&lowered), MatchStage::Underscored),
        ];
        for (candidate, stage) in staged {
            if let Some(field) = self.exact.get(&candidate) {
                return Some((*field, stage));
            }
        }

        // separators must not decide whether a key is found inside the text
        let spaced = single_spaced(&lowered);
        let compacted = compact(&lowered);
        self.by_length
            .iter()
            .find(|(key, squeezed, _)| {
                lowered.contains(key.as_str())
                    || spaced.contains(key.as_str())
                    || (!squeezed.is_empty() && compacted.contains(squeezed.as_str()))
            })
            .map(|(_, _, field)| (*field, MatchStage::Substring))
    }

    /// Every key registered for `field`, longest first
    pub fn keys_for(&self, field: CanonicalField) -> impl Iterator<Item = &str> {
        self.by_length
            .iter()
            .filter(move |(_, _, f)| *f == field)
            .map(|(key, _, _)| key.as_str())
    }
}

impl From<BTreeMap<CanonicalField, Vec<String>>> for HeaderCatalog {
    fn from(synonyms: BTreeMap<CanonicalField, Vec<String>>) -> Self {
        Self::from_synonyms(&synonyms)
    }
}

impl From<HeaderCatalog> for BTreeMap<CanonicalField, Vec<String>> {
    fn from(catalog: HeaderCatalog) -> Self {
        let mut out: BTreeMap<CanonicalField, Vec<String>> = BTreeMap::new();
        for (key, _, field) in catalog.by_length {
            out.entry(field).or_default().push(key);
        }
        out
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, '_' | '.' | '-')
}

/// Drop whitespace and `_ . -` entirely
pub fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && !is_separator(*c))
        .collect()
}

fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c.is_whitespace() || is_separator(c))
        .filter(|w| !w.is_empty())
}

/// Separators become single spaces
pub fn single_spaced(s: &str) -> String {
    words(s).collect::<Vec<_>>().join(" ")
}

/// Separators become single underscores
pub fn underscored(s: &str) -> String {
    words(s).collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn catalog() -> HeaderCatalog {
        HeaderCatalog::new([
            ("txn id", CanonicalField::TransactionId),
            ("TXNID", CanonicalField::TransactionId),
            ("লেনদেন আইডি", CanonicalField::TransactionId),
            ("txn type", CanonicalField::TransactionType),
            ("txn_type_dr_cr", CanonicalField::Direction),
            ("amount", CanonicalField::Amount),
            ("balance after txn", CanonicalField::BalanceAfter),
        ])
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let c = catalog();
        assert_eq!(
            c.resolve_with_stage("  TXN ID "),
            Some((CanonicalField::TransactionId, MatchStage::Exact))
        );
    }

    #[test]
    fn test_separator_variants_resolve_to_same_field() {
        let c = catalog();
        for raw in ["TXN ID", "txn_id", "Txn.Id", "txn-id", "TxnId"] {
            assert_eq!(c.resolve(raw), Some(CanonicalField::TransactionId), "{raw}");
        }
    }

    #[test]
    fn test_keys_are_stored_normalized() {
        let c = catalog();
        assert_eq!(
            c.resolve_with_stage("txnid"),
            Some((CanonicalField::TransactionId, MatchStage::Exact))
        );
    }

    #[test]
    fn test_underscore_form_wins_over_substring() {
        let c = catalog();
        assert_eq!(
            c.resolve_with_stage("TXN TYPE DR CR"),
            Some((CanonicalField::Direction, MatchStage::Underscored))
        );
        assert_eq!(c.resolve("TXN TYPE"), Some(CanonicalField::TransactionType));
    }

    #[test]
    fn test_substring_prefers_longest_key() {
        let c = catalog();
        // contains both "amount" and nothing longer
        assert_eq!(
            c.resolve_with_stage("Total Amount (BDT)"),
            Some((CanonicalField::Amount, MatchStage::Substring))
        );
        // "balance after txn" is longer than "txn id" would be
        assert_eq!(
            c.resolve("available balance after txn"),
            Some(CanonicalField::BalanceAfter)
        );
    }

    #[test]
    fn test_substring_ignores_separator_style() {
        let c = catalog();
        for raw in ["TXN ID NO", "TXN_ID_NO", "Txn.Id.No", "txn-id-no", "TxnIdNo"] {
            assert_eq!(
                c.resolve_with_stage(raw),
                Some((CanonicalField::TransactionId, MatchStage::Substring)),
                "{raw}"
            );
        }
        for raw in ["Balance After Txn (Tk)", "BALANCE_AFTER_TXN_TK", "balance.after.txn.tk"] {
            assert_eq!(c.resolve(raw), Some(CanonicalField::BalanceAfter), "{raw}");
        }
    }

    #[test]
    fn test_keys_for_lists_longest_first() {
        let c = catalog();
        let keys: Vec<&str> = c.keys_for(CanonicalField::TransactionId).collect();
        assert_eq!(keys, vec!["লেনদেন আইডি", "txn id", "txnid"]);
        assert_eq!(c.keys_for(CanonicalField::Status).count(), 0);
    }

    #[test]
    fn test_bengali_synonym() {
        let c = catalog();
        assert_eq!(c.resolve("লেনদেন আইডি"), Some(CanonicalField::TransactionId));
    }

    #[test]
    fn test_unmapped() {
        let c = catalog();
        assert_eq!(c.resolve("SI."), None);
        assert_eq!(c.resolve(""), None);
        assert_eq!(c.resolve("   "), None);
    }

    #[test]
    fn test_first_field_for_duplicate_key_wins() {
        let c = HeaderCatalog::new([
            ("amount", CanonicalField::Amount),
            ("AMOUNT", CanonicalField::BalanceAfter),
        ]);
        assert_eq!(c.len(), 1);
        assert_eq!(c.resolve("amount"), Some(CanonicalField::Amount));
    }

    #[test]
    fn test_serde_round_trip_keeps_resolution() {
        let json = serde_json::to_string(&catalog()).unwrap();
        let back: HeaderCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), catalog().len());
        assert_eq!(back.resolve("Txn.Id"), Some(CanonicalField::TransactionId));
    }

    proptest! {
        #[test]
        fn prop_case_and_separator_variants_agree(
            upper in proptest::collection::vec(any::<bool>(), 5),
            sep in prop::sample::select(vec![" ", "_", ".", "-", "  ", ""]),
            suffix in prop::sample::select(vec!["", "no", "No.", "number"]),
        ) {
            let letters: String = "txnid"
                .chars()
                .zip(upper.iter())
                .map(|(ch, up)| if *up { ch.to_ascii_uppercase() } else { ch })
                .collect();
            let mut raw = format!("{}{}{}", &letters[..3], sep, &letters[3..]);
            if !suffix.is_empty() {
                raw.push_str(sep);
                raw.push_str(suffix);
            }
            prop_assert_eq!(catalog().resolve(&raw), Some(CanonicalField::TransactionId));
        }
    }
}

//! Item-code / sub-code predicate filtering.
//!
//! A filter set is a list of [`FilterPredicate`]s combined with OR. Within a
//! predicate the item-code clause and the sub-code clause combine with AND.
//! A list where no predicate names an item code leaves the records untouched.

use serde::{Deserialize, Serialize};

use crate::model::TransferRecord;

/// Form value selecting "sub-code must be empty".
pub const EMPTY_MARKER: &str = "(empty)";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcodeFilter {
    /// No constraint on the sub-code.
    #[default]
    Any,
    /// Sub-code starts with the given text (case-sensitive).
    Prefix(String),
    /// Sub-code is null, empty or whitespace only.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Case-insensitive substring of the item code. Empty matches any code.
    pub item_code: String,
    pub subcode: SubcodeFilter,
}

impl FilterPredicate {
    pub fn new(item_code: &str, subcode: SubcodeFilter) -> Self {
        Self {
            item_code: item_code.trim().to_string(),
            subcode,
        }
    }

    /// Build a predicate from the two form fields.
    ///
    /// The sub-code field is upper-cased; blank means no constraint and
    /// [`EMPTY_MARKER`] asks for records without a sub-code.
    pub fn from_form(item_code: &str, subcode: &str) -> Self {
        let sub = subcode.trim();
        let subcode = if sub.is_empty() {
            SubcodeFilter::Any
        } else if sub.eq_ignore_ascii_case(EMPTY_MARKER) {
            SubcodeFilter::Empty
        } else {
            SubcodeFilter::Prefix(sub.to_uppercase())
        };
        Self::new(item_code, subcode)
    }

    pub fn has_item_code(&self) -> bool {
        !self.item_code.is_empty()
    }

    /// A predicate with neither clause set constrains nothing.
    pub fn is_blank(&self) -> bool {
        !self.has_item_code() && self.subcode == SubcodeFilter::Any
    }

    pub fn matches(&self, record: &TransferRecord) -> bool {
        let code_ok = self.item_code.is_empty()
            || record
                .item_code
                .to_lowercase()
                .contains(&self.item_code.to_lowercase());
        if !code_ok {
            return false;
        }
        match &self.subcode {
            SubcodeFilter::Any => true,
            SubcodeFilter::Prefix(prefix) => record
                .item_subcode
                .as_deref()
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            SubcodeFilter::Empty => record.has_empty_subcode(),
        }
    }
}

/// True when at least one predicate filters on the item code.
pub fn has_item_code_filter(predicates: &[FilterPredicate]) -> bool {
    predicates.iter().any(FilterPredicate::has_item_code)
}

/// Keep the records matching at least one predicate.
///
/// Without any item code in the list every record is returned. Blank
/// predicates are skipped rather than matching everything.
pub fn apply_filters(
    records: &[TransferRecord],
    predicates: &[FilterPredicate],
) -> Vec<TransferRecord> {
    if !has_item_code_filter(predicates) {
        return records.to_vec();
    }
    let active: Vec<&FilterPredicate> = predicates.iter().filter(|p| !p.is_blank()).collect();
    records
        .iter()
        .filter(|r| active.iter().any(|p| p.matches(r)))
        .cloned()
        .collect()
}

//! Tag filter algebra (C3).
//!
//! Four matching modes over a memory's tag set `M` against a filter set `F`
//! (spec §4.1). The in-memory form here is authoritative for post-filtering
//! semantic and graph results; fulltext/temporal strategies additionally
//! pre-filter in SQL with an equivalent JSON-array predicate (see
//! `storage::sql_tag_predicate`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TagsMatch {
    #[default]
    Any,
    All,
    AnyStrict,
    AllStrict,
}

/// `tags` is `None`/empty when the memory has no tags at all ("untagged").
/// `filter` empty means "no filter requested".
pub fn matches_tags(tags: &[String], filter: &[String], mode: TagsMatch) -> bool {
    if filter.is_empty() {
        return matches!(mode, TagsMatch::Any | TagsMatch::All);
    }
    let m: HashSet<&str> = tags.iter().map(String::as_str).collect();
    let f: HashSet<&str> = filter.iter().map(String::as_str).collect();
    match mode {
        TagsMatch::Any => m.is_empty() || !m.is_disjoint(&f),
        TagsMatch::All => m.is_empty() || f.is_subset(&m),
        TagsMatch::AnyStrict => !m.is_empty() && !m.is_disjoint(&f),
        TagsMatch::AllStrict => !m.is_empty() && f.is_subset(&m),
    }
}

/// Parse a memory's stored tag column. Corrupted JSON is treated as
/// untagged rather than raised (spec §7, "Data corruption").
pub fn parse_tags_json(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}

/// Build the SQL fragment used to pre-filter rows whose `tags` JSON array
/// intersects (or is a subset of) `filter`, mirroring [`matches_tags`] for
/// the modes where SQL-side pre-filtering is a safe narrowing (fulltext and
/// temporal strategies only — semantic and graph strategies always
/// post-filter in memory because their candidate sets are not SQL rows).
///
/// Returns `None` when no pre-filter is needed (mode/filter combination that
/// always passes at the SQL layer; final acceptance still flows through
/// [`matches_tags`] during hydration).
pub fn sql_tag_predicate(filter: &[String], mode: TagsMatch) -> Option<String> {
    if filter.is_empty() {
        return None;
    }
    let escaped: Vec<String> = filter
        .iter()
        .map(|t| format!("'{}'", t.replace('\'', "''")))
        .collect();
    let in_list = escaped.join(",");
    match mode {
        TagsMatch::Any | TagsMatch::All => Some(format!(
            "(tags IS NULL OR tags = '[]' OR EXISTS (\
                SELECT 1 FROM json_each(tags) je WHERE je.value IN ({in_list})))"
        )),
        TagsMatch::AnyStrict | TagsMatch::AllStrict => Some(format!(
            "(tags IS NOT NULL AND tags != '[]' AND EXISTS (\
                SELECT 1 FROM json_each(tags) je WHERE je.value IN ({in_list})))"
        )),
    }
}

//! Scope filter (C10, spec §4.8): profile/project/session lineage
//! matching, applied after scoring so it filters without disturbing rank
//! order.
//!
//! No teacher counterpart exists (`vestige-core` has no notion of
//! scoped banks); grounded in the same "exact-match-or-wildcard" shape
//! the teacher uses for tag matching in `search::tags`, generalized to a
//! three-mode lineage check. See `DESIGN.md`.

use crate::model::{Scope, ScopeMode};

/// A field matches when either side imposes no constraint (`None`), or
/// both sides are `Some` and equal. A memory with an unscoped field is
/// visible from any requested scope along that dimension; a request with
/// no scope along a dimension imposes no constraint either.
fn field_matches(memory_field: Option<&str>, requested: Option<&str>) -> bool {
    match (memory_field, requested) {
        (Some(m), Some(r)) => m == r,
        _ => true,
    }
}

/// Does `(scope_profile, scope_project)` pass the requested `scope` under
/// `mode`? `strict` checks both dimensions; `profile_only`/`project_only`
/// check a single dimension and ignore the other entirely (spec §4.8).
pub fn passes_scope(scope_profile: Option<&str>, scope_project: Option<&str>, scope: &Scope, mode: ScopeMode) -> bool {
    match mode {
        ScopeMode::Strict => field_matches(scope_profile, scope.profile.as_deref()) && field_matches(scope_project, scope.project.as_deref()),
        ScopeMode::ProfileOnly => field_matches(scope_profile, scope.profile.as_deref()),
        ScopeMode::ProjectOnly => field_matches(scope_project, scope.project.as_deref()),
    }
}

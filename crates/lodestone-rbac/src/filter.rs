//! Ownership filtering of generated bindings.
//!
//! Generated binding collections are shared across every subject and
//! template in a cluster; verification needs the slice attributable to
//! one subject and one role template.

use lodestone_types::{GeneratedBinding, SubjectKind};
use tracing::debug;

/// Selects bindings that carry a subject with matching kind and name
/// AND are attributable to the role template named by `prefix`.
///
/// When a binding carries a structured owner back-reference it is
/// authoritative: the owner name must equal `prefix` exactly. Otherwise
/// ownership falls back to an anchored prefix match on the role
/// reference name. The fallback is knowingly loose — a template named
/// `"a"` also matches a role ref `"ab-aggregator"` — and stays until
/// the target system's name-spacing uniqueness is confirmed.
pub fn filter_by_subject_and_prefix<'a>(
    bindings: &'a [GeneratedBinding],
    subject_kind: SubjectKind,
    subject_name: &str,
    prefix: &str,
) -> Vec<&'a GeneratedBinding> {
    let matched: Vec<&GeneratedBinding> = bindings
        .iter()
        .filter(|binding| {
            binding
                .subjects
                .iter()
                .any(|s| s.matches(subject_kind, subject_name))
        })
        .filter(|binding| match &binding.owner {
            Some(owner) => owner.name == prefix,
            None => binding.role_ref_name.starts_with(prefix),
        })
        .collect();

    debug!(
        subject = subject_name,
        kind = %subject_kind,
        prefix,
        matched = matched.len(),
        total = bindings.len(),
        "bindings filtered by subject and owner"
    );

    matched
}

//! Canonical ordering and set-equality for rule collections.
//!
//! Generated roles list their rules in whatever order the control plane
//! happened to write them, so rule collections are compared through a
//! canonical form: sort by a fixed field-wise key, then compare the
//! sorted sequences element-wise.
//!
//! Duplicate rules within a collection are NOT collapsed: a collection
//! with a rule repeated twice is not set-equal to the same collection
//! with it once. Callers must pre-deduplicate if duplication is
//! semantically irrelevant to them.

use std::cmp::Ordering;
use std::collections::HashMap;

use lodestone_types::PolicyRule;

/// Total order over rules: field-wise lexicographic comparison of the
/// normalized (sorted, deduplicated) fields, in the fixed order
/// (verbs, apiGroups, resources, resourceNames, nonResourceURLs).
///
/// Comparing the field vectors lexicographically makes a shorter field
/// that is a prefix of a longer one sort first.
pub fn compare_rules(a: &PolicyRule, b: &PolicyRule) -> Ordering {
    a.normalized_fields().cmp(&b.normalized_fields())
}

/// Returns a clone of `rules` sorted into canonical order.
pub fn canonicalize(rules: &[PolicyRule]) -> Vec<PolicyRule> {
    let mut sorted = rules.to_vec();
    sorted.sort_by(compare_rules);
    sorted
}

/// Tests two rule collections for set-equality independent of input
/// order. Duplicates count: `[r, r]` is not equal to `[r]`.
pub fn equal_as_sets(a: &[PolicyRule], b: &[PolicyRule]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    canonicalize(a) == canonicalize(b)
}

/// Multiset difference for mismatch diagnostics: rules present only in
/// `a` and rules present only in `b`, each in canonical order.
pub fn diff(a: &[PolicyRule], b: &[PolicyRule]) -> (Vec<PolicyRule>, Vec<PolicyRule>) {
    let mut counts: HashMap<&PolicyRule, i64> = HashMap::new();
    for rule in a {
        *counts.entry(rule).or_insert(0) += 1;
    }
    for rule in b {
        *counts.entry(rule).or_insert(0) -= 1;
    }

    let mut only_a = Vec::new();
    let mut only_b = Vec::new();
    for (rule, count) in counts {
        match count.cmp(&0) {
            Ordering::Greater => {
                only_a.extend(std::iter::repeat_n(rule.clone(), count.unsigned_abs() as usize));
            }
            Ordering::Less => {
                only_b.extend(std::iter::repeat_n(rule.clone(), count.unsigned_abs() as usize));
            }
            Ordering::Equal => {}
        }
    }
    only_a.sort_by(compare_rules);
    only_b.sort_by(compare_rules);
    (only_a, only_b)
}

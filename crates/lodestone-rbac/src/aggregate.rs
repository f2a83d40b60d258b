//! Expected rule sets for aggregated cluster roles.
//!
//! The control plane merges a role template's own rules with its
//! inherited templates' rules into aggregated cluster roles. This
//! module computes what those merged rule sets should be, so observed
//! state can be checked against them.
//!
//! Two flavors are provided:
//! - the one-level helpers ([`expected_main_rules`],
//!   [`expected_mgmt_aggregate`]), which concatenate the main template's
//!   rules with exactly the supplied children, matching the verification
//!   contract (the caller flattens deeper graphs by composing calls);
//! - the transitive closure ([`effective_rules`]), which walks the whole
//!   inheritance DAG with memoization and reports cycles as a detected
//!   anomaly instead of recursing forever.

use std::collections::HashMap;

use lodestone_types::{PolicyRule, RoleTemplate, TemplateContext};
use thiserror::Error;

use crate::classify::MgmtResourceTables;

/// Error type for inheritance-graph traversal.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The inheritance graph references a template that was not supplied.
    #[error("role template {name:?} referenced by inheritance but not provided")]
    UnknownTemplate { name: String },

    /// The inheritance graph contains a cycle. The system under test is
    /// trusted not to allow cycles, so observing one is an anomaly worth
    /// surfacing, not a crash.
    #[error("cyclic inheritance detected at {name:?} via chain {chain:?}")]
    CyclicInheritance { name: String, chain: Vec<String> },
}

/// Expected merged rules for a main template and its directly supplied
/// children: plain concatenation, no deduplication, no recursion beyond
/// the children given.
///
/// `direct_children` may be empty (the expectation degenerates to the
/// main template's own rules) and the main template's rules may be
/// empty (the "inherited rules only" case).
pub fn expected_main_rules(main: &RoleTemplate, direct_children: &[RoleTemplate]) -> Vec<PolicyRule> {
    let mut rules = main.rules.clone();
    for child in direct_children {
        rules.extend(child.rules.iter().cloned());
    }
    rules
}

/// Expected rules for the management aggregated variant: the merged
/// rules of [`expected_main_rules`], filtered to the management
/// category of the requested context.
pub fn expected_mgmt_aggregate(
    tables: &MgmtResourceTables,
    main: &RoleTemplate,
    direct_children: &[RoleTemplate],
    context: TemplateContext,
) -> Vec<PolicyRule> {
    tables.filter_mgmt_rules(&expected_main_rules(main, direct_children), context)
}

/// Effective rules of a template: its own rules plus the effective
/// rules of every transitively inherited template, memoized per
/// template name.
///
/// `templates` must contain every template reachable through
/// inheritance, keyed by name.
pub fn effective_rules(
    name: &str,
    templates: &HashMap<String, RoleTemplate>,
) -> Result<Vec<PolicyRule>, AggregateError> {
    let mut memo: HashMap<String, Vec<PolicyRule>> = HashMap::new();
    let mut stack: Vec<String> = Vec::new();
    walk(name, templates, &mut memo, &mut stack)
}

fn walk(
    name: &str,
    templates: &HashMap<String, RoleTemplate>,
    memo: &mut HashMap<String, Vec<PolicyRule>>,
    stack: &mut Vec<String>,
) -> Result<Vec<PolicyRule>, AggregateError> {
    if let Some(rules) = memo.get(name) {
        return Ok(rules.clone());
    }
    if stack.iter().any(|seen| seen == name) {
        return Err(AggregateError::CyclicInheritance {
            name: name.to_string(),
            chain: stack.clone(),
        });
    }

    let template = templates
        .get(name)
        .ok_or_else(|| AggregateError::UnknownTemplate {
            name: name.to_string(),
        })?;

    stack.push(name.to_string());
    let mut rules = template.rules.clone();
    for child in &template.inherited {
        rules.extend(walk(child, templates, memo, stack)?);
    }
    stack.pop();

    memo.insert(name.to_string(), rules.clone());
    Ok(rules)
}

//! Kubernetes-style wildcard matching of rules against access requests.
//!
//! A subject's effective permission for (verb, resource) is true iff
//! some generated role reachable from a binding bound to that subject
//! contains a matching rule. `*` matches any single field value.

use lodestone_types::PolicyRule;

fn field_matches(field: &[String], want: &str) -> bool {
    field.iter().any(|value| value == "*" || value == want)
}

/// Whether a single rule grants `verb` on `resource` in `api_group`.
pub fn rule_matches(rule: &PolicyRule, verb: &str, api_group: &str, resource: &str) -> bool {
    field_matches(&rule.verbs, verb)
        && field_matches(&rule.api_groups, api_group)
        && field_matches(&rule.resources, resource)
}

/// Whether any rule in the collection grants the access.
pub fn rules_allow(rules: &[PolicyRule], verb: &str, api_group: &str, resource: &str) -> bool {
    rules
        .iter()
        .any(|rule| rule_matches(rule, verb, api_group, resource))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let rule = PolicyRule::new(["get", "list"], [""], ["pods"]);
        assert!(rule_matches(&rule, "get", "", "pods"));
        assert!(rule_matches(&rule, "list", "", "pods"));
        assert!(!rule_matches(&rule, "delete", "", "pods"));
        assert!(!rule_matches(&rule, "get", "", "services"));
        assert!(!rule_matches(&rule, "get", "apps", "pods"));
    }

    #[test]
    fn test_wildcard_verb() {
        let rule = PolicyRule::new(["*"], [""], ["pods"]);
        assert!(rule_matches(&rule, "deletecollection", "", "pods"));
    }

    #[test]
    fn test_wildcard_group_and_resource() {
        let rule = PolicyRule::new(["get"], ["*"], ["*"]);
        assert!(rule_matches(&rule, "get", "management.cattle.io", "projects"));
        assert!(!rule_matches(&rule, "update", "management.cattle.io", "projects"));
    }

    #[test]
    fn test_rules_allow_any_rule() {
        let rules = vec![
            PolicyRule::new(["get"], [""], ["pods"]),
            PolicyRule::new(["update"], ["apps"], ["deployments"]),
        ];
        assert!(rules_allow(&rules, "update", "apps", "deployments"));
        assert!(!rules_allow(&rules, "update", "", "pods"));
        assert!(!rules_allow(&[], "get", "", "pods"));
    }
}

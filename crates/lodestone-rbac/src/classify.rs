//! Management-plane classification of policy rules.
//!
//! Management-plane resources (projects, cluster registration tokens,
//! node pools, …) only exist in the local cluster's administrative API.
//! Rules touching them are split out of the plain aggregator into
//! context-specific management aggregators, so the verifier has to make
//! the same split when computing expectations.
//!
//! The resource tables are injected as an immutable value rather than
//! read from package-level state, so classifier instances built from
//! different table versions can coexist.

use std::collections::BTreeMap;

use lodestone_types::{PolicyRule, TemplateContext};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// API group owning the management-plane administrative resources.
pub const MANAGEMENT_API_GROUP: &str = "management.cattle.io";
/// API group owning RKE provisioning resources.
pub const RKE_API_GROUP: &str = "rke.cattle.io";
/// API group owning project-level administrative resources.
pub const PROJECT_API_GROUP: &str = "project.cattle.io";
/// The core (empty) API group.
pub const CORE_API_GROUP: &str = "";

/// Management-plane category of a rule, within a requested context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MgmtCategory {
    /// Touches cluster-scoped management resources.
    ClusterMgmt,
    /// Touches project-scoped management resources.
    ProjectMgmt,
    /// A regular workload resource rule.
    Regular,
}

/// The fixed resource-name → owning-API-group membership tables.
///
/// The table contents are a bit-exact contract with the control plane's
/// aggregation logic; [`MgmtResourceTables::default`] builds the
/// well-known tables, and custom tables can be supplied for testing or
/// for newer control-plane versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgmtResourceTables {
    cluster: BTreeMap<String, String>,
    project: BTreeMap<String, String>,
}

impl Default for MgmtResourceTables {
    fn default() -> Self {
        let cluster = [
            ("clusterscans", MANAGEMENT_API_GROUP),
            ("clusterregistrationtokens", MANAGEMENT_API_GROUP),
            ("clusterroletemplatebindings", MANAGEMENT_API_GROUP),
            ("etcdbackups", MANAGEMENT_API_GROUP),
            ("nodes", MANAGEMENT_API_GROUP),
            ("nodepools", MANAGEMENT_API_GROUP),
            ("projects", MANAGEMENT_API_GROUP),
            ("etcdsnapshots", RKE_API_GROUP),
        ];
        let project = [
            ("sourcecodeproviderconfigs", PROJECT_API_GROUP),
            ("projectroletemplatebindings", MANAGEMENT_API_GROUP),
            ("secrets", CORE_API_GROUP),
        ];
        Self::new(cluster, project)
    }
}

impl MgmtResourceTables {
    /// Builds tables from (resource name, owning API group) pairs.
    pub fn new<I, J, S, T>(cluster: I, project: J) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        J: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            cluster: to_map(cluster),
            project: to_map(project),
        }
    }

    /// Classifies a rule within the requested context.
    ///
    /// A rule is `ClusterMgmt` when the context is `Cluster` and some
    /// (api group, resource) pair of the rule appears in the cluster
    /// table; `ProjectMgmt` analogously for `Project`; otherwise
    /// `Regular`. Classification is always total.
    pub fn classify(&self, rule: &PolicyRule, context: TemplateContext) -> MgmtCategory {
        match context {
            TemplateContext::Cluster => {
                if self.matches_table(rule, &self.cluster) {
                    MgmtCategory::ClusterMgmt
                } else {
                    MgmtCategory::Regular
                }
            }
            TemplateContext::Project => {
                if self.matches_table(rule, &self.project) {
                    MgmtCategory::ProjectMgmt
                } else {
                    MgmtCategory::Regular
                }
            }
        }
    }

    /// Returns the subset of `rules` that classify as management-plane
    /// for the requested context. Non-matching rules are silently
    /// dropped.
    pub fn filter_mgmt_rules(
        &self,
        rules: &[PolicyRule],
        context: TemplateContext,
    ) -> Vec<PolicyRule> {
        let filtered: Vec<PolicyRule> = rules
            .iter()
            .filter(|rule| self.classify(rule, context) != MgmtCategory::Regular)
            .cloned()
            .collect();

        if filtered.len() < rules.len() {
            debug!(
                %context,
                kept = filtered.len(),
                dropped = rules.len() - filtered.len(),
                "non-management rules dropped"
            );
        }

        filtered
    }

    /// Whether the resource name appears in either table.
    ///
    /// Access checks against resource types outside both tables have no
    /// classification rule and are rejected as unsupported by the
    /// verifier rather than retried.
    pub fn knows_resource(&self, resource: &str) -> bool {
        self.cluster.contains_key(resource) || self.project.contains_key(resource)
    }

    fn matches_table(&self, rule: &PolicyRule, table: &BTreeMap<String, String>) -> bool {
        rule.resources.iter().any(|resource| {
            table
                .get(resource)
                .is_some_and(|group| rule.api_groups.iter().any(|g| g == group))
        })
    }
}

fn to_map<S, T, I>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (S, T)>,
    S: Into<String>,
    T: Into<String>,
{
    entries
        .into_iter()
        .map(|(resource, group)| (resource.into(), group.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn tables() -> MgmtResourceTables {
        MgmtResourceTables::default()
    }

    #[test_case("projects", MANAGEMENT_API_GROUP; "projects under management group")]
    #[test_case("nodes", MANAGEMENT_API_GROUP; "nodes under management group")]
    #[test_case("etcdsnapshots", RKE_API_GROUP; "etcd snapshots under rke group")]
    fn test_cluster_mgmt_classification(resource: &str, group: &str) {
        let rule = PolicyRule::new(["get"], [group], [resource]);
        assert_eq!(
            tables().classify(&rule, TemplateContext::Cluster),
            MgmtCategory::ClusterMgmt
        );
    }

    #[test_case("sourcecodeproviderconfigs", PROJECT_API_GROUP; "scpc under project group")]
    #[test_case("projectroletemplatebindings", MANAGEMENT_API_GROUP; "prtbs under management group")]
    #[test_case("secrets", CORE_API_GROUP; "secrets under core group")]
    fn test_project_mgmt_classification(resource: &str, group: &str) {
        let rule = PolicyRule::new(["get"], [group], [resource]);
        assert_eq!(
            tables().classify(&rule, TemplateContext::Project),
            MgmtCategory::ProjectMgmt
        );
    }

    #[test]
    fn test_group_must_match_resource_owner() {
        // "projects" is only a management resource under its owning
        // group; the same name in the core group is regular.
        let rule = PolicyRule::new(["get"], [CORE_API_GROUP], ["projects"]);
        assert_eq!(
            tables().classify(&rule, TemplateContext::Cluster),
            MgmtCategory::Regular
        );
    }

    #[test]
    fn test_regular_resource() {
        let rule = PolicyRule::new(["get", "list"], [""], ["pods"]);
        assert_eq!(
            tables().classify(&rule, TemplateContext::Cluster),
            MgmtCategory::Regular
        );
        assert_eq!(
            tables().classify(&rule, TemplateContext::Project),
            MgmtCategory::Regular
        );
    }

    #[test]
    fn test_context_selects_table() {
        // secrets is project-mgmt, so under cluster context it is regular.
        let rule = PolicyRule::new(["get"], [CORE_API_GROUP], ["secrets"]);
        assert_eq!(
            tables().classify(&rule, TemplateContext::Cluster),
            MgmtCategory::Regular
        );
        assert_eq!(
            tables().classify(&rule, TemplateContext::Project),
            MgmtCategory::ProjectMgmt
        );
    }

    #[test]
    fn test_filter_mgmt_rules_drops_non_matching() {
        let mgmt = PolicyRule::new(["get"], [MANAGEMENT_API_GROUP], ["projects"]);
        let regular = PolicyRule::new(["get"], [""], ["pods"]);
        let filtered =
            tables().filter_mgmt_rules(&[mgmt.clone(), regular], TemplateContext::Cluster);
        assert_eq!(filtered, vec![mgmt]);
    }

    #[test]
    fn test_filter_mgmt_rules_empty_input() {
        assert!(
            tables()
                .filter_mgmt_rules(&[], TemplateContext::Cluster)
                .is_empty()
        );
    }

    #[test]
    fn test_mixed_resource_rule_matches_on_any() {
        // One management resource among regular ones is enough.
        let rule = PolicyRule::new(["get"], [MANAGEMENT_API_GROUP], ["settings", "nodepools"]);
        assert_eq!(
            tables().classify(&rule, TemplateContext::Cluster),
            MgmtCategory::ClusterMgmt
        );
    }

    #[test]
    fn test_knows_resource() {
        let t = tables();
        assert!(t.knows_resource("projects"));
        assert!(t.knows_resource("secrets"));
        assert!(!t.knows_resource("pods"));
    }

    #[test]
    fn test_custom_tables() {
        let t = MgmtResourceTables::new(
            [("widgets", "widgets.example.io")],
            [("gadgets", "widgets.example.io")],
        );
        let rule = PolicyRule::new(["get"], ["widgets.example.io"], ["widgets"]);
        assert_eq!(
            t.classify(&rule, TemplateContext::Cluster),
            MgmtCategory::ClusterMgmt
        );
        assert!(!t.knows_resource("projects"));
    }
}

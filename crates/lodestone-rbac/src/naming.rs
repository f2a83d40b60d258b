//! Deterministic names of generated authorization artifacts.
//!
//! The control plane derives generated role names from template names
//! with fixed suffixes. These constants are a bit-exact contract: every
//! binding-count assertion in the verifier is a consequence of the
//! decision table in [`expected_role_ref_names`].

use lodestone_types::{BindingKind, Scope};

/// Suffix of the plain aggregator (all non-management-filtered rules).
pub const AGGREGATOR_SUFFIX: &str = "-aggregator";
/// Suffix of the cluster-management aggregated variant.
pub const CLUSTER_MGMT_AGGREGATOR_SUFFIX: &str = "-cluster-mgmt-aggregator";
/// Suffix of the project-management aggregated variant.
pub const PROJECT_MGMT_AGGREGATOR_SUFFIX: &str = "-project-mgmt-aggregator";

pub fn aggregator_name(template_name: &str) -> String {
    format!("{template_name}{AGGREGATOR_SUFFIX}")
}

pub fn cluster_mgmt_aggregator_name(template_name: &str) -> String {
    format!("{template_name}{CLUSTER_MGMT_AGGREGATOR_SUFFIX}")
}

pub fn project_mgmt_aggregator_name(template_name: &str) -> String {
    format!("{template_name}{PROJECT_MGMT_AGGREGATOR_SUFFIX}")
}

/// The role reference name(s) the generated binding(s) for a declared
/// binding must carry.
///
/// Downstream clusters only ever see the flattened non-management
/// aggregator; management-plane resources are local-only concepts. The
/// local cluster materializes one or two management aggregators instead:
/// project bindings reference the project-management aggregator, and
/// cluster bindings reference the cluster-management aggregator plus,
/// when more than one binding was generated, the project-management one
/// as well (the effective rule set touched both categories).
pub fn expected_role_ref_names(
    scope: &Scope,
    kind: BindingKind,
    template_name: &str,
    generated_count: usize,
) -> Vec<String> {
    match (scope, kind) {
        (Scope::Downstream(_), _) => vec![aggregator_name(template_name)],
        (Scope::Local, BindingKind::Project) => {
            vec![project_mgmt_aggregator_name(template_name)]
        }
        (Scope::Local, BindingKind::Cluster) => {
            let mut names = vec![cluster_mgmt_aggregator_name(template_name)];
            if generated_count > 1 {
                names.push(project_mgmt_aggregator_name(template_name));
            }
            names
        }
    }
}

//! # lodestone-rbac: RBAC aggregation rule engine
//!
//! The pure computational core of the Lodestone verifier:
//! - **Canonicalization** ([`canonical`]) — deterministic rule ordering
//!   and order/duplicate-insensitive set-equality.
//! - **Classification** ([`classify`]) — which management-plane category
//!   a rule belongs to, driven by injected resource tables.
//! - **Aggregation** ([`aggregate`]) — expected merged rule sets for a
//!   role template and its inheritance graph.
//! - **Naming** ([`naming`]) — the deterministic names of generated
//!   aggregator roles and the role references bindings must produce.
//! - **Filtering** ([`filter`]) — attributing generated bindings to a
//!   subject and role template.
//! - **Access matching** ([`access`]) — `*`-wildcard rule matching.
//!
//! Everything in this crate is a pure function over value types; no
//! function here performs I/O or fails on expected conditions. The
//! I/O-facing verification lives in `lodestone-verify`.

pub mod access;
pub mod aggregate;
pub mod canonical;
pub mod classify;
pub mod filter;
pub mod naming;

// Re-export commonly used items
pub use access::{rule_matches, rules_allow};
pub use aggregate::{AggregateError, effective_rules, expected_main_rules, expected_mgmt_aggregate};
pub use canonical::{canonicalize, diff, equal_as_sets};
pub use classify::{MgmtCategory, MgmtResourceTables};
pub use filter::filter_by_subject_and_prefix;
pub use naming::{
    AGGREGATOR_SUFFIX, CLUSTER_MGMT_AGGREGATOR_SUFFIX, PROJECT_MGMT_AGGREGATOR_SUFFIX,
    aggregator_name, cluster_mgmt_aggregator_name, expected_role_ref_names,
    project_mgmt_aggregator_name,
};

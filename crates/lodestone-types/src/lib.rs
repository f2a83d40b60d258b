//! # lodestone-types: Core types for `Lodestone`
//!
//! This crate contains shared types used across the `Lodestone` verifier:
//! - Policy rules ([`PolicyRule`])
//! - Role templates ([`RoleTemplate`], [`TemplateContext`])
//! - Cluster scoping ([`Scope`], [`ClusterId`])
//! - Subjects and bindings ([`Subject`], [`SubjectKind`], [`Binding`], [`BindingKind`])
//! - Generated artifacts ([`GeneratedRole`], [`GeneratedBinding`], [`OwnerKey`])

use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

// ============================================================================
// Cluster scoping
// ============================================================================

/// Unique identifier for a managed (downstream) cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClusterId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which cluster's RBAC state an operation targets.
///
/// The local cluster is the central management cluster; downstream
/// clusters derive their RBAC state from local bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// The central management cluster.
    Local,
    /// A managed cluster, identified by its cluster ID.
    Downstream(ClusterId),
}

impl Scope {
    pub fn is_local(&self) -> bool {
        matches!(self, Scope::Local)
    }

    pub fn is_downstream(&self) -> bool {
        matches!(self, Scope::Downstream(_))
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Local => write!(f, "local"),
            Scope::Downstream(id) => write!(f, "downstream/{id}"),
        }
    }
}

// ============================================================================
// Policy rules
// ============================================================================

/// A single authorization rule.
///
/// Two rules are equal iff all five fields are equal *as sets*: order
/// and duplicates within a field are irrelevant. Note that this is
/// field-level set semantics only; collections of rules are still
/// compared as sequences by the canonicalizer.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub verbs: Vec<String>,
    pub api_groups: Vec<String>,
    pub resources: Vec<String>,
    pub resource_names: Vec<String>,
    pub non_resource_urls: Vec<String>,
}

fn to_strings<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl PolicyRule {
    /// Creates a rule from the three commonly populated fields.
    pub fn new<I1, S1, I2, S2, I3, S3>(verbs: I1, api_groups: I2, resources: I3) -> Self
    where
        I1: IntoIterator<Item = S1>,
        S1: Into<String>,
        I2: IntoIterator<Item = S2>,
        S2: Into<String>,
        I3: IntoIterator<Item = S3>,
        S3: Into<String>,
    {
        Self {
            verbs: to_strings(verbs),
            api_groups: to_strings(api_groups),
            resources: to_strings(resources),
            resource_names: Vec::new(),
            non_resource_urls: Vec::new(),
        }
    }

    pub fn with_resource_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_names = to_strings(names);
        self
    }

    pub fn with_non_resource_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_resource_urls = to_strings(urls);
        self
    }

    /// Each field sorted and deduplicated, in the fixed comparison order
    /// (verbs, apiGroups, resources, resourceNames, nonResourceURLs).
    ///
    /// This is the normal form behind `PartialEq`, `Hash`, and the
    /// canonical rule ordering.
    pub fn normalized_fields(&self) -> [Vec<&str>; 5] {
        [
            normalize_field(&self.verbs),
            normalize_field(&self.api_groups),
            normalize_field(&self.resources),
            normalize_field(&self.resource_names),
            normalize_field(&self.non_resource_urls),
        ]
    }
}

fn normalize_field(field: &[String]) -> Vec<&str> {
    let mut values: Vec<&str> = field.iter().map(String::as_str).collect();
    values.sort_unstable();
    values.dedup();
    values
}

impl PartialEq for PolicyRule {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_fields() == other.normalized_fields()
    }
}

impl Hash for PolicyRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized_fields().hash(state);
    }
}

// ============================================================================
// Role templates
// ============================================================================

/// Whether a role template applies to cluster or project context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateContext {
    Cluster,
    Project,
}

impl TemplateContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateContext::Cluster => "cluster",
            TemplateContext::Project => "project",
        }
    }
}

impl Display for TemplateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, reusable bundle of policy rules plus an inheritance list.
///
/// Inheritance references other templates by name and forms a DAG. The
/// inherited list is only replaced wholesale (the "update inheritance"
/// operation), never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleTemplate {
    pub name: String,
    pub context: TemplateContext,
    pub rules: Vec<PolicyRule>,
    pub inherited: Vec<String>,
    pub external: bool,
    pub locked: bool,
}

impl RoleTemplate {
    pub fn new(name: impl Into<String>, context: TemplateContext, rules: Vec<PolicyRule>) -> Self {
        Self {
            name: name.into(),
            context,
            rules,
            inherited: Vec::new(),
            external: false,
            locked: false,
        }
    }

    pub fn with_inherited<I, S>(mut self, inherited: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherited = inherited.into_iter().map(Into::into).collect();
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}

// ============================================================================
// Subjects and bindings
// ============================================================================

/// The kind of principal a binding grants to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    User,
    Group,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::User => "User",
            SubjectKind::Group => "Group",
        }
    }
}

impl Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A principal referenced by a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
}

impl Subject {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::User,
            name: name.into(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Group,
            name: name.into(),
        }
    }

    pub fn matches(&self, kind: SubjectKind, name: &str) -> bool {
        self.kind == kind && self.name == name
    }
}

/// Whether a binding grants at cluster scope (CRTB) or project scope (PRTB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    Cluster,
    Project,
}

impl BindingKind {
    /// Recovers the binding kind from a generated binding name.
    ///
    /// Project-scoped bindings carry a `prtb` marker in their generated
    /// names; anything else is cluster-scoped. Callers that hold the
    /// original [`Binding`] should use its `kind` field instead.
    pub fn infer_from_name(name: &str) -> Self {
        if name.contains("prtb") {
            BindingKind::Project
        } else {
            BindingKind::Cluster
        }
    }
}

/// A declared assignment of a role template to a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub kind: BindingKind,
    pub subject: Subject,
    pub role_template_name: String,
    pub cluster: ClusterId,
    pub project: Option<String>,
}

impl Binding {
    /// Cluster role template binding (CRTB).
    pub fn crtb(
        subject: Subject,
        role_template_name: impl Into<String>,
        cluster: ClusterId,
    ) -> Self {
        Self {
            kind: BindingKind::Cluster,
            subject,
            role_template_name: role_template_name.into(),
            cluster,
            project: None,
        }
    }

    /// Project role template binding (PRTB).
    pub fn prtb(
        subject: Subject,
        role_template_name: impl Into<String>,
        cluster: ClusterId,
        project: impl Into<String>,
    ) -> Self {
        Self {
            kind: BindingKind::Project,
            subject,
            role_template_name: role_template_name.into(),
            cluster,
            project: Some(project.into()),
        }
    }
}

// ============================================================================
// Generated artifacts
// ============================================================================

/// A role materialized by the control plane from a role template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRole {
    pub name: String,
    pub scope: Scope,
    pub rules: Vec<PolicyRule>,
}

impl GeneratedRole {
    pub fn new(name: impl Into<String>, scope: Scope, rules: Vec<PolicyRule>) -> Self {
        Self {
            name: name.into(),
            scope,
            rules,
        }
    }
}

/// Structured back-reference from a generated object to the declared
/// object it was derived from.
///
/// When present, this is authoritative for ownership filtering; the
/// role-ref name-prefix match remains the fallback for systems that do
/// not stamp it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerKey {
    pub kind: String,
    pub name: String,
}

impl OwnerKey {
    pub fn role_template(name: impl Into<String>) -> Self {
        Self {
            kind: "RoleTemplate".to_string(),
            name: name.into(),
        }
    }
}

/// A (cluster) role binding materialized by the control plane.
///
/// A single declared [`Binding`] may yield several of these, one per
/// aggregator role reference it touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedBinding {
    pub name: String,
    /// `None` for cluster-scoped bindings.
    pub namespace: Option<String>,
    pub role_ref_name: String,
    pub subjects: Vec<Subject>,
    pub owner: Option<OwnerKey>,
}

impl GeneratedBinding {
    pub fn cluster_scoped(
        name: impl Into<String>,
        role_ref_name: impl Into<String>,
        subjects: Vec<Subject>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            role_ref_name: role_ref_name.into(),
            subjects,
            owner: None,
        }
    }

    pub fn namespaced(
        name: impl Into<String>,
        namespace: impl Into<String>,
        role_ref_name: impl Into<String>,
        subjects: Vec<Subject>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            role_ref_name: role_ref_name.into(),
            subjects,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: OwnerKey) -> Self {
        self.owner = Some(owner);
        self
    }
}

//! The verification façade.
//!
//! Composes the rule engine with the cluster API to answer "does
//! cluster X currently reflect the RBAC state implied by these role
//! templates and this binding?", tolerating eventual consistency
//! through the poller. All verdicts are audit-logged.

use lodestone_rbac::{
    aggregator_name, canonicalize, cluster_mgmt_aggregator_name, expected_main_rules,
    expected_mgmt_aggregate, expected_role_ref_names, filter_by_subject_and_prefix,
    project_mgmt_aggregator_name, MgmtResourceTables,
};
use lodestone_types::{Binding, PolicyRule, RoleTemplate, Scope, Subject, TemplateContext};
use tracing::{info, warn};

use crate::cluster::ClusterApi;
use crate::config::VerifyConfig;
use crate::error::{Result, VerifyError};
use crate::poll::{poll_until, PollConfig};

/// Verifies that a cluster's generated RBAC artifacts match the state
/// implied by declared role templates and bindings.
pub struct Verifier<C: ClusterApi> {
    api: C,
    tables: MgmtResourceTables,
    config: VerifyConfig,
}

impl<C: ClusterApi> Verifier<C> {
    pub fn new(api: C) -> Self {
        Self {
            api,
            tables: MgmtResourceTables::default(),
            config: VerifyConfig::default(),
        }
    }

    /// Replaces the classification tables (for control-plane versions
    /// with different membership).
    pub fn with_tables(mut self, tables: MgmtResourceTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_config(mut self, config: VerifyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api(&self) -> &C {
        &self.api
    }

    pub fn tables(&self) -> &MgmtResourceTables {
        &self.tables
    }

    /// Verifies the main aggregated cluster role: the role named
    /// `<main>-aggregator` must hold exactly the main template's rules
    /// merged with the supplied children's rules.
    ///
    /// `direct_children` must be the full transitive child list when
    /// deeper inheritance is being verified; each call checks one
    /// merge.
    pub fn verify_main_acr(
        &self,
        scope: &Scope,
        main: &RoleTemplate,
        direct_children: &[RoleTemplate],
    ) -> Result<()> {
        let expected = expected_main_rules(main, direct_children);
        self.verify_role_rules(
            scope,
            &aggregator_name(&main.name),
            &expected,
            self.config.object.poll_config(),
        )
    }

    /// Verifies the cluster-management aggregated variant.
    pub fn verify_cluster_mgmt_acr(
        &self,
        scope: &Scope,
        main: &RoleTemplate,
        direct_children: &[RoleTemplate],
    ) -> Result<()> {
        let expected =
            expected_mgmt_aggregate(&self.tables, main, direct_children, TemplateContext::Cluster);
        self.verify_role_rules(
            scope,
            &cluster_mgmt_aggregator_name(&main.name),
            &expected,
            self.config.object.poll_config(),
        )
    }

    /// Verifies the project-management aggregated variant.
    pub fn verify_project_mgmt_acr(
        &self,
        scope: &Scope,
        main: &RoleTemplate,
        direct_children: &[RoleTemplate],
    ) -> Result<()> {
        let expected =
            expected_mgmt_aggregate(&self.tables, main, direct_children, TemplateContext::Project);
        self.verify_role_rules(
            scope,
            &project_mgmt_aggregator_name(&main.name),
            &expected,
            self.config.object.poll_config(),
        )
    }

    /// Verifies that every generated role derived from a deleted
    /// template is gone from the scope. Roles of other templates are
    /// untouched by construction of the prefix query.
    pub fn verify_template_removed(&self, scope: &Scope, template_name: &str) -> Result<()> {
        let what = format!("removal of roles generated from {template_name} in {scope}");
        poll_until(&self.config.propagation.poll_config(), &what, || {
            let remaining = self.api.list_roles(scope, &[template_name])?;
            Ok(remaining.is_empty())
        })?;
        info!(template = template_name, %scope, "generated roles removed");
        Ok(())
    }

    /// Counts the generated bindings in `scope` attributable to the
    /// declared binding whose role reference is one of the expected
    /// aggregator names. One read, no polling.
    pub fn count_role_ref_matches(
        &self,
        scope: &Scope,
        binding: &Binding,
        generated_count: usize,
    ) -> Result<usize> {
        let names = expected_role_ref_names(
            scope,
            binding.kind,
            &binding.role_template_name,
            generated_count,
        );

        let mut observed = self.api.list_cluster_role_bindings(scope)?;
        if let Some(project) = &binding.project {
            observed.extend(self.api.list_role_bindings(scope, project)?);
        }

        let owned = filter_by_subject_and_prefix(
            &observed,
            binding.subject.kind,
            &binding.subject.name,
            &binding.role_template_name,
        );
        Ok(owned
            .iter()
            .filter(|b| names.contains(&b.role_ref_name))
            .count())
    }

    /// Verifies that a declared binding produced exactly
    /// `expected_matches` generated bindings with the expected role
    /// references, polling through propagation.
    pub fn verify_binding_matches(
        &self,
        scope: &Scope,
        binding: &Binding,
        generated_count: usize,
        expected_matches: usize,
    ) -> Result<()> {
        let object = format!(
            "bindings of {} {:?} to {} in {scope}",
            binding.subject.kind, binding.subject.name, binding.role_template_name
        );
        let mut last_observed = None;
        let result = poll_until(&self.config.propagation.poll_config(), &object, || {
            let count = self.count_role_ref_matches(scope, binding, generated_count)?;
            last_observed = Some(count);
            Ok(count == expected_matches)
        });

        match result {
            Ok(()) => {
                info!(%object, matches = expected_matches, "binding verification passed");
                Ok(())
            }
            Err(VerifyError::Timeout { .. }) if last_observed.is_some() => {
                let actual = last_observed.unwrap_or_default();
                warn!(%object, expected = expected_matches, actual, "binding verification failed");
                Err(VerifyError::BindingMismatch {
                    object,
                    expected: expected_matches,
                    actual,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Verifies that an access check converges to the expected verdict.
    ///
    /// Resource types outside the classification tables have no rule to
    /// verify against; that is a programming error in the calling test
    /// and fails fast as [`VerifyError::Unsupported`].
    pub fn verify_access(
        &self,
        subject: &Subject,
        verb: &str,
        resource: &str,
        scope: &Scope,
        name: &str,
        expect_allowed: bool,
    ) -> Result<()> {
        if !self.tables.knows_resource(resource) {
            return Err(VerifyError::Unsupported {
                verb: verb.to_string(),
                resource: resource.to_string(),
            });
        }

        let what = format!(
            "{} {:?} {verb} {resource} {name:?} in {scope} => {}",
            subject.kind,
            subject.name,
            if expect_allowed { "allow" } else { "deny" }
        );
        poll_until(&self.config.propagation.poll_config(), &what, || {
            let allowed = self.api.check_access(subject, verb, resource, scope, name)?;
            Ok(allowed == expect_allowed)
        })?;
        info!(%what, "access verification passed");
        Ok(())
    }

    /// Waits for a feature flag to reach the expected value.
    pub fn wait_feature_flag(&self, flag: &str, expected: bool) -> Result<()> {
        let what = format!("feature flag {flag} == {expected}");
        poll_until(&self.config.object.poll_config(), &what, || {
            Ok(self.api.get_feature_flag(flag)? == expected)
        })
    }

    /// Shared shape of the ACR checks: fetch, canonicalize both sides,
    /// compare, retry, and carry both sides into the mismatch verdict.
    fn verify_role_rules(
        &self,
        scope: &Scope,
        role_name: &str,
        expected: &[PolicyRule],
        poll: PollConfig,
    ) -> Result<()> {
        let expected = canonicalize(expected);
        let what = format!("rules of {role_name} in {scope}");
        let mut last_observed: Option<Vec<PolicyRule>> = None;

        let result = poll_until(&poll, &what, || {
            let role = self.api.get_role(scope, role_name)?;
            let actual = canonicalize(&role.rules);
            let matched = actual == expected;
            last_observed = Some(actual);
            Ok(matched)
        });

        match result {
            Ok(()) => {
                info!(role = role_name, %scope, rules = expected.len(), "rule verification passed");
                Ok(())
            }
            Err(VerifyError::Timeout { .. }) if last_observed.is_some() => {
                let actual = last_observed.unwrap_or_default();
                warn!(
                    role = role_name,
                    %scope,
                    expected = expected.len(),
                    actual = actual.len(),
                    "rule verification failed"
                );
                Err(VerifyError::RuleMismatch {
                    object: role_name.to_string(),
                    expected,
                    actual,
                })
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ApiError;
    use lodestone_types::{Binding, ClusterId, GeneratedBinding, GeneratedRole};

    /// Stub that answers every read with not-found and every access
    /// check with deny.
    struct EmptyCluster;

    impl ClusterApi for EmptyCluster {
        fn get_role(&self, _: &Scope, name: &str) -> std::result::Result<GeneratedRole, ApiError> {
            Err(ApiError::not_found("clusterrole", name))
        }

        fn list_roles(
            &self,
            _: &Scope,
            _: &[&str],
        ) -> std::result::Result<Vec<GeneratedRole>, ApiError> {
            Ok(Vec::new())
        }

        fn list_role_bindings(
            &self,
            _: &Scope,
            _: &str,
        ) -> std::result::Result<Vec<GeneratedBinding>, ApiError> {
            Ok(Vec::new())
        }

        fn list_cluster_role_bindings(
            &self,
            _: &Scope,
        ) -> std::result::Result<Vec<GeneratedBinding>, ApiError> {
            Ok(Vec::new())
        }

        fn get_role_template(&self, name: &str) -> std::result::Result<RoleTemplate, ApiError> {
            Err(ApiError::not_found("roletemplate", name))
        }

        fn create_role_template(&self, _: &RoleTemplate) -> std::result::Result<(), ApiError> {
            Ok(())
        }

        fn delete_role_template(&self, _: &str) -> std::result::Result<(), ApiError> {
            Ok(())
        }

        fn update_inheritance(&self, _: &str, _: &[String]) -> std::result::Result<(), ApiError> {
            Ok(())
        }

        fn create_binding(&self, binding: &Binding) -> std::result::Result<Binding, ApiError> {
            Ok(binding.clone())
        }

        fn delete_binding(&self, _: &str) -> std::result::Result<(), ApiError> {
            Ok(())
        }

        fn check_access(
            &self,
            _: &Subject,
            _: &str,
            _: &str,
            _: &Scope,
            _: &str,
        ) -> std::result::Result<bool, ApiError> {
            Ok(false)
        }

        fn get_feature_flag(&self, name: &str) -> std::result::Result<bool, ApiError> {
            Err(ApiError::not_found("feature", name))
        }

        fn set_feature_flag(&self, _: &str, _: bool) -> std::result::Result<(), ApiError> {
            Ok(())
        }
    }

    fn verifier() -> Verifier<EmptyCluster> {
        Verifier::new(EmptyCluster).with_config(VerifyConfig::fast_for_tests())
    }

    #[test]
    fn test_unknown_resource_fails_fast_without_polling() {
        let v = verifier();
        let err = v
            .verify_access(
                &Subject::user("u-1"),
                "get",
                "pods",
                &Scope::Local,
                "any",
                true,
            )
            .unwrap_err();
        assert!(matches!(err, VerifyError::Unsupported { .. }));
    }

    #[test]
    fn test_missing_role_times_out_not_mismatches() {
        // The role never appears, so the verdict is "never converged",
        // not "converged to the wrong value".
        let v = verifier();
        let main = RoleTemplate::new(
            "tpl",
            TemplateContext::Cluster,
            vec![PolicyRule::new(["get"], [""], ["secrets"])],
        );
        let err = v.verify_main_acr(&Scope::Local, &main, &[]).unwrap_err();
        assert!(matches!(err, VerifyError::Timeout { .. }));
    }

    #[test]
    fn test_template_removed_on_empty_cluster() {
        let v = verifier();
        assert!(v.verify_template_removed(&Scope::Local, "tpl").is_ok());
    }

    #[test]
    fn test_binding_mismatch_reports_observed_count() {
        let v = verifier();
        let binding = Binding::crtb(Subject::user("u-1"), "tpl", ClusterId::from("c-1"));
        let err = v
            .verify_binding_matches(&Scope::Local, &binding, 1, 1)
            .unwrap_err();
        match err {
            VerifyError::BindingMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
            }
            other => panic!("expected binding mismatch, got {other:?}"),
        }
    }
}

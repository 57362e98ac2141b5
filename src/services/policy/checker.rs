//! Building and evaluating permission checks for a request.
//!
//! Evaluation order (first failure wins):
//! 1. permission: explicit on the rule, else the method mapping (500 when absent)
//! 2. entity id from the named route parameter (400 when absent)
//! 3. subject id from the request variables (400 when absent)
//! 4. policy engine call (500 on error)
use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::context::RequestVars;
use crate::error::AuthError;
use crate::services::policy::engine::PolicyEngine;
use crate::services::policy::entity::EntityTarget;
use crate::services::policy::mapping::MethodPermissionMap;
use crate::services::policy::types::{
    CheckMetadata, EntityRef, PermissionCheckRequest, PermissionDecision, SubjectRef,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectOptions {
    pub subject_type: String,
    /// Request variable holding the subject id.
    pub id_variable: String,
}

impl Default for SubjectOptions {
    fn default() -> Self {
        Self {
            subject_type: "user".to_string(),
            id_variable: "sub".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PermissionOptions {
    pub method_permissions: MethodPermissionMap,
    pub default_tenant_id: Option<String>,
    /// Request variable that overrides the default tenant when set.
    pub tenant_variable: Option<String>,
    pub subject: SubjectOptions,
    pub throw_on_permission_denied: bool,
    pub metadata: CheckMetadata,
}

impl Default for PermissionOptions {
    fn default() -> Self {
        Self {
            method_permissions: MethodPermissionMap::default(),
            default_tenant_id: None,
            tenant_variable: None,
            subject: SubjectOptions::default(),
            throw_on_permission_denied: true,
            metadata: CheckMetadata::default(),
        }
    }
}

pub struct PermissionChecker {
    engine: Arc<dyn PolicyEngine>,
    options: PermissionOptions,
}

impl std::fmt::Debug for PermissionChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionChecker")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PermissionChecker {
    pub fn new(engine: Arc<dyn PolicyEngine>, options: PermissionOptions) -> Self {
        Self { engine, options }
    }

    /// Rule guarding `entity`; the permission comes from the method mapping
    /// unless set with [`PermissionRule::permission`].
    pub fn rule(self: &Arc<Self>, entity: EntityTarget) -> PermissionRule {
        PermissionRule {
            checker: Arc::clone(self),
            entity,
            permission: None,
        }
    }

    fn tenant(&self, vars: Option<&RequestVars>) -> Option<String> {
        self.options
            .tenant_variable
            .as_deref()
            .and_then(|name| vars?.get_str(name))
            .map(str::to_string)
            .or_else(|| self.options.default_tenant_id.clone())
    }

    pub fn build_request(
        &self,
        rule: &PermissionRule,
        method: &Method,
        params: &HashMap<String, String>,
        vars: Option<&RequestVars>,
    ) -> Result<PermissionCheckRequest, AuthError> {
        let tenant_id = self.tenant(vars);

        let permission = match rule.permission.as_deref() {
            Some(permission) => permission.to_string(),
            None => self
                .options
                .method_permissions
                .permission_for(method)
                .map(str::to_string)
                .ok_or_else(|| AuthError::PermissionMappingMissing {
                    method: method.to_string(),
                })?,
        };

        let entity_id = params
            .get(&rule.entity.id_param)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::EntityIdMissing {
                param: rule.entity.id_param.clone(),
            })?;

        let subject = &self.options.subject;
        let subject_id = vars
            .and_then(|v| v.get_str(&subject.id_variable))
            .ok_or_else(|| AuthError::SubjectIdMissing {
                variable: subject.id_variable.clone(),
            })?;

        Ok(PermissionCheckRequest {
            tenant_id,
            entity: EntityRef::new(rule.entity.entity_type.clone(), entity_id.clone()),
            permission,
            subject: SubjectRef::new(subject.subject_type.clone(), subject_id),
            metadata: self.options.metadata.clone(),
        })
    }

    pub async fn check(
        &self,
        request: PermissionCheckRequest,
    ) -> Result<PermissionDecision, AuthError> {
        let result = self.engine.check(&request).await.map_err(|err| {
            tracing::error!(error = ?err, entity = ?request.entity, "permission check failed");
            AuthError::PolicyEngine(err)
        })?;

        Ok(PermissionDecision { result, request })
    }

    /// `PermissionDenied` for a negative decision when denial is enforced.
    pub fn enforce(&self, decision: &PermissionDecision) -> Result<(), AuthError> {
        if decision.is_allowed() || !self.options.throw_on_permission_denied {
            return Ok(());
        }
        Err(AuthError::PermissionDenied {
            entity_type: decision.request.entity.entity_type.clone(),
            entity_id: decision.request.entity.id.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PermissionRule {
    checker: Arc<PermissionChecker>,
    entity: EntityTarget,
    permission: Option<String>,
}

impl PermissionRule {
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn checker(&self) -> &PermissionChecker {
        &self.checker
    }

    pub async fn evaluate(
        &self,
        method: &Method,
        params: &HashMap<String, String>,
        vars: Option<&RequestVars>,
    ) -> Result<PermissionDecision, AuthError> {
        let request = self.checker.build_request(self, method, params, vars)?;
        self.checker.check(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::policy::engine::PolicyError;
    use crate::services::policy::types::PermissionCheckResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        can: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PolicyEngine for Fixed {
        async fn check(
            &self,
            _request: &PermissionCheckRequest,
        ) -> Result<PermissionCheckResponse, PolicyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PermissionCheckResponse { can: self.can })
        }
    }

    fn checker(options: PermissionOptions) -> Arc<PermissionChecker> {
        let engine = Arc::new(Fixed {
            can: true,
            calls: AtomicUsize::new(0),
        });
        Arc::new(PermissionChecker::new(engine, options))
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn vars(pairs: &[(&str, &str)]) -> RequestVars {
        let mut vars = RequestVars::default();
        for (k, v) in pairs {
            vars.set(*k, *v);
        }
        vars
    }

    #[test]
    fn builds_request_from_route_and_context() {
        let checker = checker(PermissionOptions {
            default_tenant_id: Some("default".into()),
            ..PermissionOptions::default()
        });
        let rule = checker.rule(EntityTarget::new("team", "teamId"));

        let request = checker
            .build_request(
                &rule,
                &Method::GET,
                &params(&[("teamId", "team_1")]),
                Some(&vars(&[("sub", "acct_1")])),
            )
            .expect("request");

        assert_eq!(
            request,
            PermissionCheckRequest {
                tenant_id: Some("default".into()),
                entity: EntityRef::new("team", "team_1"),
                permission: "view".into(),
                subject: SubjectRef::new("user", "acct_1"),
                metadata: CheckMetadata::default(),
            }
        );
    }

    #[test]
    fn tenant_variable_overrides_default() {
        let checker = checker(PermissionOptions {
            default_tenant_id: Some("default".into()),
            tenant_variable: Some("tenant".into()),
            ..PermissionOptions::default()
        });
        let rule = checker.rule(EntityTarget::new("team", "teamId"));
        let p = params(&[("teamId", "team_1")]);

        let with_var = checker
            .build_request(&rule, &Method::GET, &p, Some(&vars(&[("sub", "a"), ("tenant", "acme")])))
            .expect("request");
        assert_eq!(with_var.tenant_id.as_deref(), Some("acme"));

        let without_var = checker
            .build_request(&rule, &Method::GET, &p, Some(&vars(&[("sub", "a")])))
            .expect("request");
        assert_eq!(without_var.tenant_id.as_deref(), Some("default"));
    }

    #[test]
    fn explicit_permission_beats_mapping() {
        let checker = checker(PermissionOptions {
            method_permissions: MethodPermissionMap::empty(),
            ..PermissionOptions::default()
        });
        let rule = checker
            .rule(EntityTarget::new("team", "teamId"))
            .permission("manage");

        let request = checker
            .build_request(
                &rule,
                &Method::DELETE,
                &params(&[("teamId", "team_1")]),
                Some(&vars(&[("sub", "a")])),
            )
            .expect("request");
        assert_eq!(request.permission, "manage");
    }

    #[test]
    fn failures_are_reported_in_order() {
        let checker = checker(PermissionOptions {
            method_permissions: MethodPermissionMap::empty().with(Method::POST, "create"),
            ..PermissionOptions::default()
        });
        let rule = checker.rule(EntityTarget::new("team", "teamId"));

        let err = checker
            .build_request(&rule, &Method::GET, &HashMap::new(), None)
            .expect_err("no mapping");
        assert_eq!(err.to_string(), "no permission mapping found for method 'GET'");

        let err = checker
            .build_request(&rule, &Method::POST, &HashMap::new(), None)
            .expect_err("no entity");
        assert_eq!(
            err.to_string(),
            "entity id 'teamId' not found in the request parameters"
        );

        let err = checker
            .build_request(&rule, &Method::POST, &params(&[("teamId", "t")]), None)
            .expect_err("no subject");
        assert_eq!(err.to_string(), "subject id 'sub' not found in request context");
    }

    #[tokio::test]
    async fn denial_is_enforced_only_when_configured() {
        let engine = Arc::new(Fixed {
            can: false,
            calls: AtomicUsize::new(0),
        });
        let strict = Arc::new(PermissionChecker::new(engine.clone(), PermissionOptions::default()));
        let lenient = Arc::new(PermissionChecker::new(
            engine.clone(),
            PermissionOptions {
                throw_on_permission_denied: false,
                ..PermissionOptions::default()
            },
        ));

        let p = params(&[("teamId", "team_1")]);
        let v = vars(&[("sub", "acct_1")]);

        let rule = strict.rule(EntityTarget::new("team", "teamId"));
        let decision = rule.evaluate(&Method::GET, &p, Some(&v)).await.expect("decision");
        assert!(!decision.is_allowed());
        assert!(matches!(
            strict.enforce(&decision),
            Err(AuthError::PermissionDenied { .. })
        ));
        assert!(lenient.enforce(&decision).is_ok());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }
}

use crate::diff::compute_rule_diff;
use crate::errors::ReconcileError;
use crate::merge::merge;
use crate::store::{RoleStore, StoreError};
use crate::types::{ReconcileOperation, ReconcileResult, Role};

/// Total fetch-compute-write attempts per [`ReconcileOptions::run`] call.
/// Bounds the retry when another actor keeps creating and deleting the role
/// while we reconcile.
pub const MAX_ATTEMPTS: usize = 3;

/// One reconciliation request: converge the persisted role named
/// `role.name` toward `role`.
pub struct ReconcileOptions<S> {
    /// The expected role that will be reconciled
    pub role: Role,
    /// Perform writes. When false, results are returned as a dry-run.
    pub confirm: bool,
    /// Remove permissions the persisted role has beyond the expected set
    /// (strict policy) instead of leaving them in place (union policy).
    pub remove_extra_permissions: bool,
    /// Used to look up the existing role, and create/update it when confirmed
    pub store: S,
}

impl<S: RoleStore> ReconcileOptions<S> {
    /// Reconcile the role against the store.
    ///
    /// Losing a race to a concurrent creator (on create) or deleter (on
    /// update) restarts the whole fetch-compute-write cycle, bounded by
    /// [`MAX_ATTEMPTS`]. Version conflicts on update are not retried here;
    /// they surface to the caller.
    pub async fn run(&self) -> Result<ReconcileResult, ReconcileError> {
        let name = &self.role.name;
        for attempt in 0..MAX_ATTEMPTS {
            let mut result = match self.store.get(name).await {
                Err(StoreError::NotFound(_)) => ReconcileResult {
                    role: self.role.clone(),
                    missing_rules: self.role.rules.clone(),
                    extra_rules: Vec::new(),
                    operation: ReconcileOperation::Create,
                    protected: false,
                },
                Err(err) => return Err(err.into()),
                Ok(existing) => {
                    compute_reconciled_role(&existing, &self.role, self.remove_extra_permissions)
                }
            };

            // An opted-out role short-circuits before the dry-run check
            if result.protected {
                tracing::debug!(role = %name, "role is protected, skipping reconciliation");
                return Ok(result);
            }
            if !self.confirm {
                tracing::debug!(role = %name, operation = %result.operation, "dry-run");
                return Ok(result);
            }

            match result.operation {
                ReconcileOperation::Create => match self.store.create(&result.role).await {
                    // Created since we started this reconcile, re-run
                    Err(StoreError::AlreadyExists(_)) => {
                        tracing::debug!(role = %name, attempt, "role appeared during reconcile, retrying");
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                    Ok(created) => {
                        tracing::info!(role = %name, "created role");
                        result.role = created;
                        return Ok(result);
                    }
                },

                ReconcileOperation::Update => match self.store.update(&result.role).await {
                    // Deleted since we started this reconcile, re-run
                    Err(StoreError::NotFound(_)) => {
                        tracing::debug!(role = %name, attempt, "role disappeared during reconcile, retrying");
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                    Ok(updated) => {
                        tracing::info!(
                            role = %name,
                            missing = result.missing_rules.len(),
                            extra = result.extra_rules.len(),
                            "updated role"
                        );
                        result.role = updated;
                        return Ok(result);
                    }
                },

                ReconcileOperation::None => return Ok(result),

                // Recreate is reserved; reaching it is a logic error
                other => return Err(ReconcileError::InvalidOperation(other, name.clone())),
            }
        }

        Err(ReconcileError::ExceededMaxAttempts {
            name: name.clone(),
            attempts: MAX_ATTEMPTS,
        })
    }
}

/// Compute the role that must be updated to make the existing role's
/// permissions and metadata match the expected role's.
///
/// Metadata merges give the existing role's own keys precedence; expected
/// keys only fill gaps. This lets administrators pin annotations and labels
/// that would otherwise be auto-managed.
fn compute_reconciled_role(existing: &Role, expected: &Role, remove_extra: bool) -> ReconcileResult {
    let mut result = ReconcileResult {
        role: existing.clone(),
        missing_rules: Vec::new(),
        extra_rules: Vec::new(),
        operation: ReconcileOperation::None,
        protected: existing.is_protected(),
    };

    result.role.annotations = merge(&[expected.annotations.as_ref(), existing.annotations.as_ref()]);
    if result.role.annotations != existing.annotations {
        result.operation = ReconcileOperation::Update;
    }
    result.role.labels = merge(&[expected.labels.as_ref(), existing.labels.as_ref()]);
    if result.role.labels != existing.labels {
        result.operation = ReconcileOperation::Update;
    }

    let diff = compute_rule_diff(&existing.rules, &expected.rules, remove_extra);
    result.missing_rules = diff.missing;
    result.extra_rules = diff.extra;
    if diff.changed {
        result.role.rules = diff.rules;
        result.operation = ReconcileOperation::Update;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PolicyRule, AUTOUPDATE_ANNOTATION};
    use std::collections::HashMap;

    fn rule(verbs: &[&str], resources: &[&str]) -> PolicyRule {
        PolicyRule {
            verbs: verbs.iter().map(|s| s.to_string()).collect(),
            api_groups: vec!["".into()],
            resources: resources.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn role(name: &str, rules: Vec<PolicyRule>) -> Role {
        Role {
            name: name.into(),
            rules,
            ..Default::default()
        }
    }

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_matching_role_is_a_noop() {
        let existing = role("viewer", vec![rule(&["get", "list"], &["pods"])]);
        let result = compute_reconciled_role(&existing, &existing.clone(), false);
        assert_eq!(result.operation, ReconcileOperation::None);
        assert_eq!(result.role, existing);
    }

    #[test]
    fn test_existing_metadata_wins_on_conflict() {
        let mut existing = role("viewer", vec![]);
        existing.labels = Some(map(&[("tier", "pinned"), ("env", "prod")]));
        let mut expected = role("viewer", vec![]);
        expected.labels = Some(map(&[("tier", "managed"), ("team", "platform")]));

        let result = compute_reconciled_role(&existing, &expected, false);
        assert_eq!(result.operation, ReconcileOperation::Update);
        let labels = result.role.labels.unwrap();
        // existing keys win, expected keys fill gaps
        assert_eq!(labels.get("tier").unwrap(), "pinned");
        assert_eq!(labels.get("env").unwrap(), "prod");
        assert_eq!(labels.get("team").unwrap(), "platform");
    }

    #[test]
    fn test_unset_to_empty_metadata_is_a_change() {
        let existing = role("viewer", vec![]);
        let mut expected = role("viewer", vec![]);
        expected.annotations = Some(HashMap::new());

        let result = compute_reconciled_role(&existing, &expected, false);
        assert_eq!(result.operation, ReconcileOperation::Update);
        assert_eq!(result.role.annotations, Some(HashMap::new()));

        // both unset stays unset, and is not a change
        let result = compute_reconciled_role(&existing, &role("viewer", vec![]), false);
        assert_eq!(result.operation, ReconcileOperation::None);
        assert!(result.role.annotations.is_none());
    }

    #[test]
    fn test_protected_flag_from_annotation() {
        let mut existing = role("viewer", vec![]);
        existing.annotations = Some(map(&[(AUTOUPDATE_ANNOTATION, "false")]));
        let expected = role("viewer", vec![rule(&["get"], &["pods"])]);

        let result = compute_reconciled_role(&existing, &expected, false);
        assert!(result.protected);
        // the diff is still computed and reported
        assert_eq!(result.operation, ReconcileOperation::Update);
        assert_eq!(result.missing_rules, vec![rule(&["get"], &["pods"])]);
    }

    #[test]
    fn test_rule_change_combines_with_metadata_change() {
        let existing = role("viewer", vec![rule(&["get"], &["pods"])]);
        let mut expected = role("viewer", vec![rule(&["get", "list"], &["pods"])]);
        expected.labels = Some(map(&[("team", "platform")]));

        let result = compute_reconciled_role(&existing, &expected, false);
        assert_eq!(result.operation, ReconcileOperation::Update);
        assert_eq!(result.missing_rules, vec![rule(&["list"], &["pods"])]);
        assert_eq!(
            result.role.rules,
            vec![rule(&["get"], &["pods"]), rule(&["list"], &["pods"])]
        );
        assert_eq!(result.role.labels.unwrap().get("team").unwrap(), "platform");
    }
}

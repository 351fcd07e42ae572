use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Annotation key that controls automatic reconciliation of a persisted role.
/// Setting it to the literal string `"false"` opts the role out of all
/// automatic updates; any other value (or no annotation at all) leaves the
/// role eligible.
pub const AUTOUPDATE_ANNOTATION: &str = "rolewarden/autoupdate";

/// An atomic access grant: which verbs may be applied to which resources.
///
/// The reconciliation engine never interprets the individual fields; it only
/// compares rules through [`crate::coverage::covers`]. `"*"` acts as a
/// wildcard in `verbs`, `api_groups` and `resources`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Allowed verbs (e.g. "get", "list", "create", "*" for all)
    pub verbs: Vec<String>,
    /// API groups this rule applies to ("" for core, "*" for all)
    #[serde(default)]
    pub api_groups: Vec<String>,
    /// Resource types (e.g. "pods", "secrets", "*" for all)
    #[serde(default)]
    pub resources: Vec<String>,
    /// Optional restriction to named resource instances; empty means all
    #[serde(default)]
    pub resource_names: Vec<String>,
    /// Non-resource URL paths this rule grants; a trailing "/*" matches a subtree
    #[serde(default)]
    pub non_resource_urls: Vec<String>,
}

/// A named, persisted bundle of access-granting rules plus metadata.
///
/// `annotations` and `labels` distinguish between absent (`None`) and present
/// but empty (`Some` of an empty map); the engine compares the two states
/// differently when deciding whether a metadata change occurred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Unique key in the store
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

impl Role {
    /// True iff the role carries the auto-update annotation set to `"false"`.
    pub fn is_protected(&self) -> bool {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(AUTOUPDATE_ANNOTATION))
            .map(|v| v == "false")
            .unwrap_or(false)
    }
}

/// The store operation required to converge a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileOperation {
    Create,
    Update,
    /// Reserved; no code path currently produces or executes it.
    Recreate,
    None,
}

impl std::fmt::Display for ReconcileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReconcileOperation::Create => "create",
            ReconcileOperation::Update => "update",
            ReconcileOperation::Recreate => "recreate",
            ReconcileOperation::None => "none",
        };
        f.write_str(s)
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileResult {
    /// The reconciled role. If the run was a dry-run, or the existing role
    /// was protected, this role was not persisted.
    pub role: Role,
    /// Expected rules that were missing from the currently persisted role
    pub missing_rules: Vec<PolicyRule>,
    /// Extra permissions the currently persisted role had
    pub extra_rules: Vec<PolicyRule>,
    /// The store operation required to reconcile. `None` means the persisted
    /// role already matched. The operation was actually performed only when
    /// the run was confirmed and the role was not protected.
    pub operation: ReconcileOperation,
    /// An existing role opted out of reconciliation; no write was issued.
    pub protected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_protected_only_on_literal_false() {
        let mut role = Role {
            name: "viewer".into(),
            ..Default::default()
        };
        assert!(!role.is_protected());

        let mut ann = HashMap::new();
        ann.insert(AUTOUPDATE_ANNOTATION.to_string(), "true".to_string());
        role.annotations = Some(ann.clone());
        assert!(!role.is_protected());

        ann.insert(AUTOUPDATE_ANNOTATION.to_string(), "false".to_string());
        role.annotations = Some(ann);
        assert!(role.is_protected());
    }

    #[test]
    fn test_role_serde_omits_absent_maps() {
        let role = Role {
            name: "viewer".into(),
            rules: vec![PolicyRule {
                verbs: vec!["get".into()],
                resources: vec!["pods".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&role).unwrap();
        assert!(json.get("annotations").is_none());
        assert!(json.get("labels").is_none());

        let back: Role = serde_json::from_value(json).unwrap();
        assert_eq!(back, role);
        assert!(back.annotations.is_none());
    }
}

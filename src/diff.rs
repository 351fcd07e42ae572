use crate::coverage::covers;
use crate::types::PolicyRule;

/// Outcome of comparing an existing rule set against the expected one.
#[derive(Debug, Clone, Default)]
pub struct RuleDiff {
    /// Expected rules not covered by the existing set
    pub missing: Vec<PolicyRule>,
    /// Existing rules not covered by the expected set
    pub extra: Vec<PolicyRule>,
    /// The rule set the role should end up with
    pub rules: Vec<PolicyRule>,
    /// Whether `rules` differs from the existing set
    pub changed: bool,
}

/// Compute missing and extra rules and pick the resulting rule set.
///
/// With `remove_extra = false` (union policy), missing rules are appended to
/// the existing set and extras are retained. With `remove_extra = true`
/// (strict policy), any difference in either direction replaces the set with
/// exactly `expected`.
pub fn compute_rule_diff(
    existing: &[PolicyRule],
    expected: &[PolicyRule],
    remove_extra: bool,
) -> RuleDiff {
    let (_, extra) = covers(expected, existing);
    let (_, missing) = covers(existing, expected);

    let mut diff = RuleDiff {
        missing,
        extra,
        rules: existing.to_vec(),
        changed: false,
    };

    if !remove_extra && !diff.missing.is_empty() {
        diff.rules.extend(diff.missing.iter().cloned());
        diff.changed = true;
    } else if remove_extra && (!diff.missing.is_empty() || !diff.extra.is_empty()) {
        diff.rules = expected.to_vec();
        diff.changed = true;
    }

    diff
}

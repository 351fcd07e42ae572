//! Rule subsumption: decides whether one rule set already grants everything
//! another rule set grants.
//!
//! Rules are first broken down into atomic grants (one verb on one resource
//! in one API group, optionally narrowed to a resource name, or one verb on
//! one non-resource URL). An atom is covered when some single rule in the
//! owning set grants it; the owning set as a whole covers a target set when
//! every atom of every target rule is covered.

use crate::types::PolicyRule;

/// Returns whether `owner` covers every grant in `target`, together with the
/// atomic rules of `target` that are not covered.
pub fn covers(owner: &[PolicyRule], target: &[PolicyRule]) -> (bool, Vec<PolicyRule>) {
    let mut uncovered = Vec::new();
    for rule in target {
        for atom in break_down(rule) {
            if !owner.iter().any(|o| rule_covers(o, &atom)) {
                uncovered.push(atom);
            }
        }
    }
    (uncovered.is_empty(), uncovered)
}

/// Split a rule into atomic grants so each can be tested independently.
fn break_down(rule: &PolicyRule) -> Vec<PolicyRule> {
    let mut atoms = Vec::new();
    for verb in &rule.verbs {
        if !rule.resources.is_empty() {
            for group in &rule.api_groups {
                for resource in &rule.resources {
                    if rule.resource_names.is_empty() {
                        atoms.push(PolicyRule {
                            verbs: vec![verb.clone()],
                            api_groups: vec![group.clone()],
                            resources: vec![resource.clone()],
                            ..Default::default()
                        });
                    } else {
                        for name in &rule.resource_names {
                            atoms.push(PolicyRule {
                                verbs: vec![verb.clone()],
                                api_groups: vec![group.clone()],
                                resources: vec![resource.clone()],
                                resource_names: vec![name.clone()],
                                ..Default::default()
                            });
                        }
                    }
                }
            }
        }
        for url in &rule.non_resource_urls {
            atoms.push(PolicyRule {
                verbs: vec![verb.clone()],
                non_resource_urls: vec![url.clone()],
                ..Default::default()
            });
        }
    }
    atoms
}

/// True iff a single `owner` rule grants everything the atomic rule grants.
fn rule_covers(owner: &PolicyRule, atom: &PolicyRule) -> bool {
    let verbs_ok = atom
        .verbs
        .iter()
        .all(|v| has_all(&owner.verbs) || owner.verbs.contains(v));

    let resources_ok = atom.resources.is_empty()
        || (atom
            .api_groups
            .iter()
            .all(|g| has_all(&owner.api_groups) || owner.api_groups.contains(g))
            && atom
                .resources
                .iter()
                .all(|r| has_all(&owner.resources) || owner.resources.contains(r))
            && resource_names_cover(owner, atom));

    let urls_ok = atom
        .non_resource_urls
        .iter()
        .all(|u| owner.non_resource_urls.iter().any(|o| url_covers(o, u)));

    verbs_ok && resources_ok && urls_ok
}

fn has_all(items: &[String]) -> bool {
    items.iter().any(|i| i == "*")
}

/// An owner with no resource-name restriction covers every name; a restricted
/// owner never covers an unrestricted atom.
fn resource_names_cover(owner: &PolicyRule, atom: &PolicyRule) -> bool {
    if owner.resource_names.is_empty() {
        return true;
    }
    !atom.resource_names.is_empty()
        && atom
            .resource_names
            .iter()
            .all(|n| owner.resource_names.contains(n))
}

/// A URL pattern covers a path on exact match, a bare `*`, or a trailing
/// `/*` subtree wildcard.
fn url_covers(pattern: &str, path: &str) -> bool {
    if pattern == "*" || pattern == path {
        return true;
    }
    pattern
        .strip_suffix("/*")
        .is_some_and(|prefix| path.starts_with(prefix) && path.len() > prefix.len())
}

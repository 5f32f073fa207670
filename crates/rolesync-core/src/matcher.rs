//! Role Matcher: finds the secondary role equivalent to a primary role
//!
//! Roles in the two groups share no identifiers, so equivalence is decided
//! by display name. The strategy sits behind [`RoleMatcher`] so a different
//! join (for example an explicit mapping table) can replace it without
//! touching the reconciler or the event handler.

use crate::model::{Role, RoleId, normalize_name};

/// Strategy for mapping a primary role name onto a secondary role
pub trait RoleMatcher: Send + Sync {
    /// Return the id of the candidate equivalent to `target_name`, if any.
    ///
    /// `candidates` is in the secondary group's native role order.
    fn find_equivalent(&self, target_name: &str, candidates: &[Role]) -> Option<RoleId>;
}

/// Substring containment on normalized names, first match wins.
///
/// A candidate matches when its normalized name contains the normalized
/// target. The reverse direction is never checked and there is no scoring,
/// so a short target can match several long names and the earliest one in
/// `candidates` is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainmentMatcher {
    match_empty: bool,
}

impl ContainmentMatcher {
    /// Matcher that treats an empty target name as "no match"
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher that lets an empty target match the first candidate
    pub fn permissive() -> Self {
        Self { match_empty: true }
    }

    pub fn matches_empty_names(&self) -> bool {
        self.match_empty
    }
}

impl RoleMatcher for ContainmentMatcher {
    fn find_equivalent(&self, target_name: &str, candidates: &[Role]) -> Option<RoleId> {
        let target = normalize_name(target_name);
        if target.is_empty() && !self.match_empty {
            tracing::debug!("empty role name never matches");
            return None;
        }

        candidates
            .iter()
            .find(|candidate| normalize_name(&candidate.name).contains(&target))
            .map(|candidate| candidate.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn roles(pairs: &[(u64, &str)]) -> Vec<Role> {
        pairs.iter().map(|(id, name)| Role::new(*id, *name)).collect()
    }

    #[test]
    fn test_first_containment_match_wins() {
        let candidates = roles(&[(1, "Junior Officer"), (2, "Officer Corps")]);

        let found = ContainmentMatcher::new().find_equivalent("Officer", &candidates);

        assert_eq!(found, Some(RoleId(1)));
    }

    #[test]
    fn test_no_match_returns_none() {
        let candidates = roles(&[(1, "Alpha"), (2, "Beta")]);

        assert_eq!(ContainmentMatcher::new().find_equivalent("Zzz", &candidates), None);
    }

    #[rstest]
    #[case("officer", Some(1))]
    #[case("  OFFICER  ", Some(1))]
    #[case("Officer Corps", Some(2))]
    #[case("Junior Officer Extra", None)]
    fn test_normalization_and_direction(#[case] target: &str, #[case] expected: Option<u64>) {
        let candidates = roles(&[(1, " Junior Officer"), (2, "OFFICER CORPS ")]);

        let found = ContainmentMatcher::new().find_equivalent(target, &candidates);

        assert_eq!(found, expected.map(RoleId));
    }

    #[test]
    fn test_empty_target_is_no_match_by_default() {
        let candidates = roles(&[(1, "Alpha")]);

        assert_eq!(ContainmentMatcher::new().find_equivalent("   ", &candidates), None);
    }

    #[test]
    fn test_permissive_empty_target_matches_first_candidate() {
        // Degenerate behavior kept behind an explicit opt-in
        let candidates = roles(&[(7, "Alpha"), (8, "Beta")]);

        let found = ContainmentMatcher::permissive().find_equivalent("", &candidates);

        assert_eq!(found, Some(RoleId(7)));
    }

    #[test]
    fn test_empty_candidate_list() {
        assert_eq!(ContainmentMatcher::new().find_equivalent("Alpha", &[]), None);
    }

    proptest! {
        #[test]
        fn prop_result_always_contains_target(
            target in "[a-c]{1,3}",
            names in proptest::collection::vec("[a-c ]{0,8}", 0..8),
        ) {
            let candidates: Vec<Role> = names
                .iter()
                .enumerate()
                .map(|(i, n)| Role::new(i as u64, n.as_str()))
                .collect();

            match ContainmentMatcher::new().find_equivalent(&target, &candidates) {
                Some(id) => {
                    let idx = id.get() as usize;
                    prop_assert!(normalize_name(&candidates[idx].name).contains(&target));
                    // nothing earlier matched
                    for earlier in &candidates[..idx] {
                        prop_assert!(!normalize_name(&earlier.name).contains(&target));
                    }
                }
                None => {
                    for c in &candidates {
                        prop_assert!(!normalize_name(&c.name).contains(&target));
                    }
                }
            }
        }
    }
}

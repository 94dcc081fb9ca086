// Selection engine: toggle-time rule checks and derived roster statistics.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::catalog::Match;
use crate::config::ConstraintConfig;
use crate::squad::player::{Credits, Player, Role};
use crate::squad::roster::{DerivedStatistics, RoleCounts, RosterState};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a player cannot be added. Messages are display-ready.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("you can only select {cap} players")]
    RosterFull { cap: usize },

    #[error("not enough credits left to select {name}")]
    InsufficientBudget {
        name: String,
        cost: Credits,
        remaining: Credits,
    },

    #[error("you can select a maximum of {cap} players from {team}")]
    TeamQuotaExceeded { team: String, cap: usize },

    #[error("you have already selected the maximum number of {role} players")]
    RoleQuotaExceeded { role: Role, quota: usize },
}

// ---------------------------------------------------------------------------
// Toggle results
// ---------------------------------------------------------------------------

/// Successful toggle outcome carrying the next roster snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Toggle {
    Added(RosterState),
    Removed(RosterState),
}

impl Toggle {
    pub fn roster(&self) -> &RosterState {
        match self {
            Toggle::Added(r) | Toggle::Removed(r) => r,
        }
    }

    pub fn into_roster(self) -> RosterState {
        match self {
            Toggle::Added(r) | Toggle::Removed(r) => r,
        }
    }

    pub fn action(&self) -> ToggleAction {
        match self {
            Toggle::Added(_) => ToggleAction::Added,
            Toggle::Removed(_) => ToggleAction::Removed,
        }
    }
}

/// What a toggle did, without the roster payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Added,
    Removed,
}

// ---------------------------------------------------------------------------
// The engine
// ---------------------------------------------------------------------------

/// Toggle `player` in or out of `roster` under `rules`.
///
/// A selected player is always removable, whatever the rules say. An
/// unselected player passes the rule checks in a fixed order (capacity,
/// budget, team quota, role quota) and the first violation is the one
/// reported. The input roster is never modified; the result carries the
/// next snapshot.
pub fn try_toggle(
    roster: &RosterState,
    player: &Player,
    rules: &ConstraintConfig,
) -> Result<Toggle, SelectionError> {
    if roster.contains(player.id) {
        return Ok(Toggle::Removed(roster.with_removed(player.id)));
    }

    if roster.len() >= rules.squad_size {
        return Err(SelectionError::RosterFull {
            cap: rules.squad_size,
        });
    }

    let remaining = rules.credit_cap.saturating_sub(roster.spent());
    if remaining < player.credit {
        return Err(SelectionError::InsufficientBudget {
            name: player.name.clone(),
            cost: player.credit,
            remaining,
        });
    }

    if roster.team_count(&player.team) >= rules.per_team_cap {
        return Err(SelectionError::TeamQuotaExceeded {
            team: player.team.clone(),
            cap: rules.per_team_cap,
        });
    }

    let quota = rules.role_quotas.quota(player.role);
    if roster.role_count(player.role) >= quota {
        return Err(SelectionError::RoleQuotaExceeded {
            role: player.role,
            quota,
        });
    }

    Ok(Toggle::Added(roster.with_added(player)))
}

/// Recompute the display statistics for `roster` in the context of
/// `fixture`. Both match teams are always present in the team counts,
/// seeded at zero, so an empty roster still renders a 0/0 split.
pub fn derive_statistics(
    roster: &RosterState,
    fixture: &Match,
    rules: &ConstraintConfig,
) -> DerivedStatistics {
    let mut team_counts = BTreeMap::new();
    team_counts.insert(fixture.team_a.clone(), 0);
    team_counts.insert(fixture.team_b.clone(), 0);

    let mut spent = Credits::ZERO;
    let mut role_counts = RoleCounts::default();
    for player in roster.iter() {
        spent = spent.saturating_add(player.credit);
        *team_counts.entry(player.team.clone()).or_insert(0) += 1;
        role_counts.bump(player.role);
    }

    DerivedStatistics {
        player_count: roster.len(),
        budget_remaining: rules.credit_cap.saturating_sub(spent),
        team_counts,
        role_counts,
    }
}

/// A roster is complete when it holds exactly the configured squad size.
pub fn is_complete(roster: &RosterState, rules: &ConstraintConfig) -> bool {
    roster.len() == rules.squad_size
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod props {
    use proptest::prelude::*;

    use super::*;

    /// Two teams of 18 (2 GK, 6 DEF, 6 MID, 4 FWD each), all costing at
    /// most 9.0, so eleven selections can never exhaust the 100.0 cap.
    fn sample_pool() -> Vec<Player> {
        let mut pool = Vec::new();
        let mut id = 0;
        for team in ["Alpha", "Beta"] {
            for (role, count) in [
                (Role::Goalkeeper, 2),
                (Role::Defender, 6),
                (Role::Midfielder, 6),
                (Role::Forward, 4),
            ] {
                for _ in 0..count {
                    id += 1;
                    pool.push(Player {
                        id,
                        name: format!("{team} {role} {id}"),
                        team: team.to_string(),
                        role,
                        credit: Credits::from_tenths(40 + (id % 50)),
                    });
                }
            }
        }
        pool
    }

    fn sample_fixture() -> Match {
        Match {
            id: "m1".to_string(),
            team_a: "Alpha".to_string(),
            team_b: "Beta".to_string(),
            kickoff: "2026-09-04T18:30:00Z".parse().unwrap(),
            venue: "Test Ground".to_string(),
            format: "League".to_string(),
            players: Vec::new(),
        }
    }

    /// Walk `order`, adding every player the rules accept, until the squad
    /// is complete. The sample pool is rich enough that this always fills.
    fn greedy_eleven(pool: &[Player], order: &[usize], rules: &ConstraintConfig) -> RosterState {
        let mut roster = RosterState::new();
        for &index in order {
            if is_complete(&roster, rules) {
                break;
            }
            if roster.contains(pool[index].id) {
                continue;
            }
            if let Ok(Toggle::Added(next)) = try_toggle(&roster, &pool[index], rules) {
                roster = next;
            }
        }
        roster
    }

    proptest! {
        #[test]
        fn any_toggle_script_preserves_every_invariant(
            script in proptest::collection::vec(0usize..36, 0..40),
        ) {
            let pool = sample_pool();
            let rules = ConstraintConfig::default();
            let mut roster = RosterState::new();

            for index in script {
                if let Ok(toggle) = try_toggle(&roster, &pool[index], &rules) {
                    roster = toggle.into_roster();
                }

                prop_assert!(roster.len() <= rules.squad_size);
                prop_assert!(roster.spent() <= rules.credit_cap);
                prop_assert!(roster.team_count("Alpha") <= rules.per_team_cap);
                prop_assert!(roster.team_count("Beta") <= rules.per_team_cap);
                for role in Role::ALL {
                    prop_assert!(roster.role_count(role) <= rules.role_quotas.quota(role));
                }
                prop_assert!(roster.duplicate_id().is_none());
            }
        }

        #[test]
        fn toggling_twice_restores_the_roster(
            script in proptest::collection::vec(0usize..36, 0..20),
            pick in 0usize..36,
        ) {
            let pool = sample_pool();
            let rules = ConstraintConfig::default();
            let mut roster = RosterState::new();
            for index in script {
                if let Ok(toggle) = try_toggle(&roster, &pool[index], &rules) {
                    roster = toggle.into_roster();
                }
            }

            let player = &pool[pick];
            if let Ok(first) = try_toggle(&roster, player, &rules) {
                let second = try_toggle(first.roster(), player, &rules)
                    .expect("reversing a toggle must always be legal");
                prop_assert_eq!(second.into_roster(), roster);
            }
        }

        #[test]
        fn selection_order_never_changes_the_outcome(
            order_a in Just((0usize..36).collect::<Vec<_>>()).prop_shuffle(),
            order_b in Just((0usize..36).collect::<Vec<_>>()).prop_shuffle(),
        ) {
            let pool = sample_pool();
            let rules = ConstraintConfig::default();

            let eleven = greedy_eleven(&pool, &order_a, &rules);
            prop_assert_eq!(eleven.len(), 11);

            // Re-select the same squad in an unrelated order: every step
            // must be legal and the outcome identical.
            let replay: Vec<&Player> = order_b
                .iter()
                .map(|&i| &pool[i])
                .filter(|p| eleven.contains(p.id))
                .collect();

            let mut roster = RosterState::new();
            for player in replay {
                let toggle = try_toggle(&roster, player, &rules)
                    .expect("any order of a legal squad must be accepted");
                roster = toggle.into_roster();
            }

            prop_assert_eq!(&roster, &eleven);

            let fixture = sample_fixture();
            prop_assert_eq!(
                derive_statistics(&roster, &fixture, &rules),
                derive_statistics(&eleven, &fixture, &rules)
            );
        }
    }
}

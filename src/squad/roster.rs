// Roster snapshots and the statistics derived from them.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::squad::player::{Credits, Player, Role};

// ---------------------------------------------------------------------------
// RosterState
// ---------------------------------------------------------------------------

/// The players currently selected for one (user, match) pairing, ordered by
/// selection time and unique by player id.
///
/// A roster is a value: the selection engine never mutates one in place, it
/// returns new snapshots. The serialized form is a bare JSON array of
/// players, which is also the persisted form.
///
/// Two rosters compare equal when they contain the same players, regardless
/// of the order they were picked in. Selection order is kept for display,
/// but the team itself is a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterState {
    players: Vec<Player>,
}

impl RosterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from an explicit player list, preserving order.
    pub fn from_players(players: Vec<Player>) -> Self {
        Self { players }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Membership is decided by player id alone.
    pub fn contains(&self, player_id: u32) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Selected players in selection order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Total credits consumed by the selected players.
    pub fn spent(&self) -> Credits {
        self.players
            .iter()
            .fold(Credits::ZERO, |acc, p| acc.saturating_add(p.credit))
    }

    pub fn team_count(&self, team: &str) -> usize {
        self.players.iter().filter(|p| p.team == team).count()
    }

    pub fn role_count(&self, role: Role) -> usize {
        self.players.iter().filter(|p| p.role == role).count()
    }

    /// Players grouped by role in display order. Roles with nobody selected
    /// are included with empty groups so callers can render a stable section
    /// list.
    pub fn by_role(&self) -> Vec<(Role, Vec<&Player>)> {
        Role::ALL
            .iter()
            .map(|&role| {
                let group = self.players.iter().filter(|p| p.role == role).collect();
                (role, group)
            })
            .collect()
    }

    /// New snapshot with `player` appended. Constraint checks are the
    /// selection engine's job, not this type's.
    pub(crate) fn with_added(&self, player: &Player) -> RosterState {
        let mut players = self.players.clone();
        players.push(player.clone());
        RosterState { players }
    }

    /// New snapshot without the given player id.
    pub(crate) fn with_removed(&self, player_id: u32) -> RosterState {
        let players = self
            .players
            .iter()
            .filter(|p| p.id != player_id)
            .cloned()
            .collect();
        RosterState { players }
    }

    /// First player id that appears more than once, if any. Used to detect
    /// tampered or damaged persisted rosters.
    pub(crate) fn duplicate_id(&self) -> Option<u32> {
        let mut seen = HashSet::new();
        for p in &self.players {
            if !seen.insert(p.id) {
                return Some(p.id);
            }
        }
        None
    }
}

impl PartialEq for RosterState {
    fn eq(&self, other: &Self) -> bool {
        if self.players.len() != other.players.len() {
            return false;
        }
        let mut ours: Vec<u32> = self.players.iter().map(|p| p.id).collect();
        let mut theirs: Vec<u32> = other.players.iter().map(|p| p.id).collect();
        ours.sort_unstable();
        theirs.sort_unstable();
        ours == theirs
    }
}

impl Eq for RosterState {}

// ---------------------------------------------------------------------------
// Derived statistics
// ---------------------------------------------------------------------------

/// Per-role selection counts. All four roles are always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleCounts {
    pub gk: usize,
    pub def: usize,
    pub mid: usize,
    pub fwd: usize,
}

impl RoleCounts {
    pub fn count(&self, role: Role) -> usize {
        match role {
            Role::Goalkeeper => self.gk,
            Role::Defender => self.def,
            Role::Midfielder => self.mid,
            Role::Forward => self.fwd,
        }
    }

    pub(crate) fn bump(&mut self, role: Role) {
        match role {
            Role::Goalkeeper => self.gk += 1,
            Role::Defender => self.def += 1,
            Role::Midfielder => self.mid += 1,
            Role::Forward => self.fwd += 1,
        }
    }
}

/// Aggregates recomputed from a roster on every read.
///
/// Never cached inside `RosterState` and never persisted, so the figures
/// cannot drift from the roster they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedStatistics {
    pub player_count: usize,
    /// Budget cap minus total spent, floored at zero.
    pub budget_remaining: Credits,
    /// Selected players per source team. Both of the match's teams are
    /// always present, zero included.
    pub team_counts: BTreeMap<String, usize>,
    pub role_counts: RoleCounts,
}

impl DerivedStatistics {
    pub fn team_count(&self, team: &str) -> usize {
        self.team_counts.get(team).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

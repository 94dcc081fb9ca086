// Selection sessions: one user picking a team for one match, persisted
// through the team vault.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Match;
use crate::config::ConstraintConfig;
use crate::squad::player::{Player, Role};
use crate::squad::roster::{DerivedStatistics, RosterState};
use crate::squad::select::{self, SelectionError, ToggleAction};
use crate::store::{KeyValueStore, StorageError, TeamVault};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("select {required} players to save this team ({selected} selected)")]
    Incomplete { selected: usize, required: usize },

    #[error("player {id} is not in this match")]
    UnknownPlayer { id: u32 },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ---------------------------------------------------------------------------
// Selection session
// ---------------------------------------------------------------------------

/// One user building a team for one match. The roster lives in memory until
/// `finalize` writes it to the vault; `discard` deletes the saved copy.
#[derive(Debug)]
pub struct SelectionSession {
    user: String,
    fixture: Match,
    rules: ConstraintConfig,
    roster: RosterState,
}

impl SelectionSession {
    /// Begin a fresh session with an empty roster.
    pub fn start(user: &str, fixture: Match, rules: ConstraintConfig) -> Self {
        Self {
            user: user.to_string(),
            fixture,
            rules,
            roster: RosterState::new(),
        }
    }

    /// Begin a session from whatever the vault holds for this user and
    /// match: the saved roster verbatim, or an empty roster when nothing
    /// was saved. A saved team that no longer fits the current rules is
    /// restored anyway and logged; the usual checks still apply to any
    /// further additions.
    pub async fn resume<S>(
        store: &S,
        user: &str,
        fixture: Match,
        rules: ConstraintConfig,
    ) -> Result<Self, SessionError>
    where
        S: KeyValueStore + ?Sized,
    {
        let vault = TeamVault::new(store);
        let roster = vault.load(user, &fixture.id).await?.unwrap_or_default();

        if roster.len() > rules.squad_size || roster.spent() > rules.credit_cap {
            warn!(
                user,
                match_id = %fixture.id,
                players = roster.len(),
                spent = %roster.spent(),
                "restored team no longer fits the current rules"
            );
        }

        Ok(Self {
            user: user.to_string(),
            fixture,
            rules,
            roster,
        })
    }

    /// Toggle a player from this match's pool in or out of the roster.
    pub fn toggle(&mut self, player_id: u32) -> Result<ToggleAction, SessionError> {
        let player = self
            .fixture
            .player(player_id)
            .ok_or(SessionError::UnknownPlayer { id: player_id })?;

        let toggle = select::try_toggle(&self.roster, player, &self.rules)?;
        let action = toggle.action();
        self.roster = toggle.into_roster();
        debug!(
            user = %self.user,
            match_id = %self.fixture.id,
            player_id,
            ?action,
            players = self.roster.len(),
            "toggled"
        );
        Ok(action)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn fixture(&self) -> &Match {
        &self.fixture
    }

    pub fn roster(&self) -> &RosterState {
        &self.roster
    }

    /// Recompute the display statistics for the current roster.
    pub fn statistics(&self) -> DerivedStatistics {
        select::derive_statistics(&self.roster, &self.fixture, &self.rules)
    }

    pub fn is_complete(&self) -> bool {
        select::is_complete(&self.roster, &self.rules)
    }

    /// Slots still to fill before the team can be saved.
    pub fn remaining_slots(&self) -> usize {
        self.rules.squad_size.saturating_sub(self.roster.len())
    }

    /// The current roster grouped by role for preview displays.
    pub fn roster_by_role(&self) -> Vec<(Role, Vec<&Player>)> {
        self.roster.by_role()
    }

    /// Persist the roster. Only a complete team can be saved.
    pub async fn finalize<S>(&self, store: &S) -> Result<(), SessionError>
    where
        S: KeyValueStore + ?Sized,
    {
        if !self.is_complete() {
            return Err(SessionError::Incomplete {
                selected: self.roster.len(),
                required: self.rules.squad_size,
            });
        }

        TeamVault::new(store)
            .save(&self.user, &self.fixture.id, &self.roster)
            .await?;
        info!(
            user = %self.user,
            match_id = %self.fixture.id,
            spent = %self.roster.spent(),
            "team saved"
        );
        Ok(())
    }

    /// Delete the saved team. The in-memory roster is cleared only once the
    /// delete has gone through.
    pub async fn discard<S>(&mut self, store: &S) -> Result<(), SessionError>
    where
        S: KeyValueStore + ?Sized,
    {
        TeamVault::new(store)
            .remove(&self.user, &self.fixture.id)
            .await?;
        self.roster = RosterState::new();
        info!(user = %self.user, match_id = %self.fixture.id, "team discarded");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Match partition
// ---------------------------------------------------------------------------

/// Catalog matches split by whether this user has a saved team.
#[derive(Debug, Default, PartialEq)]
pub struct MatchPartition<'a> {
    pub upcoming: Vec<&'a Match>,
    pub mine: Vec<&'a Match>,
}

/// Partition `matches` into those without and with a saved team for `user`,
/// preserving catalog order within each half.
pub async fn partition_matches<'a, S>(
    store: &S,
    user: &str,
    matches: &'a [Match],
) -> Result<MatchPartition<'a>, StorageError>
where
    S: KeyValueStore + ?Sized,
{
    let vault = TeamVault::new(store);
    let mut partition = MatchPartition::default();
    for fixture in matches {
        if vault.exists(user, &fixture.id).await? {
            partition.mine.push(fixture);
        } else {
            partition.upcoming.push(fixture);
        }
    }
    Ok(partition)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

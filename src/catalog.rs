// Static fixture catalog: data/matches.toml plus data/players.csv.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::config::{ConstraintConfig, DataPaths};
use crate::squad::player::{Credits, Player, Role};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("invalid catalog: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Assembled catalog types
// ---------------------------------------------------------------------------

/// A scheduled fixture together with its selectable player pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    pub team_a: String,
    pub team_b: String,
    pub kickoff: DateTime<Utc>,
    pub venue: String,
    pub format: String,
    pub players: Vec<Player>,
}

impl Match {
    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// "Crimson City vs Harbour Rovers"
    pub fn title(&self) -> String {
        format!("{} vs {}", self.team_a, self.team_b)
    }

    /// Kickoff date like "Wed, Sep 4".
    pub fn kickoff_day(&self) -> String {
        self.kickoff.format("%a, %b %-d").to_string()
    }

    /// Kickoff time like "6:30 PM".
    pub fn kickoff_time(&self) -> String {
        self.kickoff.format("%-I:%M %p").to_string()
    }
}

/// The full set of fixtures available for selection.
#[derive(Debug, Clone)]
pub struct Catalog {
    matches: Vec<Match>,
}

impl Catalog {
    /// Load both catalog files and validate the result against the active
    /// rules. All referential problems (unknown match ids, foreign teams,
    /// bad role codes) and any pool too thin to ever complete a squad are
    /// rejected here rather than surfacing mid-selection.
    pub fn load(paths: &DataPaths, rules: &ConstraintConfig) -> Result<Self, CatalogError> {
        let matches_text =
            std::fs::read_to_string(&paths.matches).map_err(|e| CatalogError::Io {
                path: paths.matches.clone(),
                source: e,
            })?;
        let raw_matches = parse_matches(&matches_text).map_err(|e| CatalogError::Toml {
            path: paths.matches.clone(),
            source: e,
        })?;

        let players_file = File::open(&paths.players).map_err(|e| CatalogError::Io {
            path: paths.players.clone(),
            source: e,
        })?;
        let rows = parse_players(players_file).map_err(|e| CatalogError::Csv {
            path: paths.players.clone(),
            source: e,
        })?;

        let matches = assemble(raw_matches, rows, rules)?;
        info!(matches = matches.len(), "catalog loaded");
        Ok(Self { matches })
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn match_by_id(&self, id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }
}

// ---------------------------------------------------------------------------
// Raw file formats
// ---------------------------------------------------------------------------

/// data/matches.toml top level.
#[derive(Debug, Deserialize)]
struct MatchesFile {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

/// One [[matches]] entry. Kickoff is a quoted RFC 3339 string, always UTC.
#[derive(Debug, Deserialize)]
struct RawMatch {
    id: String,
    team_a: String,
    team_b: String,
    kickoff: DateTime<Utc>,
    venue: String,
    format: String,
}

/// One row of data/players.csv.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    match_id: String,
    id: u32,
    name: String,
    team: String,
    role: String,
    credit: Credits,
}

fn parse_matches(text: &str) -> Result<Vec<RawMatch>, toml::de::Error> {
    let file: MatchesFile = toml::from_str(text)?;
    Ok(file.matches)
}

fn parse_players<R: Read>(reader: R) -> Result<Vec<RawPlayerRow>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.deserialize().collect()
}

// ---------------------------------------------------------------------------
// Assembly and validation
// ---------------------------------------------------------------------------

fn assemble(
    raw_matches: Vec<RawMatch>,
    rows: Vec<RawPlayerRow>,
    rules: &ConstraintConfig,
) -> Result<Vec<Match>, CatalogError> {
    if raw_matches.is_empty() {
        return Err(CatalogError::Validation("no matches defined".into()));
    }

    let mut matches = Vec::with_capacity(raw_matches.len());
    let mut seen_ids = HashSet::new();
    for raw in raw_matches {
        if !seen_ids.insert(raw.id.clone()) {
            return Err(CatalogError::Validation(format!(
                "duplicate match id `{}`",
                raw.id
            )));
        }
        matches.push(Match {
            id: raw.id,
            team_a: raw.team_a,
            team_b: raw.team_b,
            kickoff: raw.kickoff,
            venue: raw.venue,
            format: raw.format,
            players: Vec::new(),
        });
    }

    for row in rows {
        let Some(fixture) = matches.iter_mut().find(|m| m.id == row.match_id) else {
            return Err(CatalogError::Validation(format!(
                "player {} references unknown match `{}`",
                row.id, row.match_id
            )));
        };

        if fixture.players.iter().any(|p| p.id == row.id) {
            return Err(CatalogError::Validation(format!(
                "duplicate player id {} in match `{}`",
                row.id, fixture.id
            )));
        }
        if row.team != fixture.team_a && row.team != fixture.team_b {
            return Err(CatalogError::Validation(format!(
                "player {} plays for `{}` which is not in match `{}`",
                row.id, row.team, fixture.id
            )));
        }
        let role = Role::from_code(&row.role).ok_or_else(|| {
            CatalogError::Validation(format!(
                "player {} has unknown role `{}`",
                row.id, row.role
            ))
        })?;

        fixture.players.push(Player {
            id: row.id,
            name: row.name,
            team: row.team,
            role,
            credit: row.credit,
        });
    }

    for fixture in &matches {
        check_feasible(fixture, rules)?;
    }

    Ok(matches)
}

/// A pool that cannot produce one complete squad under the rules is a data
/// error worth rejecting at load time, not one toggle at a time.
fn check_feasible(fixture: &Match, rules: &ConstraintConfig) -> Result<(), CatalogError> {
    let pool = &fixture.players;

    if pool.len() < rules.squad_size {
        return Err(CatalogError::Validation(format!(
            "match `{}` has only {} players for a squad of {}",
            fixture.id,
            pool.len(),
            rules.squad_size
        )));
    }

    let mut selectable_by_role = 0usize;
    for role in Role::ALL {
        let available = pool.iter().filter(|p| p.role == role).count();
        selectable_by_role += available.min(rules.role_quotas.quota(role));
    }
    if selectable_by_role < rules.squad_size {
        return Err(CatalogError::Validation(format!(
            "match `{}` role distribution cannot fill a squad of {}",
            fixture.id, rules.squad_size
        )));
    }

    let mut selectable_by_team = 0usize;
    for team in [&fixture.team_a, &fixture.team_b] {
        let available = pool.iter().filter(|p| &p.team == team).count();
        selectable_by_team += available.min(rules.per_team_cap);
    }
    if selectable_by_team < rules.squad_size {
        return Err(CatalogError::Validation(format!(
            "match `{}` team split cannot fill a squad of {}",
            fixture.id, rules.squad_size
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MATCHES_TOML: &str = r#"
[[matches]]
id = "m1"
team_a = "Alpha"
team_b = "Beta"
kickoff = "2026-09-04T18:30:00Z"
venue = "Test Ground"
format = "League"
"#;

    fn raw_match(id: &str) -> RawMatch {
        RawMatch {
            id: id.to_string(),
            team_a: "Alpha".to_string(),
            team_b: "Beta".to_string(),
            kickoff: "2026-09-04T18:30:00Z".parse().unwrap(),
            venue: "Test Ground".to_string(),
            format: "League".to_string(),
        }
    }

    fn row(match_id: &str, id: u32, team: &str, role: &str) -> RawPlayerRow {
        RawPlayerRow {
            match_id: match_id.to_string(),
            id,
            name: format!("Player {id}"),
            team: team.to_string(),
            role: role.to_string(),
            credit: Credits::from_tenths(80),
        }
    }

    /// 2 GK, 6 DEF, 6 MID, 4 FWD per team: every default quota is reachable.
    fn full_pool(match_id: &str) -> Vec<RawPlayerRow> {
        let mut rows = Vec::new();
        let mut id = 1;
        for team in ["Alpha", "Beta"] {
            for (role, count) in [("GK", 2), ("DEF", 6), ("MID", 6), ("FWD", 4)] {
                for _ in 0..count {
                    rows.push(row(match_id, id, team, role));
                    id += 1;
                }
            }
        }
        rows
    }

    #[test]
    fn parses_matches_toml() {
        let matches = parse_matches(MATCHES_TOML).expect("sample toml should parse");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "m1");
        assert_eq!(matches[0].team_a, "Alpha");
        assert_eq!(matches[0].team_b, "Beta");
        assert_eq!(matches[0].venue, "Test Ground");
        assert_eq!(matches[0].format, "League");
    }

    #[test]
    fn parses_player_rows_and_trims_whitespace() {
        let csv = "match_id,id,name,team,role,credit\n\
                   m1, 7 , Dane Whitlock , Alpha , GK , 8.5\n";
        let rows = parse_players(csv.as_bytes()).expect("sample csv should parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 7);
        assert_eq!(rows[0].name, "Dane Whitlock");
        assert_eq!(rows[0].team, "Alpha");
        assert_eq!(rows[0].role, "GK");
        assert_eq!(rows[0].credit, Credits::from_tenths(85));
    }

    #[test]
    fn assembles_players_onto_their_matches() {
        let mut rows = full_pool("m1");
        rows.extend(full_pool_for_second_match());
        let matches = assemble(
            vec![raw_match("m1"), raw_match("m2")],
            rows,
            &ConstraintConfig::default(),
        )
        .expect("two feasible matches should assemble");

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].players.len(), 36);
        assert_eq!(matches[1].players.len(), 36);
        assert!(matches[0].player(1).is_some());
        assert!(matches[0].player(101).is_none());
    }

    fn full_pool_for_second_match() -> Vec<RawPlayerRow> {
        full_pool("m2")
            .into_iter()
            .map(|mut r| {
                r.id += 100;
                r
            })
            .collect()
    }

    #[test]
    fn rejects_duplicate_match_ids() {
        let err = assemble(
            vec![raw_match("m1"), raw_match("m1")],
            vec![],
            &ConstraintConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("duplicate match id")));
    }

    #[test]
    fn rejects_duplicate_player_ids_within_a_match() {
        let mut rows = full_pool("m1");
        rows.push(row("m1", 1, "Alpha", "MID"));
        let err = assemble(vec![raw_match("m1")], rows, &ConstraintConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("duplicate player id 1")));
    }

    #[test]
    fn rejects_player_referencing_unknown_match() {
        let mut rows = full_pool("m1");
        rows.push(row("m9", 99, "Alpha", "MID"));
        let err = assemble(vec![raw_match("m1")], rows, &ConstraintConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("unknown match `m9`")));
    }

    #[test]
    fn rejects_player_from_a_team_not_in_the_match() {
        let mut rows = full_pool("m1");
        rows.push(row("m1", 99, "Gamma", "MID"));
        let err = assemble(vec![raw_match("m1")], rows, &ConstraintConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("`Gamma`")));
    }

    #[test]
    fn rejects_unknown_role_code() {
        let mut rows = full_pool("m1");
        rows.push(row("m1", 99, "Alpha", "STRIKER"));
        let err = assemble(vec![raw_match("m1")], rows, &ConstraintConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("unknown role `STRIKER`")));
    }

    #[test]
    fn rejects_pool_smaller_than_the_squad() {
        let rows = vec![row("m1", 1, "Alpha", "GK"), row("m1", 2, "Beta", "MID")];
        let err = assemble(vec![raw_match("m1")], rows, &ConstraintConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("only 2 players")));
    }

    #[test]
    fn rejects_pool_whose_roles_cannot_fill_a_squad() {
        // 12 midfielders: enough bodies, but the MID quota caps usable
        // players at 5.
        let rows: Vec<_> = (1..=12)
            .map(|id| {
                let team = if id % 2 == 0 { "Alpha" } else { "Beta" };
                row("m1", id, team, "MID")
            })
            .collect();
        let err = assemble(vec![raw_match("m1")], rows, &ConstraintConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("role distribution")));
    }

    #[test]
    fn rejects_pool_with_a_lopsided_team_split() {
        // All players from one team: at most 7 are ever selectable.
        let mut id = 0;
        let mut rows = Vec::new();
        for (role, count) in [("GK", 1), ("DEF", 5), ("MID", 5), ("FWD", 3)] {
            for _ in 0..count {
                id += 1;
                rows.push(row("m1", id, "Alpha", role));
            }
        }
        let err = assemble(vec![raw_match("m1")], rows, &ConstraintConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("team split")));
    }

    #[test]
    fn rejects_empty_matches_file() {
        let err = assemble(vec![], vec![], &ConstraintConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ref msg) if msg.contains("no matches")));
    }

    #[test]
    fn formats_kickoff_for_display() {
        let fixture = Match {
            id: "m1".to_string(),
            team_a: "Alpha".to_string(),
            team_b: "Beta".to_string(),
            kickoff: "2026-09-04T18:30:00Z".parse().unwrap(),
            venue: "Test Ground".to_string(),
            format: "League".to_string(),
            players: Vec::new(),
        };
        assert_eq!(fixture.title(), "Alpha vs Beta");
        assert_eq!(fixture.kickoff_day(), "Fri, Sep 4");
        assert_eq!(fixture.kickoff_time(), "6:30 PM");
    }
}

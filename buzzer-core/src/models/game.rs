//! Game model and score/status updates

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Maximum length for a team name (matches the VARCHAR(100) column)
const MAX_TEAM_NAME_LEN: usize = 100;

/// Lifecycle status of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    #[default]
    Upcoming,
    Live,
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Live => "live",
            Self::Finished => "finished",
        }
    }

    /// Whether a game in this status may move to `next`.
    ///
    /// A finished game is final; every other change is allowed.
    pub fn can_transition_to(&self, next: GameStatus) -> bool {
        *self == next || *self != Self::Finished
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(Self::Upcoming),
            "live" => Ok(Self::Live),
            "finished" => Ok(Self::Finished),
            _ => Err(ValidationError::InvalidVariant {
                field: "status",
                value: s.to_owned(),
            }),
        }
    }
}

/// Validated team name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamName(String);

impl TeamName {
    /// Create a team name.
    ///
    /// # Rules
    /// - Surrounding whitespace is trimmed
    /// - Must not be empty
    /// - Max 100 characters
    pub fn new(field: &'static str, s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field });
        }
        if trimmed.chars().count() > MAX_TEAM_NAME_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_TEAM_NAME_LEN,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validate a score value, returning it as the stored column type.
pub fn score(field: &'static str, value: i64) -> Result<i32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::Negative { field, value });
    }
    i32::try_from(value).map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "score out of range",
    })
}

/// Game record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub home_team: String,
    pub away_team: String,
    pub game_date: DateTime<Utc>,
    pub status: GameStatus,
    pub home_score: i32,
    pub away_score: i32,
    pub created_at: DateTime<Utc>,
}

/// Game with its commentary count, as shown in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    #[serde(flatten)]
    pub game: Game,
    pub commentary_count: i64,
}

/// Validated input for a new game
#[derive(Debug, Clone)]
pub struct NewGame {
    pub home_team: TeamName,
    pub away_team: TeamName,
    pub game_date: DateTime<Utc>,
    pub status: GameStatus,
    pub home_score: i32,
    pub away_score: i32,
}

impl NewGame {
    /// Build a new upcoming game with zero scores.
    pub fn new(home_team: &str, away_team: &str, game_date: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            home_team: TeamName::new("home_team", home_team)?,
            away_team: TeamName::new("away_team", away_team)?,
            game_date,
            status: GameStatus::Upcoming,
            home_score: 0,
            away_score: 0,
        })
    }

    pub fn with_status(mut self, status: GameStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_scores(mut self, home: i64, away: i64) -> Result<Self, ValidationError> {
        self.home_score = score("home_score", home)?;
        self.away_score = score("away_score", away)?;
        Ok(self)
    }
}

/// Partial score/status update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamePatch {
    pub status: Option<GameStatus>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl GamePatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.home_score.is_none() && self.away_score.is_none()
    }

    /// Apply the patch to `game`, returning the updated record.
    pub fn apply(&self, game: &Game) -> Result<Game, ValidationError> {
        let mut updated = game.clone();
        if let Some(next) = self.status {
            if !game.status.can_transition_to(next) {
                return Err(ValidationError::InvalidTransition {
                    from: game.status.as_str(),
                    to: next.as_str(),
                });
            }
            updated.status = next;
        }
        if let Some(home) = self.home_score {
            updated.home_score = score("home_score", home.into())?;
        }
        if let Some(away) = self.away_score {
            updated.away_score = score("away_score", away.into())?;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_game(status: GameStatus) -> Game {
        let now = Utc::now();
        Game {
            id: 1,
            home_team: "Hawks".into(),
            away_team: "Owls".into(),
            game_date: now,
            status,
            home_score: 0,
            away_score: 0,
            created_at: now,
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("LIVE".parse::<GameStatus>().unwrap(), GameStatus::Live);
        assert_eq!(" finished ".parse::<GameStatus>().unwrap(), GameStatus::Finished);
        assert!(matches!(
            "halftime".parse::<GameStatus>(),
            Err(ValidationError::InvalidVariant { field: "status", .. })
        ));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&GameStatus::Upcoming).unwrap();
        assert_eq!(json, "\"upcoming\"");
    }

    #[test]
    fn team_name_rules() {
        assert_eq!(TeamName::new("home_team", "  Hawks ").unwrap().as_str(), "Hawks");
        assert!(matches!(
            TeamName::new("home_team", "   "),
            Err(ValidationError::Empty { field: "home_team" })
        ));

        let long = "x".repeat(101);
        assert!(matches!(
            TeamName::new("away_team", &long),
            Err(ValidationError::TooLong { max: 100, .. })
        ));
        assert!(TeamName::new("away_team", &"x".repeat(100)).is_ok());
    }

    #[test]
    fn negative_scores_rejected() {
        let err = NewGame::new("A", "B", Utc::now())
            .unwrap()
            .with_scores(-1, 0)
            .unwrap_err();
        assert!(matches!(err, ValidationError::Negative { field: "home_score", value: -1 }));
    }

    #[test]
    fn patch_updates_scores_and_status() {
        let game = sample_game(GameStatus::Upcoming);
        let patch = GamePatch {
            status: Some(GameStatus::Live),
            home_score: Some(3),
            away_score: None,
        };

        let updated = patch.apply(&game).unwrap();
        assert_eq!(updated.status, GameStatus::Live);
        assert_eq!(updated.home_score, 3);
        assert_eq!(updated.away_score, 0);
        assert_eq!(updated.id, game.id);
    }

    #[test]
    fn finished_game_is_final() {
        let game = sample_game(GameStatus::Finished);
        let patch = GamePatch {
            status: Some(GameStatus::Live),
            ..Default::default()
        };
        assert!(matches!(
            patch.apply(&game),
            Err(ValidationError::InvalidTransition { from: "finished", to: "live" })
        ));

        // Score corrections on a finished game are still allowed
        let patch = GamePatch {
            away_score: Some(2),
            ..Default::default()
        };
        assert_eq!(patch.apply(&game).unwrap().away_score, 2);
    }

    #[test]
    fn summary_flattens_game_fields() {
        let summary = GameSummary {
            game: sample_game(GameStatus::Live),
            commentary_count: 4,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["home_team"], "Hawks");
        assert_eq!(value["status"], "live");
        assert_eq!(value["commentary_count"], 4);
    }
}

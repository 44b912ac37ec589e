use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Detected-pattern tags kept per game.
pub const MAX_PATTERN_TAGS: usize = 12;
/// Points kept in each game's win-rate series.
pub const MAX_SERIES_POINTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameId {
    Pong,
    #[serde(rename = "connect4")]
    ConnectFour,
    Rps,
    Dodge,
    Memory,
}

impl GameId {
    pub const ALL: [GameId; 5] = [
        GameId::Pong,
        GameId::ConnectFour,
        GameId::Rps,
        GameId::Dodge,
        GameId::Memory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameId::Pong => "pong",
            GameId::ConnectFour => "connect4",
            GameId::Rps => "rps",
            GameId::Dodge => "dodge",
            GameId::Memory => "memory",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            GameId::Pong => "Paddle Duel",
            GameId::ConnectFour => "Connect Four",
            GameId::Rps => "Rock Paper Scissors",
            GameId::Dodge => "Dodge",
            GameId::Memory => "Memory Match",
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameId {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameId::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProfileError::UnknownGame(s.to_string()))
    }
}

/// Session result from the human player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

/// Coarse numbers exported at session end and used to seed the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternSummary {
    Pong {
        table_size: usize,
        epsilon: f64,
        updates: u64,
        /// Share of the player's returns sent upward.
        high_returns: f64,
    },
    ConnectFour {
        column_weights: [f64; 7],
        depth: usize,
        favorite_opening: Option<usize>,
    },
    Rps {
        choice_counts: Vec<u32>,
        accuracy: Option<f64>,
        pattern_count: usize,
    },
    Dodge {
        /// Hotspot center as a fraction of the field.
        hotspot: Option<(f64, f64)>,
        hotspot_confidence: f64,
        edge_share: f64,
        samples: u64,
    },
    Memory {
        score: f64,
        tier: u8,
        rounds: u32,
    },
}

/// Everything the profile keeps about one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameStats {
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Detected tendencies, most recent last.
    pub patterns: Vec<String>,
    /// Player win rate after each recorded session.
    pub win_rate_series: Vec<f64>,
    pub last_summary: Option<PatternSummary>,
}

impl GameStats {
    pub fn win_rate(&self) -> f64 {
        if self.played == 0 {
            0.0
        } else {
            f64::from(self.wins) / f64::from(self.played)
        }
    }

    /// Count one finished session and merge its pattern tags.
    pub fn record(&mut self, result: GameResult, patterns: &[String]) {
        self.played += 1;
        match result {
            GameResult::Win => self.wins += 1,
            GameResult::Loss => self.losses += 1,
            GameResult::Draw => self.draws += 1,
        }

        for tag in patterns {
            self.patterns.retain(|existing| existing != tag);
            self.patterns.push(tag.clone());
        }
        if self.patterns.len() > MAX_PATTERN_TAGS {
            let excess = self.patterns.len() - MAX_PATTERN_TAGS;
            self.patterns.drain(..excess);
        }

        self.win_rate_series.push(self.win_rate());
        if self.win_rate_series.len() > MAX_SERIES_POINTS {
            let excess = self.win_rate_series.len() - MAX_SERIES_POINTS;
            self.win_rate_series.drain(..excess);
        }
    }
}

/// The whole persisted profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub games: BTreeMap<GameId, GameStats>,
}

impl Profile {
    pub fn stats(&self, game: GameId) -> GameStats {
        self.games.get(&game).cloned().unwrap_or_default()
    }

    pub fn stats_mut(&mut self, game: GameId) -> &mut GameStats {
        self.games.entry(game).or_default()
    }

    pub fn total_played(&self) -> u32 {
        self.games.values().map(|s| s.played).sum()
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ProfileError;
use crate::profile::types::{GameId, GameResult, GameStats, PatternSummary, Profile};

/// Player profile collaborator. Failures are the store's business: they are
/// logged and never reach the caller.
pub trait ProfileStore {
    fn game_stats(&self, game: GameId) -> GameStats;

    fn record_game(&mut self, game: GameId, result: GameResult, patterns: &[String]);

    fn update_patterns(&mut self, game: GameId, summary: PatternSummary);

    fn profile(&self) -> &Profile;
}

/// Volatile store, used by tests and headless runs without a profile path.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profile: Profile,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: Profile) -> Self {
        MemoryProfileStore { profile }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn game_stats(&self, game: GameId) -> GameStats {
        self.profile.stats(game)
    }

    fn record_game(&mut self, game: GameId, result: GameResult, patterns: &[String]) {
        self.profile.stats_mut(game).record(result, patterns);
    }

    fn update_patterns(&mut self, game: GameId, summary: PatternSummary) {
        self.profile.stats_mut(game).last_summary = Some(summary);
    }

    fn profile(&self) -> &Profile {
        &self.profile
    }
}

/// Profile persisted as pretty JSON. Every mutation rewrites the file via a
/// temporary sibling and a rename.
#[derive(Debug)]
pub struct JsonProfileStore {
    path: PathBuf,
    profile: Profile,
}

impl JsonProfileStore {
    /// Open the profile at `path`. A missing file starts an empty profile; an
    /// unreadable or corrupt one is logged and replaced by an empty profile.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let profile = if path.exists() {
            match Self::load(&path) {
                Ok(profile) => profile,
                Err(e) => {
                    log::warn!("{e}; starting from an empty profile");
                    Profile::default()
                }
            }
        } else {
            log::info!("no profile at {}, starting fresh", path.display());
            Profile::default()
        };
        JsonProfileStore { path, profile }
    }

    pub fn load(path: &Path) -> Result<Profile, ProfileError> {
        let json = fs::read_to_string(path).map_err(|e| ProfileError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ProfileError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), ProfileError> {
        let json = serde_json::to_string_pretty(&self.profile)?;
        let write_err = |e: std::io::Error| ProfileError::Write {
            path: self.path.clone(),
            source: e,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            log::warn!("{e}");
        }
    }
}

impl ProfileStore for JsonProfileStore {
    fn game_stats(&self, game: GameId) -> GameStats {
        self.profile.stats(game)
    }

    fn record_game(&mut self, game: GameId, result: GameResult, patterns: &[String]) {
        self.profile.stats_mut(game).record(result, patterns);
        log::debug!("recorded {result:?} for {game}");
        self.persist();
    }

    fn update_patterns(&mut self, game: GameId, summary: PatternSummary) {
        self.profile.stats_mut(game).last_summary = Some(summary);
        self.persist();
    }

    fn profile(&self) -> &Profile {
        &self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_summary() -> PatternSummary {
        PatternSummary::Memory {
            score: 64.0,
            tier: 2,
            rounds: 3,
        }
    }

    #[test]
    fn test_memory_store_records() {
        let mut store = MemoryProfileStore::new();
        assert_eq!(store.game_stats(GameId::Rps), GameStats::default());
        store.record_game(GameId::Rps, GameResult::Loss, &["Favors rock".into()]);
        store.update_patterns(GameId::Rps, memory_summary());

        let stats = store.game_stats(GameId::Rps);
        assert_eq!(stats.played, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.patterns, vec!["Favors rock"]);
        assert_eq!(stats.last_summary, Some(memory_summary()));
        assert_eq!(store.game_stats(GameId::Pong).played, 0);
    }

    #[test]
    fn test_json_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profile.json");

        let mut store = JsonProfileStore::open(&path);
        store.record_game(GameId::Memory, GameResult::Win, &["Strong recall".into()]);
        store.update_patterns(GameId::Memory, memory_summary());
        assert!(path.exists());

        let reopened = JsonProfileStore::open(&path);
        let stats = reopened.game_stats(GameId::Memory);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.last_summary, Some(memory_summary()));
        assert!(!dir.path().join("nested").join("profile.json.tmp").exists());
    }

    #[test]
    fn test_json_store_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonProfileStore::load(&path),
            Err(ProfileError::Parse { .. })
        ));
        let mut store = JsonProfileStore::open(&path);
        assert_eq!(store.profile(), &Profile::default());

        store.record_game(GameId::Dodge, GameResult::Draw, &[]);
        let reloaded = JsonProfileStore::load(&path).unwrap();
        assert_eq!(reloaded.stats(GameId::Dodge).draws, 1);
    }
}

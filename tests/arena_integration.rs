use adaptive_arena::arena::{Arena, GameView, InputStatus, PlayerInput};
use adaptive_arena::config::ArenaConfig;
use adaptive_arena::profile::{
    GameId, JsonProfileStore, MemoryProfileStore, PatternSummary, ProfileStore,
};
use adaptive_arena::sim::{run_session, ScriptedPlayer};

fn seeded_config(seed: u64) -> ArenaConfig {
    let mut config = ArenaConfig::default();
    config.session.seed = Some(seed);
    config
}

#[test]
fn test_every_game_runs_and_is_recorded() {
    let mut arena = Arena::new(seeded_config(7), MemoryProfileStore::new());
    let mut player = ScriptedPlayer::habitual(Some(7));

    for game in GameId::ALL {
        for _ in 0..2 {
            let run = run_session(&mut arena, game, &mut player).expect("session ran");
            assert_eq!(run.summary.game, game);
            assert!(run.summary.result.is_some(), "{game} did not finish");
        }
        let stats = arena.store().game_stats(game);
        assert_eq!(stats.played, 2);
        assert_eq!(stats.wins + stats.losses + stats.draws, 2);
        assert_eq!(stats.win_rate_series.len(), 2);
        assert!(stats.last_summary.is_some());
    }
    assert_eq!(arena.store().profile().total_played(), 10);
}

#[test]
fn test_profile_persists_between_arenas() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("profile.json");

    {
        let store = JsonProfileStore::open(&path);
        let mut arena = Arena::new(seeded_config(1), store);
        let mut player = ScriptedPlayer::habitual(Some(1));
        run_session(&mut arena, GameId::Rps, &mut player).unwrap();
        run_session(&mut arena, GameId::Memory, &mut player).unwrap();
    }

    let reopened = JsonProfileStore::open(&path);
    assert_eq!(reopened.game_stats(GameId::Rps).played, 1);
    assert_eq!(reopened.game_stats(GameId::Memory).played, 1);
    assert!(matches!(
        reopened.game_stats(GameId::Rps).last_summary,
        Some(PatternSummary::Rps { .. })
    ));
}

#[test]
fn test_rock_heavy_player_is_read_by_predictor() {
    let mut arena = Arena::new(seeded_config(3), MemoryProfileStore::new());
    let mut player = ScriptedPlayer::habitual(Some(3));
    let run = run_session(&mut arena, GameId::Rps, &mut player).unwrap();

    match run.summary.pattern_summary {
        PatternSummary::Rps {
            choice_counts,
            accuracy,
            ..
        } => {
            assert!(choice_counts[0] > choice_counts[2]);
            assert!(accuracy.is_some());
        }
        other => panic!("unexpected summary {other:?}"),
    }
}

#[test]
fn test_connect_four_weights_follow_favorite_column() {
    let mut arena = Arena::new(seeded_config(9), MemoryProfileStore::new());
    let mut player = ScriptedPlayer::habitual(Some(9));
    for _ in 0..3 {
        run_session(&mut arena, GameId::ConnectFour, &mut player).unwrap();
    }

    let stats = arena.store().game_stats(GameId::ConnectFour);
    let Some(PatternSummary::ConnectFour { column_weights, .. }) = stats.last_summary else {
        panic!("missing connect four summary");
    };
    let favorite = player.connect_four.favorite;
    let far = column_weights[6];
    assert!(column_weights[favorite] > far);
}

#[test]
fn test_memory_tier_carries_into_next_session() {
    let mut arena = Arena::new(seeded_config(4), MemoryProfileStore::new());
    let mut player = ScriptedPlayer::habitual(Some(4));
    run_session(&mut arena, GameId::Memory, &mut player).unwrap();

    let Some(PatternSummary::Memory { tier, .. }) =
        arena.store().game_stats(GameId::Memory).last_summary
    else {
        panic!("missing memory summary");
    };

    arena.start(GameId::Memory);
    match arena.view() {
        Some(GameView::Memory(view)) => assert_eq!(view.tier.level(), tier),
        other => panic!("unexpected view {other:?}"),
    }
    arena.stop();
}

#[test]
fn test_stopping_mid_session_discards_pending_effects() {
    let mut arena = Arena::new(seeded_config(2), MemoryProfileStore::new());
    arena.start(GameId::ConnectFour);
    assert_eq!(arena.tick(PlayerInput::Column(3)), InputStatus::Accepted);

    let summary = arena.stop().unwrap();
    assert_eq!(summary.result, None);
    assert_eq!(arena.tick(PlayerInput::None), InputStatus::NotRunning);
    assert_eq!(arena.store().game_stats(GameId::ConnectFour).played, 0);
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use adaptive_arena::arena::Arena;
use adaptive_arena::config::ArenaConfig;
use adaptive_arena::profile::{GameId, JsonProfileStore, ProfileStore};
use adaptive_arena::sim::{run_session, ScriptedPlayer};

/// Play headless sessions against the adaptive opponents with a scripted
/// player and report what each opponent learned.
#[derive(Parser)]
#[command(name = "adaptive-arena", about = "Adaptive opponents for five small games")]
struct Cli {
    /// Game to play: pong, connect4, rps, dodge, memory, or all
    #[arg(long, default_value = "all")]
    game: String,

    /// Sessions to play per game
    #[arg(long, default_value_t = 3)]
    sessions: usize,

    /// Path to the JSON player profile (overrides the config file)
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "arena.toml")]
    config: PathBuf,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Override the per-session tick cap
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn parse_games(arg: &str) -> Result<Vec<GameId>> {
    if arg.eq_ignore_ascii_case("all") {
        return Ok(GameId::ALL.to_vec());
    }
    arg.split(',')
        .map(|name| name.trim().parse::<GameId>().map_err(anyhow::Error::from))
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("parsing --game '{arg}'"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", ArenaConfig::default_toml()?);
        return Ok(());
    }

    let mut config = ArenaConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(path) = cli.profile {
        config.session.profile_path = path;
    }
    if let Some(seed) = cli.seed {
        config.session.seed = Some(seed);
    }
    if let Some(max_ticks) = cli.max_ticks {
        config.session.max_ticks = max_ticks;
    }
    config.validate().context("validating config overrides")?;

    let games = parse_games(&cli.game)?;
    let store = JsonProfileStore::open(config.session.profile_path.clone());
    let mut player = ScriptedPlayer::habitual(config.session.seed);
    let mut arena = Arena::new(config, store);

    for game in games {
        println!("== {} ==", game.title());
        for n in 1..=cli.sessions {
            let Some(run) = run_session(&mut arena, game, &mut player) else {
                continue;
            };
            let result = run
                .summary
                .result
                .map_or_else(|| "unfinished".to_string(), |r| format!("{r:?}"));
            println!("session {n}: {result} after {} ticks", run.summary.ticks);
            for insight in &run.insights {
                println!("  {:<22} {}", insight.label, insight.value);
            }
        }

        let stats = arena.store().game_stats(game);
        println!(
            "played {} | won {} | lost {} | drawn {} | win rate {:.0}%",
            stats.played,
            stats.wins,
            stats.losses,
            stats.draws,
            stats.win_rate() * 100.0
        );
        if !stats.patterns.is_empty() {
            println!("patterns: {}", stats.patterns.join(", "));
        }
        println!();
    }

    let store = arena.into_store();
    store
        .save()
        .with_context(|| format!("saving profile to {}", store.path().display()))?;
    Ok(())
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` takes player - headless host for take scripts.
//!
//! Loads a RON take script, runs it through a take sequencer on a
//! fixed-timestep clock, and replays scripted signals and skips. Useful for
//! checking the pacing of an experience without the VR runtime.

mod cli;
mod clock;
mod player;

use clap::Parser;
use cli::Args;
use clock::PlaybackClock;
use ordoplay_takes::TakeScript;
use player::{Player, PlayerError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ordoplay_takes=debug,ordoplay_takes_player=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OrdoPlay takes player v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        tracing::error!("Playback failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), PlayerError> {
    let script = TakeScript::load(&args.script)?;

    let mut clock = PlaybackClock::new(args.tick_rate);
    clock.set_time_scale(args.time_scale);
    tracing::info!("Playing '{}' at {}x speed", script.name, clock.time_scale());

    let mut player = Player::from_script(&script, clock)?.with_cues(&args.raises, &args.skips);
    let result = player.run(args.max_secs, args.realtime);
    tracing::info!("{}", player.sequencer().status_text());
    result.map(|_| ())
}

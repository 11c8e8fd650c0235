use anyhow::Context;
use pirates_replay::*;

use std::env;

fn main() -> anyhow::Result<()> {
    let args: Vec<_> = env::args().skip(1).collect();
    let debug = args.iter().any(|arg| arg == "--debug");
    let path = args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .context("usage: replay_summary [--debug] <replay file>")?;
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;

    let mut replay = Replay::load(&text, &ReplayOptions::new(debug, None))
        .with_context(|| format!("loading {path}"))?;

    let document = &replay.document;
    println!(
        "revision {}, {} players, {}x{} map, {} turns",
        document.revision,
        document.players,
        document.rows,
        document.cols,
        document.duration
    );
    let last = document.duration;
    for (i, player) in replay.players_info.iter().enumerate() {
        println!(
            "{:>2} {:<20} {:?} score {:?} turns {:?}",
            i,
            player.name,
            player.color,
            document.score_at(last, i),
            player.turns
        );
    }
    if let Some(leader) = document.leader_at(last) {
        println!("leader after turn {last}: {}", replay.players_info[leader].name);
    }
    for issue in &document.issues {
        println!("ignored: {}", issue.variant);
    }

    let mut peak = (0, 0);
    for turn in 0..=last {
        let alive = replay.get_turn(turn)?;
        if alive.len() > peak.1 {
            peak = (turn, alive.len());
        }
    }
    println!("entities alive in turn {last}: {}", replay.get_turn(last)?.len());
    println!("most entities alive: {} in turn {}", peak.1, peak.0);
    Ok(())
}

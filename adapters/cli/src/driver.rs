use std::fmt;

use anyhow::{bail, Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use vector_racing_core::{Acceleration, Command, Event, MoverId, RaceOutcome, StartRejection};
use vector_racing_rendering::Scene;
use vector_racing_system_autopilot::{policy, Autopilot, AutopilotStats};
use vector_racing_world::{self as world, query, starting_grid, track::Track, Race};

use crate::config::{HumanPolicy, RaceConfig};

/// Drives the human seat without any interactive input.
#[derive(Debug)]
pub(crate) struct HumanDriver {
    policy: HumanPolicy,
    script: std::vec::IntoIter<Acceleration>,
}

impl HumanDriver {
    pub(crate) fn new(policy: HumanPolicy, script: Vec<Acceleration>) -> Self {
        Self {
            policy,
            script: script.into_iter(),
        }
    }

    /// Picks the next acceleration, preferring the script while it stays legal.
    pub(crate) fn choose(&mut self, race: &Race) -> Acceleration {
        let moves = query::available_moves(race, MoverId::Human);

        if let Some(scripted) = self.script.next() {
            if moves.iter().any(|candidate| candidate.acceleration == scripted) {
                return scripted;
            }
            tracing::debug!(?scripted, "scripted acceleration is illegal, using policy");
        }

        let chosen = match self.policy {
            HumanPolicy::Greedy => query::mover_state(race, MoverId::Human).and_then(|state| {
                policy::closest_move(&moves, query::track(race).sub_goal(&state))
            }),
            HumanPolicy::Parked => moves
                .iter()
                .find(|candidate| candidate.velocity.is_zero())
                .or_else(|| moves.first()),
        };

        chosen.map_or(Acceleration::COAST, |candidate| candidate.acceleration)
    }
}

/// Final state of a headless race.
#[derive(Debug)]
pub(crate) struct RaceSummary {
    pub(crate) outcome: Option<RaceOutcome>,
    pub(crate) turns: u64,
    pub(crate) human_moves: u32,
    pub(crate) autopilot_moves: Option<u32>,
    pub(crate) autopilot_stats: Option<AutopilotStats>,
    pub(crate) scene: Scene,
}

impl fmt::Display for RaceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scene)?;
        if self.outcome.is_none() {
            writeln!(f, "race abandoned after {} turns", self.turns)?;
        }
        writeln!(f, "turns: {}", self.turns)?;
        writeln!(f, "human moves: {}", self.human_moves)?;
        if let Some(moves) = self.autopilot_moves {
            writeln!(f, "autopilot moves: {moves}")?;
        }
        if let Some(stats) = self.autopilot_stats {
            writeln!(
                f,
                "autopilot replans: {} ok, {} failed, {} fallback moves",
                stats.replans, stats.failed_replans, stats.fallback_moves
            )?;
        }
        Ok(())
    }
}

/// Runs a full race on `track` with both seats driven headlessly.
pub(crate) fn run_race(track: Track, config: &RaceConfig) -> Result<RaceSummary> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let grid = starting_grid(&track, &mut rng, config.autopilot);
    tracing::info!(
        human = %grid.human,
        autopilot = ?grid.autopilot,
        seed = config.seed,
        "starting grid drawn"
    );

    let mut race = Race::new(track);
    let mut autopilot = config
        .autopilot
        .then(|| Autopilot::new(config.autopilot_config()));
    let mut human = HumanDriver::new(config.human, config.script());
    let mut pending = vec![Command::StartRace {
        required_laps: config.required_laps,
        human_start: grid.human,
        autopilot_start: grid.autopilot,
    }];

    while !pending.is_empty() {
        if query::turns_started(&race) > config.max_turns {
            tracing::warn!(max_turns = config.max_turns, "turn limit reached");
            break;
        }

        let mut events = Vec::new();
        for command in pending.drain(..) {
            world::apply(&mut race, command, &mut events);
        }

        let mut next = Vec::new();
        if let Some(autopilot) = autopilot.as_mut() {
            autopilot
                .handle(&events, &race, &mut next)
                .context("autopilot cannot take part in the race")?;
        }

        for event in &events {
            match event {
                Event::RaceRejected { reason } => bail!(describe_rejection(*reason)),
                Event::MoveRejected {
                    mover,
                    acceleration,
                    reason,
                } => bail!("{mover} move {acceleration:?} rejected: {reason:?}"),
                Event::MoveStarted { .. } => next.push(Command::CommitMove),
                Event::TurnStarted {
                    mover: MoverId::Human,
                } => next.push(Command::BeginMove {
                    mover: MoverId::Human,
                    acceleration: human.choose(&race),
                }),
                Event::RaceFinished { outcome } => {
                    tracing::info!(?outcome, "race finished");
                }
                _ => {}
            }
        }
        pending = next;
    }

    let human_moves = query::mover_view(&race, MoverId::Human).map_or(0, |view| view.moves);
    let autopilot_moves = query::mover_view(&race, MoverId::Autopilot).map(|view| view.moves);

    Ok(RaceSummary {
        outcome: query::outcome(&race),
        turns: query::turns_started(&race),
        human_moves,
        autopilot_moves,
        autopilot_stats: autopilot.as_ref().map(Autopilot::stats),
        scene: Scene::capture(&race, autopilot.as_ref().and_then(Autopilot::plan)),
    })
}

fn describe_rejection(reason: StartRejection) -> String {
    match reason {
        StartRejection::NoLaps => "a race needs at least one lap".to_owned(),
        StartRejection::NotOnFinishLine { cell } => {
            format!("start cell {cell} is not on the finish line")
        }
    }
}

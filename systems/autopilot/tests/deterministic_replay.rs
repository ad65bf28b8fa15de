use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use vector_racing_core::{Acceleration, CellCoord, Command, Event, MoverId, RaceOutcome};
use vector_racing_system_autopilot::{Autopilot, AutopilotConfig, AutopilotStats};
use vector_racing_world::{
    self as world, query,
    track::{Track, TrackGrid},
    Race,
};

#[test]
fn deterministic_replay_produces_identical_races() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.outcome, Some(RaceOutcome::Winner(MoverId::Autopilot)));
}

fn track() -> Track {
    let grid = TrackGrid::from_glyphs(&[
        "############",
        "#SS...11...#",
        "#SS...11...#",
        "#..........#",
        "#...####...#",
        "#...22.....#",
        "#...22.....#",
        "############",
    ])
    .expect("valid layout");
    Track::analyze(grid).expect("valid track")
}

fn replay() -> ReplayOutcome {
    let mut race = Race::new(track());
    let mut autopilot = Autopilot::new(AutopilotConfig::default());
    let mut log = Vec::new();
    let mut pending = vec![Command::StartRace {
        required_laps: 1,
        human_start: CellCoord::new(1, 1),
        autopilot_start: Some(CellCoord::new(2, 2)),
    }];
    let mut human_script = scripted_human().into_iter();

    for _ in 0..2_000 {
        if pending.is_empty() {
            break;
        }

        let mut events = Vec::new();
        for command in pending.drain(..) {
            world::apply(&mut race, command, &mut events);
        }
        record_events(&events, &mut log);

        let mut next = Vec::new();
        autopilot
            .handle(&events, &race, &mut next)
            .expect("autopilot has a route");
        for event in &events {
            match event {
                Event::MoveStarted { .. } => next.push(Command::CommitMove),
                Event::TurnStarted {
                    mover: MoverId::Human,
                } => next.push(Command::BeginMove {
                    mover: MoverId::Human,
                    acceleration: human_turn(&race, &mut human_script),
                }),
                _ => {}
            }
        }
        pending = next;
    }

    ReplayOutcome {
        outcome: query::outcome(&race),
        stats: autopilot.stats(),
        events: log,
    }
}

fn scripted_human() -> Vec<Acceleration> {
    [(1, 0), (1, 1), (-1, 0), (0, -1), (-1, 0)]
        .into_iter()
        .filter_map(|(ddx, ddy)| Acceleration::new(ddx, ddy))
        .collect()
}

/// Follows the script while it stays legal, then brakes towards rest.
fn human_turn(race: &Race, script: &mut impl Iterator<Item = Acceleration>) -> Acceleration {
    let moves = query::available_moves(race, MoverId::Human);
    let state = query::mover_state(race, MoverId::Human).expect("human seat");

    if let Some(acceleration) = script.next() {
        if moves.iter().any(|candidate| candidate.acceleration == acceleration) {
            return acceleration;
        }
    }

    let braking = Acceleration::new(
        -state.velocity.dx().signum() as i8,
        -state.velocity.dy().signum() as i8,
    )
    .unwrap_or(Acceleration::COAST);
    if moves.iter().any(|candidate| candidate.acceleration == braking) {
        return braking;
    }
    moves
        .first()
        .map_or(Acceleration::COAST, |candidate| candidate.acceleration)
}

fn record_events(events: &[Event], log: &mut Vec<EventRecord>) {
    log.extend(events.iter().filter_map(EventRecord::from_event));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    outcome: Option<RaceOutcome>,
    stats: AutopilotStats,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    MoveCommitted {
        mover: MoverId,
        from: CellCoord,
        to: CellCoord,
    },
    LapCompleted {
        mover: MoverId,
        completed_lap: u32,
    },
    TurnSkipped {
        mover: MoverId,
    },
    Rejected {
        mover: MoverId,
    },
}

impl EventRecord {
    fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::MoveCommitted {
                mover, from, to, ..
            } => Some(Self::MoveCommitted {
                mover: *mover,
                from: *from,
                to: *to,
            }),
            Event::LapCompleted {
                mover,
                completed_lap,
            } => Some(Self::LapCompleted {
                mover: *mover,
                completed_lap: *completed_lap,
            }),
            Event::TurnSkipped { mover } => Some(Self::TurnSkipped { mover: *mover }),
            Event::MoveRejected { mover, .. } => Some(Self::Rejected { mover: *mover }),
            _ => None,
        }
    }
}

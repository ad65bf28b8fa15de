use vector_racing_core::{Acceleration, CellCoord, Command, Event, MoverId, RaceOutcome, Velocity};
use vector_racing_system_autopilot::{Autopilot, AutopilotConfig, AutopilotError};
use vector_racing_system_planner::{HeuristicKind, PlanError};
use vector_racing_world::{
    self as world, query,
    track::{Track, TrackGrid},
    Race,
};

fn race_on(lines: &[&str]) -> Race {
    let grid = TrackGrid::from_glyphs(lines).expect("valid layout");
    Race::new(Track::analyze(grid).expect("valid track"))
}

/// Drives the race with a human that never leaves its start cell.
fn pump(
    race: &mut Race,
    autopilot: &mut Autopilot,
    start: Command,
    max_rounds: usize,
) -> Result<Vec<Event>, AutopilotError> {
    let mut log = Vec::new();
    let mut pending = vec![start];

    for _ in 0..max_rounds {
        if pending.is_empty() {
            break;
        }

        let mut events = Vec::new();
        for command in pending.drain(..) {
            world::apply(race, command, &mut events);
        }
        log.extend(events.iter().cloned());

        let mut next = Vec::new();
        autopilot.handle(&events, race, &mut next)?;
        for event in &events {
            match event {
                Event::MoveStarted { .. } => next.push(Command::CommitMove),
                Event::TurnStarted {
                    mover: MoverId::Human,
                } => next.push(Command::BeginMove {
                    mover: MoverId::Human,
                    acceleration: Acceleration::COAST,
                }),
                _ => {}
            }
        }
        pending = next;
    }

    Ok(log)
}

fn start(human: CellCoord, autopilot: CellCoord) -> Command {
    Command::StartRace {
        required_laps: 1,
        human_start: human,
        autopilot_start: Some(autopilot),
    }
}

#[test]
fn autopilot_wins_around_a_parked_opponent() {
    let row = "S...1...2..S";
    let mut race = race_on(&[row, row, row, row, row]);
    let mut autopilot = Autopilot::new(AutopilotConfig::default());

    let log = pump(
        &mut race,
        &mut autopilot,
        start(CellCoord::new(0, 0), CellCoord::new(0, 2)),
        400,
    )
    .expect("route exists");

    assert_eq!(
        query::outcome(&race),
        Some(RaceOutcome::Winner(MoverId::Autopilot))
    );
    assert!(!log
        .iter()
        .any(|event| matches!(event, Event::MoveRejected { .. })));

    let view = query::mover_view(&race, MoverId::Autopilot).expect("autopilot seat");
    let plan = autopilot.plan().expect("plan kept");
    assert_eq!(plan.current(), Some(view.state.cell));
    assert_eq!(plan.waypoints(), view.history);
    assert!(view.history.iter().all(|&cell| cell != CellCoord::new(0, 0)));
}

#[test]
fn opponent_on_the_route_triggers_a_spliced_replan() {
    let row = "S...1...2..S";
    let mut race = race_on(&[row, row, row, row, row]);
    let mut autopilot = Autopilot::new(AutopilotConfig::default());
    let parked = CellCoord::new(11, 2);

    let log = pump(
        &mut race,
        &mut autopilot,
        start(parked, CellCoord::new(0, 2)),
        400,
    )
    .expect("detour exists");

    assert_eq!(
        query::outcome(&race),
        Some(RaceOutcome::Winner(MoverId::Autopilot))
    );
    let stats = autopilot.stats();
    assert!(stats.replans >= 1);
    assert_eq!(stats.failed_replans, 0);

    let view = query::mover_view(&race, MoverId::Autopilot).expect("autopilot seat");
    let plan = autopilot.plan().expect("plan kept");
    assert_eq!(plan.waypoints(), view.history);
    assert_eq!(view.history.first(), Some(&CellCoord::new(0, 2)));
    assert!(view.history.iter().all(|&cell| cell != parked));
    assert!(!log.iter().any(|event| matches!(
        event,
        Event::MoveCommitted {
            mover: MoverId::Autopilot,
            to,
            ..
        } if *to == parked
    )));
}

#[test]
fn blocked_replan_keeps_the_plan_and_falls_back() {
    let mut race = race_on(&["SS.....12S"]);
    let mut autopilot = Autopilot::new(AutopilotConfig::default());

    let log = pump(
        &mut race,
        &mut autopilot,
        start(CellCoord::new(1, 0), CellCoord::new(0, 0)),
        4,
    )
    .expect("initial route exists");

    assert!(log.contains(&Event::MoveStarted {
        mover: MoverId::Autopilot,
        from: CellCoord::new(0, 0),
        to: CellCoord::new(0, 0),
        velocity: Velocity::ZERO,
    }));
    assert!(autopilot.is_recalculating());
    let stats = autopilot.stats();
    assert_eq!(stats.failed_replans, 1);
    assert_eq!(stats.replans, 0);
    assert_eq!(stats.fallback_moves, 1);
}

#[test]
fn unreachable_start_is_fatal_for_the_autopilot() {
    let mut race = race_on(&["S.1.#.2.", "######.#", "S.....2S"]);
    let mut autopilot = Autopilot::new(AutopilotConfig {
        heuristic: HeuristicKind::UniformCost,
        ..AutopilotConfig::default()
    });

    let error = pump(
        &mut race,
        &mut autopilot,
        start(CellCoord::new(0, 2), CellCoord::new(0, 0)),
        4,
    )
    .expect_err("autopilot is walled in");

    assert!(matches!(
        error,
        AutopilotError::UnreachableGoal(PlanError::Unreachable { .. })
    ));
}

#[test]
fn solo_races_ignore_the_autopilot() {
    let mut race = race_on(&["S......12S"]);
    let mut autopilot = Autopilot::default();
    let mut events = Vec::new();
    world::apply(
        &mut race,
        Command::StartRace {
            required_laps: 1,
            human_start: CellCoord::new(0, 0),
            autopilot_start: None,
        },
        &mut events,
    );

    let mut commands = Vec::new();
    autopilot
        .handle(&events, &race, &mut commands)
        .expect("nothing to plan");

    assert!(commands.is_empty());
    assert!(autopilot.plan().is_none());
}

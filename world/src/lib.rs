#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative race session state for vector racing.

pub mod connectivity;
pub mod progress;
pub mod track;
pub mod trajectory;

use vector_racing_core::{
    Acceleration, CellCoord, Command, CrossingEvent, Event, MoveRejection, MoverId, MoverState,
    RaceOutcome, StartRejection, Velocity,
};

use crate::progress::ProgressNote;
use crate::track::Track;
use crate::trajectory::{CandidateMove, SegmentCheck};

pub use crate::track::{starting_grid, StartGrid};

/// Lifecycle stage of a race session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RacePhase {
    /// No race has been started yet.
    Waiting,
    /// Movers are taking turns.
    Running,
    /// The race ended with the provided outcome.
    Finished(RaceOutcome),
}

/// Owned session context for a single race on a single track.
#[derive(Debug)]
pub struct Race {
    track: Track,
    required_laps: u32,
    phase: RacePhase,
    turn: MoverId,
    turns_started: u64,
    human: Option<Mover>,
    autopilot: Option<Mover>,
    in_flight: Option<PendingMove>,
    skipped: Option<MoverId>,
}

#[derive(Clone, Debug)]
struct Mover {
    state: MoverState,
    history: Vec<CellCoord>,
    moves: u32,
}

impl Mover {
    fn new(start: CellCoord) -> Self {
        Self {
            state: MoverState::at_start(start),
            history: vec![start],
            moves: 0,
        }
    }
}

#[derive(Clone, Debug)]
struct PendingMove {
    mover: MoverId,
    from: CellCoord,
    to: CellCoord,
    velocity: Velocity,
    crossings: Vec<CrossingEvent>,
}

impl Race {
    /// Creates an idle session on the provided track.
    #[must_use]
    pub fn new(track: Track) -> Self {
        Self {
            track,
            required_laps: vector_racing_core::DEFAULT_REQUIRED_LAPS,
            phase: RacePhase::Waiting,
            turn: MoverId::Human,
            turns_started: 0,
            human: None,
            autopilot: None,
            in_flight: None,
            skipped: None,
        }
    }

    fn mover(&self, id: MoverId) -> Option<&Mover> {
        match id {
            MoverId::Human => self.human.as_ref(),
            MoverId::Autopilot => self.autopilot.as_ref(),
        }
    }

    fn opponent_cell(&self, id: MoverId) -> Option<CellCoord> {
        self.mover(id.opponent()).map(|mover| mover.state.cell)
    }

    fn available_moves(&self, id: MoverId) -> Vec<CandidateMove> {
        let Some(mover) = self.mover(id) else {
            return Vec::new();
        };
        let from = mover.state.cell;
        let obstacle = self.opponent_cell(id);

        trajectory::candidate_moves(self.track.grid(), from, mover.state.velocity)
            .filter(|candidate| {
                obstacle.map_or(true, |cell| {
                    !trajectory::collides_with(from, candidate.destination, cell)
                })
            })
            .collect()
    }

    fn start(
        &mut self,
        required_laps: u32,
        human_start: CellCoord,
        autopilot_start: Option<CellCoord>,
        out_events: &mut Vec<Event>,
    ) {
        if required_laps == 0 {
            out_events.push(Event::RaceRejected {
                reason: StartRejection::NoLaps,
            });
            return;
        }

        for cell in std::iter::once(human_start).chain(autopilot_start) {
            if !self.track.is_on_finish_line(cell) {
                out_events.push(Event::RaceRejected {
                    reason: StartRejection::NotOnFinishLine { cell },
                });
                return;
            }
        }

        self.required_laps = required_laps;
        self.phase = RacePhase::Running;
        self.turns_started = 0;
        self.human = Some(Mover::new(human_start));
        self.autopilot = autopilot_start.map(Mover::new);
        self.in_flight = None;
        self.skipped = None;

        tracing::info!(
            required_laps,
            %human_start,
            autopilot = autopilot_start.is_some(),
            "race started"
        );
        out_events.push(Event::RaceStarted {
            required_laps,
            human_start,
            autopilot_start,
        });
        self.resolve_turn(MoverId::Human, out_events);
    }

    fn begin_move(
        &mut self,
        mover: MoverId,
        acceleration: Acceleration,
        out_events: &mut Vec<Event>,
    ) {
        match self.check_move(mover, acceleration) {
            Ok(pending) => {
                out_events.push(Event::MoveStarted {
                    mover,
                    from: pending.from,
                    to: pending.to,
                    velocity: pending.velocity,
                });
                self.in_flight = Some(pending);
            }
            Err(reason) => {
                tracing::debug!(%mover, ?reason, "move rejected");
                out_events.push(Event::MoveRejected {
                    mover,
                    acceleration,
                    reason,
                });
            }
        }
    }

    fn check_move(
        &self,
        id: MoverId,
        acceleration: Acceleration,
    ) -> Result<PendingMove, MoveRejection> {
        if self.phase != RacePhase::Running {
            return Err(MoveRejection::RaceNotRunning);
        }
        if self.in_flight.is_some() {
            return Err(MoveRejection::MoveInFlight);
        }
        if self.turn != id {
            return Err(MoveRejection::NotYourTurn);
        }
        let mover = self.mover(id).ok_or(MoveRejection::NotYourTurn)?;

        let from = mover.state.cell;
        let velocity = mover.state.velocity.accelerate(acceleration);
        let to = from
            .offset(velocity)
            .filter(|&cell| self.track.grid().contains(cell))
            .ok_or(MoveRejection::LeavesGrid)?;

        let crossings = match trajectory::validate(self.track.grid(), from, to) {
            SegmentCheck::Legal { crossings } => crossings,
            SegmentCheck::Blocked { at } => return Err(MoveRejection::Blocked { at }),
        };

        if let Some(at) = self.opponent_cell(id) {
            if trajectory::collides_with(from, to, at) {
                return Err(MoveRejection::CollidesWithOpponent { at });
            }
        }

        Ok(PendingMove {
            mover: id,
            from,
            to,
            velocity,
            crossings,
        })
    }

    fn commit_move(&mut self, out_events: &mut Vec<Event>) {
        let Some(pending) = self.in_flight.take() else {
            return;
        };
        let id = pending.mover;
        let required_laps = self.required_laps;

        let mut notes = Vec::new();
        let finished = {
            let checkpoint1 = self.track.checkpoint1();
            let checkpoint2 = self.track.checkpoint2();
            let mover = match id {
                MoverId::Human => self.human.as_mut(),
                MoverId::Autopilot => self.autopilot.as_mut(),
            };
            let Some(mover) = mover else {
                return;
            };

            let moved = MoverState {
                cell: pending.to,
                velocity: pending.velocity,
                ..mover.state
            };
            let update = progress::advance_observed(
                moved,
                &pending.crossings,
                checkpoint1,
                checkpoint2,
                |note| notes.push(note),
            );
            mover.state = update.state;
            mover.history.push(pending.to);
            mover.moves += 1;
            mover.state.has_finished(required_laps)
        };

        tracing::debug!(
            mover = %id,
            from = %pending.from,
            to = %pending.to,
            "move committed"
        );
        out_events.push(Event::MoveCommitted {
            mover: id,
            from: pending.from,
            to: pending.to,
            velocity: pending.velocity,
        });
        out_events.extend(notes.into_iter().map(|note| match note {
            ProgressNote::CheckpointPassed(checkpoint) => Event::CheckpointPassed {
                mover: id,
                checkpoint,
            },
            ProgressNote::LapCompleted { completed_lap } => Event::LapCompleted {
                mover: id,
                completed_lap,
            },
            ProgressNote::FinishMissed => Event::FinishMissed { mover: id },
        }));

        if finished {
            self.finish(RaceOutcome::Winner(id), out_events);
            return;
        }

        let next = if self.mover(id.opponent()).is_some() {
            id.opponent()
        } else {
            id
        };
        self.resolve_turn(next, out_events);
    }

    fn resolve_turn(&mut self, preferred: MoverId, out_events: &mut Vec<Event>) {
        self.skipped = None;

        for id in [preferred, preferred.opponent()] {
            if self.mover(id).is_none() {
                continue;
            }

            if !self.available_moves(id).is_empty() {
                self.turn = id;
                self.turns_started += 1;
                out_events.push(Event::TurnStarted { mover: id });
                return;
            }

            tracing::warn!(mover = %id, "no legal move available, skipping turn");
            self.skipped = Some(id);
            out_events.push(Event::TurnSkipped { mover: id });
        }

        self.finish(RaceOutcome::Stalled, out_events);
    }

    fn finish(&mut self, outcome: RaceOutcome, out_events: &mut Vec<Event>) {
        self.phase = RacePhase::Finished(outcome);
        tracing::info!(
            ?outcome,
            human_moves = self.human.as_ref().map_or(0, |mover| mover.moves),
            autopilot_moves = self.autopilot.as_ref().map_or(0, |mover| mover.moves),
            "race finished"
        );
        out_events.push(Event::RaceFinished { outcome });
    }
}

/// Applies the provided command to the session, mutating state deterministically.
pub fn apply(race: &mut Race, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartRace {
            required_laps,
            human_start,
            autopilot_start,
        } => race.start(required_laps, human_start, autopilot_start, out_events),
        Command::BeginMove {
            mover,
            acceleration,
        } => race.begin_move(mover, acceleration, out_events),
        Command::CommitMove => race.commit_move(out_events),
    }
}

/// Query functions that provide read-only access to the session state.
pub mod query {
    use super::{Race, RacePhase};
    use crate::track::Track;
    use crate::trajectory::CandidateMove;
    use vector_racing_core::{CellCoord, MoverId, MoverState, RaceOutcome, Velocity};

    /// Read-only view of a mover's bookkeeping.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MoverView<'a> {
        /// Current kinematic and progress state.
        pub state: MoverState,
        /// Number of committed moves.
        pub moves: u32,
        /// Every cell occupied so far, starting with the start cell.
        pub history: &'a [CellCoord],
    }

    /// Move that passed validation and awaits its commit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InFlightMove {
        /// Mover performing the move.
        pub mover: MoverId,
        /// Cell being left.
        pub from: CellCoord,
        /// Cell being reached.
        pub to: CellCoord,
        /// Velocity after the acceleration.
        pub velocity: Velocity,
    }

    /// Track the race is driven on.
    #[must_use]
    pub fn track(race: &Race) -> &Track {
        &race.track
    }

    /// Laps each mover must complete.
    #[must_use]
    pub fn required_laps(race: &Race) -> u32 {
        race.required_laps
    }

    /// Lifecycle stage of the session.
    #[must_use]
    pub fn phase(race: &Race) -> RacePhase {
        race.phase
    }

    /// Final outcome, once the race has ended.
    #[must_use]
    pub fn outcome(race: &Race) -> Option<RaceOutcome> {
        match race.phase {
            RacePhase::Finished(outcome) => Some(outcome),
            RacePhase::Waiting | RacePhase::Running => None,
        }
    }

    /// Mover holding the turn while the race runs.
    #[must_use]
    pub fn current_turn(race: &Race) -> Option<MoverId> {
        (race.phase == RacePhase::Running).then_some(race.turn)
    }

    /// Number of turns handed out since the race started.
    #[must_use]
    pub fn turns_started(race: &Race) -> u64 {
        race.turns_started
    }

    /// Current state of the mover, if it participates.
    #[must_use]
    pub fn mover_state(race: &Race, mover: MoverId) -> Option<MoverState> {
        race.mover(mover).map(|entry| entry.state)
    }

    /// Bookkeeping view of the mover, if it participates.
    #[must_use]
    pub fn mover_view(race: &Race, mover: MoverId) -> Option<MoverView<'_>> {
        race.mover(mover).map(|entry| MoverView {
            state: entry.state,
            moves: entry.moves,
            history: &entry.history,
        })
    }

    /// Cell occupied by the mover's opponent, if there is one.
    #[must_use]
    pub fn opponent_cell(race: &Race, mover: MoverId) -> Option<CellCoord> {
        race.opponent_cell(mover)
    }

    /// Legal moves for the mover that avoid its opponent.
    #[must_use]
    pub fn available_moves(race: &Race, mover: MoverId) -> Vec<CandidateMove> {
        race.available_moves(mover)
    }

    /// Mover whose turn was skipped during the latest hand-off.
    #[must_use]
    pub fn blocked_mover(race: &Race) -> Option<MoverId> {
        race.skipped
    }

    /// Move awaiting its commit, if any.
    #[must_use]
    pub fn in_flight(race: &Race) -> Option<InFlightMove> {
        race.in_flight.as_ref().map(|pending| InFlightMove {
            mover: pending.mover,
            from: pending.from,
            to: pending.to,
            velocity: pending.velocity,
        })
    }
}

//! Guided exercise player.
//!
//! Steps through a fixed list of exercises set by set. After each completed
//! set the player rests for the configured number of seconds, counting down
//! once per tick of its [`SessionTimer`]; the rest can be skipped. Completing
//! the last set of the last step finishes the workout.
//!
//! Rest rules:
//! 1. More sets left in the step → rest with the step's `rest_seconds`
//! 2. Last set of a step, more steps left → rest with the *finished* step's
//!    `rest_seconds`, then move to the next step at set 1
//! 3. Last set of the last step → Complete, no rest

use crate::clock::{Clock, SystemClock};
use crate::timer::{SessionTimer, Tick};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// What a set asks for
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StepTarget {
    Reps(u32),
    DurationSeconds(u32),
}

/// One exercise in a guided workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseStep {
    pub name: String,
    pub sets: u32,
    pub target: StepTarget,
    pub rest_seconds: u32,
}

impl ExerciseStep {
    pub fn reps(name: impl Into<String>, sets: u32, reps: u32, rest_seconds: u32) -> Self {
        Self {
            name: name.into(),
            sets,
            target: StepTarget::Reps(reps),
            rest_seconds,
        }
    }

    pub fn timed(name: impl Into<String>, sets: u32, seconds: u32, rest_seconds: u32) -> Self {
        Self {
            name: name.into(),
            sets,
            target: StepTarget::DurationSeconds(seconds),
            rest_seconds,
        }
    }

    fn validate(&self) -> Option<String> {
        if self.sets == 0 {
            return Some(format!("{}: needs at least one set", self.name));
        }
        match self.target {
            StepTarget::Reps(0) => Some(format!("{}: rep target must be > 0", self.name)),
            StepTarget::DurationSeconds(0) => {
                Some(format!("{}: duration must be > 0", self.name))
            }
            _ => None,
        }
    }
}

/// Coarse phase of the player
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPhase {
    Performing,
    Resting,
    Complete,
}

/// Snapshot exposed to rendering collaborators
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct PlayerState {
    pub step_index: usize,
    pub set_number: u32,
    pub resting: bool,
    pub remaining_rest: u32,
    pub completed: bool,
}

impl PlayerState {
    pub fn phase(&self) -> PlayerPhase {
        if self.completed {
            PlayerPhase::Complete
        } else if self.resting {
            PlayerPhase::Resting
        } else {
            PlayerPhase::Performing
        }
    }
}

pub struct ExercisePlayer<C: Clock = SystemClock> {
    clock: C,
    steps: Vec<ExerciseStep>,
    state: PlayerState,
    timer: SessionTimer,
    rest_scheduled: u32,
    rest_consumed: u32,
    rest_skipped: u32,
}

impl<C: Clock> ExercisePlayer<C> {
    /// Validates the steps; the player starts performing step 0, set 1.
    pub fn new(clock: C, steps: Vec<ExerciseStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::Player("guided workout has no steps".into()));
        }
        let problems: Vec<String> = steps.iter().filter_map(ExerciseStep::validate).collect();
        if !problems.is_empty() {
            return Err(Error::Player(problems.join("; ")));
        }

        let timer = SessionTimer::every_second()?;
        tracing::info!("Guided workout ready: {} steps", steps.len());
        Ok(Self {
            clock,
            steps,
            state: PlayerState {
                step_index: 0,
                set_number: 1,
                resting: false,
                remaining_rest: 0,
                completed: false,
            },
            timer,
            rest_scheduled: 0,
            rest_consumed: 0,
            rest_skipped: 0,
        })
    }

    /// Mark the current set done and move to rest, the next set, or completion
    pub fn complete_set(&mut self) -> Result<PlayerPhase> {
        match self.state.phase() {
            PlayerPhase::Resting => {
                return Err(Error::Player("cannot complete a set while resting".into()))
            }
            PlayerPhase::Complete => {
                return Err(Error::Player("workout already complete".into()))
            }
            PlayerPhase::Performing => {}
        }

        let step = &self.steps[self.state.step_index];
        let rest = step.rest_seconds;
        tracing::debug!(
            "Completed set {}/{} of {}",
            self.state.set_number,
            step.sets,
            step.name
        );

        if self.state.set_number < step.sets {
            self.state.set_number += 1;
            self.begin_rest(rest);
        } else if self.state.step_index + 1 < self.steps.len() {
            self.state.step_index += 1;
            self.state.set_number = 1;
            self.begin_rest(rest);
        } else {
            self.timer.stop();
            self.state.completed = true;
            tracing::info!(
                "Guided workout complete: {}s rested, {}s skipped",
                self.rest_consumed,
                self.rest_skipped
            );
        }
        Ok(self.state.phase())
    }

    /// End the rest now, whatever is left on the countdown
    pub fn skip_rest(&mut self) -> Result<()> {
        if !self.state.resting {
            return Err(Error::Player("not resting".into()));
        }
        self.rest_skipped += self.state.remaining_rest;
        tracing::debug!("Skipped {}s of rest", self.state.remaining_rest);
        self.finish_rest();
        Ok(())
    }

    /// Apply every countdown tick due by now. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let mut applied = 0;
        while let Some(tick) = self.timer.poll(now) {
            if self.on_tick(tick) {
                applied += 1;
            }
        }
        applied
    }

    fn on_tick(&mut self, tick: Tick) -> bool {
        if !self.timer.accepts(&tick) || !self.state.resting {
            tracing::debug!("Discarding stale rest tick due {}", tick.due);
            return false;
        }
        self.state.remaining_rest -= 1;
        self.rest_consumed += 1;
        if self.state.remaining_rest == 0 {
            self.finish_rest();
        }
        true
    }

    fn begin_rest(&mut self, seconds: u32) {
        self.rest_scheduled += seconds;
        if seconds == 0 {
            return;
        }
        self.state.resting = true;
        self.state.remaining_rest = seconds;
        self.timer.start(self.clock.now());
    }

    fn finish_rest(&mut self) {
        self.timer.stop();
        self.state.resting = false;
        self.state.remaining_rest = 0;
    }

    /// Stop the player and return where it got to
    pub fn abandon(mut self) -> PlayerState {
        self.timer.stop();
        tracing::info!(
            "Guided workout abandoned at step {} set {}",
            self.state.step_index,
            self.state.set_number
        );
        self.state
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn phase(&self) -> PlayerPhase {
        self.state.phase()
    }

    /// Step being performed, or prepared for after the current rest
    pub fn current_step(&self) -> Option<&ExerciseStep> {
        if self.state.completed {
            None
        } else {
            self.steps.get(self.state.step_index)
        }
    }

    pub fn steps(&self) -> &[ExerciseStep] {
        &self.steps
    }

    /// Fraction of steps finished
    pub fn progress(&self) -> f64 {
        if self.state.completed {
            1.0
        } else {
            self.state.step_index as f64 / self.steps.len() as f64
        }
    }

    pub fn rest_scheduled(&self) -> u32 {
        self.rest_scheduled
    }

    pub fn rest_consumed(&self) -> u32 {
        self.rest_consumed
    }

    pub fn rest_skipped(&self) -> u32 {
        self.rest_skipped
    }
}

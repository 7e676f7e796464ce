//! Ordered queue of delayed battle steps.
//!
//! Each entry waits `delay_ms` after the previous entry ran. The store's tick
//! subscription advances the clock; steps never overlap and nothing cancels a
//! running sequence.

use std::collections::VecDeque;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::creature::Side;

/// Interval of the tick subscription driving the timeline.
pub const TICK_MS: u32 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TurnStep {
    /// Cutscene overlay opens and the alternate form is requested.
    MegaActivate(Side),
    MegaEncase(Side),
    /// Form swap. Waits for the alternate form if it has not arrived yet.
    MegaBurst(Side),
    MegaFinish(Side),
    EnemyMegaRoll,
    ChooseOrder { player_move: usize },
    Announce { side: Side, move_index: usize },
    Strike { side: Side, move_index: usize },
    /// Defender settles after being hit by `side`.
    Recover { side: Side },
    /// Clears the transient animation of one side.
    Idle(Side),
    SendOut { index: usize },
    CatchShake,
    CatchResolve,
    /// Ends a sequence; the dialog box takes over.
    Settle,
}

impl TurnStep {
    /// Side whose attack this step belongs to.
    pub fn attacker(&self) -> Option<Side> {
        match self {
            TurnStep::Announce { side, .. }
            | TurnStep::Strike { side, .. }
            | TurnStep::Recover { side } => Some(*side),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Scheduled {
    pub delay_ms: u32,
    pub step: TurnStep,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    queue: VecDeque<Scheduled>,
    elapsed_ms: u32,
}

impl Timeline {
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = &TurnStep> {
        self.queue.iter().map(|scheduled| &scheduled.step)
    }

    pub fn push(&mut self, delay_ms: u32, step: TurnStep) {
        if self.queue.is_empty() {
            self.elapsed_ms = 0;
        }
        self.queue.push_back(Scheduled { delay_ms, step });
    }

    /// Runs `steps` before anything already queued, keeping their order. The
    /// first new step waits its full delay from now.
    pub fn push_front_all(&mut self, steps: Vec<(u32, TurnStep)>) {
        self.elapsed_ms = 0;
        for (delay_ms, step) in steps.into_iter().rev() {
            self.queue.push_front(Scheduled { delay_ms, step });
        }
    }

    /// Puts a blocked step back at the head; the clock restarts when it runs.
    pub fn defer(&mut self, step: TurnStep) {
        self.elapsed_ms = 0;
        self.queue.push_front(Scheduled { delay_ms: 0, step });
    }

    /// Removes the head step right away, ignoring its delay, if it matches `pred`.
    pub fn take_front_if(&mut self, pred: impl Fn(&TurnStep) -> bool) -> Option<TurnStep> {
        if !pred(&self.queue.front()?.step) {
            return None;
        }
        let scheduled = self.queue.pop_front()?;
        self.elapsed_ms = 0;
        Some(scheduled.step)
    }

    pub fn advance(&mut self, dt_ms: u32) {
        if !self.queue.is_empty() {
            self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        }
    }

    pub fn pop_due(&mut self) -> Option<TurnStep> {
        let head = self.queue.front()?;
        if self.elapsed_ms < head.delay_ms {
            return None;
        }
        self.elapsed_ms -= head.delay_ms;
        let scheduled = self.queue.pop_front()?;
        if self.queue.is_empty() {
            self.elapsed_ms = 0;
        }
        Some(scheduled.step)
    }

    /// Drops leading steps matching `pred`. Used to skip the rest of an attack
    /// whose user fainted before it could move.
    pub fn skip_while(&mut self, pred: impl Fn(&TurnStep) -> bool) {
        while self
            .queue
            .front()
            .map(|scheduled| pred(&scheduled.step))
            .unwrap_or(false)
        {
            if let Some(dropped) = self.queue.pop_front() {
                self.elapsed_ms = self.elapsed_ms.saturating_sub(dropped.delay_ms);
            }
        }
        if self.queue.is_empty() {
            self.elapsed_ms = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_fire_after_their_delay() {
        let mut timeline = Timeline::default();
        timeline.push(0, TurnStep::EnemyMegaRoll);
        timeline.push(800, TurnStep::Settle);

        assert_eq!(timeline.pop_due(), Some(TurnStep::EnemyMegaRoll));
        assert_eq!(timeline.pop_due(), None);

        timeline.advance(750);
        assert_eq!(timeline.pop_due(), None);
        timeline.advance(TICK_MS);
        assert_eq!(timeline.pop_due(), Some(TurnStep::Settle));
        assert!(timeline.is_idle());
    }

    #[test]
    fn test_delays_chain_from_previous_step() {
        let mut timeline = Timeline::default();
        timeline.push(100, TurnStep::Idle(Side::Player));
        timeline.push(100, TurnStep::Settle);

        timeline.advance(250);
        assert_eq!(timeline.pop_due(), Some(TurnStep::Idle(Side::Player)));
        assert_eq!(timeline.pop_due(), Some(TurnStep::Settle));
    }

    #[test]
    fn test_push_front_all_runs_before_queued() {
        let mut timeline = Timeline::default();
        timeline.push(0, TurnStep::Settle);
        timeline.push_front_all(vec![
            (0, TurnStep::MegaActivate(Side::Enemy)),
            (400, TurnStep::MegaEncase(Side::Enemy)),
        ]);
        let steps: Vec<_> = timeline.steps().cloned().collect();
        assert_eq!(
            steps,
            vec![
                TurnStep::MegaActivate(Side::Enemy),
                TurnStep::MegaEncase(Side::Enemy),
                TurnStep::Settle,
            ]
        );
    }

    #[test]
    fn test_push_front_all_does_not_inherit_elapsed_time() {
        let mut timeline = Timeline::default();
        timeline.push(1000, TurnStep::Idle(Side::Enemy));
        timeline.advance(500);
        assert_eq!(timeline.pop_due(), None);

        timeline.push_front_all(vec![(
            800,
            TurnStep::Strike {
                side: Side::Player,
                move_index: 0,
            },
        )]);
        timeline.advance(750);
        assert_eq!(timeline.pop_due(), None);
        timeline.advance(TICK_MS);
        assert_eq!(
            timeline.pop_due(),
            Some(TurnStep::Strike {
                side: Side::Player,
                move_index: 0,
            })
        );
    }

    #[test]
    fn test_take_front_if_ignores_delay() {
        let mut timeline = Timeline::default();
        timeline.push(1000, TurnStep::Idle(Side::Enemy));
        timeline.push(0, TurnStep::Settle);

        assert_eq!(timeline.take_front_if(|step| matches!(step, TurnStep::Settle)), None);
        assert_eq!(
            timeline.take_front_if(|step| matches!(step, TurnStep::Idle(_))),
            Some(TurnStep::Idle(Side::Enemy))
        );
        assert_eq!(timeline.pop_due(), Some(TurnStep::Settle));
    }

    #[test]
    fn test_defer_restarts_clock() {
        let mut timeline = Timeline::default();
        timeline.push(0, TurnStep::MegaBurst(Side::Player));
        timeline.push(1200, TurnStep::MegaFinish(Side::Player));

        timeline.advance(TICK_MS);
        assert_eq!(timeline.pop_due(), Some(TurnStep::MegaBurst(Side::Player)));
        timeline.defer(TurnStep::MegaBurst(Side::Player));

        timeline.advance(TICK_MS);
        assert_eq!(timeline.pop_due(), Some(TurnStep::MegaBurst(Side::Player)));
        assert_eq!(timeline.pop_due(), None);
        timeline.advance(1150);
        assert_eq!(timeline.pop_due(), Some(TurnStep::MegaFinish(Side::Player)));
    }

    #[test]
    fn test_skip_while_drops_attack_steps() {
        let mut timeline = Timeline::default();
        timeline.push(
            800,
            TurnStep::Strike {
                side: Side::Enemy,
                move_index: 0,
            },
        );
        timeline.push(600, TurnStep::Recover { side: Side::Enemy });
        timeline.push(0, TurnStep::Settle);

        timeline.skip_while(|step| step.attacker() == Some(Side::Enemy));
        assert_eq!(timeline.steps().collect::<Vec<_>>(), vec![&TurnStep::Settle]);
    }
}

//! Two-sided mutual exclusion with preemption.
//!
//! A [`TwoGate`] has a front side and a back side; at most one side is
//! open at a time, and any number of holders may share the open side.
//! The intended occupants are asymmetric: foreground consumers enter
//! [`Side::Front`], the background promoter parks on [`Side::Back`].
//!
//! Preemption is expressed as cancellation rather than priority. Every
//! guard carries a token that trips when the opposite side asks for the
//! gate; a holder that observes its token must finish up and release
//! promptly. The front side preempts — a blocked front entrant cancels the
//! back side's token — while the back side waits passively until the front
//! is idle. The usual handshake is therefore:
//!
//! - consumer: `request_open(Front)` then `enter(Front, Forever, token)`;
//! - promoter: hold `Back`, and on a tripped guard token release, let the
//!   consumer run, and re-enter `Back`.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::{
    error::WaitError,
    monitor::CANCEL_GRAIN,
    token::CancelToken,
    wait::Wait,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Foreground holders; preempt the back side when blocked.
    Front,
    /// Background holders; yield to the front and wait for idleness.
    Back,
}

impl Side {
    fn index(self) -> usize {
        match self {
            Side::Front => 0,
            Side::Back => 1,
        }
    }
}

struct State {
    open: Side,
    holders: usize,
    waiting: [usize; 2],
    /// Token handed to guards of the currently open side; cancelled to ask
    /// them to yield, replaced on every flip.
    yield_token: CancelToken,
}

pub struct TwoGate {
    state: Mutex<State>,
    cond: Condvar,
}

impl TwoGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                open: Side::Back,
                holders: 0,
                waiting: [0; 2],
                yield_token: CancelToken::new(),
            }),
            cond: Condvar::new(),
        }
    }

    /// Asks the gate to flip to `side` at the next safe point. When the
    /// opposite side is inside, its guards see their preempt token trip
    /// (front requests only; the back never preempts the front).
    pub fn request_open(&self, side: Side) {
        let mut state = self.state.lock();
        if state.open == side {
            return;
        }
        if state.holders == 0 {
            flip(&mut state, side);
            self.cond.notify_all();
        } else if side == Side::Front {
            state.yield_token.cancel();
        }
    }

    /// Blocks until `side` is open, then joins it. The guard's
    /// [`preempt_token`](GateGuard::preempt_token) trips when the opposite
    /// side requests the gate.
    pub fn enter(
        &self,
        side: Side,
        wait: Wait,
        token: &CancelToken,
    ) -> Result<GateGuard<'_>, WaitError> {
        let deadline = wait.deadline();
        let mut state = self.state.lock();
        state.waiting[side.index()] += 1;
        let res = loop {
            if token.is_cancelled() {
                break Err(WaitError::Cancelled);
            }
            if state.open == side {
                state.holders += 1;
                break Ok(state.yield_token.clone());
            }
            if state.holders == 0 {
                flip(&mut state, side);
                state.holders = 1;
                self.cond.notify_all();
                break Ok(state.yield_token.clone());
            }
            // Re-assert on every lap: the other side may have reopened
            // with a fresh token since the last request.
            if side == Side::Front {
                state.yield_token.cancel();
            }
            let now = Instant::now();
            if let Some(d) = deadline {
                if now >= d {
                    break Err(WaitError::TimedOut);
                }
            }
            let slice = match deadline {
                Some(d) => CANCEL_GRAIN.min(d - now),
                None => CANCEL_GRAIN,
            };
            self.cond.wait_for(&mut state, slice);
        };
        state.waiting[side.index()] -= 1;
        res.map(|token| GateGuard { gate: self, token })
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.holders -= 1;
        if state.holders == 0 {
            let next = if state.waiting[Side::Front.index()] > 0 {
                Some(Side::Front)
            } else if state.waiting[Side::Back.index()] > 0 {
                Some(Side::Back)
            } else {
                None
            };
            if let Some(side) = next {
                if state.open != side {
                    flip(&mut state, side);
                }
            }
            self.cond.notify_all();
        }
    }
}

impl Default for TwoGate {
    fn default() -> Self {
        Self::new()
    }
}

fn flip(state: &mut State, side: Side) {
    state.open = side;
    state.yield_token = CancelToken::new();
}

/// Shared occupancy of one side of a [`TwoGate`]; releases on drop.
pub struct GateGuard<'g> {
    gate: &'g TwoGate,
    token: CancelToken,
}

impl GateGuard<'_> {
    /// Trips when the opposite side asks this side to yield.
    pub fn preempt_token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

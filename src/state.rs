// printex - Distributed mutual exclusion among peer processes via
// Ricart-Agrawala, guarding a single shared printer resource
// Copyright (C) 2026  printex contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

// The peer state core: the tuple (state, my_ts, my_seq, deferred) plus the
// Lamport clock, all behind one mutex. A second, finer-grained lock is
// deliberately never introduced here — the tie-break in `decide_request`
// needs to observe `(state, my_ts)` together with the incoming request, and
// splitting the lock would reopen the race the whole algorithm exists to
// close.

use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::clock::LamportClock;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Released,
    Wanted,
    Held,
}

/// A `RequestAccess` whose reply has been withheld. Strategy B of the
/// algorithm (see DESIGN.md): rather than parking a worker thread on a
/// condition variable until it may reply, the handler stashes the reply
/// channel here and returns immediately; `release()` walks this list and
/// wakes each one.
struct Deferred {
    from_id: u32,
    their_ts: u64,
    reply: oneshot::Sender<u64>,
}

struct Inner {
    clock: LamportClock,
    state: State,
    my_ts: Option<u64>,
    my_seq: u64,
    deferred: Vec<Deferred>,
}

/// Outcome of evaluating an inbound `RequestAccess` against current state.
pub enum AccessDecision {
    /// Reply immediately with this timestamp.
    Grant(u64),
    /// Reply withheld; resolves once our own `release()` drains it.
    Deferred(oneshot::Receiver<u64>),
}

/// A withheld reply ready to be sent, produced by `release()`.
pub struct PendingReply {
    pub from_id: u32,
    pub ts_reply: u64,
    sender: oneshot::Sender<u64>,
}

impl PendingReply {
    pub fn send(self) {
        // The peer that was deferred may have given up (process exit,
        // connection drop) — nothing to do about a closed receiver.
        let _ = self.sender.send(self.ts_reply);
    }
}

pub struct PeerCore {
    pub id: u32,
    inner: Mutex<Inner>,
}

impl PeerCore {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            inner: Mutex::new(Inner {
                clock: LamportClock::new(),
                state: State::Released,
                my_ts: None,
                my_seq: 0,
                deferred: Vec::new(),
            }),
        }
    }

    pub fn tick(&self) -> u64 {
        self.inner.lock().unwrap().clock.tick()
    }

    pub fn merge(&self, received: u64) -> u64 {
        self.inner.lock().unwrap().clock.merge(received)
    }

    pub fn state(&self) -> State {
        self.inner.lock().unwrap().state
    }

    /// RELEASED -> WANTED. Returns the freshly minted request timestamp and
    /// the request sequence number for this request.
    pub fn begin_request(&self) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock().unwrap();

        if inner.state != State::Released {
            return Err(Error::ProtocolViolation(
                "begin_request called outside RELEASED",
            ));
        }

        inner.my_seq += 1;
        let ts = inner.clock.tick();
        inner.my_ts = Some(ts);
        inner.state = State::Wanted;

        Ok((ts, inner.my_seq))
    }

    /// WANTED -> HELD. Caller is responsible for having collected all N-1
    /// replies first; this only performs the transition.
    pub fn enter_critical(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        if inner.state != State::Wanted {
            return Err(Error::ProtocolViolation("enter_critical called outside WANTED"));
        }

        inner.state = State::Held;

        Ok(())
    }

    /// HELD -> RELEASED. Returns the deferred replies to send, each stamped
    /// with its own `tick()`'d timestamp (each is itself an outgoing-message
    /// event per spec.md §4.1).
    pub fn release(&self) -> Result<Vec<PendingReply>> {
        let mut inner = self.inner.lock().unwrap();

        if inner.state != State::Held {
            return Err(Error::ProtocolViolation("release called outside HELD"));
        }

        inner.state = State::Released;
        inner.my_ts = None;

        let pending = inner
            .deferred
            .drain(..)
            .map(|d| {
                let ts_reply = inner.clock.tick();

                PendingReply {
                    from_id: d.from_id,
                    ts_reply,
                    sender: d.reply,
                }
            })
            .collect();

        Ok(pending)
    }

    /// Evaluate an inbound `RequestAccess(from_id, their_ts)` against the
    /// tie-break rule of spec.md §4.6. Caller must have already merged
    /// `their_ts` into the clock before calling this.
    pub fn decide_request(&self, from_id: u32, their_ts: u64) -> AccessDecision {
        let mut inner = self.inner.lock().unwrap();

        let must_defer = match inner.state {
            State::Held => true,
            State::Wanted => {
                let my_ts = inner
                    .my_ts
                    .expect("state WANTED implies my_ts is set (invariant 2)");

                (my_ts, self.id) < (their_ts, from_id)
            }
            State::Released => false,
        };

        if must_defer {
            let (tx, rx) = oneshot::channel();

            inner.deferred.push(Deferred {
                from_id,
                their_ts,
                reply: tx,
            });

            AccessDecision::Deferred(rx)
        } else {
            AccessDecision::Grant(inner.clock.tick())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_peer_has_zero_outbound_messages_to_wait_on() {
        let core = PeerCore::new(1);

        let (ts, seq) = core.begin_request().unwrap();
        assert_eq!(ts, 1);
        assert_eq!(seq, 1);

        // N = 1: no peers to reply, enter_critical immediately.
        core.enter_critical().unwrap();
        assert_eq!(core.state(), State::Held);

        let pending = core.release().unwrap();
        assert!(pending.is_empty());
        assert_eq!(core.state(), State::Released);
    }

    #[test]
    fn re_requesting_while_held_is_rejected() {
        let core = PeerCore::new(1);

        core.begin_request().unwrap();
        core.enter_critical().unwrap();

        assert!(core.begin_request().is_err());
    }

    #[test]
    fn lower_id_wins_equal_timestamp_tie_break() {
        // Peer 1 is WANTED with ts=1. Peer 2 (higher id) requests with ts=1.
        let core = PeerCore::new(1);
        core.begin_request().unwrap();

        match core.decide_request(2, 1) {
            AccessDecision::Deferred(_) => {}
            AccessDecision::Grant(_) => panic!("peer 1 should defer the higher-id tied request"),
        }
    }

    #[test]
    fn higher_id_defers_to_lower_id_on_tie() {
        // Peer 2 is WANTED with ts=1. Peer 1 (lower id) requests with ts=1.
        let core = PeerCore::new(2);
        core.begin_request().unwrap();

        match core.decide_request(1, 1) {
            AccessDecision::Grant(_) => {}
            AccessDecision::Deferred(_) => panic!("peer 2 should grant the lower-id tied request"),
        }
    }

    #[test]
    fn lower_timestamp_wins_regardless_of_id() {
        // Peer 3 is WANTED with ts=7 (by advancing the clock before requesting).
        let core = PeerCore::new(3);
        core.merge(6); // clock now at 7
        let (ts, _) = core.begin_request().unwrap();
        assert_eq!(ts, 8);

        // Peer 1 (lower id) requests with ts=5, which is also lower than 8.
        match core.decide_request(1, 5) {
            AccessDecision::Grant(_) => {}
            AccessDecision::Deferred(_) => panic!("lower timestamp must take priority over id"),
        }
    }

    #[tokio::test]
    async fn deferred_reply_resolves_after_release() {
        let core = PeerCore::new(1);
        core.begin_request().unwrap();

        let rx = match core.decide_request(2, 100) {
            AccessDecision::Deferred(rx) => rx,
            AccessDecision::Grant(_) => panic!("our own lower-priority request should defer theirs"),
        };

        core.enter_critical().unwrap();
        let pending = core.release().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].from_id, 2);

        for p in pending {
            p.send();
        }

        let ts = rx.await.unwrap();
        assert!(ts > 0);
    }

    #[test]
    fn release_clears_deferred_and_my_ts() {
        let core = PeerCore::new(1);
        core.begin_request().unwrap();

        if let AccessDecision::Deferred(_) = core.decide_request(9, 1) {
            // withheld as expected
        }

        core.enter_critical().unwrap();
        let pending = core.release().unwrap();
        assert_eq!(pending.len(), 1);

        // Invariant 2: RELEASED => deferred = ∅ ∧ my_ts = ⊥.
        let inner = core.inner.lock().unwrap();
        assert!(inner.deferred.is_empty());
        assert_eq!(inner.my_ts, None);
    }
}

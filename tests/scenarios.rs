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

//! End-to-end exercises of the literal scenarios in spec.md §8, driven
//! through the real `Requester`/`PeerCore` stack with an in-memory stand-in
//! for the transport (`DirectLink`/`RecordingPrinter` below) instead of real
//! TCP sockets, per the strategy spec.md §9 calls out: peers hold only
//! connection handles, never references to each other's state, so a
//! same-process substitute that calls straight into a sibling's `PeerCore`
//! is behaviorally identical to dialing out over the wire.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use printex::error::Result;
use printex::peer_client::PeerLink;
use printex::printer_client::PrinterLink;
use printex::protocol::{AccessRelease, AccessRequest, AccessResponse, PrintRequest, PrintResponse};
use printex::requester::Requester;
use printex::state::{AccessDecision, PeerCore, State};

/// Calls straight into another peer's `PeerCore`, standing in for a dialed
/// `RequestAccess`/`ReleaseAccess` connection.
struct DirectLink {
    target: Arc<PeerCore>,
}

#[async_trait]
impl PeerLink for DirectLink {
    fn id(&self) -> u32 {
        self.target.id
    }

    async fn request_access(&self, request: AccessRequest) -> Result<AccessResponse> {
        self.target.merge(request.lamport_timestamp);

        let ts_reply = match self
            .target
            .decide_request(request.client_id, request.lamport_timestamp)
        {
            AccessDecision::Grant(ts) => ts,
            AccessDecision::Deferred(rx) => rx.await.expect("reply channel dropped before release"),
        };

        Ok(AccessResponse {
            access_granted: true,
            lamport_timestamp: ts_reply,
        })
    }

    async fn release_access(&self, release: AccessRelease) {
        self.target.merge(release.lamport_timestamp);
    }
}

/// One printed job, as observed by `RecordingPrinter`.
#[derive(Debug, Clone)]
struct Entry {
    client_id: u32,
    start: Instant,
    end: Instant,
}

/// A `PrinterLink` that never fails, logs arrival order, and holds each call
/// open for `hold` so overlapping calls (a mutual-exclusion violation) are
/// observable in the recorded intervals.
struct RecordingPrinter {
    log: Mutex<Vec<Entry>>,
    hold: Duration,
}

impl RecordingPrinter {
    fn new(hold: Duration) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            hold,
        }
    }

    fn client_ids_in_order(&self) -> Vec<u32> {
        self.log.lock().unwrap().iter().map(|e| e.client_id).collect()
    }

    fn has_overlap(&self) -> bool {
        let log = self.log.lock().unwrap();
        for a in log.iter() {
            for b in log.iter() {
                if a.client_id != b.client_id && a.start < b.end && b.start < a.end {
                    return true;
                }
            }
        }
        false
    }
}

#[async_trait]
impl PrinterLink for Arc<RecordingPrinter> {
    async fn send_to_printer(&self, request: PrintRequest) -> Result<PrintResponse> {
        let start = Instant::now();
        tokio::time::sleep(self.hold).await;
        let end = Instant::now();

        self.log.lock().unwrap().push(Entry {
            client_id: request.client_id,
            start,
            end,
        });

        Ok(PrintResponse {
            success: true,
            confirmation_message: format!("printed for {}", request.client_id),
            lamport_timestamp: request.lamport_timestamp + 1,
        })
    }
}

fn direct_peer(core: &Arc<PeerCore>) -> Box<dyn PeerLink> {
    Box::new(DirectLink {
        target: core.clone(),
    })
}

fn boxed_printer(printer: &Arc<RecordingPrinter>) -> Box<dyn PrinterLink> {
    Box::new(printer.clone())
}

/// Scenario A (spec.md §8): N = 2, peer 1 requests while peer 2 is idle.
/// Peer 1 must enter HELD, print, and release without ever being deferred.
#[tokio::test]
async fn scenario_a_serial_uncontended() {
    let core1 = Arc::new(PeerCore::new(1));
    let core2 = Arc::new(PeerCore::new(2));
    let printer = Arc::new(RecordingPrinter::new(Duration::from_millis(0)));

    let requester1 = Requester::new(core1.clone(), vec![direct_peer(&core2)], boxed_printer(&printer));

    requester1.run_once().await.unwrap();

    assert_eq!(core1.state(), State::Released);
    assert_eq!(printer.client_ids_in_order(), vec![1]);
}

/// Scenario B (spec.md §8): N = 2, both peers issue requests that race to an
/// equal Lamport timestamp. The lower id must win and enter HELD first.
#[tokio::test]
async fn scenario_b_tie_break_by_id() {
    let core1 = Arc::new(PeerCore::new(1));
    let core2 = Arc::new(PeerCore::new(2));
    let printer = Arc::new(RecordingPrinter::new(Duration::from_millis(5)));

    let requester1 = Requester::new(core1.clone(), vec![direct_peer(&core2)], boxed_printer(&printer));
    let requester2 = Requester::new(core2.clone(), vec![direct_peer(&core1)], boxed_printer(&printer));

    let (r1, r2) = tokio::join!(requester1.run_once(), requester2.run_once());
    r1.unwrap();
    r2.unwrap();

    assert_eq!(printer.client_ids_in_order(), vec![1, 2]);
    assert!(!printer.has_overlap());
}

/// Scenario C (spec.md §8): N = 3, peer 1 idle, peer 2 and peer 3 request
/// with distinct timestamps (5 and 7). The resource must receive peer 2's
/// job before peer 3's regardless of RPC interleaving.
#[tokio::test]
async fn scenario_c_tie_break_by_timestamp() {
    let core1 = Arc::new(PeerCore::new(1));
    let core2 = Arc::new(PeerCore::new(2));
    let core3 = Arc::new(PeerCore::new(3));
    let printer = Arc::new(RecordingPrinter::new(Duration::from_millis(5)));

    core2.merge(4); // next tick() = 5
    core3.merge(6); // next tick() = 7

    let requester2 = Requester::new(
        core2.clone(),
        vec![direct_peer(&core1), direct_peer(&core3)],
        boxed_printer(&printer),
    );
    let requester3 = Requester::new(
        core3.clone(),
        vec![direct_peer(&core1), direct_peer(&core2)],
        boxed_printer(&printer),
    );

    let (r2, r3) = tokio::join!(requester2.run_once(), requester3.run_once());
    r2.unwrap();
    r3.unwrap();

    assert_eq!(printer.client_ids_in_order(), vec![2, 3]);
}

/// Scenario D (spec.md §8): N = 3, peer 1 is already HELD when peer 2 and
/// peer 3 both request. Both are deferred; on peer 1's release, the lower
/// `(ts, id)` pair — peer 2 — enters HELD next, and peer 3 waits for it.
#[tokio::test]
async fn scenario_d_new_requests_during_held() {
    let core1 = Arc::new(PeerCore::new(1));
    let core2 = Arc::new(PeerCore::new(2));
    let core3 = Arc::new(PeerCore::new(3));
    let printer = Arc::new(RecordingPrinter::new(Duration::from_millis(5)));

    // Force peer 1 into HELD without going through its own Requester: this
    // scenario only exercises peer 2 and peer 3's reaction to an already-held
    // peer, not peer 1's own request/release cycle.
    core1.begin_request().unwrap();
    core1.enter_critical().unwrap();
    assert_eq!(core1.state(), State::Held);

    let requester2 = Requester::new(
        core2.clone(),
        vec![direct_peer(&core1), direct_peer(&core3)],
        boxed_printer(&printer),
    );
    let requester3 = Requester::new(
        core3.clone(),
        vec![direct_peer(&core1), direct_peer(&core2)],
        boxed_printer(&printer),
    );

    let driving = tokio::spawn(async move {
        let (r2, r3) = tokio::join!(requester2.run_once(), requester3.run_once());
        r2.unwrap();
        r3.unwrap();
    });

    // Give peer 2 and peer 3 a chance to issue their requests and be
    // deferred by peer 1 before releasing it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(core2.state(), State::Wanted);
    assert_eq!(core3.state(), State::Wanted);

    let pending = core1.release().unwrap();
    assert_eq!(pending.len(), 2);
    for reply in pending {
        reply.send();
    }

    driving.await.unwrap();

    assert_eq!(printer.client_ids_in_order(), vec![2, 3]);
    assert!(!printer.has_overlap());
}

/// Scenario F (spec.md §8): N = 5, all peers request within a short window.
/// The safety property — at most one peer HELD (printing) at any instant —
/// must hold regardless of how the five requests interleave.
#[tokio::test]
async fn scenario_f_maximum_concurrency_preserves_exclusion() {
    let cores: Vec<Arc<PeerCore>> = (1..=5u32).map(PeerCore::new).map(Arc::new).collect();
    let printer = Arc::new(RecordingPrinter::new(Duration::from_millis(10)));

    let mut handles = Vec::new();
    for core in &cores {
        let peers: Vec<Box<dyn PeerLink>> = cores
            .iter()
            .filter(|other| other.id != core.id)
            .map(direct_peer)
            .collect();

        let requester = Requester::new(core.clone(), peers, boxed_printer(&printer));
        handles.push(tokio::spawn(async move { requester.run_once().await }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ids = printer.client_ids_in_order();
    assert_eq!(ids.len(), 5);
    assert!(!printer.has_overlap());

    for core in &cores {
        assert_eq!(core.state(), State::Released);
    }
}

/// Boundary behavior (spec.md §8): N = 1, a request transitions straight
/// through RELEASED -> WANTED -> HELD -> RELEASED with zero outbound peer
/// messages.
#[tokio::test]
async fn single_peer_zero_outbound_messages() {
    let core = Arc::new(PeerCore::new(1));
    let printer = Arc::new(RecordingPrinter::new(Duration::from_millis(0)));

    let requester = Requester::new(core.clone(), Vec::new(), boxed_printer(&printer));
    requester.run_once().await.unwrap();

    assert_eq!(core.state(), State::Released);
    assert_eq!(printer.client_ids_in_order(), vec![1]);
}

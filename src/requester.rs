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

// The local peer lifecycle (spec.md §4.4): idle, request, await, critical,
// release. Runs forever on the main task of the `peer` binary while
// `PeerServer` answers inbound RPCs on its own spawned tasks.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use rand::Rng;

use crate::error::Result;
use crate::peer_client::PeerLink;
use crate::printer_client::PrinterLink;
use crate::protocol::{AccessRelease, AccessRequest, PrintRequest};
use crate::state::PeerCore;

/// Idle-phase sleep window, spec.md §4.4 step 1: "design parameter, e.g.
/// uniform in [4, 10] seconds — chosen to ensure contention but not
/// saturation".
const IDLE_MIN_SECS: f64 = 4.0;
const IDLE_MAX_SECS: f64 = 10.0;

pub struct Requester {
    core: Arc<PeerCore>,
    peers: Vec<Box<dyn PeerLink>>,
    printer: Box<dyn PrinterLink>,
}

impl Requester {
    pub fn new(
        core: Arc<PeerCore>,
        peers: Vec<Box<dyn PeerLink>>,
        printer: Box<dyn PrinterLink>,
    ) -> Self {
        Self {
            core,
            peers,
            printer,
        }
    }

    pub fn core(&self) -> &Arc<PeerCore> {
        &self.core
    }

    /// Runs the lifecycle forever. Returns only on a fatal error — per
    /// spec.md §7 category 1, a peer that cannot be contacted during a
    /// request cycle is treated as fatal for the whole process rather than
    /// silently entering HELD having heard back from fewer than N-1 peers
    /// (the policy spec.md §9 calls out as the Open Question this crate
    /// resolves, see DESIGN.md).
    pub async fn run(&self) -> Result<()> {
        loop {
            self.idle_phase().await;
            self.run_once().await?;
        }
    }

    async fn idle_phase(&self) {
        let secs = rand::thread_rng().gen_range(IDLE_MIN_SECS..IDLE_MAX_SECS);

        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }

    /// One full request/await/critical/release cycle (spec.md §4.4 steps
    /// 2-5), with the idle phase omitted. Exposed separately from `run` so
    /// scenario tests can drive deterministic cycles without waiting out the
    /// idle-phase sleep.
    pub async fn run_once(&self) -> Result<()> {
        let (my_ts, my_seq) = self.core.begin_request()?;

        info!(
            "peer {} -> WANTED (request #{}, ts={})",
            self.core.id, my_seq, my_ts
        );

        let request = AccessRequest {
            client_id: self.core.id,
            lamport_timestamp: my_ts,
            request_number: my_seq,
        };

        // Broadcast concurrently; every reply is awaited before proceeding.
        let replies = futures::future::join_all(
            self.peers.iter().map(|peer| peer.request_access(request)),
        )
        .await;

        for (peer, reply) in self.peers.iter().zip(replies) {
            let response = reply?;
            self.core.merge(response.lamport_timestamp);

            info!(
                "peer {} received OK from {} (ts={})",
                self.core.id,
                peer.id(),
                response.lamport_timestamp
            );
        }

        self.core.enter_critical()?;
        info!("peer {} -> HELD", self.core.id);

        let print_ts = self.core.tick();
        let print_request = PrintRequest {
            client_id: self.core.id,
            message_content: format!("message from peer {} (request #{})", self.core.id, my_seq),
            lamport_timestamp: print_ts,
            request_number: my_seq,
        };

        match self.printer.send_to_printer(print_request).await {
            Ok(response) => {
                self.core.merge(response.lamport_timestamp);
                info!(
                    "peer {} printer confirmed: {}",
                    self.core.id, response.confirmation_message
                );
            }
            // spec.md §7 category 3: surfaced, but we still release below to
            // avoid deadlocking every peer deferred on us.
            Err(e) => error!("peer {} could not reach printer: {}", self.core.id, e),
        }

        let pending = self.core.release()?;
        info!(
            "peer {} -> RELEASED, delivering {} deferred repl{}",
            self.core.id,
            pending.len(),
            if pending.len() == 1 { "y" } else { "ies" }
        );

        for reply in pending {
            reply.send();
        }

        let release_ts = self.core.tick();
        let release = AccessRelease {
            client_id: self.core.id,
            lamport_timestamp: release_ts,
            request_number: my_seq,
        };

        for peer in &self.peers {
            peer.release_access(release).await;
        }

        Ok(())
    }
}

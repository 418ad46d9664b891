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

// The "dumb" printer (spec.md §1, §6): the external resource the whole
// protocol exists to guard. It is oblivious to mutual exclusion — it only
// serializes overlapping calls and keeps its own Lamport clock, exactly as
// `original_source/src/printer_server.py` does, so that any exclusion
// violation upstream would show up here as overlapping print jobs.

use std::time::Duration;

use log::info;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::clock::LamportClock;
use crate::protocol::{PrintRequest, PrintResponse};

struct Inner {
    clock: LamportClock,
}

pub struct Printer {
    inner: Mutex<Inner>,
    delay: Duration,
}

impl Printer {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                clock: LamportClock::new(),
            }),
            delay,
        }
    }

    /// `SendToPrinter(PrintRequest) -> PrintResponse`. Holding the mutex
    /// across the simulated print delay is what makes overlapping calls
    /// serialize — irrelevant to the correctness of the mutual-exclusion
    /// protocol (spec.md §6), but it is what makes a violation upstream
    /// observable as a queued rather than overlapping print.
    pub async fn send_to_printer(&self, request: PrintRequest) -> PrintResponse {
        let mut inner = self.inner.lock().await;

        let received = inner.clock.merge(request.lamport_timestamp);

        info!(
            "printer received request from peer {} (req #{}, ts={}, merged={})",
            request.client_id, request.request_number, request.lamport_timestamp, received
        );

        sleep(self.delay).await;

        let response_ts = inner.clock.tick();

        info!(
            "printer finished request #{} from peer {} (ts={})",
            request.request_number, request.client_id, response_ts
        );

        PrintResponse {
            success: true,
            confirmation_message: format!(
                "message #{} from peer {} printed",
                request.request_number, request.client_id
            ),
            lamport_timestamp: response_ts,
        }
    }
}

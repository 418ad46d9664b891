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

// Outbound half of the peer service: one-shot connections dialed whenever
// the requester loop needs to call a sibling peer. Persisting connections
// across idle periods (spec.md §4.4 step 1 sleeps 4-10s between requests)
// buys little here, so each RPC simply dials, sends, awaits the reply (or
// not, for the fire-and-forget release notice), and lets the socket drop.
//
// `PeerLink` is the trait the requester loop actually programs against,
// grounded in the teacher's `Fetcher` trait (`sources/mod.rs`): one real
// implementation dials out over TCP, and the in-process scenario tests
// substitute an in-memory one wired directly to another peer's `PeerCore`,
// standing in for the transport per spec.md §9's note that the condition-
// variable and capture-and-defer strategies are transport-agnostic.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::protocol::{AccessRelease, AccessRequest, AccessResponse, Message};
use crate::transport;

#[async_trait]
pub trait PeerLink: Send + Sync {
    fn id(&self) -> u32;

    /// Blocking (from the requester loop's point of view) `RequestAccess`
    /// call. A transport failure here is fatal for the request cycle per
    /// spec.md §7 category 1 — the caller cannot complete a round without
    /// every peer's reply, so it is surfaced rather than swallowed.
    async fn request_access(&self, request: AccessRequest) -> Result<AccessResponse>;

    /// Informational `ReleaseAccess` notice (spec.md §4.4 step 5, §9: "the
    /// source sends both; spec treats it as informational only"). A
    /// transport failure here is benign per spec.md §7 category 2, so this
    /// has no `Result` to propagate.
    async fn release_access(&self, release: AccessRelease);
}

pub struct PeerClient {
    pub id: u32,
    pub addr: String,
}

impl PeerClient {
    pub fn new(id: u32, addr: String) -> Self {
        Self { id, addr }
    }
}

#[async_trait]
impl PeerLink for PeerClient {
    fn id(&self) -> u32 {
        self.id
    }

    async fn request_access(&self, request: AccessRequest) -> Result<AccessResponse> {
        let mut link = transport::connect(&self.addr)
            .await
            .map_err(|_| Error::PeerUnreachable(self.id))?;

        match transport::call(&mut link, &Message::AccessRequest(request)).await {
            Ok(Message::AccessResponse(response)) => Ok(response),
            Ok(_) => Err(Error::MalformedFrame),
            Err(_) => Err(Error::PeerUnreachable(self.id)),
        }
    }

    async fn release_access(&self, release: AccessRelease) {
        let result: Result<()> = async {
            let mut link = transport::connect(&self.addr).await?;
            transport::send(&mut link, &Message::AccessRelease(release)).await
        }
        .await;

        if let Err(e) = result {
            log::warn!(
                "failed to notify peer {} of release (benign): {}",
                self.id,
                e
            );
        }
    }
}

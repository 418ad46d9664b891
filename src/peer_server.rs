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

// Inbound half of the peer service (spec.md §4.3): a TCP listener spawning
// one task per accepted connection, grounded in the teacher's `up()`/
// `process_peer` split in `lrthrome.rs` — simplified because our wire
// protocol is one request/reply per connection rather than a long-lived
// multiplexed stream, so each task only ever reads a single frame.
//
// Strategy B (spec.md §9) means a deferred request never occupies a worker
// thread: the task simply `.await`s the oneshot receiver handed back by
// `PeerCore::decide_request`, which is exactly as cheap as any other
// suspended async task, so this naturally supports the "N-1 concurrent
// in-flight invocations" requirement of spec.md §4.3 without a sized pool.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Error, Result};
use crate::protocol::{AccessResponse, Message};
use crate::state::{AccessDecision, PeerCore};
use crate::transport;

pub struct PeerServer {
    listener: TcpListener,
    core: Arc<PeerCore>,
}

impl PeerServer {
    pub async fn bind(addr: &str, core: Arc<PeerCore>) -> Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            core,
        })
    }

    pub async fn serve(self) -> Result<()> {
        info!("peer {} listening for peer RPCs on {:?}", self.core.id, self.listener.local_addr());

        loop {
            let (stream, addr) = self.listener.accept().await?;
            let core = self.core.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, core).await {
                    warn!("peer connection from {} failed: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, core: Arc<PeerCore>) -> Result<()> {
    let mut link = transport::wrap(stream);

    let message = match transport::recv(&mut link).await? {
        Some(message) => message,
        None => return Ok(()),
    };

    match message {
        Message::AccessRequest(request) => {
            core.merge(request.lamport_timestamp);

            debug!(
                "peer {} received RequestAccess from {} (ts={})",
                core.id, request.client_id, request.lamport_timestamp
            );

            let ts_reply = match core.decide_request(request.client_id, request.lamport_timestamp) {
                AccessDecision::Grant(ts) => ts,
                AccessDecision::Deferred(rx) => {
                    debug!(
                        "peer {} deferring reply to {}",
                        core.id, request.client_id
                    );

                    rx.await.map_err(|_| Error::ReplyChannelClosed)?
                }
            };

            transport::send(
                &mut link,
                &Message::AccessResponse(AccessResponse {
                    access_granted: true,
                    lamport_timestamp: ts_reply,
                }),
            )
            .await?;
        }
        Message::AccessRelease(release) => {
            core.merge(release.lamport_timestamp);

            debug!(
                "peer {} received ReleaseAccess from {}",
                core.id, release.client_id
            );
        }
        _ => return Err(Error::MalformedFrame),
    }

    Ok(())
}

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

// Outbound half of the resource (printer) service. The printer is an
// external collaborator (spec.md §1): this client only needs to place one
// `SendToPrinter` call per critical-section entry and merge its reply.
//
// `PrinterLink` mirrors `PeerLink`'s purpose: the requester loop programs
// against the trait, the TCP implementation is the only one used in
// production, and scenario tests substitute an in-memory printer stand-in.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::protocol::{Message, PrintRequest, PrintResponse};
use crate::transport;

#[async_trait]
pub trait PrinterLink: Send + Sync {
    async fn send_to_printer(&self, request: PrintRequest) -> Result<PrintResponse>;
}

pub struct PrinterClient {
    pub addr: String,
}

impl PrinterClient {
    pub fn new(addr: String) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl PrinterLink for PrinterClient {
    async fn send_to_printer(&self, request: PrintRequest) -> Result<PrintResponse> {
        let mut link = transport::connect(&self.addr)
            .await
            .map_err(|_| Error::PrinterUnreachable)?;

        match transport::call(&mut link, &Message::PrintRequest(request)).await {
            Ok(Message::PrintResponse(response)) => Ok(response),
            Ok(_) => Err(Error::MalformedFrame),
            Err(_) => Err(Error::PrinterUnreachable),
        }
    }
}

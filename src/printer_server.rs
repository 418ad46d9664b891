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

// Networking glue for the printer binary, structured like `peer_server.rs`:
// one task per accepted connection, a single request/response frame pair.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Error, Result};
use crate::printer::Printer;
use crate::protocol::Message;
use crate::transport;

pub struct PrinterServer {
    listener: TcpListener,
    printer: Arc<Printer>,
}

impl PrinterServer {
    pub async fn bind(addr: &str, printer: Arc<Printer>) -> Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            printer,
        })
    }

    pub async fn serve(self) -> Result<()> {
        info!("printer listening on {:?}", self.listener.local_addr());

        loop {
            let (stream, addr) = self.listener.accept().await?;
            let printer = self.printer.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, printer).await {
                    warn!("printer connection from {} failed: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, printer: Arc<Printer>) -> Result<()> {
    let mut link = transport::wrap(stream);

    let message = match transport::recv(&mut link).await? {
        Some(message) => message,
        None => return Ok(()),
    };

    match message {
        Message::PrintRequest(request) => {
            debug!(
                "printer dispatching request #{} from peer {}",
                request.request_number, request.client_id
            );

            let response = printer.send_to_printer(request).await;

            transport::send(&mut link, &Message::PrintResponse(response)).await?;
        }
        _ => return Err(Error::MalformedFrame),
    }

    Ok(())
}

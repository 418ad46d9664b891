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

// Thin framing layer shared by every RPC client and server in this crate.
//
// spec.md §1 treats the transport as an external contract ("a reliable
// request/response RPC"); this module is the one concrete realization of
// that contract, grounded in the teacher's `Framed<TcpStream, _>` usage but
// upgraded from a raw byte codec to a length-delimited one, since our frames
// are discrete request/response messages rather than an open byte stream.

use tokio::net::TcpStream;
use tokio_stream::StreamExt;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use futures::SinkExt;

use crate::error::{Error, Result};
use crate::protocol::Message;

pub type Link = Framed<TcpStream, LengthDelimitedCodec>;

pub async fn connect(addr: &str) -> Result<Link> {
    let stream = TcpStream::connect(addr).await?;

    Ok(Framed::new(stream, LengthDelimitedCodec::new()))
}

pub fn wrap(stream: TcpStream) -> Link {
    Framed::new(stream, LengthDelimitedCodec::new())
}

pub async fn send(link: &mut Link, message: &Message) -> Result<()> {
    link.send(message.to_bytes()).await?;

    Ok(())
}

/// Reads exactly one frame and parses it. `None` means the peer closed the
/// connection cleanly before sending a reply.
pub async fn recv(link: &mut Link) -> Result<Option<Message>> {
    match link.next().await {
        Some(Ok(frame)) => Message::parse(&frame).map(Some),
        Some(Err(e)) => Err(Error::Io(e)),
        None => Ok(None),
    }
}

/// Sends `message` and waits for the single reply frame that answers it.
pub async fn call(link: &mut Link, message: &Message) -> Result<Message> {
    send(link, message).await?;

    recv(link).await?.ok_or(Error::MalformedFrame)
}

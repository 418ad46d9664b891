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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame")]
    MalformedFrame,

    #[error("invalid message variant {0}")]
    InvalidVariant(u8),

    #[error("protocol version mismatch: expected {expected}, received {received}")]
    VersionMismatch { expected: u8, received: u8 },

    #[error("peer {0} is unreachable")]
    PeerUnreachable(u32),

    #[error("printer is unreachable")]
    PrinterUnreachable,

    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    #[error("no endpoint configured for peer {0}")]
    UnknownPeer(u32),

    #[error("invalid peer spec '{0}', expected id=host:port")]
    InvalidPeerSpec(String),

    #[error("deferred reply channel dropped before release")]
    ReplyChannelClosed,
}

pub type Result<T> = std::result::Result<T, Error>;

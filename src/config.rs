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

// CLI surface (spec.md §6). Unlike the teacher, which loads a TOML file
// pointed to by an env var, this crate takes flags only: no environment
// variables, no persisted state, per spec.md §6's explicit requirement.

use clap::Parser;

use crate::error::{Error, Result};

/// A peer contending for the shared printer via Ricart-Agrawala mutual exclusion.
#[derive(Parser, Debug)]
#[command(name = "peer")]
pub struct PeerArgs {
    /// This peer's id, unique across the membership.
    #[arg(long)]
    pub id: u32,

    /// Listen endpoint for inbound peer RPCs (e.g. 127.0.0.1:5001).
    #[arg(long)]
    pub port: String,

    /// Other peers, comma-separated as id=host:port
    /// (e.g. 2=127.0.0.1:5002,3=127.0.0.1:5003).
    ///
    /// This supersedes the source's id-from-port-number convention
    /// (`port % 100`) flagged as an Open Question in spec.md §9: every peer
    /// id here is stated explicitly rather than derived.
    #[arg(long, value_delimiter = ',')]
    pub clients: Vec<String>,

    /// Endpoint of the printer resource (e.g. 127.0.0.1:50051).
    #[arg(long)]
    pub server: String,
}

impl PeerArgs {
    /// Parses `--clients` entries of the form `id=host:port`.
    pub fn parse_clients(&self) -> Result<Vec<(u32, String)>> {
        self.clients
            .iter()
            .map(|spec| {
                let (id_str, addr) = spec
                    .split_once('=')
                    .ok_or_else(|| Error::InvalidPeerSpec(spec.clone()))?;

                let id: u32 = id_str
                    .parse()
                    .map_err(|_| Error::InvalidPeerSpec(spec.clone()))?;

                Ok((id, addr.to_string()))
            })
            .collect()
    }
}

/// The "dumb" printer resource (spec.md §1, §6): oblivious to mutual
/// exclusion, exists only so a violation of exclusion would be observable.
#[derive(Parser, Debug)]
#[command(name = "printer")]
pub struct PrinterArgs {
    /// Listen endpoint for inbound `SendToPrinter` calls.
    #[arg(long, default_value = "127.0.0.1:50051")]
    pub port: String,

    /// Simulated printing delay in milliseconds.
    ///
    /// The original hard-codes a 2s sleep; this is exposed so tests don't
    /// have to wait on it.
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,
}

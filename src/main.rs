#[macro_use]
extern crate log;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use printex::config::PeerArgs;
use printex::peer_client::{PeerClient, PeerLink};
use printex::peer_server::PeerServer;
use printex::printer_client::{PrinterClient, PrinterLink};
use printex::requester::Requester;
use printex::state::PeerCore;

/// Bootstrap settling interval before the requester loop starts, per
/// spec.md §6: "on start, a peer brings up its server, then waits a small
/// settling interval... a pragmatic bootstrap, not part of the algorithm."
const BOOTSTRAP_SETTLE: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = PeerArgs::parse();
    let clients = args.parse_clients()?;

    info!(
        "peer {} starting (listen={}, printer={}, peers={})",
        args.id,
        args.port,
        args.server,
        clients.len()
    );

    let core = Arc::new(PeerCore::new(args.id));

    let server = PeerServer::bind(&args.port, core.clone()).await?;
    tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            error!("peer server crashed: {}", e);
        }
    });

    tokio::time::sleep(BOOTSTRAP_SETTLE).await;

    let peers: Vec<Box<dyn PeerLink>> = clients
        .into_iter()
        .map(|(id, addr)| Box::new(PeerClient::new(id, addr)) as Box<dyn PeerLink>)
        .collect();

    let printer: Box<dyn PrinterLink> = Box::new(PrinterClient::new(args.server.clone()));

    let requester = Requester::new(core, peers, printer);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("peer {} interrupted, shutting down", args.id);
            Ok(())
        }
        result = requester.run() => {
            result?;
            Ok(())
        }
    }
}

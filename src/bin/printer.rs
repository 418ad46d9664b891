#[macro_use]
extern crate log;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use printex::config::PrinterArgs;
use printex::printer::Printer;
use printex::printer_server::PrinterServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = PrinterArgs::parse();

    info!(
        "printer starting (port={}, delay={}ms)",
        args.port, args.delay_ms
    );

    let printer = Arc::new(Printer::new(Duration::from_millis(args.delay_ms)));
    let server = PrinterServer::bind(&args.port, printer).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("printer interrupted, shutting down");
            Ok(())
        }
        result = server.serve() => {
            result?;
            Ok(())
        }
    }
}

use std::{net::SocketAddr, path::PathBuf, process::exit};

use axum_server::Handle;
use clap::Parser;

use fintrack::{GatewayState, build_gateway_router, graceful_shutdown, setup_logging};

/// A gateway that forwards client requests to the fintrack API server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The base URL of the API server, e.g. "http://localhost:3000".
    #[arg(long)]
    backend_url: String,

    /// The port to serve the gateway from.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// File to write debug logs to.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(error) = setup_logging(args.log_file.as_deref()) {
        eprintln!("Could not open the log file: {error}");
        exit(1);
    }

    if reqwest::Url::parse(&args.backend_url).is_err() {
        tracing::error!("Invalid backend URL {}", args.backend_url);
        exit(1);
    }

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_gateway_router(GatewayState::new(&args.backend_url));
    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    tracing::info!(
        "Gateway listening on {} and forwarding to {}",
        addr,
        args.backend_url
    );
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Gateway stopped unexpectedly.");
}

//! IKE Connection Controller Example
//!
//! Sets up the network path to an IKE server, prints what was selected and
//! then runs the controller event loop for a while. No IKE exchange is
//! performed; the example only shows address selection, the NAT-T socket
//! switch and keepalives.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example connection_demo --features ipsec -- <server_hostname> [seconds] [--nat]
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=debug cargo run --example connection_demo --features ipsec -- vpn.example.com 60 --nat
//! ```
//!
//! With `--nat` the example behaves as if IKE_SA_INIT had reported a NAT and
//! moves to the UDP 4500 socket, which starts keepalives every 10 seconds.

use bytes::Bytes;
use ikelink_platform::Network;
use ikelink_proto::ipsec::{
    connection::{ConnectionDependencies, IkeConnectionCallback, IkeConnectionController},
    ikev2::IkeHeader,
    ConnectionConfig, Error,
};
use std::env;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Prints every notification the controller raises
struct PrintingSession;

impl IkeConnectionCallback for PrintingSession {
    fn on_underlying_network_updated(&mut self) {
        println!("→ Path updated");
    }

    fn on_underlying_network_died(&mut self, network: Network) {
        println!("✗ Network {} died", network);
    }

    fn on_ike_packet_received(&mut self, header: IkeHeader, packet: Bytes) {
        println!(
            "← IKE message id={} ({} bytes) for SPI {:016x}",
            header.message_id,
            packet.len(),
            header.local_spi()
        );
    }

    fn on_error(&mut self, error: Error) {
        eprintln!("✗ Connection error: {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <server_hostname> [seconds] [--nat]", args[0]);
        eprintln!();
        eprintln!("Environment variables:");
        eprintln!("  RUST_LOG=debug    Enable debug logging");
        std::process::exit(1);
    }
    let hostname = &args[1];
    let seconds: u64 = match args.get(2) {
        Some(arg) if arg != "--nat" => arg.parse()?,
        _ => 30,
    };
    let simulate_nat = args.iter().any(|arg| arg == "--nat");

    println!("IKE Connection Controller Example");
    println!("=================================");
    println!("Server:   {}", hostname);
    println!("Duration: {}s", seconds);
    println!();

    let config = ConnectionConfig::builder()
        .with_server_hostname(hostname.as_str())
        .with_keepalive_interval_secs(10)
        .build()?;

    let mut controller = IkeConnectionController::new(
        config,
        ConnectionDependencies::system(),
        Box::new(PrintingSession),
    )?;

    println!("[1/3] Setting up connection...");
    controller.set_up().await?;
    let spi = rand::random::<u64>();
    controller.register_ike_spi(spi)?;

    let info = controller.build_connection_info()?;
    println!("✓ Connected");
    println!("  Network: {}", info.network);
    println!("  Local:   {}:{}", info.local_address, info.local_port);
    println!("  Remote:  {}:{}", info.remote_address, info.remote_port);
    println!("  Socket:  {}", info.socket_kind);
    println!("  SPI:     {:016x}", spi);
    println!();

    if simulate_nat {
        println!("[2/3] Applying NAT detection result...");
        match controller.handle_nat_detection_in_ike_init(true, spi) {
            Ok(()) => println!(
                "✓ Now on {} (keepalive: {})",
                controller.socket_kind().map_or("-", |k| k.as_str()),
                controller.has_keepalive()
            ),
            Err(e) => println!("✗ NAT-T not possible: {}", e),
        }
    } else {
        println!("[2/3] No NAT simulated");
    }
    println!();

    println!("[3/3] Running event loop...");
    let deadline = Instant::now() + Duration::from_secs(seconds);
    while let Ok(Some(event)) = timeout_at(deadline, controller.next_event()).await {
        controller.handle_event(event).await;
    }

    let snapshot = controller.metrics().snapshot();
    controller.tear_down();

    println!();
    println!("Summary");
    println!("  Sockets opened:   {}", snapshot.sockets_opened);
    println!("  Keepalives sent:  {}", snapshot.keepalive_packets_sent);
    println!("  Packets received: {}", snapshot.packets_received);
    println!("  Packets dropped:  {}", snapshot.packets_dropped);

    Ok(())
}

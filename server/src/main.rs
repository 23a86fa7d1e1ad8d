use clap::Parser;
use log::{error, info};
use server::network::Server;
use server::rounds::RoundSettings;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,
}

/// Main-method of the application.
/// Parses command-line arguments, binds the listener and runs the server loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::new(&address, RoundSettings::default()).await?;
    info!("Fishing server ready on ws://{}", server.local_addr());

    let server_handle = tokio::spawn(server.run());

    // Handle shutdown gracefully
    tokio::select! {
        result = server_handle => {
            if let Err(e) = result {
                error!("Server task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use rand::Rng;
use shared::{ClientEvent, Fish, ServerEvent, JUNK_FISH_NAME};
use std::time::Duration;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Headless angler that joins the server and fishes on a loop
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short, long, default_value = "ws://127.0.0.1:3000")]
    server: String,
    /// Display name to join with
    #[arg(short, long, default_value = "Bot")]
    name: String,
    /// Number of casts before disconnecting
    #[arg(short, long, default_value = "20")]
    casts: u32,
}

// name, emoji, min weight, max weight
const FISH_TABLE: [(&str, &str, f64, f64); 5] = [
    ("Карась", "🐟", 0.2, 1.5),
    ("Окунь", "🐠", 0.3, 2.0),
    ("Щука", "🦈", 2.0, 12.0),
    ("Сом", "🐋", 5.0, 40.0),
    (JUNK_FISH_NAME, "👢", 1.0, 1.0),
];

fn random_fish(rng: &mut impl Rng) -> Fish {
    let (name, emoji, min, max) = FISH_TABLE[rng.gen_range(0..FISH_TABLE.len())];
    let weight = if max > min {
        rng.gen_range(min..max)
    } else {
        min
    };
    // Round to 10 grams like a kitchen scale
    Fish::new(name, emoji, (weight * 100.0).round() / 100.0)
}

fn describe(event: &ServerEvent) -> String {
    match event {
        ServerEvent::RoundStart {
            round, total_rounds, ..
        } => format!("round {}/{} started", round, total_rounds),
        ServerEvent::RoundEnd { round, ranking, .. } => format!(
            "round {} over, leader: {}",
            round,
            ranking.first().map(|s| s.name.as_str()).unwrap_or("nobody")
        ),
        ServerEvent::PlayerCaught {
            name,
            fish,
            total_weight,
            ..
        } => format!("{} caught {} {} kg (total {})", name, fish.name, fish.weight, total_weight),
        ServerEvent::GameEnd { winner, .. } => format!(
            "game over, winner: {}",
            winner.as_ref().map(|w| w.name.as_str()).unwrap_or("nobody")
        ),
        other => other.name().to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.server.as_str()).await?;
    info!("Connected to {}", args.server);
    let (mut write, mut read) = ws_stream.split();

    // Print every server event as it arrives
    let reader = tokio::spawn(async move {
        while let Some(Ok(message)) = read.next().await {
            if let Message::Text(text) = message {
                match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(ServerEvent::TimeUpdate { .. }) => {}
                    Ok(event) => info!("<- {}", describe(&event)),
                    Err(e) => warn!("Unreadable server frame: {}", e),
                }
            }
        }
    });

    let join = ClientEvent::Join {
        name: Some(args.name.clone()),
    };
    write.send(Message::Text(join.to_json())).await?;

    let mut rng = rand::thread_rng();
    for _ in 0..args.casts {
        let cast = ClientEvent::Cast {
            x: rng.gen_range(0.0..800.0),
            y: rng.gen_range(300.0..600.0),
        };
        write.send(Message::Text(cast.to_json())).await?;
        sleep(Duration::from_millis(rng.gen_range(1_000..4_000))).await;

        write.send(Message::Text(ClientEvent::Pulling.to_json())).await?;
        sleep(Duration::from_millis(rng.gen_range(500..1_500))).await;

        let outcome = if rng.gen_bool(0.7) {
            ClientEvent::Caught {
                fish: random_fish(&mut rng),
            }
        } else {
            ClientEvent::Missed { reason: None }
        };
        write.send(Message::Text(outcome.to_json())).await?;
        sleep(Duration::from_millis(500)).await;
    }

    write.send(Message::Text(ClientEvent::GetLeaderboard.to_json())).await?;
    sleep(Duration::from_millis(500)).await;

    write.send(Message::Close(None)).await?;
    reader.abort();
    info!("Test client finished");

    Ok(())
}

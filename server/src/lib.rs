//! # Fishing Derby Server Library
//!
//! This library provides the authoritative server for the multiplayer fishing
//! mini-game. It tracks connected anglers, runs a fixed sequence of timed
//! rounds, scores catches and keeps an all-time leaderboard of the heaviest
//! fish, broadcasting every change to all connected clients.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Scoring
//! Clients report what they landed; the server decides whether it counts.
//! Catches score only while a round is running, and the junk item never
//! scores. Round and lifetime totals are computed here, never trusted from
//! the client.
//!
//! ### Round Clock
//! A single repeating tick drives the countdown, round, break and game-end
//! phases. The clock stops when the last angler leaves and the whole game
//! restarts on its own after the final round if anyone is still around.
//!
//! ### State Broadcasting
//! Every mutation is paired with exactly one event, sent in the order the
//! mutation happened. Clients have no other way to learn about changes.
//!
//! ## Architecture Design
//!
//! ### Single-Task Event Loop
//! Connection tasks and timer tasks never touch game state. They post
//! messages to one loop which applies them sequentially, so each handler
//! sees a consistent snapshot and no locking is needed around the player
//! map, the leaderboard or the round state.
//!
//! ### Ports and Test Doubles
//! Outbound delivery goes through the [`broadcast::Gateway`] trait and
//! timers go through the [`timer::Scheduler`] trait. Tests drive the whole
//! game with [`broadcast::RecordingGateway`] and [`timer::ManualScheduler`]
//! instead of sockets and wall-clock time.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! Joined players, their statistics and the round/total rankings.
//!
//! ### Leaderboard Module (`leaderboard`)
//! Bounded list of the heaviest single catches across the process lifetime.
//!
//! ### Scoring Module (`scoring`)
//! Cast, pull, catch and miss handling on top of the registry and leaderboard.
//!
//! ### Rounds Module (`rounds`)
//! The phase state machine and the game state it owns.
//!
//! ### Game Module (`game`)
//! Dispatches inbound client events, disconnects and timer firings.
//!
//! ### Network Module (`network`)
//! WebSocket listener, per-connection tasks and the main server loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::rounds::RoundSettings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::new("0.0.0.0:3000", RoundSettings::default()).await?;
//!
//!     // Accepts connections and runs the round clock until the process exits
//!     server.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod game;
pub mod leaderboard;
pub mod network;
pub mod rounds;
pub mod scoring;
pub mod session;
pub mod timer;
mod utils;

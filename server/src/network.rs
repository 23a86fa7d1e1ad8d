//! Server network layer handling WebSocket connections and game loop coordination

use crate::broadcast::ConnectionHub;
use crate::game::FishingGame;
use crate::rounds::RoundSettings;
use crate::timer::{TimerFired, TokioScheduler};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientEvent, ConnectionId};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum NetworkMessage {
    Connected {
        id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Message>,
    },
    FrameReceived {
        id: ConnectionId,
        text: String,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// Main server coordinating networking and the game
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    game: FishingGame,
    hub: ConnectionHub,
    timers: TokioScheduler,

    // Communication channels
    network_tx: mpsc::UnboundedSender<NetworkMessage>,
    network_rx: mpsc::UnboundedReceiver<NetworkMessage>,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,
}

impl Server {
    pub async fn new(
        addr: &str,
        settings: RoundSettings,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (network_tx, network_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            game: FishingGame::new(settings),
            hub: ConnectionHub::new(),
            timers: TokioScheduler::new(timer_tx),
            network_tx,
            network_rx,
            timer_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawns task that accepts sockets and hands each to its own connection task
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let network_tx = self.network_tx.clone();

        tokio::spawn(async move {
            let mut next_id: u64 = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let id = ConnectionId::new(next_id);
                        next_id += 1;
                        tokio::spawn(Self::handle_connection(
                            stream,
                            addr,
                            id,
                            network_tx.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }
        });
    }

    /// Runs the handshake, then pumps frames in both directions until either side closes
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        id: ConnectionId,
        network_tx: mpsc::UnboundedSender<NetworkMessage>,
    ) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake with {} failed: {}", addr, e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        if network_tx
            .send(NetworkMessage::Connected {
                id,
                addr,
                outbound: outbound_tx,
            })
            .is_err()
        {
            return;
        }

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = write.send(message).await {
                    debug!("Failed to write to {}: {}", id, e);
                    break;
                }
            }
        });

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if network_tx
                        .send(NetworkMessage::FrameReceived { id, text })
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("Read error on {}: {}", id, e);
                    break;
                }
            }
        }

        let _ = network_tx.send(NetworkMessage::Disconnected { id });
        writer.abort();
    }

    fn handle_network_message(&mut self, message: NetworkMessage) {
        match message {
            NetworkMessage::Connected { id, addr, outbound } => {
                info!("{} connected from {}", id, addr);
                self.hub.register(id, outbound);
            }
            NetworkMessage::FrameReceived { id, text } => match ClientEvent::from_json(&text) {
                Ok(event) => {
                    self.game
                        .handle_event(id, event, &mut self.hub, &mut self.timers);
                }
                Err(e) => {
                    warn!("Dropping frame from {}: {}", id, e);
                }
            },
            NetworkMessage::Disconnected { id } => {
                info!("{} disconnected", id);
                self.hub.unregister(id);
                self.game
                    .handle_disconnect(id, &mut self.hub, &mut self.timers);
            }
        }
    }

    /// Main server loop; every game mutation happens here, one message at a time
    pub async fn run(mut self) {
        self.spawn_acceptor();
        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.network_rx.recv() => {
                    match message {
                        Some(message) => self.handle_network_message(message),
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                Some(fired) = self.timer_rx.recv() => {
                    self.game.handle_timer(fired, &mut self.hub, &mut self.timers);
                },
            }
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

pub const TOTAL_ROUNDS: u32 = 10;
pub const ROUND_TIME: u32 = 120;
pub const BREAK_TIME: u32 = 10;
pub const COUNTDOWN: u32 = 5;
pub const RESTART_DELAY: u32 = 15;
pub const LEADERBOARD_SIZE: usize = 10;

/// Placeholder catch that animates on the client but never scores.
pub const JUNK_FISH_NAME: &str = "Старый ботинок";
pub const DEFAULT_PLAYER_NAME: &str = "Рыбак";
pub const DEFAULT_MISS_REASON: &str = "escaped";
/// Heaviest single catch the server accepts, in kilograms.
pub const MAX_FISH_WEIGHT: f64 = 1_000.0;

pub const PLAYER_COLORS: [&str; 8] = [
    "#e74c3c", "#3498db", "#2ecc71", "#9b59b6", "#f39c12", "#1abc9c", "#e91e63", "#00bcd4",
];

/// Opaque token handed out by the transport for one connection.
///
/// The server keys players by it for the lifetime of the process but never
/// derives any meaning from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Fish {
    pub name: String,
    pub emoji: String,
    pub weight: f64,
}

impl Fish {
    pub fn new(name: &str, emoji: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            emoji: emoji.to_string(),
            weight,
        }
    }

    pub fn is_junk(&self) -> bool {
        self.name == JUNK_FISH_NAME
    }

    /// Positive and no heavier than [`MAX_FISH_WEIGHT`]
    pub fn has_valid_weight(&self) -> bool {
        self.weight.is_finite() && self.weight > 0.0 && self.weight <= MAX_FISH_WEIGHT
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub is_fishing: bool,
    pub fish_count: u32,
    pub total_weight: f64,
    pub round_weight: f64,
    pub round_fish: u32,
    pub best_catch: Option<Fish>,
}

impl Player {
    pub fn new(id: ConnectionId, name: String, color: String) -> Self {
        Self {
            id,
            name,
            color,
            x: 0.0,
            y: 0.0,
            is_fishing: false,
            fish_count: 0,
            total_weight: 0.0,
            round_weight: 0.0,
            round_fish: 0,
            best_catch: None,
        }
    }

    pub fn round_standing(&self) -> RoundStanding {
        RoundStanding {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            round_weight: self.round_weight,
            round_fish: self.round_fish,
        }
    }

    pub fn total_standing(&self) -> TotalStanding {
        TotalStanding {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            total_weight: self.total_weight,
            total_fish: self.fish_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundStanding {
    pub id: ConnectionId,
    pub name: String,
    pub color: String,
    pub round_weight: f64,
    pub round_fish: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TotalStanding {
    pub id: ConnectionId,
    pub name: String,
    pub color: String,
    pub total_weight: f64,
    pub total_fish: u32,
}

/// One best-catch record; `name` is the angler's name at the time of the catch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub fish: String,
    pub emoji: String,
    pub weight: f64,
    pub time: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub current_round: u32,
    pub total_rounds: u32,
    pub time_left: u32,
    pub is_active: bool,
    pub is_break: bool,
}

/// Events pushed from the server, framed as `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    Joined {
        player: Player,
        players: Vec<Player>,
        leaderboard: Vec<LeaderboardEntry>,
        game_state: GameStateView,
    },
    PlayerJoined(Player),
    PlayerCast {
        id: ConnectionId,
        x: f64,
        y: f64,
    },
    PlayerPulling {
        id: ConnectionId,
        name: String,
    },
    PlayerCaught {
        id: ConnectionId,
        name: String,
        fish: Fish,
        fish_count: u32,
        total_weight: f64,
        round_fish: u32,
        round_weight: f64,
    },
    PlayerMissed {
        id: ConnectionId,
        name: String,
        reason: String,
    },
    PlayerLeft(ConnectionId),
    LeaderboardUpdate(Vec<LeaderboardEntry>),
    GameStarting {
        countdown: u32,
    },
    RoundStart {
        round: u32,
        total_rounds: u32,
        time_left: u32,
    },
    TimeUpdate {
        time_left: u32,
        round: u32,
        is_break: bool,
    },
    RoundEnd {
        round: u32,
        ranking: Vec<RoundStanding>,
        total_ranking: Vec<TotalStanding>,
    },
    BreakStart {
        time_left: u32,
        next_round: u32,
    },
    GameEnd {
        ranking: Vec<TotalStanding>,
        winner: Option<TotalStanding>,
    },
    GameReset,
}

impl ServerEvent {
    /// Wire name of the event, handy for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Joined { .. } => "joined",
            ServerEvent::PlayerJoined(_) => "playerJoined",
            ServerEvent::PlayerCast { .. } => "playerCast",
            ServerEvent::PlayerPulling { .. } => "playerPulling",
            ServerEvent::PlayerCaught { .. } => "playerCaught",
            ServerEvent::PlayerMissed { .. } => "playerMissed",
            ServerEvent::PlayerLeft(_) => "playerLeft",
            ServerEvent::LeaderboardUpdate(_) => "leaderboardUpdate",
            ServerEvent::GameStarting { .. } => "gameStarting",
            ServerEvent::RoundStart { .. } => "roundStart",
            ServerEvent::TimeUpdate { .. } => "timeUpdate",
            ServerEvent::RoundEnd { .. } => "roundEnd",
            ServerEvent::BreakStart { .. } => "breakStart",
            ServerEvent::GameEnd { .. } => "gameEnd",
            ServerEvent::GameReset => "gameReset",
        }
    }
}

/// Why an inbound frame was dropped.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("invalid `{event}` payload: {reason}")]
    InvalidPayload {
        event: &'static str,
        reason: &'static str,
    },
}

/// Gameplay and session events sent by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Join { name: Option<String> },
    Cast { x: f64, y: f64 },
    Pulling,
    Caught { fish: Fish },
    Missed { reason: Option<String> },
    GetLeaderboard,
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct CastPayload {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct CaughtPayload {
    fish: Fish,
}

#[derive(Deserialize)]
struct MissedPayload {
    #[serde(default)]
    reason: Option<String>,
}

impl ClientEvent {
    /// Parses and validates one text frame.
    ///
    /// Only the presence and basic shape of required fields is checked here;
    /// everything else (unknown players, game phase) is the game's concern.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;

        match envelope.event.as_str() {
            "join" => match envelope.data {
                Value::Null => Ok(ClientEvent::Join { name: None }),
                Value::String(name) => Ok(ClientEvent::Join { name: Some(name) }),
                _ => Err(ProtocolError::InvalidPayload {
                    event: "join",
                    reason: "name must be a string",
                }),
            },
            "cast" => {
                let payload: CastPayload = serde_json::from_value(envelope.data)?;
                if !payload.x.is_finite() || !payload.y.is_finite() {
                    return Err(ProtocolError::InvalidPayload {
                        event: "cast",
                        reason: "coordinates must be finite",
                    });
                }
                Ok(ClientEvent::Cast {
                    x: payload.x,
                    y: payload.y,
                })
            }
            "pulling" => Ok(ClientEvent::Pulling),
            "caught" => {
                let payload: CaughtPayload = serde_json::from_value(envelope.data)?;
                if !payload.fish.has_valid_weight() {
                    return Err(ProtocolError::InvalidPayload {
                        event: "caught",
                        reason: "fish weight must be positive and at most 1000 kg",
                    });
                }
                Ok(ClientEvent::Caught { fish: payload.fish })
            }
            // Unreadable payloads fall back to the default reason
            "missed" => {
                let reason = serde_json::from_value::<MissedPayload>(envelope.data)
                    .ok()
                    .and_then(|payload| payload.reason);
                Ok(ClientEvent::Missed { reason })
            }
            "getLeaderboard" => Ok(ClientEvent::GetLeaderboard),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Encodes the event the way a browser client would send it.
    pub fn to_json(&self) -> String {
        let frame = match self {
            ClientEvent::Join { name } => json!({ "event": "join", "data": name }),
            ClientEvent::Cast { x, y } => json!({ "event": "cast", "data": { "x": x, "y": y } }),
            ClientEvent::Pulling => json!({ "event": "pulling", "data": {} }),
            ClientEvent::Caught { fish } => json!({ "event": "caught", "data": { "fish": fish } }),
            ClientEvent::Missed { reason } => {
                json!({ "event": "missed", "data": { "reason": reason } })
            }
            ClientEvent::GetLeaderboard => json!({ "event": "getLeaderboard" }),
        };
        frame.to_string()
    }
}

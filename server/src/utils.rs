use shared::PLAYER_COLORS;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Pick a display colour from the palette, cycling by join order
pub fn color_for(join_index: usize) -> String {
    PLAYER_COLORS[join_index % PLAYER_COLORS.len()].to_string()
}

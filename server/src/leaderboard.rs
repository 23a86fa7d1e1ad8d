//! All-time best single catches
//!
//! The store keeps at most [`LEADERBOARD_SIZE`] entries, heaviest first.
//! A new catch is appended, the list is re-sorted and the tail is dropped, so
//! an entry survives only while it ranks among the best by weight. Equal
//! weights keep insertion order, which means an older record wins a tie.

use crate::utils::get_timestamp;
use log::debug;
use shared::{Fish, LeaderboardEntry, LEADERBOARD_SIZE};

#[derive(Debug)]
pub struct LeaderboardStore {
    entries: Vec<LeaderboardEntry>,
    capacity: usize,
}

impl LeaderboardStore {
    pub fn new() -> Self {
        Self::with_capacity(LEADERBOARD_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Records a catch, returning false if the catch is the junk item
    ///
    /// A true return means the list was re-evaluated and should be
    /// broadcast, even if the new entry fell straight off the end.
    pub fn record(&mut self, player_name: &str, fish: &Fish) -> bool {
        self.record_at(player_name, fish, get_timestamp())
    }

    pub fn record_at(&mut self, player_name: &str, fish: &Fish, time: u64) -> bool {
        if fish.is_junk() {
            return false;
        }

        self.entries.push(LeaderboardEntry {
            name: player_name.to_string(),
            fish: fish.name.clone(),
            emoji: fish.emoji.clone(),
            weight: fish.weight,
            time,
        });
        self.entries.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        self.entries.truncate(self.capacity);

        debug!(
            "Leaderboard after {} caught {} ({}): {} entries",
            player_name,
            fish.name,
            fish.weight,
            self.entries.len()
        );
        true
    }

    pub fn snapshot(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LeaderboardStore {
    fn default() -> Self {
        Self::new()
    }
}

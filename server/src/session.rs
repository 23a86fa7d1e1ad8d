//! Player session tracking for the fishing server
//!
//! This module owns every connected player and their statistics:
//! - Session lifecycle (join, rejoin, leave)
//! - Per-round and lifetime catch statistics
//! - Round and total rankings computed on demand
//!
//! Players are keyed by the transport's connection id. The registry also
//! remembers join order, which decides colour assignment and breaks ties
//! when two players have the same weight in a ranking.

use crate::utils::color_for;
use log::info;
use shared::{ConnectionId, Player, RoundStanding, TotalStanding, DEFAULT_PLAYER_NAME};
use std::collections::HashMap;

/// Registry of all joined players
///
/// The registry holds no notion of the game phase; callers decide when
/// stats are reset and what gets broadcast about each change.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Joined players indexed by connection id
    players: HashMap<ConnectionId, Player>,
    /// Connection ids in the order their players first joined
    join_order: Vec<ConnectionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a player for the given connection
    ///
    /// Blank or missing names fall back to the default angler name. The
    /// colour is picked from the palette by the number of players already
    /// present. Joining again from the same connection replaces the player
    /// record but keeps its position in join order.
    pub fn join(&mut self, id: ConnectionId, requested_name: Option<&str>) -> &Player {
        let name = requested_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PLAYER_NAME)
            .to_string();
        let color = color_for(self.players.len());

        if !self.players.contains_key(&id) {
            self.join_order.push(id);
        }

        info!(
            "{} joined as {} ({} players)",
            id,
            name,
            self.join_order.len()
        );

        self.players.insert(id, Player::new(id, name, color));
        &self.players[&id]
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Removes a player, returning it if it was registered
    pub fn leave(&mut self, id: ConnectionId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.join_order.retain(|joined| *joined != id);
        info!(
            "{} ({}) left ({} players)",
            player.name,
            id,
            self.players.len()
        );
        Some(player)
    }

    /// Zeroes the current-round statistics of every player
    pub fn reset_round_stats(&mut self) {
        for player in self.players.values_mut() {
            player.round_fish = 0;
            player.round_weight = 0.0;
        }
    }

    /// Zeroes lifetime and current-round statistics of every player
    pub fn reset_lifetime_stats(&mut self) {
        for player in self.players.values_mut() {
            player.fish_count = 0;
            player.total_weight = 0.0;
            player.round_fish = 0;
            player.round_weight = 0.0;
        }
    }

    /// All players in join order
    pub fn players(&self) -> Vec<Player> {
        self.iter_in_order().cloned().collect()
    }

    /// Players sorted by round weight, heaviest first
    pub fn round_ranking(&self) -> Vec<RoundStanding> {
        let mut ranking: Vec<RoundStanding> =
            self.iter_in_order().map(Player::round_standing).collect();
        // sort_by is stable, so equal weights keep join order
        ranking.sort_by(|a, b| b.round_weight.total_cmp(&a.round_weight));
        ranking
    }

    /// Players sorted by lifetime weight, heaviest first
    pub fn total_ranking(&self) -> Vec<TotalStanding> {
        let mut ranking: Vec<TotalStanding> =
            self.iter_in_order().map(Player::total_standing).collect();
        ranking.sort_by(|a, b| b.total_weight.total_cmp(&a.total_weight));
        ranking
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn iter_in_order(&self) -> impl Iterator<Item = &Player> {
        self.join_order.iter().filter_map(|id| self.players.get(id))
    }
}

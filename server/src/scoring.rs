//! Gameplay events that touch player statistics
//!
//! A [`ScoreAggregator`] borrows the registry, the leaderboard and the
//! gateway for the duration of one inbound event. Events from connections
//! that never joined are dropped without a trace.

use crate::broadcast::Gateway;
use crate::leaderboard::LeaderboardStore;
use crate::session::SessionRegistry;
use log::debug;
use shared::{ConnectionId, Fish, ServerEvent, DEFAULT_MISS_REASON};

pub struct ScoreAggregator<'a> {
    registry: &'a mut SessionRegistry,
    leaderboard: &'a mut LeaderboardStore,
    gateway: &'a mut dyn Gateway,
}

impl<'a> ScoreAggregator<'a> {
    pub fn new(
        registry: &'a mut SessionRegistry,
        leaderboard: &'a mut LeaderboardStore,
        gateway: &'a mut dyn Gateway,
    ) -> Self {
        Self {
            registry,
            leaderboard,
            gateway,
        }
    }

    /// Applies a landed fish, returning whether it scored
    ///
    /// A catch scores only while a round is active, the fish is not the
    /// junk item and its weight is within [`shared::MAX_FISH_WEIGHT`]. `playerCaught`
    /// goes out either way so clients can play the catch animation.
    pub fn apply_catch(&mut self, id: ConnectionId, fish: Fish, round_active: bool) -> bool {
        let Some(player) = self.registry.get_mut(id) else {
            return false;
        };

        player.is_fishing = false;
        let scored = round_active && !fish.is_junk() && fish.has_valid_weight();

        if scored {
            player.fish_count += 1;
            player.total_weight += fish.weight;
            player.round_fish += 1;
            player.round_weight += fish.weight;

            let is_best = player
                .best_catch
                .as_ref()
                .map_or(true, |best| fish.weight > best.weight);
            if is_best {
                player.best_catch = Some(fish.clone());
            }
        } else {
            debug!(
                "{} landed {} ({}) without scoring (round active: {})",
                player.name, fish.name, fish.weight, round_active
            );
        }

        let caught = ServerEvent::PlayerCaught {
            id,
            name: player.name.clone(),
            fish: fish.clone(),
            fish_count: player.fish_count,
            total_weight: player.total_weight,
            round_fish: player.round_fish,
            round_weight: player.round_weight,
        };
        let name = player.name.clone();

        if scored && self.leaderboard.record(&name, &fish) {
            self.gateway.broadcast(ServerEvent::LeaderboardUpdate(
                self.leaderboard.snapshot().to_vec(),
            ));
        }
        self.gateway.broadcast(caught);
        scored
    }

    pub fn apply_miss(&mut self, id: ConnectionId, reason: Option<String>) {
        let Some(player) = self.registry.get_mut(id) else {
            return;
        };

        player.is_fishing = false;
        let reason = reason
            .filter(|reason| !reason.is_empty())
            .unwrap_or_else(|| DEFAULT_MISS_REASON.to_string());

        self.gateway.broadcast(ServerEvent::PlayerMissed {
            id,
            name: player.name.clone(),
            reason,
        });
    }

    pub fn apply_cast(&mut self, id: ConnectionId, x: f64, y: f64) {
        let Some(player) = self.registry.get_mut(id) else {
            return;
        };

        player.x = x;
        player.y = y;
        player.is_fishing = true;

        self.gateway.broadcast(ServerEvent::PlayerCast { id, x, y });
    }

    /// Relays that a player is reeling in; no state changes
    pub fn report_pulling(&mut self, id: ConnectionId) {
        if let Some(player) = self.registry.get(id) {
            self.gateway.broadcast(ServerEvent::PlayerPulling {
                id,
                name: player.name.clone(),
            });
        }
    }
}

use crate::broadcast::Gateway;
use crate::leaderboard::LeaderboardStore;
use crate::rounds::{RoundScheduler, RoundSettings};
use crate::scoring::ScoreAggregator;
use crate::session::SessionRegistry;
use crate::timer::{Scheduler, TimerFired};
use log::debug;
use shared::{ClientEvent, ConnectionId, ServerEvent};

/// The whole authoritative game: players, leaderboard and round clock
///
/// Every entry point runs to completion before the next one starts; the
/// server loop guarantees that by calling these methods from a single task.
pub struct FishingGame {
    registry: SessionRegistry,
    leaderboard: LeaderboardStore,
    rounds: RoundScheduler,
}

impl FishingGame {
    pub fn new(settings: RoundSettings) -> Self {
        Self {
            registry: SessionRegistry::new(),
            leaderboard: LeaderboardStore::new(),
            rounds: RoundScheduler::new(settings),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn leaderboard(&self) -> &LeaderboardStore {
        &self.leaderboard
    }

    pub fn rounds(&self) -> &RoundScheduler {
        &self.rounds
    }

    pub fn handle_event(
        &mut self,
        id: ConnectionId,
        event: ClientEvent,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        debug!("{} sent {:?}", id, event);

        match event {
            ClientEvent::Join { name } => {
                self.join(id, name.as_deref(), gateway, timers);
            }
            ClientEvent::Cast { x, y } => {
                self.scoring(gateway).apply_cast(id, x, y);
            }
            ClientEvent::Pulling => {
                self.scoring(gateway).report_pulling(id);
            }
            ClientEvent::Caught { fish } => {
                let round_active = self.rounds.accepts_catches();
                self.scoring(gateway).apply_catch(id, fish, round_active);
            }
            ClientEvent::Missed { reason } => {
                self.scoring(gateway).apply_miss(id, reason);
            }
            ClientEvent::GetLeaderboard => {
                gateway.reply(
                    id,
                    ServerEvent::LeaderboardUpdate(self.leaderboard.snapshot().to_vec()),
                );
            }
        }
    }

    pub fn handle_disconnect(
        &mut self,
        id: ConnectionId,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        if self.registry.leave(id).is_none() {
            return;
        }

        gateway.broadcast(ServerEvent::PlayerLeft(id));

        if self.registry.is_empty() {
            self.rounds
                .on_registry_empty(&mut self.registry, gateway, timers);
        }
    }

    pub fn handle_timer(
        &mut self,
        fired: TimerFired,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        self.rounds
            .on_timer(fired, &mut self.registry, gateway, timers);
    }

    fn join(
        &mut self,
        id: ConnectionId,
        name: Option<&str>,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        let player = self.registry.join(id, name).clone();

        gateway.reply(
            id,
            ServerEvent::Joined {
                player: player.clone(),
                players: self.registry.players(),
                leaderboard: self.leaderboard.snapshot().to_vec(),
                game_state: self.rounds.view(),
            },
        );
        gateway.broadcast_except(id, ServerEvent::PlayerJoined(player));

        self.rounds
            .on_player_joined(&mut self.registry, gateway, timers);
    }

    fn scoring<'a>(&'a mut self, gateway: &'a mut dyn Gateway) -> ScoreAggregator<'a> {
        ScoreAggregator::new(&mut self.registry, &mut self.leaderboard, gateway)
    }
}

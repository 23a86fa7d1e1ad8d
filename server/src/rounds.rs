//! Round and timer state machine
//!
//! ```text
//!  Idle ──join──▶ Starting ──countdown──▶ RoundActive ◀──tick 0── RoundBreak
//!   ▲                                        │  tick 0                ▲
//!   │                                        ├────────────────────────┘
//!   │ last player leaves (tick running)      │  tick 0, final round
//!   └────────────────────────────────────────┤
//!                                            ▼
//!            Starting ◀──restart delay── Ended ──restart delay, empty──▶ Idle
//! ```
//!
//! The scheduler owns the game state and every timer handle. At most one
//! repeating tick is live at a time, and firings from a handle that is no
//! longer current are ignored.

use crate::broadcast::Gateway;
use crate::session::SessionRegistry;
use crate::timer::{Scheduler, TimerAction, TimerFired, TimerHandle};
use log::{debug, info};
use shared::{
    GameStateView, RoundStanding, ServerEvent, BREAK_TIME, COUNTDOWN, RESTART_DELAY, ROUND_TIME,
    TOTAL_ROUNDS,
};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Idle,
    Starting,
    RoundActive,
    RoundBreak,
    Ended,
}

/// Game length and pacing; durations are counted in `time_unit`s
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSettings {
    pub total_rounds: u32,
    pub round_time: u32,
    pub break_time: u32,
    pub countdown: u32,
    pub restart_delay: u32,
    pub time_unit: Duration,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            total_rounds: TOTAL_ROUNDS,
            round_time: ROUND_TIME,
            break_time: BREAK_TIME,
            countdown: COUNTDOWN,
            restart_delay: RESTART_DELAY,
            time_unit: Duration::from_secs(1),
        }
    }
}

impl RoundSettings {
    fn units(&self, count: u32) -> Duration {
        self.time_unit * count
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundScore {
    pub round: u32,
    pub ranking: Vec<RoundStanding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub current_round: u32,
    pub phase: GamePhase,
    pub time_left: u32,
    pub round_scores: Vec<RoundScore>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            current_round: 0,
            phase: GamePhase::Idle,
            time_left: 0,
            round_scores: Vec::new(),
        }
    }

    pub fn view(&self, total_rounds: u32) -> GameStateView {
        GameStateView {
            current_round: self.current_round,
            total_rounds,
            time_left: self.time_left,
            is_active: self.phase == GamePhase::RoundActive,
            is_break: self.phase == GamePhase::RoundBreak,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RoundScheduler {
    settings: RoundSettings,
    state: GameState,
    /// The repeating round/break tick
    tick: Option<TimerHandle>,
    /// Pending countdown or restart one-shot
    deferred: Option<TimerHandle>,
}

impl RoundScheduler {
    pub fn new(settings: RoundSettings) -> Self {
        Self {
            settings,
            state: GameState::new(),
            tick: None,
            deferred: None,
        }
    }

    pub fn settings(&self) -> &RoundSettings {
        &self.settings
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn view(&self) -> GameStateView {
        self.state.view(self.settings.total_rounds)
    }

    /// Catches only score while a round is running
    pub fn accepts_catches(&self) -> bool {
        self.state.phase == GamePhase::RoundActive
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.is_some()
    }

    /// Starts a game if the scheduler is idle and someone is playing
    pub fn on_player_joined(
        &mut self,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        if self.state.phase == GamePhase::Idle && !registry.is_empty() {
            self.start_game(registry, gateway, timers);
        }
    }

    /// Begins the pre-game countdown; a no-op while a game is in progress
    pub fn start_game(
        &mut self,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) -> bool {
        if self.tick.is_some() || self.state.phase != GamePhase::Idle {
            debug!("Start ignored, game already in {:?}", self.state.phase);
            return false;
        }

        self.begin_countdown(registry, gateway, timers);
        true
    }

    /// Stops the game once the last player has left
    pub fn on_registry_empty(
        &mut self,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        if let Some(tick) = self.tick.take() {
            info!(
                "All players left during round {}, stopping game",
                self.state.current_round
            );
            timers.cancel(tick);
            self.full_reset(registry, gateway);
        }
    }

    pub fn on_timer(
        &mut self,
        fired: TimerFired,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        match fired.action {
            TimerAction::Tick => {
                if self.tick != Some(fired.handle) {
                    debug!("Ignoring stale tick from {:?}", fired.handle);
                    return;
                }
                self.advance_clock(registry, gateway, timers);
            }
            TimerAction::CountdownElapsed => {
                if self.deferred != Some(fired.handle) || self.state.phase != GamePhase::Starting {
                    debug!("Ignoring stale countdown from {:?}", fired.handle);
                    return;
                }
                self.deferred = None;
                self.begin_round(registry, gateway, timers);
            }
            TimerAction::RestartElapsed => {
                if self.deferred != Some(fired.handle) || self.state.phase != GamePhase::Ended {
                    debug!("Ignoring stale restart from {:?}", fired.handle);
                    return;
                }
                self.deferred = None;

                // Players may have left during the pause
                if registry.is_empty() {
                    self.full_reset(registry, gateway);
                } else {
                    self.begin_countdown(registry, gateway, timers);
                }
            }
        }
    }

    fn begin_countdown(
        &mut self,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        self.full_reset(registry, gateway);

        let countdown = self.settings.countdown;
        self.state.phase = GamePhase::Starting;
        self.state.time_left = countdown;
        gateway.broadcast(ServerEvent::GameStarting { countdown });

        let delay = self.settings.units(countdown);
        self.deferred = Some(timers.start_once(delay, TimerAction::CountdownElapsed));
        info!("Game starting in {} with {} players", countdown, registry.len());
    }

    fn begin_round(
        &mut self,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        self.state.current_round += 1;
        self.state.time_left = self.settings.round_time;
        self.state.phase = GamePhase::RoundActive;
        registry.reset_round_stats();

        gateway.broadcast(ServerEvent::RoundStart {
            round: self.state.current_round,
            total_rounds: self.settings.total_rounds,
            time_left: self.state.time_left,
        });

        if self.tick.is_none() {
            let unit = self.settings.time_unit;
            self.tick = Some(timers.start_repeating(unit, TimerAction::Tick));
        }
        info!(
            "Round {}/{} started",
            self.state.current_round, self.settings.total_rounds
        );
    }

    fn advance_clock(
        &mut self,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        self.state.time_left = self.state.time_left.saturating_sub(1);

        if self.state.time_left > 0 {
            gateway.broadcast(ServerEvent::TimeUpdate {
                time_left: self.state.time_left,
                round: self.state.current_round,
                is_break: self.state.phase == GamePhase::RoundBreak,
            });
            return;
        }

        match self.state.phase {
            GamePhase::RoundActive => self.end_round(registry, gateway, timers),
            GamePhase::RoundBreak => self.begin_round(registry, gateway, timers),
            phase => debug!("Tick reached zero in {:?}", phase),
        }
    }

    fn end_round(
        &mut self,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        let round = self.state.current_round;
        let is_final = round >= self.settings.total_rounds;

        // Leave RoundActive before anything is published so late catches miss the window
        self.state.phase = if is_final {
            GamePhase::Ended
        } else {
            GamePhase::RoundBreak
        };

        let ranking = registry.round_ranking();
        let total_ranking = registry.total_ranking();
        self.state.round_scores.push(RoundScore {
            round,
            ranking: ranking.clone(),
        });

        gateway.broadcast(ServerEvent::RoundEnd {
            round,
            ranking,
            total_ranking,
        });
        info!("Round {} finished", round);

        if is_final {
            self.end_game(registry, gateway, timers);
        } else {
            self.state.time_left = self.settings.break_time;
            gateway.broadcast(ServerEvent::BreakStart {
                time_left: self.state.time_left,
                next_round: round + 1,
            });
        }
    }

    fn end_game(
        &mut self,
        registry: &mut SessionRegistry,
        gateway: &mut dyn Gateway,
        timers: &mut dyn Scheduler,
    ) {
        if let Some(tick) = self.tick.take() {
            timers.cancel(tick);
        }
        self.state.phase = GamePhase::Ended;
        self.state.time_left = 0;

        let ranking = registry.total_ranking();
        let winner = ranking.first().cloned();
        match &winner {
            Some(winner) => info!("Game over, {} wins with {}", winner.name, winner.total_weight),
            None => info!("Game over with no players"),
        }
        gateway.broadcast(ServerEvent::GameEnd { ranking, winner });

        let delay = self.settings.units(self.settings.restart_delay);
        self.deferred = Some(timers.start_once(delay, TimerAction::RestartElapsed));
    }

    fn full_reset(&mut self, registry: &mut SessionRegistry, gateway: &mut dyn Gateway) {
        self.state = GameState::new();
        registry.reset_lifetime_stats();
        gateway.broadcast(ServerEvent::GameReset);
    }
}

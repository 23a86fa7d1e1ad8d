//! Integration tests for the fishing server components
//!
//! These tests drive the full game through its public entry points, plus one
//! end-to-end run over a real WebSocket.

use assert_approx_eq::assert_approx_eq;
use server::broadcast::{Audience, RecordingGateway};
use server::game::FishingGame;
use server::rounds::{GamePhase, RoundSettings};
use server::timer::{ManualScheduler, TimerAction};
use shared::{ClientEvent, ConnectionId, Fish, ServerEvent, JUNK_FISH_NAME};

struct Table {
    game: FishingGame,
    gateway: RecordingGateway,
    timers: ManualScheduler,
}

impl Table {
    fn new(settings: RoundSettings) -> Self {
        Self {
            game: FishingGame::new(settings),
            gateway: RecordingGateway::new(),
            timers: ManualScheduler::new(),
        }
    }

    fn send(&mut self, raw: u64, event: ClientEvent) {
        self.game
            .handle_event(conn(raw), event, &mut self.gateway, &mut self.timers);
    }

    fn join(&mut self, raw: u64, name: &str) {
        self.send(
            raw,
            ClientEvent::Join {
                name: Some(name.to_string()),
            },
        );
    }

    fn catch(&mut self, raw: u64, name: &str, weight: f64) {
        self.send(
            raw,
            ClientEvent::Caught {
                fish: Fish::new(name, "🐟", weight),
            },
        );
    }

    fn leave(&mut self, raw: u64) {
        self.game
            .handle_disconnect(conn(raw), &mut self.gateway, &mut self.timers);
    }

    fn fire(&mut self, action: TimerAction) {
        let fired = self.timers.fire(action).expect("timer should be pending");
        self.game
            .handle_timer(fired, &mut self.gateway, &mut self.timers);
    }

    fn ticks(&mut self, count: u32) {
        for _ in 0..count {
            self.fire(TimerAction::Tick);
        }
    }

    fn start_round(&mut self) {
        self.fire(TimerAction::CountdownElapsed);
    }

    fn phase(&self) -> GamePhase {
        self.game.rounds().phase()
    }
}

fn conn(raw: u64) -> ConnectionId {
    ConnectionId::new(raw)
}

fn short_settings(total_rounds: u32) -> RoundSettings {
    RoundSettings {
        total_rounds,
        round_time: 4,
        break_time: 2,
        ..RoundSettings::default()
    }
}

/// GAMEPLAY SCENARIO TESTS
mod scenario_tests {
    use super::*;

    /// Single angler lands a carp, then a boot that must not count
    #[test]
    fn carp_scores_and_boot_does_not() {
        let mut table = Table::new(RoundSettings::default());
        table.join(1, "A");
        assert_eq!(table.phase(), GamePhase::Starting);

        table.start_round();
        assert_eq!(table.phase(), GamePhase::RoundActive);
        assert_eq!(table.game.rounds().state().current_round, 1);
        assert_eq!(table.game.rounds().state().time_left, 120);

        table.send(1, ClientEvent::Cast { x: 10.0, y: 20.0 });
        assert!(table.game.registry().get(conn(1)).unwrap().is_fishing);

        table.catch(1, "Carp", 5.0);
        let player = table.game.registry().get(conn(1)).unwrap();
        assert_approx_eq!(player.round_weight, 5.0);
        assert_approx_eq!(player.total_weight, 5.0);
        assert!(!player.is_fishing);
        let board = table.game.leaderboard().snapshot();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].fish, "Carp");
        assert_eq!(board[0].weight, 5.0);
        assert_eq!(board[0].name, "A");

        table.gateway.clear();
        table.catch(1, JUNK_FISH_NAME, 1.0);
        let player = table.game.registry().get(conn(1)).unwrap();
        assert_eq!(player.round_weight, 5.0);
        assert_eq!(player.total_weight, 5.0);
        assert_eq!(table.game.leaderboard().len(), 1);
        assert_eq!(table.gateway.names(), vec!["playerCaught"]);
    }

    /// Final round goes straight to the end of the game
    #[test]
    fn tenth_round_ends_game_without_break() {
        let mut table = Table::new(RoundSettings::default());
        table.join(1, "A");
        table.start_round();

        for round in 1..=10 {
            assert_eq!(table.game.rounds().state().current_round, round);
            table.ticks(120);
            if round < 10 {
                assert_eq!(table.phase(), GamePhase::RoundBreak);
                table.ticks(10);
            }
        }

        assert_eq!(table.phase(), GamePhase::Ended);
        assert_eq!(table.gateway.count("roundEnd"), 10);
        assert_eq!(table.gateway.count("breakStart"), 9);
        assert_eq!(table.gateway.count("roundStart"), 10);
        assert_eq!(table.gateway.count("gameEnd"), 1);
        assert_eq!(table.game.rounds().state().round_scores.len(), 10);
        assert_eq!(table.timers.repeating_count(), 0);

        let names = table.gateway.names();
        let last_round_end = names.iter().rposition(|n| *n == "roundEnd").unwrap();
        assert_eq!(names[last_round_end + 1], "gameEnd");
    }

    /// Everyone leaves between rounds
    #[test]
    fn all_players_leaving_during_break_stops_the_clock() {
        let mut table = Table::new(short_settings(3));
        table.join(1, "A");
        table.start_round();
        table.catch(1, "Carp", 5.0);
        table.ticks(4);
        assert_eq!(table.phase(), GamePhase::RoundBreak);
        table.gateway.clear();

        table.leave(1);

        assert_eq!(table.gateway.names(), vec!["playerLeft", "gameReset"]);
        assert_eq!(table.phase(), GamePhase::Idle);
        assert_eq!(table.game.rounds().state().current_round, 0);
        assert!(table.game.rounds().state().round_scores.is_empty());
        assert!(!table.game.rounds().is_ticking());
        assert!(table.timers.pending().is_empty());
    }

    /// The only angler leaves during the countdown, so the game plays out empty
    #[test]
    fn empty_game_ends_without_winner() {
        let mut table = Table::new(short_settings(2));
        table.join(1, "A");
        table.leave(1);
        assert_eq!(table.phase(), GamePhase::Starting);

        table.start_round();
        table.ticks(4 + 2 + 4);
        assert_eq!(table.phase(), GamePhase::Ended);

        match table.gateway.last_named("gameEnd") {
            Some(ServerEvent::GameEnd { ranking, winner }) => {
                assert!(ranking.is_empty());
                assert!(winner.is_none());
            }
            other => panic!("Unexpected event: {:?}", other),
        }

        table.fire(TimerAction::RestartElapsed);
        assert_eq!(table.phase(), GamePhase::Idle);
        assert!(table.timers.pending().is_empty());
        assert_eq!(table.gateway.last(), Some(&ServerEvent::GameReset));
    }

    /// Everyone leaves mid-round
    #[test]
    fn all_players_leaving_stops_the_clock() {
        let mut table = Table::new(short_settings(3));
        table.join(1, "A");
        table.join(2, "B");
        table.start_round();
        table.catch(1, "Carp", 5.0);
        table.ticks(1);

        table.leave(1);
        assert_eq!(table.phase(), GamePhase::RoundActive);
        table.leave(2);

        assert_eq!(table.phase(), GamePhase::Idle);
        assert_eq!(table.game.rounds().state().current_round, 0);
        assert!(!table.game.rounds().is_ticking());
        assert_eq!(table.timers.repeating_count(), 0);
        assert_eq!(table.gateway.last(), Some(&ServerEvent::GameReset));
        // the leaderboard outlives games
        assert_eq!(table.game.leaderboard().len(), 1);
    }

    /// Two anglers land fish before the next tick
    #[test]
    fn simultaneous_catches_both_score() {
        let mut table = Table::new(RoundSettings::default());
        table.join(1, "A");
        table.join(2, "B");
        table.start_round();
        table.gateway.clear();

        table.catch(1, "Perch", 2.0);
        table.catch(2, "Pike", 6.5);

        assert_approx_eq!(table.game.registry().get(conn(1)).unwrap().total_weight, 2.0);
        assert_approx_eq!(table.game.registry().get(conn(2)).unwrap().total_weight, 6.5);
        assert_eq!(table.gateway.count("leaderboardUpdate"), 2);

        match table.gateway.last_named("leaderboardUpdate") {
            Some(ServerEvent::LeaderboardUpdate(entries)) => {
                let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
                assert_eq!(names, vec!["B", "A"]);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    /// Rejoining a fresh game after the restart delay
    #[test]
    fn game_restarts_after_delay_when_players_remain() {
        let mut table = Table::new(short_settings(1));
        table.join(1, "A");
        table.start_round();
        table.catch(1, "Carp", 5.0);
        table.ticks(4);
        assert_eq!(table.phase(), GamePhase::Ended);

        match table.gateway.last_named("gameEnd") {
            Some(ServerEvent::GameEnd { winner, .. }) => {
                assert_eq!(winner.as_ref().map(|w| w.total_weight), Some(5.0));
            }
            other => panic!("Unexpected event: {:?}", other),
        }

        table.fire(TimerAction::RestartElapsed);

        assert_eq!(table.phase(), GamePhase::Starting);
        assert_eq!(table.game.registry().get(conn(1)).unwrap().total_weight, 0.0);
        assert_eq!(table.game.leaderboard().len(), 1);
    }

    /// Nobody is left when the restart delay fires
    #[test]
    fn game_goes_idle_when_empty_at_restart() {
        let mut table = Table::new(short_settings(1));
        table.join(1, "A");
        table.start_round();
        table.ticks(4);
        table.leave(1);
        assert_eq!(table.phase(), GamePhase::Ended);

        table.fire(TimerAction::RestartElapsed);
        assert_eq!(table.phase(), GamePhase::Idle);

        table.join(2, "B");
        assert_eq!(table.phase(), GamePhase::Starting);
    }
}

/// INVARIANT TESTS
mod invariant_tests {
    use super::*;

    /// Catches outside an active round only animate
    #[test]
    fn catches_outside_rounds_never_score() {
        let mut table = Table::new(short_settings(2));
        table.join(1, "A");

        // Starting
        table.catch(1, "Carp", 3.0);
        // RoundBreak
        table.start_round();
        table.ticks(4);
        assert_eq!(table.phase(), GamePhase::RoundBreak);
        table.catch(1, "Carp", 3.0);
        // Ended
        table.ticks(2 + 4);
        assert_eq!(table.phase(), GamePhase::Ended);
        table.catch(1, "Carp", 3.0);

        let player = table.game.registry().get(conn(1)).unwrap();
        assert_eq!(player.fish_count, 0);
        assert_eq!(player.total_weight, 0.0);
        assert!(table.game.leaderboard().is_empty());
        assert_eq!(table.gateway.count("playerCaught"), 3);
        assert_eq!(table.gateway.count("leaderboardUpdate"), 0);
    }

    /// Leaderboard stays sorted, bounded and free of junk
    #[test]
    fn leaderboard_stays_sorted_and_bounded() {
        let mut table = Table::new(RoundSettings::default());
        table.join(1, "A");
        table.start_round();

        let mut seed: u64 = 7;
        for i in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let weight = (seed >> 33) as f64 / 10_000_000.0 + 0.01;
            if i % 7 == 0 {
                table.catch(1, JUNK_FISH_NAME, weight);
            } else {
                table.catch(1, "Roach", weight);
            }

            let board = table.game.leaderboard().snapshot();
            assert!(board.len() <= 10);
            assert!(board.windows(2).all(|pair| pair[0].weight >= pair[1].weight));
            assert!(board.iter().all(|entry| entry.fish != JUNK_FISH_NAME));
        }
        assert_eq!(table.game.leaderboard().len(), 10);
    }

    /// Weights only grow between resets
    #[test]
    fn weights_are_monotonic_within_a_round() {
        let mut table = Table::new(RoundSettings::default());
        table.join(1, "A");
        table.start_round();

        let mut last_round = 0.0;
        let mut last_total = 0.0;
        for weight in [1.0, 0.5, 3.25, 0.25, 2.0] {
            table.catch(1, "Bream", weight);
            let player = table.game.registry().get(conn(1)).unwrap();
            assert!(player.round_weight >= last_round);
            assert!(player.total_weight >= last_total);
            last_round = player.round_weight;
            last_total = player.total_weight;
        }
        assert_approx_eq!(last_total, 7.0);
    }

    /// Each break-to-round transition adds exactly one round
    #[test]
    fn round_number_increments_by_one() {
        let mut table = Table::new(short_settings(4));
        table.join(1, "A");
        table.start_round();

        let mut seen = vec![table.game.rounds().state().current_round];
        while table.phase() != GamePhase::Ended {
            table.ticks(1);
            let round = table.game.rounds().state().current_round;
            if round != *seen.last().unwrap() {
                seen.push(round);
            }
        }
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    /// Only one repeating tick ever exists
    #[test]
    fn single_tick_handle() {
        let mut table = Table::new(short_settings(3));
        table.join(1, "A");
        table.join(2, "B");
        table.start_round();
        table.join(3, "C");

        for _ in 0..20 {
            assert!(table.timers.repeating_count() <= 1);
            if table.phase() == GamePhase::Ended {
                break;
            }
            table.ticks(1);
        }
        assert_eq!(table.timers.repeating_count(), 0);
    }

    /// Joins are announced to everyone except the joiner
    #[test]
    fn join_announcements() {
        let mut table = Table::new(RoundSettings::default());
        table.join(1, "A");
        table.gateway.clear();
        table.join(2, "B");

        assert_eq!(table.gateway.sent[0].0, Audience::Only(conn(2)));
        assert_eq!(table.gateway.sent[1].0, Audience::AllExcept(conn(2)));
        assert_eq!(table.gateway.received_by(conn(1)).len(), 1);
    }
}

/// END-TO-END TESTS
mod websocket_tests {
    use super::*;
    use futures_util::stream::Stream;
    use futures_util::{SinkExt, StreamExt};
    use server::network::Server;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_test::assert_ok;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};

    async fn wait_for<S>(read: &mut S, name: &str) -> ServerEvent
    where
        S: Stream<Item = Result<Message, WsError>> + Unpin,
    {
        let search = async {
            while let Some(Ok(message)) = read.next().await {
                if let Message::Text(text) = message {
                    let event: ServerEvent = serde_json::from_str(&text).unwrap();
                    if event.name() == name {
                        return event;
                    }
                }
            }
            panic!("Connection closed before {} arrived", name);
        };
        timeout(Duration::from_secs(5), search)
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for {}", name))
    }

    /// A real client joins, waits for the round and lands a fish
    #[tokio::test]
    async fn join_and_catch_over_websocket() {
        let settings = RoundSettings {
            countdown: 1,
            round_time: 100,
            time_unit: Duration::from_millis(20),
            ..RoundSettings::default()
        };
        let server = assert_ok!(Server::new("127.0.0.1:0", settings).await);
        let url = format!("ws://{}", server.local_addr());
        tokio::spawn(server.run());

        let (ws_stream, _) = assert_ok!(connect_async(url.as_str()).await);
        let (mut write, mut read) = ws_stream.split();

        let join = ClientEvent::Join {
            name: Some("Ann".to_string()),
        };
        write.send(Message::Text(join.to_json())).await.unwrap();

        match wait_for(&mut read, "joined").await {
            ServerEvent::Joined { player, .. } => assert_eq!(player.name, "Ann"),
            other => panic!("Unexpected event: {:?}", other),
        }
        wait_for(&mut read, "roundStart").await;

        let carp = ClientEvent::Caught {
            fish: Fish::new("Carp", "🐟", 5.0),
        };
        write.send(Message::Text(carp.to_json())).await.unwrap();

        match wait_for(&mut read, "playerCaught").await {
            ServerEvent::PlayerCaught {
                total_weight,
                round_weight,
                ..
            } => {
                assert_eq!(total_weight, 5.0);
                assert_eq!(round_weight, 5.0);
            }
            other => panic!("Unexpected event: {:?}", other),
        }

        write
            .send(Message::Text(ClientEvent::GetLeaderboard.to_json()))
            .await
            .unwrap();
        match wait_for(&mut read, "leaderboardUpdate").await {
            ServerEvent::LeaderboardUpdate(entries) => assert_eq!(entries[0].fish, "Carp"),
            other => panic!("Unexpected event: {:?}", other),
        }
    }
}

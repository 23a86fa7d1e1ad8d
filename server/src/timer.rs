//! Scheduling port used by the round scheduler
//!
//! Timers never run game code themselves. When a timer fires it posts a
//! [`TimerFired`] message back to the server loop, which handles it like any
//! other inbound event. That keeps every state mutation on one task.

use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// What the game should do when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Pre-game countdown finished
    CountdownElapsed,
    /// One time unit passed during a round or break
    Tick,
    /// Post-game pause finished
    RestartElapsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub handle: TimerHandle,
    pub action: TimerAction,
}

pub trait Scheduler {
    fn start_repeating(&mut self, interval: Duration, action: TimerAction) -> TimerHandle;
    fn start_once(&mut self, delay: Duration, action: TimerAction) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

/// Scheduler backed by tokio tasks
pub struct TokioScheduler {
    fired_tx: mpsc::UnboundedSender<TimerFired>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    pub fn new(fired_tx: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            fired_tx,
            tasks: HashMap::new(),
            next_id: 1,
        }
    }

    fn next_handle(&mut self) -> TimerHandle {
        // Forget one-shot tasks that already completed
        self.tasks.retain(|_, task| !task.is_finished());

        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        handle
    }
}

impl Scheduler for TokioScheduler {
    fn start_repeating(&mut self, period: Duration, action: TimerAction) -> TimerHandle {
        let handle = self.next_handle();
        let fired_tx = self.fired_tx.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if fired_tx.send(TimerFired { handle, action }).is_err() {
                    break;
                }
            }
        });

        self.tasks.insert(handle, task);
        handle
    }

    fn start_once(&mut self, delay: Duration, action: TimerAction) -> TimerHandle {
        let handle = self.next_handle();
        let fired_tx = self.fired_tx.clone();

        let task = tokio::spawn(async move {
            sleep(delay).await;
            let _ = fired_tx.send(TimerFired { handle, action });
        });

        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            debug!("Cancelling timer {:?}", handle);
            task.abort();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingTimer {
    pub handle: TimerHandle,
    pub action: TimerAction,
    pub period: Option<Duration>,
    pub delay: Duration,
}

/// Scheduler that only records timers; callers decide when they fire
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: Vec<PendingTimer>,
    next_id: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live timers, oldest first
    pub fn pending(&self) -> &[PendingTimer] {
        &self.pending
    }

    pub fn repeating_count(&self) -> usize {
        self.pending.iter().filter(|t| t.period.is_some()).count()
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    /// Fires the oldest live timer with the given action
    ///
    /// One-shot timers are consumed; repeating timers stay live.
    pub fn fire(&mut self, action: TimerAction) -> Option<TimerFired> {
        let index = self.pending.iter().position(|t| t.action == action)?;
        let timer = if self.pending[index].period.is_some() {
            self.pending[index].clone()
        } else {
            self.pending.remove(index)
        };
        Some(TimerFired {
            handle: timer.handle,
            action: timer.action,
        })
    }

    fn push(&mut self, action: TimerAction, period: Option<Duration>, delay: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push(PendingTimer {
            handle,
            action,
            period,
            delay,
        });
        handle
    }
}

impl Scheduler for ManualScheduler {
    fn start_repeating(&mut self, period: Duration, action: TimerAction) -> TimerHandle {
        self.push(action, Some(period), period)
    }

    fn start_once(&mut self, delay: Duration, action: TimerAction) -> TimerHandle {
        self.push(action, None, delay)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|t| t.handle != handle);
    }
}

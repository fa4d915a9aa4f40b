//! Simulation Clock
//!
//! Runs a `MarketSimulator` inside a dedicated task. The task is the only
//! writer of session state: ticks come from a fixed-period timer, and place,
//! cancel and snapshot requests arrive on an mpsc inbox and are handled in
//! arrival order between ticks. Tick snapshots are published on a broadcast
//! channel.

use crate::error::{Result, TradingError};
use crate::services::engine::MarketSimulator;
use crate::types::{Order, Placement, PlaceOrderRequest, SessionState, TickSnapshot};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 64;

/// Requests handled by the clock task.
#[derive(Debug)]
enum Command {
    PlaceOrder {
        request: PlaceOrderRequest,
        reply: oneshot::Sender<Result<Placement>>,
    },
    CancelOrder {
        order_id: String,
        reply: oneshot::Sender<Result<Order>>,
    },
    State {
        reply: oneshot::Sender<SessionState>,
    },
    OrderHistory {
        limit: usize,
        offset: usize,
        reply: oneshot::Sender<Vec<Order>>,
    },
    Tick {
        reply: oneshot::Sender<TickSnapshot>,
    },
    Shutdown,
}

/// Spawns the clock task.
pub struct SimulationClock;

impl SimulationClock {
    /// Start ticking `simulator` every `tick_interval`.
    ///
    /// The first timer tick fires one full period after spawning. The join
    /// handle yields the simulator back once the task stops.
    pub fn spawn(
        simulator: MarketSimulator,
        tick_interval: Duration,
        event_buffer: usize,
    ) -> (SimulationHandle, JoinHandle<MarketSimulator>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (tick_tx, _) = broadcast::channel(event_buffer.max(1));
        let (running_tx, running_rx) = watch::channel(());

        let handle = SimulationHandle {
            commands: command_tx,
            ticks: tick_tx.clone(),
            running: running_rx,
        };
        let task = tokio::spawn(run(simulator, tick_interval, command_rx, tick_tx, running_tx));

        (handle, task)
    }
}

async fn run(
    mut simulator: MarketSimulator,
    tick_interval: Duration,
    mut commands: mpsc::Receiver<Command>,
    tick_tx: broadcast::Sender<TickSnapshot>,
    // Dropped on return, which wakes every `on_tick` listener
    _running: watch::Sender<()>,
) -> MarketSimulator {
    info!(
        "Simulation clock started for {} ({}ms ticks)",
        simulator.symbol(),
        tick_interval.as_millis()
    );

    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = simulator.tick(now_ms());
                publish(&tick_tx, snapshot);
            }
            command = commands.recv() => {
                match command {
                    Some(Command::PlaceOrder { request, reply }) => {
                        let _ = reply.send(simulator.place_order(request, now_ms()));
                    }
                    Some(Command::CancelOrder { order_id, reply }) => {
                        let _ = reply.send(simulator.cancel_order(&order_id, now_ms()));
                    }
                    Some(Command::State { reply }) => {
                        let _ = reply.send(simulator.state());
                    }
                    Some(Command::OrderHistory { limit, offset, reply }) => {
                        let _ = reply.send(simulator.order_history(limit, offset));
                    }
                    Some(Command::Tick { reply }) => {
                        let snapshot = simulator.tick(now_ms());
                        publish(&tick_tx, snapshot.clone());
                        let _ = reply.send(snapshot);
                    }
                    Some(Command::Shutdown) | None => {
                        info!("Simulation clock received shutdown signal");
                        break;
                    }
                }
            }
        }
    }

    info!("Simulation clock stopped after {} ticks", simulator.ticks());
    simulator
}

fn publish(tick_tx: &broadcast::Sender<TickSnapshot>, snapshot: TickSnapshot) {
    // No subscribers is fine
    if tick_tx.send(snapshot).is_err() {
        debug!("Tick published with no subscribers");
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Cloneable handle to a running clock.
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    commands: mpsc::Sender<Command>,
    ticks: broadcast::Sender<TickSnapshot>,
    running: watch::Receiver<()>,
}

impl SimulationHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| TradingError::EngineStopped)?;
        reply_rx.await.map_err(|_| TradingError::EngineStopped)
    }

    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<Placement> {
        self.request(|reply| Command::PlaceOrder { request, reply }).await?
    }

    pub async fn cancel_order(&self, order_id: impl Into<String>) -> Result<Order> {
        let order_id = order_id.into();
        self.request(|reply| Command::CancelOrder { order_id, reply }).await?
    }

    /// Current session state.
    pub async fn state(&self) -> Result<SessionState> {
        self.request(|reply| Command::State { reply }).await
    }

    /// Filled and canceled orders, newest first.
    pub async fn order_history(&self, limit: usize, offset: usize) -> Result<Vec<Order>> {
        self.request(|reply| Command::OrderHistory {
            limit,
            offset,
            reply,
        })
        .await
    }

    /// Advance one tick now, without waiting for the timer. The snapshot is
    /// also published to subscribers.
    pub async fn tick_now(&self) -> Result<TickSnapshot> {
        self.request(|reply| Command::Tick { reply }).await
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TickSnapshot> {
        self.ticks.subscribe()
    }

    /// Run `callback` on every published snapshot until the clock stops.
    /// Snapshots missed by a slow callback are skipped. The callback task
    /// does not keep the clock alive once every handle is dropped.
    pub fn on_tick<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(&TickSnapshot) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let mut running = self.running.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(snapshot) => callback(&snapshot),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!("Tick callback lagged, skipped {} snapshots", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    // Only errors once the clock task has returned
                    _ = running.changed() => break,
                }
            }
        })
    }

    /// Ask the clock to stop. A tick already in progress completes first.
    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| TradingError::EngineStopped)
    }

    /// Whether the clock task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

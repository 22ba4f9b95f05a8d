//! Tokio driver for a `ControlPanel`.
//!
//! One task owns the panel. Actions arrive on an mpsc queue and are applied
//! strictly in order; a fixed interval drives the periodic processes. New log
//! entries are forwarded to whoever holds the entry receiver.
//!
//! Store writes never run on the panel task. A writer task takes snapshots
//! and clears in the order they were issued and performs each one on the
//! blocking pool, reporting save outcomes back to the panel task.

use crate::error::RuntimeError;
use crate::log::LogEntry;
use crate::panel::ControlPanel;
use crate::persistence::StateStore;
use crate::protocol::Action;
use crate::state::GameState;
use crate::telemetry::PanelStatus;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const TICK_MS: u64 = 100;
const COMMAND_QUEUE_SIZE: usize = 64;

#[derive(Debug)]
pub enum RuntimeCommand {
    Dispatch(Action),
    Status(oneshot::Sender<PanelStatus>),
    Snapshot(oneshot::Sender<GameState>),
    Shutdown,
}

#[derive(Debug)]
enum StoreJob {
    Save { snapshot: GameState, previous: u64 },
    Clear,
}

#[derive(Debug, Clone, Copy)]
struct SaveReport {
    stamped: u64,
    previous: u64,
    saved: bool,
}

/// Cloneable front door to a running panel task.
#[derive(Debug, Clone)]
pub struct PanelHandle {
    commands: mpsc::Sender<RuntimeCommand>,
}

impl PanelHandle {
    pub async fn dispatch(&self, action: Action) -> Result<(), RuntimeError> {
        self.commands
            .send(RuntimeCommand::Dispatch(action))
            .await
            .map_err(|_| RuntimeError::Closed)
    }

    pub async fn status(&self) -> Result<PanelStatus, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(RuntimeCommand::Status(tx))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    pub async fn snapshot(&self) -> Result<GameState, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(RuntimeCommand::Snapshot(tx))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        rx.await.map_err(|_| RuntimeError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.commands
            .send(RuntimeCommand::Shutdown)
            .await
            .map_err(|_| RuntimeError::Closed)
    }
}

pub struct PanelRuntime {
    panel: ControlPanel,
    commands: mpsc::Receiver<RuntimeCommand>,
    entries: mpsc::UnboundedSender<LogEntry>,
    jobs: mpsc::UnboundedSender<StoreJob>,
    reports: mpsc::UnboundedReceiver<SaveReport>,
    tick: Duration,
    reload_delay: Duration,
    reload_at: Option<Instant>,
}

impl PanelRuntime {
    /// Spawns the panel task and its store writer. The join handle yields the
    /// panel back after a shutdown, once the final save has landed.
    pub fn spawn(
        panel: ControlPanel,
        store: Arc<dyn StateStore>,
    ) -> (PanelHandle, mpsc::UnboundedReceiver<LogEntry>, JoinHandle<ControlPanel>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (entry_tx, entry_rx) = mpsc::unbounded_channel();
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(run_store_writer(store, job_rx, report_tx));
        let runtime = PanelRuntime {
            reload_delay: Duration::from_millis(panel.config().reload_delay_ms),
            panel,
            commands: command_rx,
            entries: entry_tx,
            jobs: job_tx,
            reports: report_rx,
            tick: Duration::from_millis(TICK_MS),
            reload_at: None,
        };
        let task = tokio::spawn(runtime.run(writer));

        (PanelHandle { commands: command_tx }, entry_rx, task)
    }

    async fn run(mut self, writer: JoinHandle<()>) -> ControlPanel {
        let mut interval = time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("panel runtime started");

        // Anything logged while restoring goes out first
        self.forward_entries();

        loop {
            let reload_at = self.reload_at;
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(RuntimeCommand::Dispatch(action)) => self.handle_action(action),
                    Some(RuntimeCommand::Status(reply)) => {
                        let _ = reply.send(self.panel.status());
                    }
                    Some(RuntimeCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.panel.state().clone());
                    }
                    Some(RuntimeCommand::Shutdown) | None => break,
                },
                Some(report) = self.reports.recv() => {
                    self.panel.finish_save(report.stamped, report.previous, report.saved);
                }
                _ = time::sleep_until(reload_at.unwrap_or_else(Instant::now)), if reload_at.is_some() => {
                    self.reload_at = None;
                    self.panel.reload();
                }
                _ = interval.tick() => {
                    let outcome = self.panel.advance();
                    if outcome.autosave_due {
                        debug!("autosave");
                        self.queue_save();
                    }
                }
            }

            self.forward_entries();
        }

        self.queue_save();
        let PanelRuntime {
            mut panel,
            jobs,
            mut reports,
            entries,
            ..
        } = self;

        // Closing the job queue lets the writer finish what is queued and exit
        drop(jobs);
        if let Err(e) = writer.await {
            warn!(error = %e, "store writer ended abnormally");
        }
        while let Ok(report) = reports.try_recv() {
            panel.finish_save(report.stamped, report.previous, report.saved);
        }
        for entry in panel.take_new_entries() {
            let _ = entries.send(entry);
        }

        info!("panel runtime stopped");
        panel
    }

    fn handle_action(&mut self, action: Action) {
        let outcome = self.panel.dispatch(action);

        if outcome.reset {
            self.submit(StoreJob::Clear);
            self.reload_at = Some(Instant::now() + self.reload_delay);
            info!(delay_ms = self.reload_delay.as_millis() as u64, "reload scheduled");
        } else if outcome.save_requested {
            self.queue_save();
        }
    }

    fn queue_save(&mut self) {
        let (snapshot, previous) = self.panel.begin_save();
        self.submit(StoreJob::Save { snapshot, previous });
    }

    fn submit(&mut self, job: StoreJob) {
        if let Err(mpsc::error::SendError(job)) = self.jobs.send(job) {
            warn!(?job, "store writer is gone, job dropped");
            if let StoreJob::Save { snapshot, previous } = job {
                self.panel.finish_save(snapshot.last_saved, previous, false);
            }
        }
    }

    fn forward_entries(&mut self) {
        for entry in self.panel.take_new_entries() {
            // A dropped receiver only means nobody is watching
            let _ = self.entries.send(entry);
        }
    }
}

/// Runs store jobs one at a time, in order, on the blocking pool.
async fn run_store_writer(
    store: Arc<dyn StateStore>,
    mut jobs: mpsc::UnboundedReceiver<StoreJob>,
    reports: mpsc::UnboundedSender<SaveReport>,
) {
    while let Some(job) = jobs.recv().await {
        let store = Arc::clone(&store);
        match job {
            StoreJob::Save { snapshot, previous } => {
                let stamped = snapshot.last_saved;
                let saved = match task::spawn_blocking(move || store.save(&snapshot)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        warn!(error = %e, "failed to save panel state");
                        false
                    }
                    Err(e) => {
                        warn!(error = %e, "save task failed");
                        false
                    }
                };
                let _ = reports.send(SaveReport {
                    stamped,
                    previous,
                    saved,
                });
            }
            StoreJob::Clear => match task::spawn_blocking(move || store.clear()).await {
                Ok(Ok(())) => debug!("saved state cleared"),
                Ok(Err(e)) => warn!(error = %e, "failed to clear saved state after emergency reset"),
                Err(e) => warn!(error = %e, "clear task failed"),
            },
        }
    }
}

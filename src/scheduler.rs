use crate::config::PanelConfig;
use crate::state::GameState;
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

pub const PROCESS_COUNT: usize = 5;

/// Ticks a single process may replay after a stall before it skips ahead.
const MAX_CATCH_UP: usize = 8;

pub const MAX_DUE: usize = PROCESS_COUNT * MAX_CATCH_UP;

const_assert!(MAX_DUE >= PROCESS_COUNT);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    IgnitionPoll,
    FuelDrain,
    ReactorStep,
    Autosave,
    ShipChime,
}

impl Process {
    pub const ALL: [Process; PROCESS_COUNT] = [
        Process::IgnitionPoll,
        Process::FuelDrain,
        Process::ReactorStep,
        Process::Autosave,
        Process::ShipChime,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    period_ms: u64,
    next_due: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub starts: u32,
    pub stops: u32,
    pub ticks: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub processes: [ProcessStats; PROCESS_COUNT],
    pub total_ticks: u64,
    pub running: u8,
}

/// Periodic process timers driven by explicit `now` values. Nothing here
/// sleeps; the host calls `due` as often as it likes.
#[derive(Debug)]
pub struct ProcessScheduler {
    timers: [Timer; PROCESS_COUNT],
    autosave_enabled: bool,
    stats: SchedulerStats,
}

impl ProcessScheduler {
    pub fn new(config: &PanelConfig) -> Self {
        let timer = |period_ms: u64| Timer {
            period_ms: period_ms.max(1),
            next_due: None,
        };
        Self {
            timers: [
                timer(config.ignition_poll_ms),
                timer(config.fuel_tick_ms),
                timer(config.reactor_step_ms),
                timer(config.autosave_ms),
                timer(config.ship_chime_ms),
            ],
            autosave_enabled: config.autosave_enabled,
            stats: SchedulerStats::default(),
        }
    }

    pub fn period_ms(&self, process: Process) -> u64 {
        self.timers[process.index()].period_ms
    }

    pub fn is_running(&self, process: Process) -> bool {
        self.timers[process.index()].next_due.is_some()
    }

    /// Starts `process` with its first tick one period from `now`. Returns
    /// false when it was already running.
    pub fn start(&mut self, process: Process, now: u64) -> bool {
        let timer = &mut self.timers[process.index()];
        if timer.next_due.is_some() {
            return false;
        }
        timer.next_due = Some(now.saturating_add(timer.period_ms));
        self.stats.processes[process.index()].starts += 1;
        self.update_running();
        true
    }

    /// Stops `process`. Safe to call any number of times.
    pub fn stop(&mut self, process: Process) -> bool {
        let timer = &mut self.timers[process.index()];
        if timer.next_due.take().is_none() {
            return false;
        }
        self.stats.processes[process.index()].stops += 1;
        self.update_running();
        true
    }

    pub fn stop_all(&mut self) {
        for process in Process::ALL {
            self.stop(process);
        }
    }

    fn should_run(&self, process: Process, state: &GameState) -> bool {
        match process {
            Process::IgnitionPoll => state.systems.engine_starting,
            Process::FuelDrain => state.systems.engines,
            Process::ReactorStep => true,
            Process::Autosave => self.autosave_enabled,
            Process::ShipChime => state.spaceship_online,
        }
    }

    /// Starts and stops processes to match the conditions that drive them.
    pub fn sync(&mut self, state: &GameState, now: u64) {
        for process in Process::ALL {
            match (self.should_run(process, state), self.is_running(process)) {
                (true, false) => {
                    self.start(process, now);
                }
                (false, true) => {
                    self.stop(process);
                }
                _ => {}
            }
        }
    }

    /// Drops every timer and starts fresh from `now`, as after a reload.
    pub fn restart(&mut self, state: &GameState, now: u64) {
        self.stop_all();
        self.sync(state, now);
    }

    /// Ticks whose deadline is at or before `now`, oldest first. Each
    /// returned tick carries its deadline; a process that fell more than a
    /// few periods behind skips ahead instead of replaying every tick.
    pub fn due(&mut self, now: u64) -> ArrayVec<(Process, u64), MAX_DUE> {
        let mut ready: ArrayVec<(Process, u64), MAX_DUE> = ArrayVec::new();

        for process in Process::ALL {
            let timer = &mut self.timers[process.index()];
            let stats = &mut self.stats.processes[process.index()];
            let Some(mut deadline) = timer.next_due else {
                continue;
            };

            let mut replayed = 0;
            while deadline <= now && replayed < MAX_CATCH_UP {
                ready.push((process, deadline));
                deadline = deadline.saturating_add(timer.period_ms);
                replayed += 1;
            }

            if deadline <= now {
                let behind = (now - deadline) / timer.period_ms + 1;
                stats.skipped += behind;
                deadline = deadline.saturating_add(behind * timer.period_ms);
            }

            timer.next_due = Some(deadline);
            stats.ticks += replayed as u64;
            self.stats.total_ticks += replayed as u64;
        }

        ready.sort_by_key(|(process, deadline)| (*deadline, process.index()));
        ready
    }

    /// Earliest pending deadline across running processes.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.iter().filter_map(|timer| timer.next_due).min()
    }

    fn update_running(&mut self) {
        self.stats.running = self.timers.iter().filter(|t| t.next_due.is_some()).count() as u8;
    }

    pub fn get_stats(&self) -> &SchedulerStats {
        &self.stats
    }
}

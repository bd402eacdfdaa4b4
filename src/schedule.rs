//! Recurring backup schedule
//!
//! The controller owns a single schedule slot. Setting a schedule replaces
//! whatever was there before: the old trigger is cancelled before the new
//! one is registered, so at most one trigger exists at any time.
//!
//! A trigger is a tokio task that sleeps until the next occurrence of the
//! configured local wall-clock time, then spawns a batch over the device
//! list captured when the schedule was set. The trigger re-reads the clock
//! at least once a minute, so suspends and clock adjustments are noticed.
//! Cancelling a trigger never interrupts a batch that is already running.

use crate::error::ScheduleError;
use crate::runner::BatchRunner;
use crate::types::{BatchOrigin, DeviceDescriptor, Event};
use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use utoipa::ToSchema;

/// Longest the trigger sleeps before re-reading the wall clock
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Source of local wall-clock time for triggers
pub trait Clock: Send + Sync + 'static {
    /// Current local time
    fn now(&self) -> DateTime<Local>;
}

/// The system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Summary of a schedule that was just set
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduledJob {
    /// Hour of day (0-23)
    pub hour: u32,
    /// Minute of hour (0-59)
    pub minute: u32,
    /// Devices backed up on each firing
    pub device_count: usize,
    /// Next firing time
    #[schema(value_type = String)]
    pub next_run: DateTime<Local>,
    /// Whether an existing schedule was replaced
    pub replaced: bool,
}

/// Result of a cancel request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// The active schedule was removed
    Cancelled,
    /// There was no schedule; nothing changed
    NothingToCancel,
}

impl CancelOutcome {
    /// Operator-facing message
    pub fn message(&self) -> &'static str {
        match self {
            CancelOutcome::Cancelled => "Backup schedule cancelled",
            CancelOutcome::NothingToCancel => "No active schedule to cancel",
        }
    }
}

/// Whether the slot holds a schedule
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// No schedule
    Idle,
    /// A recurring schedule is active
    Scheduled,
}

/// Snapshot of the schedule slot
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduleStatus {
    /// Idle or scheduled
    pub state: SlotState,
    /// Configured hour, when scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    /// Configured minute, when scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    /// Addresses of the scheduled devices
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<String>,
    /// Next firing time, `null` when idle
    #[schema(value_type = Option<String>)]
    pub next_run: Option<DateTime<Local>>,
}

impl ScheduleStatus {
    fn idle() -> Self {
        Self {
            state: SlotState::Idle,
            hour: None,
            minute: None,
            devices: Vec::new(),
            next_run: None,
        }
    }

    /// Next run as `HH:MM`, or "Not set" when idle
    pub fn next_run_label(&self) -> String {
        match self.next_run {
            Some(at) => at.format("%H:%M").to_string(),
            None => "Not set".to_string(),
        }
    }
}

struct TriggerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl TriggerHandle {
    fn cancel(self) {
        self.token.cancel();
        // The task exits on its own at its next await point
        drop(self.task);
    }
}

enum ScheduleState {
    Idle,
    Scheduled {
        hour: u32,
        minute: u32,
        devices: Arc<[DeviceDescriptor]>,
        trigger: TriggerHandle,
    },
}

/// Owner of the single recurring schedule slot
pub struct ScheduleController {
    slot: Arc<Mutex<ScheduleState>>,
    runner: Arc<BatchRunner>,
    clock: Arc<dyn Clock>,
    event_tx: broadcast::Sender<Event>,
    shutdown: CancellationToken,
    active_triggers: Arc<AtomicUsize>,
}

impl ScheduleController {
    /// Create an idle controller firing batches through `runner`
    pub fn new(runner: Arc<BatchRunner>, event_tx: broadcast::Sender<Event>) -> Self {
        Self::with_clock(runner, event_tx, Arc::new(SystemClock))
    }

    /// Create an idle controller reading time from `clock`
    pub fn with_clock(
        runner: Arc<BatchRunner>,
        event_tx: broadcast::Sender<Event>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slot: Arc::new(Mutex::new(ScheduleState::Idle)),
            runner,
            clock,
            event_tx,
            shutdown: CancellationToken::new(),
            active_triggers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Install a daily schedule at `hour:minute` local time for `devices`
    ///
    /// Replaces any existing schedule. On error the slot is left untouched.
    pub async fn set(
        &self,
        hour: u32,
        minute: u32,
        devices: Vec<DeviceDescriptor>,
    ) -> Result<ScheduledJob, ScheduleError> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or(ScheduleError::InvalidTime { hour, minute })?;
        if devices.is_empty() {
            return Err(ScheduleError::NoDevices);
        }

        let mut slot = self.slot.lock().await;
        if self.shutdown.is_cancelled() {
            return Err(ScheduleError::ShuttingDown);
        }

        let replaced = match std::mem::replace(&mut *slot, ScheduleState::Idle) {
            ScheduleState::Idle => false,
            ScheduleState::Scheduled { trigger, .. } => {
                trigger.cancel();
                true
            }
        };

        let devices: Arc<[DeviceDescriptor]> = devices.into();
        let next_run = next_firing(&self.clock.now(), at);
        let trigger = self.spawn_trigger(at, devices.clone());

        *slot = ScheduleState::Scheduled {
            hour,
            minute,
            devices: devices.clone(),
            trigger,
        };
        drop(slot);

        info!(
            hour,
            minute,
            devices = devices.len(),
            next_run = %next_run,
            replaced,
            "Backup schedule set"
        );
        let _ = self.event_tx.send(Event::ScheduleSet {
            hour,
            minute,
            device_count: devices.len(),
            next_run,
        });

        Ok(ScheduledJob {
            hour,
            minute,
            device_count: devices.len(),
            next_run,
            replaced,
        })
    }

    /// Remove the schedule, if any
    pub async fn cancel(&self) -> CancelOutcome {
        let mut slot = self.slot.lock().await;
        match std::mem::replace(&mut *slot, ScheduleState::Idle) {
            ScheduleState::Idle => {
                info!("No active schedule to cancel");
                CancelOutcome::NothingToCancel
            }
            ScheduleState::Scheduled { trigger, .. } => {
                trigger.cancel();
                drop(slot);
                info!("Backup schedule cancelled");
                let _ = self.event_tx.send(Event::ScheduleCancelled);
                CancelOutcome::Cancelled
            }
        }
    }

    /// Next firing time, or `None` when idle
    pub async fn next_run(&self) -> Option<DateTime<Local>> {
        self.status().await.next_run
    }

    /// Snapshot of the slot
    pub async fn status(&self) -> ScheduleStatus {
        let slot = self.slot.lock().await;
        match &*slot {
            ScheduleState::Idle => ScheduleStatus::idle(),
            ScheduleState::Scheduled {
                hour,
                minute,
                devices,
                ..
            } => {
                let next_run = NaiveTime::from_hms_opt(*hour, *minute, 0)
                    .map(|at| next_firing(&self.clock.now(), at));
                ScheduleStatus {
                    state: SlotState::Scheduled,
                    hour: Some(*hour),
                    minute: Some(*minute),
                    devices: devices.iter().map(|d| d.address().to_string()).collect(),
                    next_run,
                }
            }
        }
    }

    /// Number of live trigger tasks
    pub fn active_triggers(&self) -> usize {
        self.active_triggers.load(Ordering::SeqCst)
    }

    /// Cancel the schedule and refuse further `set` calls
    ///
    /// Batches already running are left to finish.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        self.shutdown.cancel();
        if let ScheduleState::Scheduled { trigger, .. } =
            std::mem::replace(&mut *slot, ScheduleState::Idle)
        {
            trigger.cancel();
            info!("Backup schedule stopped for shutdown");
        }
    }

    fn spawn_trigger(&self, at: NaiveTime, devices: Arc<[DeviceDescriptor]>) -> TriggerHandle {
        let token = self.shutdown.child_token();
        self.active_triggers.fetch_add(1, Ordering::SeqCst);

        let trigger = Trigger {
            at,
            devices,
            runner: self.runner.clone(),
            clock: self.clock.clone(),
            slot: self.slot.clone(),
            event_tx: self.event_tx.clone(),
            token: token.clone(),
            _live: LiveTrigger(self.active_triggers.clone()),
        };
        let task = tokio::spawn(trigger.run());

        TriggerHandle { token, task }
    }
}

/// Decrements the live trigger count when the trigger task ends
struct LiveTrigger(Arc<AtomicUsize>);

impl Drop for LiveTrigger {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Trigger {
    at: NaiveTime,
    devices: Arc<[DeviceDescriptor]>,
    runner: Arc<BatchRunner>,
    clock: Arc<dyn Clock>,
    slot: Arc<Mutex<ScheduleState>>,
    event_tx: broadcast::Sender<Event>,
    token: CancellationToken,
    _live: LiveTrigger,
}

impl Trigger {
    async fn run(self) {
        info!(at = %self.at.format("%H:%M"), "Schedule trigger started");
        let mut after = self.clock.now();

        'firing: loop {
            let next = next_firing(&after, self.at);
            debug!(next_run = %next, "Schedule trigger waiting");

            loop {
                let now = self.clock.now();
                if now >= next {
                    break;
                }
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO).min(MAX_SLEEP);
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => break 'firing,
                    _ = tokio::time::sleep(wait) => {}
                }
            }

            // Firing is serialized with set/cancel: a trigger replaced while
            // waiting for the lock sees its token cancelled and stands down.
            {
                let _slot = self.slot.lock().await;
                if self.token.is_cancelled() {
                    break;
                }
                self.fire();
            }

            after = std::cmp::max(next, self.clock.now());
        }

        info!(at = %self.at.format("%H:%M"), "Schedule trigger stopped");
    }

    fn fire(&self) {
        info!(devices = self.devices.len(), "Scheduled backup firing");
        let _ = self.event_tx.send(Event::ScheduleFired {
            device_count: self.devices.len(),
        });

        let runner = self.runner.clone();
        let devices = self.devices.clone();
        tokio::spawn(async move {
            runner.run_batch(BatchOrigin::Scheduled, &devices).await;
        });
    }
}

/// First occurrence of `at` strictly after `after`, in `after`'s time zone
///
/// A wall-clock time skipped by a DST transition moves to the next day on
/// which it exists. An ambiguous time (clocks going back) uses the earlier
/// of the two instants.
pub fn next_firing<Tz: TimeZone>(after: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = after.timezone();
    let today = after.date_naive();

    for offset in 0..=3 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            if candidate > *after {
                return candidate;
            }
        }
    }

    after.clone() + chrono::Duration::days(1)
}

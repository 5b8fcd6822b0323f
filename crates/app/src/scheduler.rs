//! One-shot job scheduling for time- and sun-triggered automations.
//!
//! Every distinct trigger key (`HH:MM` clock time or solar position name)
//! gets at most one registered job. Jobs fire once and remove themselves;
//! a permanent housekeeping job re-derives the whole schedule shortly
//! after midnight, when a new day of solar instants becomes computable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveTime, TimeZone};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use rainhub_domain::solar::{Coordinates, SolarPosition, solar_events};
use rainhub_domain::time::{self, Timestamp};

use crate::ports::AutomationTrigger;

/// Registry key of the permanent daily re-derivation job.
const DAILY_JOB_KEY: &str = "rainhub_daily";

/// Local wall-clock time of the daily re-derivation.
const DAILY_JOB_TIME: (u32, u32) = (0, 1);

struct ScheduledJob {
    fire_at: Timestamp,
    handle: JoinHandle<()>,
}

/// A registered job, for display by the surrounding API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub key: String,
    pub fire_at: Timestamp,
}

/// Owns the job registry and spawns the one-shot trigger tasks.
pub struct Scheduler<R> {
    router: Arc<R>,
    coordinates: Coordinates,
    registry: Arc<Mutex<HashMap<String, ScheduledJob>>>,
}

impl<R> Clone for Scheduler<R> {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            coordinates: self.coordinates,
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R> Scheduler<R>
where
    R: AutomationTrigger + Send + Sync + 'static,
{
    pub fn new(router: Arc<R>, coordinates: Coordinates) -> Self {
        Self {
            router,
            coordinates,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a one-shot job for a clock time (`HH:MM`), if that time is
    /// still ahead today and not already registered.
    pub fn schedule_time_automation(&self, at: &str) {
        let Ok(parsed) = NaiveTime::parse_from_str(at, "%H:%M") else {
            warn!(at, "unparseable trigger time, skipping");
            return;
        };
        let today = Local::now().date_naive();
        let Some(instant) = Local
            .from_local_datetime(&today.and_time(parsed))
            .single()
            .map(|local| local.to_utc())
        else {
            return;
        };
        let key = at.to_string();
        let trigger_at = key.clone();
        self.register(key, instant, move |scheduler| async move {
            if let Err(error) = scheduler.router.trigger_time_automations(&trigger_at).await {
                warn!(at = trigger_at, %error, "time trigger failed");
            }
        });
    }

    /// Register a one-shot job for a solar position, if today's instant
    /// exists and is still ahead.
    pub fn schedule_sun_automation(&self, position: SolarPosition) {
        let today = Local::now().date_naive();
        let events = solar_events(today, self.coordinates);
        let Some(instant) = events.get(&position).copied() else {
            debug!(%position, "no instant for position today, skipping");
            return;
        };
        self.register(position.to_string(), instant, move |scheduler| async move {
            if let Err(error) = scheduler.router.trigger_sun_automations(position).await {
                warn!(%position, %error, "sun trigger failed");
            }
        });
    }

    /// Drop registry entries whose instant has passed, aborting any job
    /// that is somehow still running. The daily job is permanent.
    pub fn cancel_elapsed_jobs(&self) {
        let now = time::now();
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        registry.retain(|key, job| {
            if key == DAILY_JOB_KEY || job.fire_at > now {
                return true;
            }
            debug!(key, "removing elapsed job");
            job.handle.abort();
            false
        });
    }

    /// Derive today's full schedule from the saved automations.
    ///
    /// `afternoon` is always scheduled first so the synthetic-angle events
    /// are exercised even without an automation on them.
    pub async fn schedule_automations(&self) {
        self.schedule_sun_automation(SolarPosition::Afternoon);
        let saved = match self.router.saved_automations().await {
            Ok(saved) => saved,
            Err(error) => {
                warn!(%error, "could not load saved automations");
                return;
            }
        };
        let mut keys: Vec<String> = saved
            .iter()
            .filter_map(|automation| automation.trigger.schedule_key())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        for key in keys {
            // clock times carry a colon, solar positions never do
            if key.contains(':') {
                self.schedule_time_automation(&key);
            } else {
                match key.parse::<SolarPosition>() {
                    Ok(position) => self.schedule_sun_automation(position),
                    Err(error) => warn!(key, %error, "skipping unknown schedule key"),
                }
            }
        }
    }

    /// Build the initial schedule and start the daily re-derivation job.
    pub async fn start(&self) {
        self.cancel_elapsed_jobs();
        self.schedule_automations().await;

        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if registry.contains_key(DAILY_JOB_KEY) {
            return;
        }
        let scheduler = self.clone();
        let first_fire = next_daily_instant();
        let handle = tokio::spawn(async move {
            loop {
                let fire_at = next_daily_instant();
                scheduler.set_fire_at(DAILY_JOB_KEY, fire_at);
                sleep_until(fire_at).await;
                debug!("daily schedule re-derivation");
                scheduler.cancel_elapsed_jobs();
                scheduler.schedule_automations().await;
            }
        });
        registry.insert(
            DAILY_JOB_KEY.to_string(),
            ScheduledJob {
                fire_at: first_fire,
                handle,
            },
        );
    }

    /// Snapshot of the registered jobs, soonest first.
    pub fn jobs(&self) -> Vec<JobInfo> {
        let registry = self
            .registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut jobs: Vec<JobInfo> = registry
            .iter()
            .map(|(key, job)| JobInfo {
                key: key.clone(),
                fire_at: job.fire_at,
            })
            .collect();
        jobs.sort_by_key(|job| job.fire_at);
        jobs
    }

    /// Abort every registered job, the daily one included.
    pub fn shutdown(&self) {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        for (_, job) in registry.drain() {
            job.handle.abort();
        }
    }

    /// Register a one-shot job unless the key is taken or the instant has
    /// passed. The spawned task removes its own entry after firing.
    fn register<F, Fut>(&self, key: String, fire_at: Timestamp, action: F)
    where
        F: FnOnce(Scheduler<R>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if fire_at <= time::now() {
            debug!(key, "instant already passed today, skipping");
            return;
        }
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if registry.contains_key(&key) {
            debug!(key, "already registered, skipping");
            return;
        }
        debug!(key, %fire_at, "registering job");
        let scheduler = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            sleep_until(fire_at).await;
            action(scheduler.clone()).await;
            scheduler.remove(&task_key);
        });
        registry.insert(key, ScheduledJob { fire_at, handle });
    }

    fn remove(&self, key: &str) {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        registry.remove(key);
    }

    fn set_fire_at(&self, key: &str, fire_at: Timestamp) {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(job) = registry.get_mut(key) {
            job.fire_at = fire_at;
        }
    }
}

/// The next local 00:01, tomorrow if today's has passed.
fn next_daily_instant() -> Timestamp {
    let (hour, minute) = DAILY_JOB_TIME;
    let now = Local::now();
    let mut date = now.date_naive();
    loop {
        let candidate = date
            .and_hms_opt(hour, minute, 0)
            .and_then(|at| Local.from_local_datetime(&at).single());
        if let Some(candidate) = candidate {
            let instant = candidate.to_utc();
            if instant > now.to_utc() {
                return instant;
            }
        }
        date = date.succ_opt().unwrap_or(date);
    }
}

async fn sleep_until(instant: Timestamp) {
    let remaining = instant - time::now();
    if let Ok(remaining) = remaining.to_std() {
        tokio::time::sleep(remaining).await;
    }
}

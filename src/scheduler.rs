use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{error, info};

use crate::config::{AppConfig, parse_time};
use crate::runs::RunKind;

const TICK: Duration = Duration::from_secs(1);

/// Wall-clock minutes at which each run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub morning: NaiveTime,
    pub evening: NaiveTime,
}

impl Schedule {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            morning: parse_time(&cfg.morning_time)?,
            evening: parse_time(&cfg.evening_time)?,
        })
    }

    pub fn due(&self, now: NaiveTime) -> Vec<RunKind> {
        [(RunKind::Morning, self.morning), (RunKind::Evening, self.evening)]
            .into_iter()
            .filter(|(_, at)| at.hour() == now.hour() && at.minute() == now.minute())
            .map(|(kind, _)| kind)
            .collect()
    }
}

/// Remembers the last minute each run fired so a slot fires once even
/// though the clock is sampled every second.
#[derive(Debug, Default)]
pub struct Trigger {
    fired: HashMap<RunKind, (NaiveDate, u32, u32)>,
}

impl Trigger {
    pub fn poll(&mut self, schedule: &Schedule, now: NaiveDateTime) -> Vec<RunKind> {
        let slot = (now.date(), now.hour(), now.minute());
        schedule
            .due(now.time())
            .into_iter()
            .filter(|kind| self.fired.insert(*kind, slot) != Some(slot))
            .collect()
    }
}

/// Sample the local clock every second and start each due run on its own
/// thread. Runs may overlap.
pub fn run_forever<F>(schedule: Schedule, job: F) -> !
where
    F: Fn(RunKind) + Send + Sync + 'static,
{
    let job = Arc::new(job);
    let mut trigger = Trigger::default();
    info!(
        morning = %schedule.morning.format("%H:%M"),
        evening = %schedule.evening.format("%H:%M"),
        "scheduler started"
    );
    loop {
        for kind in trigger.poll(&schedule, Local::now().naive_local()) {
            let job = Arc::clone(&job);
            let spawned = thread::Builder::new()
                .name(format!("{kind}-run"))
                .spawn(move || job(kind));
            match spawned {
                Ok(_) => info!(run = %kind, "run triggered"),
                Err(err) => error!(run = %kind, error = %err, "failed to start run thread"),
            }
        }
        thread::sleep(TICK);
    }
}

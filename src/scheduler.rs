//! Periodic cadences driving the reminder engine.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use log::{debug, info};
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

/// Unit of work fired on every tick of a cadence.
pub type Task = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs named tasks at fixed intervals.
pub trait Scheduler {
    fn every(&mut self, name: &'static str, interval: Duration, task: Task);
}

/// [`Scheduler`] backed by tokio intervals.
///
/// Each tick spawns the task on its own, so a tick that takes longer than
/// the interval never delays the following ones. Ticks missed while the
/// runtime was busy are skipped rather than fired in a burst.
#[derive(Default)]
pub struct TokioScheduler {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        TokioScheduler::default()
    }

    /// Stops every cadence. Ticks already running are left to finish.
    pub fn shutdown(&mut self) {
        for (name, handle) in self.handles.drain(..) {
            debug!("stopping cadence {}", name);
            handle.abort();
        }
    }
}

impl Scheduler for TokioScheduler {
    fn every(&mut self, name: &'static str, interval: Duration, task: Task) {
        info!("running {} every {} seconds", name, interval.as_secs());

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                debug!("{} tick", name);
                tokio::spawn(task());
            }
        });
        self.handles.push((name, handle));
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// The single repeating tick source owned by an engine driver.
///
/// `start` and `stop` are idempotent. A stopped ticker never resolves, which
/// makes it safe to poll unconditionally inside `tokio::select!`.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Begin ticking. The first tick lands one full period from now.
    pub fn start(&mut self) {
        if self.interval.is_some() {
            return;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    /// Start or stop to match `running`.
    pub fn set_running(&mut self, running: bool) {
        if running {
            self.start();
        } else {
            self.stop();
        }
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

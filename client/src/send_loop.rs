use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Cancellable repeating send: fires once on `start`, then every `period` until `stop`.
///
/// Only one task is ever scheduled; `start` while running does nothing.
#[derive(Debug)]
pub struct SendLoop {
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl SendLoop {
    pub fn new(period: Duration) -> Self {
        Self { period, task: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Must be called from within a tokio runtime. Returns false if already sending.
    pub fn start<F>(&mut self, mut fire: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        if self.is_active() {
            debug!("send loop already running");
            return false;
        }
        fire();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                fire();
            }
        }));
        debug!(period_ms = period.as_millis() as u64, "send loop started");
        true
    }

    /// Returns false if nothing was running.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                debug!("send loop stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for SendLoop {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<u128>>>, impl FnMut() + Send + 'static) {
        let origin = Instant::now();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        (fired, move || sink.lock().push(origin.elapsed().as_millis()))
    }

    #[tokio::test(start_paused = true)]
    async fn fires_at_zero_fifty_hundred_then_stops() {
        let (fired, fire) = recorder();
        let mut send = SendLoop::new(Duration::from_millis(50));
        assert!(send.start(fire));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(send.stop());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*fired.lock(), vec![0, 50, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_a_no_op() {
        let (fired, fire) = recorder();
        let (_, other) = recorder();
        let mut send = SendLoop::new(Duration::from_millis(50));
        assert!(send.start(fire));
        assert!(!send.start(other));
        assert!(send.is_active());
        tokio::time::sleep(Duration::from_millis(120)).await;
        send.stop();
        assert_eq!(fired.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_restart_works() {
        let (fired, fire) = recorder();
        let mut send = SendLoop::new(Duration::from_millis(100));
        assert!(!send.stop());
        send.start(fire);
        assert!(send.stop());
        assert!(!send.stop());
        assert!(!send.is_active());
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fired.lock().len(), 1);

        let (again, fire) = recorder();
        assert!(send.start(fire));
        tokio::time::sleep(Duration::from_millis(150)).await;
        send.stop();
        assert_eq!(again.lock().len(), 2);
    }
}

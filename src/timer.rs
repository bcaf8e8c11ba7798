use std::time::Duration;

use futures::StreamExt;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;

/// Handle to the single repeating poll timer.
///
/// Each tick sends a copy of the tick message on the supplied channel. A tick
/// never waits for the work it triggers, so a slow status call does not hold
/// back the next one.
pub struct PollTimer {
    period: Duration,
    active: Option<CancellationToken>,
}

impl PollTimer {
    pub fn new(period: Duration) -> Self {
        PollTimer {
            period,
            active: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Starts ticking one period from now, replacing any running timer.
    pub fn start<T: Clone + Send + 'static>(&mut self, tx: flume::Sender<T>, tick: T) {
        self.stop();

        let cancel = CancellationToken::new();
        self.active = Some(cancel.clone());

        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = IntervalStream::new(interval);

        debug!("starting poll timer every {:?}", self.period);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    instant = ticks.next() => {
                        if instant.is_none() {
                            break;
                        }

                        trace!("poll tick");

                        if tx.send(tick.clone()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Stops the timer task. Ticks already sent stay in the channel, so the
    /// receiver should check [`PollTimer::is_active`]. Stopping an idle timer
    /// does nothing.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.active.take() {
            debug!("stopping poll timer");
            cancel.cancel();
        }
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (tx, rx) = flume::unbounded();
        let mut timer = PollTimer::new(Duration::from_millis(100));

        timer.start(tx, ());
        assert!(timer.is_active());

        // nothing fires before the first period has elapsed
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(260)).await;
        assert_eq!(rx.drain().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences_ticks() {
        let (tx, rx) = flume::unbounded();
        let mut timer = PollTimer::new(Duration::from_millis(100));

        timer.start(tx, ());
        tokio::time::sleep(Duration::from_millis(150)).await;
        timer.stop();
        timer.stop();
        assert!(!timer.is_active());

        let before = rx.drain().count();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(before, 1);
        assert_eq!(rx.drain().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_running_timer() {
        let (tx, rx) = flume::unbounded();
        let mut timer = PollTimer::new(Duration::from_millis(100));

        timer.start(tx.clone(), 1u8);
        timer.start(tx, 2u8);

        tokio::time::sleep(Duration::from_millis(350)).await;

        let ticks: Vec<u8> = rx.drain().collect();
        assert_eq!(ticks, vec![2, 2, 2]);
    }
}

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::source::NowPlayingSource;
use crate::state::StateTx;
use crate::types::WidgetState;

/// Periodically polls a [`NowPlayingSource`] and publishes the result.
///
/// The first poll happens as soon as the task starts. Polls never overlap: a
/// slow request pushes the next tick back rather than queueing a burst.
pub struct Refresher {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Refresher {
    /// Spawn the polling task on the current tokio runtime.
    pub fn start<S: NowPlayingSource>(source: S, period: Duration, state: StateTx) -> Self {
        // Token shared with the task; cancelled on stop or drop
        let token = CancellationToken::new();
        let task = tokio::spawn(run(source, period, state, token.clone()));

        log::info!("Refresher started, polling every {}ms", period.as_millis());

        Self {
            token,
            task: Some(task),
        }
    }

    /// Cancel the timer and any in-flight request, then wait for the task to exit.
    /// Nothing is published once this returns.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("Refresher task ended abnormally: {}", e);
            }
        }
        log::info!("Refresher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run<S: NowPlayingSource>(
    source: S,
    period: Duration,
    state: StateTx,
    token: CancellationToken,
) {
    // First tick completes immediately
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Race the request against shutdown so a stalled fetch cannot publish late
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("Dropping in-flight poll on shutdown");
                break;
            }
            result = source.fetch() => result,
        };

        // Full detail goes to the log, the card only gets the generic message
        if let Err(e) = &result {
            log::error!("Failed to refresh now playing: {}", e);
        }

        let next = WidgetState::from_poll(&result);
        match &next {
            WidgetState::Ready(track) if track.is_playing => {
                log::debug!("Now playing: {} - {}", track.title, track.artist);
            }
            WidgetState::Ready(_) => log::debug!("Nothing playing"),
            _ => {}
        }

        // send_replace never fails, even with no receiver left
        state.send_replace(next);
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::warn;
use watch::{WatchReceiver, WatchSender};

use crate::cpu_load::{CounterSource, CpuLoadSampler, CpuLoadSnapshot};

/// Runs cpu samples off the render thread and publishes the latest result.
///
/// Every request spawns a detached thread unless one is still running. The
/// result goes through a single-slot channel, so the reader always sees a
/// complete snapshot and never waits for one.
pub struct CpuLoadWorker<S: CounterSource + 'static> {
    sampler: Arc<CpuLoadSampler<S>>,
    send: Arc<WatchSender<Option<CpuLoadSnapshot>>>,
    recv: WatchReceiver<Option<CpuLoadSnapshot>>,
    in_flight: Arc<AtomicBool>,
    latest: Option<CpuLoadSnapshot>,
}

impl<S: CounterSource + 'static> CpuLoadWorker<S> {
    pub fn new(sampler: CpuLoadSampler<S>) -> Self {
        let (send, recv) = watch::channel(None);
        Self {
            sampler: Arc::new(sampler),
            send: Arc::new(send),
            recv,
            in_flight: Arc::new(AtomicBool::new(false)),
            latest: None,
        }
    }

    /// Start a sample in the background. Returns false if one is already running.
    pub fn request(&self) -> bool {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return false;
        }

        let sampler = Arc::clone(&self.sampler);
        let send = Arc::clone(&self.send);
        let in_flight = Arc::clone(&self.in_flight);
        let spawned = thread::Builder::new()
            .name("cpu-load-sample".to_string())
            .spawn(move || {
                match sampler.sample() {
                    Ok(snapshot) => send.send(Some(snapshot)),
                    Err(e) => warn!("cpu sample failed: {e}"),
                }
                in_flight.store(false, Ordering::Release);
            });

        if let Err(e) = spawned {
            warn!("could not spawn cpu sampling thread: {e}");
            self.in_flight.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Newest published snapshot, keeping the previous one if nothing new arrived
    pub fn latest(&mut self) -> Option<&CpuLoadSnapshot> {
        if let Some(Some(snapshot)) = self.recv.get_if_new() {
            self.latest = Some(snapshot);
        }
        self.latest.as_ref()
    }

    pub fn is_sampling(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

//! Worker pool for recognition calls.
//!
//! Each worker thread owns one recognizer instance and takes jobs from a
//! shared channel, so independent calls (label, combo, score) run side by
//! side instead of queueing behind a single engine. Callers get a pending
//! handle back and wait on it with a timeout. The timeout covers the
//! engine call only; time spent queued behind other jobs is not counted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel as cb;
use image::GrayImage;
use tracing::{debug, warn};

use super::engine::{CharSet, Recognizer};
use crate::error::{ScorecardError, ScorecardResult};

/// A work item for a recognition worker.
struct RecognitionJob {
    image: GrayImage,
    charset: CharSet,
    /// Signalled when a worker takes the job
    started: cb::Sender<()>,
    reply: cb::Sender<anyhow::Result<String>>,
    /// Set once nobody is waiting for the answer
    abandoned: Arc<AtomicBool>,
}

/// A submitted recognition call.
///
/// Dropping the handle abandons the call; a worker that has not picked it
/// up yet skips it.
#[must_use = "a recognition result is only observed through wait()"]
pub struct PendingRecognition {
    started: cb::Receiver<()>,
    receiver: cb::Receiver<anyhow::Result<String>>,
    abandoned: Arc<AtomicBool>,
    timeout: Duration,
}

impl PendingRecognition {
    /// Blocks until a worker takes the job, then until it answers or the
    /// timeout expires.
    pub fn wait(self) -> ScorecardResult<String> {
        self.started.recv().map_err(|_| ScorecardError::PoolClosed)?;

        match self.receiver.recv_timeout(self.timeout) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ScorecardError::recognition(format!("{:#}", e))),
            Err(cb::RecvTimeoutError::Timeout) => {
                Err(ScorecardError::RecognitionTimeout(self.timeout))
            }
            Err(cb::RecvTimeoutError::Disconnected) => Err(ScorecardError::PoolClosed),
        }
    }
}

impl Drop for PendingRecognition {
    fn drop(&mut self) {
        self.abandoned.store(true, Ordering::Release);
    }
}

/// A fixed set of recognition workers.
pub struct RecognizerPool {
    sender: Option<cb::Sender<RecognitionJob>>,
    workers: Vec<JoinHandle<()>>,
    timeout: Duration,
}

impl RecognizerPool {
    /// Starts `size` workers (at least one), each with its own recognizer
    /// built by `factory`.
    pub fn new<R, F>(size: usize, timeout: Duration, mut factory: F) -> std::io::Result<Self>
    where
        R: Recognizer + 'static,
        F: FnMut() -> R,
    {
        let (sender, receiver) = cb::unbounded::<RecognitionJob>();
        let mut workers = Vec::with_capacity(size.max(1));

        for index in 0..size.max(1) {
            let receiver = receiver.clone();
            let engine = factory();
            let handle = thread::Builder::new()
                .name(format!("ocr-worker-{}", index))
                .spawn(move || run_worker(index, receiver, engine))?;
            workers.push(handle);
        }

        debug!("Recognizer pool started with {} workers", workers.len());

        Ok(Self {
            sender: Some(sender),
            workers,
            timeout,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues a recognition call and returns immediately.
    pub fn submit(&self, image: GrayImage, charset: CharSet) -> ScorecardResult<PendingRecognition> {
        let sender = self.sender.as_ref().ok_or(ScorecardError::PoolClosed)?;
        let (started, started_rx) = cb::bounded(1);
        let (reply, receiver) = cb::bounded(1);
        let abandoned = Arc::new(AtomicBool::new(false));

        sender
            .send(RecognitionJob {
                image,
                charset,
                started,
                reply,
                abandoned: abandoned.clone(),
            })
            .map_err(|_| ScorecardError::PoolClosed)?;

        Ok(PendingRecognition {
            started: started_rx,
            receiver,
            abandoned,
            timeout: self.timeout,
        })
    }

    /// Submits one call and waits for it.
    pub fn recognize(&self, image: GrayImage, charset: CharSet) -> ScorecardResult<String> {
        self.submit(image, charset)?.wait()
    }
}

impl Drop for RecognizerPool {
    fn drop(&mut self) {
        // Closing the channel lets every worker fall out of its loop
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Recognition worker panicked");
            }
        }
    }
}

/// Runs one worker until the job channel closes.
fn run_worker<R: Recognizer>(index: usize, receiver: cb::Receiver<RecognitionJob>, mut engine: R) {
    debug!("Recognition worker {} started", index);

    for job in receiver.iter() {
        if job.abandoned.load(Ordering::Acquire) {
            debug!("Recognition worker {}: skipping abandoned job", index);
            continue;
        }
        let _ = job.started.send(());

        let result = engine.recognize(&job.image, job.charset);
        if let Err(e) = &result {
            warn!("Recognition worker {}: {:#}", index, e);
        }
        // The caller may have timed out and dropped its receiver
        let _ = job.reply.send(result);
    }

    debug!("Recognition worker {} finished", index);
}

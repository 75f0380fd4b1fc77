//! Host-thread device streams.
//!
//! Each logical device owns one worker thread that executes queued jobs
//! strictly in submission order. A job that panics marks the stream as
//! faulted: later jobs are skipped until the fault is drained by
//! [`Stream::synchronize`], which reports it as an error for this device
//! only.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use micromag::{Error, Result};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Run(Job),
    Barrier(mpsc::Sender<()>),
}

pub(crate) struct Stream {
    index: usize,
    tx: Option<mpsc::Sender<Command>>,
    fault: Arc<Mutex<Option<String>>>,
    worker: Option<JoinHandle<()>>,
}

impl Stream {
    /// Spawn the worker for logical device `index`.
    pub(crate) fn spawn(index: usize) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Command>();
        let fault = Arc::new(Mutex::new(None));
        let worker_fault = Arc::clone(&fault);
        let worker = thread::Builder::new()
            .name(format!("micromag-dev-{index}"))
            .spawn(move || worker_loop(index, &rx, &worker_fault))?;
        log::debug!("spawned stream for device {index}");
        Ok(Self {
            index,
            tx: Some(tx),
            fault,
            worker: Some(worker),
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .as_ref()
            .and_then(|tx| tx.send(command).ok())
            .ok_or_else(|| Error::device(self.index, "stream is closed"))
    }

    /// Queue `job` behind everything already submitted.
    pub(crate) fn enqueue(&self, job: Job) -> Result<()> {
        self.send(Command::Run(job))
    }

    /// Block until every job queued so far has run (or been skipped).
    pub(crate) fn wait(&self) -> Result<()> {
        let (done_tx, done_rx) = mpsc::channel();
        self.send(Command::Barrier(done_tx))?;
        done_rx
            .recv()
            .map_err(|_| Error::device(self.index, "stream worker exited"))
    }

    /// Wait, then fail if the stream holds a fault. The fault stays
    /// recorded for the next [`synchronize`](Self::synchronize).
    pub(crate) fn wait_clean(&self) -> Result<()> {
        self.wait()?;
        match self.fault.lock().as_ref() {
            Some(message) => Err(Error::device(self.index, message.clone())),
            None => Ok(()),
        }
    }

    /// Wait, then drain and report the stream's fault, if any.
    pub(crate) fn synchronize(&self) -> Result<()> {
        self.wait()?;
        match self.fault.lock().take() {
            Some(message) => {
                log::warn!("device {}: reporting fault: {message}", self.index);
                Err(Error::device(self.index, message))
            }
            None => Ok(()),
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(index: usize, rx: &mpsc::Receiver<Command>, fault: &Mutex<Option<String>>) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Run(job) => {
                if fault.lock().is_some() {
                    continue;
                }
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    let message = panic_message(payload.as_ref());
                    log::error!("device {index}: job panicked: {message}");
                    *fault.lock() = Some(message);
                }
            }
            Command::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Single-writer runtime.
//!
//! All transitions submitted through a [`LedgerRuntime`] are applied by one
//! dedicated thread in submission order, so the committed sequence is a
//! total order that can be replayed. Submitters never block on the queue:
//! a full queue is reported as [`RuntimeError::QueueFull`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::engine::{ContractEngine, LedgerSnapshot, TransitionOutcome};
use crate::error::{ConfigError, LedgerError, LedgerResult, RuntimeError};
use crate::ir::TransitionRequest;

const WRITER_THREAD_NAME: &str = "chronoledger-writer";

enum Job {
    Execute {
        request: TransitionRequest,
        reply: Sender<LedgerResult<TransitionOutcome>>,
    },

    Snapshot {
        reply: Sender<LedgerResult<LedgerSnapshot>>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        started: Sender<()>,
    },
}

fn run_writer(engine: &ContractEngine, rx: &Receiver<Job>) {
    // Exits once every sender is dropped and the queue is drained.
    while let Ok(job) = rx.recv() {
        match job {
            Job::Execute { request, reply } => {
                let _ = reply.send(engine.execute(request));
            }
            Job::Snapshot { reply } => {
                let _ = reply.send(engine.snapshot());
            }

            #[cfg(test)]
            Job::Sleep { duration, started } => {
                let _ = started.send(());
                thread::sleep(duration);
            }
        }
    }
    tracing::debug!("writer drained, exiting");
}

fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Handle returned by [`LedgerRuntime::submit`].
#[derive(Debug)]
pub struct TransitionHandle {
    request_id: Uuid,
    rx: Receiver<LedgerResult<TransitionOutcome>>,
}

impl TransitionHandle {
    /// Correlation ID of the submitted request.
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Waits for the writer to apply the transition.
    pub fn join(self) -> LedgerResult<TransitionOutcome> {
        self.rx
            .recv()
            .map_err(|_| LedgerError::Runtime(RuntimeError::Disconnected))?
    }

    /// Waits for the writer with a timeout.
    ///
    /// A timeout does not cancel the transition; it may still commit.
    pub fn join_timeout(self, timeout: Duration) -> LedgerResult<TransitionOutcome> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => LedgerError::Runtime(RuntimeError::Timeout {
                duration_ms: timeout_ms(timeout),
            }),
            RecvTimeoutError::Disconnected => LedgerError::Runtime(RuntimeError::Disconnected),
        })?
    }
}

/// Serializes all transitions through one writer thread.
pub struct LedgerRuntime {
    engine: Arc<ContractEngine>,
    tx: Option<Sender<Job>>,
    writer: Option<JoinHandle<()>>,
    queue_capacity: usize,
}

impl LedgerRuntime {
    /// Spawn the writer thread.
    pub fn start(engine: ContractEngine, config: RuntimeConfig) -> LedgerResult<Self> {
        if config.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity.into());
        }
        let queue_capacity = config.queue_capacity;
        let engine = Arc::new(engine);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let writer_engine = Arc::clone(&engine);
        let writer = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || run_writer(&writer_engine, &rx))
            .map_err(|e| RuntimeError::Spawn {
                message: e.to_string(),
            })?;

        tracing::debug!(queue_capacity, "writer started");
        Ok(Self {
            engine,
            tx: Some(tx),
            writer: Some(writer),
            queue_capacity,
        })
    }

    fn try_submit(&self, job: Job) -> Result<(), RuntimeError> {
        let tx = self.tx.as_ref().ok_or(RuntimeError::Disconnected)?;
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RuntimeError::QueueFull {
                capacity: self.queue_capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(RuntimeError::Disconnected),
        }
    }

    /// Queue a request for the writer.
    pub fn submit(&self, request: impl Into<TransitionRequest>) -> LedgerResult<TransitionHandle> {
        let request = request.into();
        let request_id = request.request_id;
        let (reply, rx) = bounded::<LedgerResult<TransitionOutcome>>(1);
        self.try_submit(Job::Execute { request, reply })?;
        Ok(TransitionHandle { request_id, rx })
    }

    /// Queue a request and wait for its outcome.
    pub fn execute(&self, request: impl Into<TransitionRequest>) -> LedgerResult<TransitionOutcome> {
        self.submit(request)?.join()
    }

    /// Snapshot taken by the writer between two transitions.
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        let (reply, rx) = bounded::<LedgerResult<LedgerSnapshot>>(1);
        self.try_submit(Job::Snapshot { reply })?;
        rx.recv()
            .map_err(|_| LedgerError::Runtime(RuntimeError::Disconnected))?
    }

    /// Digest of [`LedgerRuntime::snapshot`].
    pub fn state_digest(&self) -> LedgerResult<String> {
        self.snapshot()?.digest()
    }

    /// Shared reference to the engine, for reads.
    #[must_use]
    pub fn engine(&self) -> &ContractEngine {
        &self.engine
    }

    /// Configured queue capacity.
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    #[cfg(test)]
    fn submit_sleep(&self, duration: Duration) -> Result<Receiver<()>, RuntimeError> {
        let (started, rx) = bounded::<()>(1);
        self.try_submit(Job::Sleep { duration, started })?;
        Ok(rx)
    }
}

impl Drop for LedgerRuntime {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain queued jobs, then exit.
        drop(self.tx.take());
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::error!("writer thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ErrorKind;
    use crate::identity::Identity;
    use crate::ir::Transition;

    const OWNER: &str = "CONTRACT_OWNER";

    fn runtime(queue_capacity: usize) -> LedgerRuntime {
        LedgerRuntime::start(
            ContractEngine::with_privileged(OWNER).unwrap(),
            RuntimeConfig { queue_capacity },
        )
        .unwrap()
    }

    fn mint(amount: u64, recipient: &str) -> Transition {
        Transition::MintTokens {
            amount,
            recipient: Identity::from(recipient),
            caller: Identity::from(OWNER),
        }
    }

    #[test]
    fn execute_applies_in_order() {
        let rt = runtime(16);
        rt.execute(mint(100, "a")).unwrap();
        rt.execute(Transition::TransferTokens {
            amount: 40,
            sender: Identity::from("a"),
            recipient: Identity::from("b"),
        })
        .unwrap();

        assert_eq!(rt.engine().tokens().balance_of("b").unwrap(), 40);
        assert_eq!(rt.snapshot().unwrap().tokens.total_supply, 100);
    }

    #[test]
    fn rejections_come_back_through_the_handle() {
        let rt = runtime(16);
        let handle = rt.submit(mint(1, "x")).unwrap();
        handle.join().unwrap();

        let err = rt
            .execute(Transition::BurnTokens {
                amount: 2,
                owner: Identity::from("x"),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    }

    #[test]
    fn handle_carries_request_id() {
        let rt = runtime(4);
        let request = TransitionRequest::new(mint(1, "x"));
        let id = request.request_id;
        let handle = rt.submit(request).unwrap();
        assert_eq!(handle.request_id(), id);
        handle.join().unwrap();
    }

    #[test]
    fn full_queue_is_reported() {
        let rt = runtime(1);

        let started = rt.submit_sleep(Duration::from_millis(200)).unwrap();
        started.recv_timeout(Duration::from_secs(1)).unwrap();

        // Writer is busy; one job fits, the next does not.
        let queued = rt.submit(mint(1, "a")).unwrap();
        let err = rt.submit(mint(1, "b")).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Runtime(RuntimeError::QueueFull { capacity: 1 })
        ));
        assert!(err.is_retryable());

        queued.join().unwrap();
        assert_eq!(rt.engine().tokens().balance_of("b").unwrap(), 0);
    }

    #[test]
    fn join_timeout_reports_timeout_while_writer_is_busy() {
        let rt = runtime(4);
        let started = rt.submit_sleep(Duration::from_millis(200)).unwrap();
        started.recv_timeout(Duration::from_secs(1)).unwrap();

        let handle = rt.submit(mint(1, "a")).unwrap();
        let err = handle.join_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Runtime(RuntimeError::Timeout { duration_ms: 10 })
        ));
        assert!(!err.is_retryable());
        assert!(err.is_outcome_unknown());

        // The timed-out mint still commits once the writer frees up.
        let snapshot = rt.snapshot().unwrap();
        assert_eq!(snapshot.tokens.balances.get("a").copied(), Some(1));
        assert_eq!(snapshot.tokens.total_supply, 1);
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let err = LedgerRuntime::start(
            ContractEngine::with_privileged(OWNER).unwrap(),
            RuntimeConfig { queue_capacity: 0 },
        )
        .err()
        .unwrap();
        assert!(err.is_config());
        assert!(matches!(
            err,
            LedgerError::Config(ConfigError::ZeroQueueCapacity)
        ));
    }

    #[test]
    fn drop_drains_queued_work() {
        let handles: Vec<_> = {
            let rt = runtime(64);
            (0..10).map(|_| rt.submit(mint(1, "a")).unwrap()).collect()
        };
        for handle in handles {
            assert_eq!(handle.join().unwrap(), TransitionOutcome::Committed);
        }
    }

    #[test]
    fn join_reports_disconnected_when_reply_sender_dropped() {
        let (tx, rx) = bounded::<LedgerResult<TransitionOutcome>>(1);
        drop(tx);

        let handle = TransitionHandle {
            request_id: Uuid::nil(),
            rx,
        };
        let err = handle.join_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, LedgerError::Runtime(RuntimeError::Disconnected)));
    }
}

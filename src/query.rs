//! Cancellable, supersedable streaming query lifecycle.
//!
//! The controller owns at most one live query. Starting a new query
//! supersedes the previous one: the generation counter is bumped and the
//! old transport task is aborted, so any record the dead task already
//! produced is dropped at the receiving end instead of reaching the
//! aggregator. Cancellation therefore holds by construction, not by
//! swapping out callbacks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ReviewSource, ReviewTarget};
use crate::error::QueryError;
use crate::ndjson::{NdjsonDecoder, Record};
use crate::types::ReviewItem;

/// Lifecycle state of the controller's current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Loading,
    Loaded,
    Error,
    Cancelled,
}

/// One notification from the live query, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
    /// The query transitioned to `Loading`.
    Started,
    /// One decoded review batch. Forwarded exactly once, in stream order.
    Batch(Vec<ReviewItem>),
    /// The stream ended without an error; state is `Loaded`.
    Finished,
    /// Terminal failure message; state is `Error`.
    Failed(String),
}

struct Shared {
    /// Identifies the current live query; anything older is stale.
    generation: AtomicU64,
    state: Mutex<QueryState>,
}

impl Shared {
    fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Receiving half of the controller's event channel.
///
/// Every event is tagged with the generation of the query that produced
/// it and checked against the controller's current generation here, so a
/// superseded or cancelled query cannot deliver anything.
pub struct QueryEvents {
    rx: mpsc::UnboundedReceiver<(u64, QueryEvent)>,
    shared: Arc<Shared>,
}

impl QueryEvents {
    /// Next event from the live query, or `None` once the controller is
    /// dropped and the channel drained.
    pub async fn next(&mut self) -> Option<QueryEvent> {
        while let Some((generation, event)) = self.rx.recv().await {
            if generation == self.shared.current() {
                return Some(event);
            }
            debug!(generation, "dropping event from superseded query");
        }
        None
    }
}

/// Owns one outstanding streaming review request at a time.
pub struct QueryController<S> {
    source: Arc<S>,
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<(u64, QueryEvent)>,
    task: Option<JoinHandle<()>>,
}

impl<S: ReviewSource + Send + Sync + 'static> QueryController<S> {
    /// Pair a controller with the event stream its consumer reads.
    pub fn new(source: S) -> (Self, QueryEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
            state: Mutex::new(QueryState::Idle),
        });
        (
            Self {
                source: Arc::new(source),
                shared: shared.clone(),
                events: tx,
                task: None,
            },
            QueryEvents { rx, shared },
        )
    }

    /// Current lifecycle state.
    pub fn state(&self) -> QueryState {
        *self.shared.state.lock().unwrap()
    }

    /// Begin a new query, superseding any query currently in flight.
    pub fn start(&mut self, target: ReviewTarget) {
        self.invalidate(QueryState::Loading);
        let generation = self.shared.current();
        let source = self.source.clone();
        let shared = self.shared.clone();
        let events = self.events.clone();
        let _ = events.send((generation, QueryEvent::Started));
        debug!(generation, url = %target.url, "query started");
        self.task = Some(tokio::spawn(async move {
            let outcome = run_query(source.as_ref(), &target, generation, &events).await;
            finish_query(outcome, generation, &shared, &events);
        }));
    }

    /// Abort the in-flight query, if any.
    ///
    /// From this moment no batch, error or done notification of the
    /// aborted query can be observed.
    pub fn cancel(&mut self) {
        debug!(generation = self.shared.current(), "query cancelled");
        self.invalidate(QueryState::Cancelled);
    }

    /// Bump the generation so in-flight records go stale, then abort the
    /// transport task.
    fn invalidate(&mut self, next: QueryState) {
        {
            let mut state = self.shared.state.lock().unwrap();
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            *state = next;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<S> Drop for QueryController<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Pump the byte stream through a fresh decoder, emitting batches as they
/// decode. Runs on the spawned transport task.
async fn run_query<S: ReviewSource + ?Sized>(
    source: &S,
    target: &ReviewTarget,
    generation: u64,
    events: &mpsc::UnboundedSender<(u64, QueryEvent)>,
) -> Result<(), QueryError> {
    let mut stream = source.open(target).await?;
    let mut decoder = NdjsonDecoder::new();
    while let Some(chunk) = stream.next().await {
        for record in decoder.push(&chunk?)? {
            emit(record, generation, events)?;
        }
    }
    if let Some(record) = decoder.finish()? {
        emit(record, generation, events)?;
    }
    Ok(())
}

fn emit(
    record: Record,
    generation: u64,
    events: &mpsc::UnboundedSender<(u64, QueryEvent)>,
) -> Result<(), QueryError> {
    match record {
        Record::Batch(items) => {
            debug!(generation, count = items.len(), "review batch received");
            let _ = events.send((generation, QueryEvent::Batch(items)));
            Ok(())
        }
        Record::ServerError(message) => Err(QueryError::Server { message }),
    }
}

/// Record the terminal state and event for a finished transport task.
///
/// Guarded by the generation: a superseded task must not overwrite the
/// state its successor established.
fn finish_query(
    outcome: Result<(), QueryError>,
    generation: u64,
    shared: &Shared,
    events: &mpsc::UnboundedSender<(u64, QueryEvent)>,
) {
    let mut state = shared.state.lock().unwrap();
    if shared.current() != generation {
        return;
    }
    match outcome {
        Ok(()) => {
            *state = QueryState::Loaded;
            let _ = events.send((generation, QueryEvent::Finished));
        }
        Err(QueryError::Cancelled) => {}
        Err(err) => {
            warn!(generation, %err, "review query failed");
            *state = QueryState::Error;
            let _ = events.send((generation, QueryEvent::Failed(err.to_string())));
        }
    }
}

//! Work queue shared by the dispatcher and its workers: FIFO delivery plus an ack/join counter.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::{SearchError, SearchResult};

/// One unit of work. `Shutdown` is the sentinel: each worker consumes exactly one and exits.
#[derive(Debug)]
pub enum WorkItem<Q> {
    Query { index: usize, query: Q },
    Shutdown,
}

impl<Q> WorkItem<Q> {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, WorkItem::Shutdown)
    }
}

#[derive(Default)]
struct Counters {
    put: usize,
    acked: usize,
    aborted: Option<String>,
}

/// Unbounded FIFO with task accounting.
///
/// Every item handed out by [`get`](Self::get) stays outstanding until [`ack`](Self::ack) is
/// called for it; [`join`](Self::join) returns once every item ever put has been acked.
/// Delivery is exactly-once: the channel hands each item to a single receiver.
pub struct WorkQueue<Q> {
    tx: Sender<WorkItem<Q>>,
    rx: Receiver<WorkItem<Q>>,
    counters: Mutex<Counters>,
    settled: Condvar,
}

impl<Q> Default for WorkQueue<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q> WorkQueue<Q> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            counters: Mutex::new(Counters::default()),
            settled: Condvar::new(),
        }
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item. Counted as outstanding before it becomes visible to workers,
    /// so `join` can never observe a put that is not yet accounted for.
    pub fn put(&self, item: WorkItem<Q>) -> SearchResult<()> {
        self.counters().put += 1;
        self.tx.send(item).map_err(|_| {
            self.counters().put -= 1;
            SearchError::queue_protocol("put on a queue with no receivers")
        })
    }

    pub fn put_query(&self, index: usize, query: Q) -> SearchResult<()> {
        self.put(WorkItem::Query { index, query })
    }

    pub fn put_shutdown(&self) -> SearchResult<()> {
        self.put(WorkItem::Shutdown)
    }

    /// Block until an item is available and take it. The item stays outstanding until acked.
    pub fn get(&self) -> SearchResult<WorkItem<Q>> {
        self.rx
            .recv()
            .map_err(|_| SearchError::queue_protocol("queue disconnected before a shutdown sentinel was delivered"))
    }

    /// Mark one delivered item as fully processed.
    pub fn ack(&self) -> SearchResult<()> {
        let mut c = self.counters();
        if c.acked >= c.put {
            return Err(SearchError::queue_protocol(format!(
                "ack without an outstanding item ({} put, {} acked)",
                c.put, c.acked
            )));
        }
        c.acked += 1;
        if c.acked == c.put {
            self.settled.notify_all();
        }
        Ok(())
    }

    /// Block until every item ever put has been acked, or until the queue is aborted.
    pub fn join(&self) -> SearchResult<()> {
        let mut c = self.counters();
        while c.acked < c.put && c.aborted.is_none() {
            c = self.settled.wait(c).unwrap_or_else(PoisonError::into_inner);
        }
        match &c.aborted {
            Some(reason) => Err(SearchError::queue_protocol(format!(
                "queue aborted with {} of {} items unacked: {reason}",
                c.put - c.acked,
                c.put
            ))),
            None => Ok(()),
        }
    }

    /// Wake every `join` caller with an error. Used when a worker dies in a way that would
    /// otherwise leave its items unacked forever. The first reason is kept.
    pub fn abort(&self, reason: impl Into<String>) {
        let mut c = self.counters();
        if c.aborted.is_none() {
            c.aborted = Some(reason.into());
        }
        self.settled.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.counters().aborted.is_some()
    }

    /// Items put but not yet acked.
    pub fn outstanding(&self) -> usize {
        let c = self.counters();
        c.put - c.acked
    }

    /// Total acks so far.
    pub fn acked(&self) -> usize {
        self.counters().acked
    }

    /// Items waiting to be picked up by a worker.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

// src/crawl/frontier.rs
// =============================================================================
// The frontier: the shared work queue plus the set of URLs already seen.
//
// Every worker talks to the crawl state only through four operations:
// - try_enqueue: check-and-insert a discovered URL (dedupe, depth, page cap)
// - dequeue: wait for the next task, or learn that the crawl is finished
// - mark_done: report that a dequeued task has been fully processed
// - cancel: stop the crawl and wake everybody up
//
// When is the crawl finished?
// An empty queue alone is not enough: a worker that is still fetching a page
// may discover new links a moment later. The crawl is finished only when the
// queue is empty AND no dequeued task is still in flight ("quiescence").
//
// Locking:
// All state sits behind one std::sync::Mutex. Critical sections are short
// and never .await while holding the lock. Waiting workers park on a
// tokio::sync::Notify instead of spinning.
// =============================================================================

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, trace};
use url::Url;

use super::task::CrawlTask;

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<CrawlTask>,
    seen: HashSet<Url>,
    in_flight: usize,
    completed: usize,
    cancelled: bool,
}

/// Thread-safe crawl frontier shared by all workers.
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
    max_pages: usize,
    max_depth: usize,
}

impl Frontier {
    pub fn new(max_pages: usize, max_depth: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            changed: Notify::new(),
            max_pages,
            max_depth,
        }
    }

    // A poisoned lock is recovered instead of propagated. The state is only
    // ever mutated in small all-or-nothing steps, none of which can panic
    // halfway. Panics in page handling are caught by the worker pool, which
    // still calls `mark_done` for the task.
    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Adds a task unless it is too deep, already seen, over the page cap,
    // or the crawl was cancelled
    //
    // Returns: true if the task was queued
    pub fn try_enqueue(&self, task: CrawlTask) -> bool {
        // Depth is checked before the seen-set so a URL rejected here can
        // still be queued later from a shallower page
        if task.depth > self.max_depth {
            trace!(url = %task.url, depth = task.depth, "rejected: too deep");
            return false;
        }

        let mut state = self.lock();
        if state.cancelled {
            return false;
        }
        if state.seen.contains(&task.url) {
            return false;
        }
        if state.seen.len() >= self.max_pages {
            trace!(url = %task.url, "rejected: page cap reached");
            return false;
        }

        debug!(url = %task.url, depth = task.depth, "queued");
        state.seen.insert(task.url.clone());
        state.queue.push_back(task);
        drop(state);

        self.changed.notify_one();
        true
    }

    // Waits for the next task
    //
    // Returns: None once the crawl is quiescent or cancelled
    pub async fn dequeue(&self) -> Option<CrawlTask> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);

            {
                let mut state = self.lock();
                if state.cancelled {
                    return None;
                }
                if let Some(task) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(task);
                }
                if state.in_flight == 0 {
                    return None;
                }
                // Registered while still holding the lock, so a wake-up sent
                // right after we release it is not lost
                notified.as_mut().enable();
            }

            notified.await;
        }
    }

    // Called exactly once for every task returned by dequeue
    pub fn mark_done(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.completed += 1;
        let quiescent = state.in_flight == 0 && state.queue.is_empty();
        drop(state);

        if quiescent {
            self.changed.notify_waiters();
        }
    }

    // Rejects further work, drops what is queued and wakes every waiter
    pub fn cancel(&self) {
        let mut state = self.lock();
        if state.cancelled {
            return;
        }
        state.cancelled = true;
        let dropped = state.queue.len();
        state.queue.clear();
        drop(state);

        debug!(dropped, "frontier cancelled");
        self.changed.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Number of distinct URLs ever accepted.
    pub fn seen_len(&self) -> usize {
        self.lock().seen.len()
    }

    /// Number of tasks that went through mark_done.
    pub fn completed(&self) -> usize {
        self.lock().completed
    }

    /// Number of tasks still waiting in the queue.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn task(path: &str, depth: usize) -> CrawlTask {
        CrawlTask::new(Url::parse(&format!("https://example.com{path}")).unwrap(), depth)
    }

    #[test]
    fn test_duplicate_urls_rejected() {
        let frontier = Frontier::new(10, 5);
        assert!(frontier.try_enqueue(task("/a", 0)));
        assert!(!frontier.try_enqueue(task("/a", 1)));
        assert_eq!(frontier.seen_len(), 1);
        assert_eq!(frontier.pending(), 1);
    }

    #[test]
    fn test_depth_checked_before_seen_set() {
        let frontier = Frontier::new(10, 1);
        assert!(!frontier.try_enqueue(task("/deep", 2)));
        assert_eq!(frontier.seen_len(), 0);
        // Found again from a shallower page: accepted
        assert!(frontier.try_enqueue(task("/deep", 1)));
    }

    #[test]
    fn test_page_cap() {
        let frontier = Frontier::new(2, 5);
        assert!(frontier.try_enqueue(task("/a", 0)));
        assert!(frontier.try_enqueue(task("/b", 1)));
        assert!(!frontier.try_enqueue(task("/c", 1)));
        assert_eq!(frontier.seen_len(), 2);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::new(10, 5);
        frontier.try_enqueue(task("/a", 0));
        frontier.try_enqueue(task("/b", 1));
        frontier.try_enqueue(task("/c", 1));

        let mut order = Vec::new();
        while let Some(task) = frontier.dequeue().await {
            order.push(task.url.path().to_string());
            frontier.mark_done();
        }
        assert_eq!(order, vec!["/a", "/b", "/c"]);
        assert_eq!(frontier.completed(), 3);
    }

    #[tokio::test]
    async fn test_empty_frontier_is_quiescent() {
        let frontier = Frontier::new(10, 5);
        assert_eq!(frontier.dequeue().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dequeue_waits_for_in_flight_work() {
        let frontier = Arc::new(Frontier::new(10, 5));
        frontier.try_enqueue(task("/a", 0));
        let first = frontier.dequeue().await.unwrap();
        assert_eq!(first.url.path(), "/a");

        // Queue is empty but /a is in flight: the waiter must block
        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.dequeue().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        // The in-flight task discovers /b
        frontier.try_enqueue(task("/b", 1));
        let second = waiter.await.unwrap().unwrap();
        assert_eq!(second.url.path(), "/b");

        // Finish both; the next waiter sees quiescence
        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.dequeue().await })
        };
        frontier.mark_done();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        frontier.mark_done();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_wakes_waiters_and_rejects_work() {
        let frontier = Arc::new(Frontier::new(10, 5));
        frontier.try_enqueue(task("/a", 0));
        frontier.try_enqueue(task("/b", 0));
        let _in_flight = frontier.dequeue().await.unwrap();
        let _also = frontier.dequeue().await.unwrap();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move { frontier.dequeue().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        frontier.cancel();
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), None);
        }
        assert!(frontier.is_cancelled());
        assert!(!frontier.try_enqueue(task("/c", 1)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueue_is_atomic() {
        let frontier = Arc::new(Frontier::new(1000, 5));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move {
                    let mut accepted = 0;
                    for i in 0..100 {
                        if frontier.try_enqueue(task(&format!("/p{i}"), 1)) {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 100);
        assert_eq!(frontier.seen_len(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueue_respects_cap() {
        let frontier = Arc::new(Frontier::new(25, 5));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move {
                    for i in 0..50 {
                        frontier.try_enqueue(task(&format!("/w{worker}/p{i}"), 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(frontier.seen_len(), 25);
    }
}

//! This module provides the data structures and functions necessary for
//! managing the order queue.
//!
//! The `OrderBoard` struct holds every order the visitors have placed and
//! hands them out lowest-eaten-count first, so the visitor who has eaten
//! the least is always the next one served.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, oneshot};
use tracing::{Level, event};
use uuid::Uuid;

/// How a placed order eventually resolves. Every order resolves exactly
/// once: either a waiter delivers a portion or the pot has run dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    Served,
    SoldOut,
}

/// One pending request for a portion.
pub struct Order {
    ticket: Uuid,
    visitor_id: u32,
    portions_eaten: u32,
    seq: u64,
    placed_at: DateTime<Utc>,
    reply: oneshot::Sender<ServeOutcome>,
}

impl Order {
    pub fn ticket(&self) -> Uuid {
        self.ticket
    }

    pub fn visitor_id(&self) -> u32 {
        self.visitor_id
    }

    pub fn portions_eaten(&self) -> u32 {
        self.portions_eaten
    }

    /// Resolves the order with a delivered portion.
    pub fn serve(self) {
        self.resolve(ServeOutcome::Served);
    }

    /// Resolves the order with the bad news that the pot is empty.
    pub fn refuse(self) {
        self.resolve(ServeOutcome::SoldOut);
    }

    fn resolve(self, outcome: ServeOutcome) {
        let waited = Utc::now() - self.placed_at;
        if self.reply.send(outcome).is_err() {
            // The receiving half is gone, which only happens when the
            // visitor task was stopped mid-run.
            event!(
                Level::WARN,
                "order {} resolved after visitor {} already left",
                self.ticket,
                self.visitor_id
            );
            return;
        }
        event!(
            Level::DEBUG,
            "order {} from visitor {} resolved as {:?} after {}ms",
            self.ticket,
            self.visitor_id,
            outcome,
            waited.num_milliseconds()
        );
    }
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Order {}

impl PartialOrd for Order {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap pops its maximum, so the comparison is inverted: fewest
// portions eaten wins, earlier submission breaks ties.
impl Ord for Order {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .portions_eaten
            .cmp(&self.portions_eaten)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct BoardState {
    accepting: bool,
    pending: BinaryHeap<Order>,
    next_seq: u64,
}

/// The order board shared by every visitor (producers) and every waiter
/// (consumers). The accepting gate and the pending heap live under one
/// lock, so an order can never slip in behind a closing gate.
pub struct OrderBoard {
    state: Mutex<BoardState>,
}

impl OrderBoard {
    pub fn new() -> Self {
        OrderBoard {
            state: Mutex::new(BoardState {
                accepting: true,
                pending: BinaryHeap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Places an order for one portion, keyed by how much the visitor
    /// has eaten so far. Returns the receiving half the visitor waits
    /// on, or `None` once the gate has closed.
    pub async fn submit(
        &self,
        visitor_id: u32,
        portions_eaten: u32,
    ) -> Option<oneshot::Receiver<ServeOutcome>> {
        let mut state = self.state.lock().await;
        if !state.accepting {
            return None;
        }

        let (reply, outcome) = oneshot::channel();
        let order = Order {
            ticket: Uuid::new_v4(),
            visitor_id,
            portions_eaten,
            seq: state.next_seq,
            placed_at: Utc::now(),
            reply,
        };
        state.next_seq += 1;
        event!(
            Level::DEBUG,
            "order {} placed by visitor {} with {} portions eaten",
            order.ticket,
            visitor_id,
            portions_eaten
        );
        state.pending.push(order);
        Some(outcome)
    }

    /// Removes the order whose visitor has eaten the least so far.
    /// `None` only means nothing is pending right now, not that the
    /// dinner is over.
    pub async fn next(&self) -> Option<Order> {
        self.state.lock().await.pending.pop()
    }

    /// Stops accepting new orders. One-way and idempotent; waiters race
    /// here at shutdown and the first one wins.
    pub async fn close_gate(&self) {
        let mut state = self.state.lock().await;
        if state.accepting {
            state.accepting = false;
            event!(
                Level::INFO,
                "order board closed with {} orders still pending",
                state.pending.len()
            );
        }
    }

    pub async fn is_accepting(&self) -> bool {
        self.state.lock().await.accepting
    }

    /// Snapshot of the pending count, for diagnostics and tests.
    pub async fn size(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hungriest_visitor_is_served_first() {
        let board = OrderBoard::new();
        let _a = board.submit(1, 3).await.expect("gate open");
        let _b = board.submit(2, 1).await.expect("gate open");
        let _c = board.submit(3, 2).await.expect("gate open");
        let _d = board.submit(4, 1).await.expect("gate open");

        let dispatched: Vec<u32> = [
            board.next().await.expect("pending").visitor_id(),
            board.next().await.expect("pending").visitor_id(),
            board.next().await.expect("pending").visitor_id(),
            board.next().await.expect("pending").visitor_id(),
        ]
        .to_vec();

        // Ties on eaten count go in submission order.
        assert_eq!(dispatched, vec![2, 4, 3, 1]);
        assert!(board.next().await.is_none());
    }

    #[tokio::test]
    async fn a_closed_gate_rejects_every_order() {
        let board = OrderBoard::new();
        assert!(board.is_accepting().await);
        assert!(board.submit(1, 0).await.is_some());

        board.close_gate().await;
        board.close_gate().await; // second close is a no-op

        assert!(!board.is_accepting().await);
        assert!(board.submit(2, 0).await.is_none());
        assert!(board.submit(3, 5).await.is_none());
        // The order placed before the close is still there to drain.
        assert_eq!(board.size().await, 1);
    }

    #[tokio::test]
    async fn an_order_resolves_exactly_once() {
        let board = OrderBoard::new();

        let outcome = board.submit(1, 0).await.expect("gate open");
        board.next().await.expect("pending").serve();
        assert_eq!(outcome.await.expect("resolved"), ServeOutcome::Served);

        let outcome = board.submit(2, 0).await.expect("gate open");
        board.next().await.expect("pending").refuse();
        assert_eq!(outcome.await.expect("resolved"), ServeOutcome::SoldOut);
    }

    #[tokio::test]
    async fn a_dropped_order_shows_up_as_an_error() {
        let board = OrderBoard::new();
        let outcome = board.submit(1, 0).await.expect("gate open");
        drop(board.next().await.expect("pending"));
        assert!(outcome.await.is_err());
    }

    #[tokio::test]
    async fn size_tracks_pending_orders() {
        let board = OrderBoard::new();
        assert_eq!(board.size().await, 0);
        let _a = board.submit(1, 0).await.expect("gate open");
        let _b = board.submit(2, 0).await.expect("gate open");
        assert_eq!(board.size().await, 2);
        drop(board.next().await);
        assert_eq!(board.size().await, 1);
    }
}

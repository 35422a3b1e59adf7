use std::sync::Arc;
use std::time::Duration;

use tracing::{Level, event, instrument};

use crate::kitchen::Kitchen;
use crate::ordque::OrderBoard;

// Idle pause between polls of an empty order board.
const POLL_PAUSE: Duration = Duration::from_micros(50);

/// One waiter on the floor. Turns pending orders into served portions
/// until the pot runs dry, then sends everyone still waiting home.
pub struct Waiter {
    id: u32,
    board: Arc<OrderBoard>,
    kitchen: Arc<Kitchen>,
    serving_delay: Duration,
}

impl Waiter {
    pub fn new(
        id: u32,
        board: Arc<OrderBoard>,
        kitchen: Arc<Kitchen>,
        serving_delay: Duration,
    ) -> Self {
        Waiter {
            id,
            board,
            kitchen,
            serving_delay,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    #[instrument(name = "waiter", skip_all)]
    pub async fn run(&self) {
        loop {
            let Some(order) = self.board.next().await else {
                if !self.board.is_accepting().await {
                    // A colleague already closed the board and drained
                    // the last pending orders.
                    break;
                }
                tokio::time::sleep(POLL_PAUSE).await;
                continue;
            };

            // The claim alone decides; the order in hand is resolved
            // either way.
            if self.kitchen.claim() {
                event!(
                    Level::DEBUG,
                    "waiter {} serves visitor {} for {:?}",
                    self.id,
                    order.visitor_id(),
                    self.serving_delay
                );
                tokio::time::sleep(self.serving_delay).await;
                order.serve();
            } else {
                order.refuse();
                self.shut_down().await;
                break;
            }
        }

        event!(Level::DEBUG, "waiter {} is done for the evening", self.id);
    }

    /// Closes the order board and refuses whatever is still pending.
    /// Closing is idempotent, so racing waiters at most drain an
    /// already empty board.
    async fn shut_down(&self) {
        self.board.close_gate().await;
        while let Some(order) = self.board.next().await {
            order.refuse();
        }
    }
}

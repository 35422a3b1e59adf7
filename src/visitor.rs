use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{Level, event, instrument};

use crate::config::DurationRange;
use crate::ordque::{OrderBoard, ServeOutcome};
use crate::spoon::Spoon;

/// One visitor at the table. Alternates between discussing and eating,
/// and needs both neighboring spoons for the latter.
pub struct Visitor {
    id: u32,
    first_spoon: Arc<Spoon>,
    second_spoon: Arc<Spoon>,
    board: Arc<OrderBoard>,
    discussion_range: DurationRange,
    eating_range: DurationRange,
    eaten: AtomicU32,
}

impl Visitor {
    /// `first_spoon` must carry the lower index. Everyone reaching for
    /// the lower-numbered spoon first is the one rule that keeps a ring
    /// of hungry visitors free of circular waits.
    pub fn new(
        id: u32,
        first_spoon: Arc<Spoon>,
        second_spoon: Arc<Spoon>,
        board: Arc<OrderBoard>,
        discussion_range: DurationRange,
        eating_range: DurationRange,
    ) -> Self {
        debug_assert!(first_spoon.id() < second_spoon.id());
        Visitor {
            id,
            first_spoon,
            second_spoon,
            board,
            discussion_range,
            eating_range,
            eaten: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Portions this visitor has eaten so far. Safe to read while the
    /// run is still going.
    pub fn eaten_count(&self) -> u32 {
        self.eaten.load(Ordering::SeqCst)
    }

    #[instrument(name = "visitor", skip_all)]
    pub async fn run(&self) {
        loop {
            self.discuss().await;

            let Some(outcome) = self.board.submit(self.id, self.eaten_count()).await else {
                event!(
                    Level::DEBUG,
                    "visitor {} found the order board closed",
                    self.id
                );
                break;
            };

            match outcome.await {
                Ok(ServeOutcome::Served) => self.eat().await,
                Ok(ServeOutcome::SoldOut) => {
                    event!(Level::DEBUG, "visitor {} was told the pot is empty", self.id);
                    break;
                }
                Err(_) => {
                    // The waiter side vanished without resolving the
                    // order; only a forced stop does that.
                    event!(
                        Level::WARN,
                        "visitor {} never heard back about an order",
                        self.id
                    );
                    break;
                }
            }
        }

        event!(
            Level::INFO,
            "visitor {} left the table after {} portions",
            self.id,
            self.eaten_count()
        );
    }

    async fn discuss(&self) {
        let pause = self.discussion_range.sample();
        event!(Level::DEBUG, "visitor {} discusses for {:?}", self.id, pause);
        tokio::time::sleep(pause).await;
    }

    async fn eat(&self) {
        let first = self.first_spoon.take(self.id).await;
        let second = self.second_spoon.take(self.id).await;

        let pause = self.eating_range.sample();
        event!(Level::DEBUG, "visitor {} eats for {:?}", self.id, pause);
        tokio::time::sleep(pause).await;

        drop(second);
        drop(first);
        self.eaten.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn visitor_leaves_when_the_board_is_closed() {
        let board = Arc::new(OrderBoard::new());
        board.close_gate().await;

        let visitor = Visitor::new(
            1,
            Arc::new(Spoon::new(0)),
            Arc::new(Spoon::new(1)),
            board,
            DurationRange::from_millis(0, 1),
            DurationRange::from_millis(0, 1),
        );

        tokio::time::timeout(Duration::from_secs(5), visitor.run())
            .await
            .expect("visitor should leave right away");
        assert_eq!(visitor.eaten_count(), 0);
    }

    #[tokio::test]
    async fn visitor_leaves_when_refused() {
        let board = Arc::new(OrderBoard::new());
        let visitor = Arc::new(Visitor::new(
            1,
            Arc::new(Spoon::new(0)),
            Arc::new(Spoon::new(1)),
            board.clone(),
            DurationRange::from_millis(0, 1),
            DurationRange::from_millis(0, 1),
        ));

        let running = tokio::spawn({
            let visitor = visitor.clone();
            async move { visitor.run().await }
        });

        // Refuse the first order that shows up, then close the board.
        let order = loop {
            match board.next().await {
                Some(order) => break order,
                None => tokio::time::sleep(Duration::from_millis(1)).await,
            }
        };
        order.refuse();
        board.close_gate().await;

        tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("visitor should leave after the refusal")
            .expect("visitor task should not panic");
        assert_eq!(visitor.eaten_count(), 0);
    }
}

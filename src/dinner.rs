use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::{Level, event};

use crate::config::DinnerConfig;
use crate::kitchen::Kitchen;
use crate::ordque::OrderBoard;
use crate::spoon::Spoon;
use crate::visitor::Visitor;
use crate::waiter::Waiter;

/// What a finished (or cut-off) run looked like.
#[derive(Debug, Clone)]
pub struct DinnerStatistics {
    pub remaining_portions: u64,
    pub eaten_by_visitor: HashMap<u32, u32>,
    pub duration: Duration,
    pub interrupted: bool,
}

impl DinnerStatistics {
    pub fn total_eaten(&self) -> u64 {
        self.eaten_by_visitor
            .values()
            .map(|&count| count as u64)
            .sum()
    }
}

/// Owns every piece of one dinner run and drives it to completion: one
/// kitchen, one order board, a ring of spoons, and the visitor and
/// waiter crews.
pub struct DinnerSimulation {
    config: DinnerConfig,
    kitchen: Arc<Kitchen>,
    visitors: Vec<Arc<Visitor>>,
    waiters: Vec<Arc<Waiter>>,
}

impl DinnerSimulation {
    pub fn new(config: DinnerConfig) -> Result<Self> {
        config.validate()?;

        let kitchen = Arc::new(Kitchen::new(config.portions));
        let board = Arc::new(OrderBoard::new());

        let spoons: Vec<Arc<Spoon>> = (0..config.visitors as usize)
            .map(|id| Arc::new(Spoon::new(id)))
            .collect();

        let visitors: Vec<Arc<Visitor>> = (0..config.visitors)
            .map(|i| {
                let left = i as usize;
                let right = (i as usize + 1) % spoons.len();
                // Everyone gets their pair pre-sorted by index; the pair
                // at the seam of the ring swaps hands here.
                let first = spoons[left.min(right)].clone();
                let second = spoons[left.max(right)].clone();
                Arc::new(Visitor::new(
                    i + 1,
                    first,
                    second,
                    board.clone(),
                    config.discussion_range,
                    config.eating_range,
                ))
            })
            .collect();

        let waiters: Vec<Arc<Waiter>> = (0..config.waiters)
            .map(|i| {
                Arc::new(Waiter::new(
                    i + 1,
                    board.clone(),
                    kitchen.clone(),
                    config.serving_delay,
                ))
            })
            .collect();

        Ok(DinnerSimulation {
            config,
            kitchen,
            visitors,
            waiters,
        })
    }

    /// Runs the dinner to natural completion: the pot empties, the board
    /// closes, and every worker goes home.
    pub async fn run(&self) -> DinnerStatistics {
        self.run_inner(None).await
    }

    /// Runs the dinner but pulls the plug once `limit` elapses. The
    /// statistics then carry whatever the counters had reached, with
    /// `interrupted` set.
    pub async fn run_until(&self, limit: Duration) -> DinnerStatistics {
        self.run_inner(Some(limit)).await
    }

    async fn run_inner(&self, limit: Option<Duration>) -> DinnerStatistics {
        event!(
            Level::INFO,
            "seating {} visitors with {} waiters on duty and {} portions in the pot",
            self.config.visitors,
            self.config.waiters,
            self.config.portions
        );

        let mut waiter_tasks = JoinSet::new();
        for waiter in &self.waiters {
            let waiter = waiter.clone();
            waiter_tasks.spawn(async move { waiter.run().await });
        }

        let start = Instant::now();

        let mut visitor_tasks = JoinSet::new();
        for visitor in &self.visitors {
            let visitor = visitor.clone();
            visitor_tasks.spawn(async move { visitor.run().await });
        }

        // A worker that panics or gets aborted is logged and left for
        // the statistics to reflect; its siblings keep going.
        let everyone_done = async {
            while let Some(finished) = waiter_tasks.join_next().await {
                if let Err(err) = finished {
                    event!(Level::WARN, "a waiter was interrupted: {}", err);
                }
            }
            while let Some(finished) = visitor_tasks.join_next().await {
                if let Err(err) = finished {
                    event!(Level::WARN, "a visitor was interrupted: {}", err);
                }
            }
        };

        let interrupted = match limit {
            Some(limit) => {
                let timed_out = tokio::time::timeout(limit, everyone_done).await.is_err();
                if timed_out {
                    event!(
                        Level::WARN,
                        "dinner ran past its {:?} budget, sending everyone home",
                        limit
                    );
                }
                timed_out
            }
            None => {
                everyone_done.await;
                false
            }
        };

        if interrupted {
            visitor_tasks.abort_all();
            waiter_tasks.abort_all();
            while visitor_tasks.join_next().await.is_some() {}
            while waiter_tasks.join_next().await.is_some() {}
        }

        self.statistics(start.elapsed(), interrupted)
    }

    /// Snapshot of the run's counters. Valid mid-run as well, which is
    /// what makes the cut-off statistics possible.
    pub fn statistics(&self, duration: Duration, interrupted: bool) -> DinnerStatistics {
        DinnerStatistics {
            remaining_portions: self.kitchen.remaining(),
            eaten_by_visitor: self
                .visitors
                .iter()
                .map(|visitor| (visitor.id(), visitor.eaten_count()))
                .collect(),
            duration,
            interrupted,
        }
    }
}

//! A fairness-ordered dining simulation: a ring of visitors contends for
//! paired spoons and a finite pot of soup, dispatched by waiters through
//! an order board that always serves the least-fed visitor next.

pub mod config;
pub mod dinner;
pub mod kitchen;
pub mod ordque;
pub mod spoon;
pub mod visitor;
pub mod waiter;

pub use config::{DinnerConfig, DurationRange};
pub use dinner::{DinnerSimulation, DinnerStatistics};

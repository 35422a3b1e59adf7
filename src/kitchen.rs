use std::sync::atomic::{AtomicU64, Ordering};

/// The pot every waiter draws from. Claiming is the only mutation; the
/// count never goes below zero and never grows back.
pub struct Kitchen {
    portions: AtomicU64,
}

impl Kitchen {
    pub fn new(initial_portions: u64) -> Self {
        Kitchen {
            portions: AtomicU64::new(initial_portions),
        }
    }

    /// Takes one portion out of the pot. Returns false once the pot is
    /// empty, leaving the count untouched. The emptiness check and the
    /// decrement are a single atomic step, so concurrent claims can
    /// never overdraw the pot.
    pub fn claim(&self) -> bool {
        self.portions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }

    /// Snapshot of the count, for statistics only. Never a basis for
    /// deciding whether a claim would succeed.
    pub fn remaining(&self) -> u64 {
        self.portions.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_stops_at_zero() {
        let kitchen = Kitchen::new(2);
        assert!(kitchen.claim());
        assert!(kitchen.claim());
        assert!(!kitchen.claim());
        assert!(!kitchen.claim());
        assert_eq!(kitchen.remaining(), 0);
    }

    #[test]
    fn empty_pot_claims_nothing() {
        let kitchen = Kitchen::new(0);
        assert!(!kitchen.claim());
        assert_eq!(kitchen.remaining(), 0);
    }

    #[test]
    fn concurrent_claims_never_overdraw() {
        let kitchen = Kitchen::new(1000);
        let successes = AtomicU64::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        if kitchen.claim() {
                            successes.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(successes.load(Ordering::SeqCst), 1000);
        assert_eq!(kitchen.remaining(), 0);
    }
}

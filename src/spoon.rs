use tokio::sync::{Mutex, MutexGuard};
use tracing::{Level, event};

/// One shared spoon. Exactly two neighboring visitors contend for it,
/// and whoever holds the guard owns the spoon until the guard drops.
pub struct Spoon {
    id: usize,
    slot: Mutex<()>,
}

impl Spoon {
    pub fn new(id: usize) -> Self {
        Spoon {
            id,
            slot: Mutex::new(()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Waits until the spoon is free and picks it up. Blocking is the
    /// only failure mode here.
    pub async fn take(&self, holder: u32) -> SpoonGuard<'_> {
        let slot = self.slot.lock().await;
        event!(Level::DEBUG, "spoon {} taken by visitor {}", self.id, holder);
        SpoonGuard {
            spoon: self,
            holder,
            _slot: slot,
        }
    }
}

pub struct SpoonGuard<'a> {
    spoon: &'a Spoon,
    holder: u32,
    _slot: MutexGuard<'a, ()>,
}

impl Drop for SpoonGuard<'_> {
    fn drop(&mut self) {
        event!(
            Level::DEBUG,
            "spoon {} put down by visitor {}",
            self.spoon.id,
            self.holder
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::task::JoinSet;

    #[tokio::test]
    async fn only_one_holder_at_a_time() {
        let spoon = Arc::new(Spoon::new(0));
        let in_use = Arc::new(AtomicBool::new(false));

        let mut holders = JoinSet::new();
        for holder in 0..4u32 {
            let spoon = spoon.clone();
            let in_use = in_use.clone();
            holders.spawn(async move {
                for _ in 0..50 {
                    let _guard = spoon.take(holder).await;
                    assert!(!in_use.swap(true, Ordering::SeqCst));
                    tokio::task::yield_now().await;
                    in_use.store(false, Ordering::SeqCst);
                }
            });
        }

        while let Some(finished) = holders.join_next().await {
            finished.expect("holder task panicked");
        }
    }
}

//! Bounded fan-out for artifact file I/O.

use rayon::prelude::*;

use crate::error::TaskError;

/// Default number of concurrent artifact writes.
pub const DEFAULT_CONCURRENCY: usize = 25;

/// Upper bound on worker threads, to stay well clear of descriptor limits.
pub const MAX_CONCURRENCY: usize = 64;

/// A small fixed-size pool used to write or delete artifacts in parallel.
///
/// Only the set of resulting files matters; no ordering between items is
/// guaranteed.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Creates a pool with `limit` threads, clamped to `1..=MAX_CONCURRENCY`.
    pub fn new(limit: usize) -> Result<Self, TaskError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(limit.clamp(1, MAX_CONCURRENCY))
            .thread_name(|i| format!("tether-io-{i}"))
            .build()
            .map_err(|e| TaskError::Pool {
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `f` on every item, stopping at the first error.
    pub fn try_for_each<T, F>(&self, items: &[T], f: F) -> Result<(), TaskError>
    where
        T: Sync,
        F: Fn(&T) -> Result<(), TaskError> + Sync + Send,
    {
        if items.is_empty() {
            return Ok(());
        }
        self.pool.install(|| items.par_iter().try_for_each(|item| f(item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn limit_is_clamped() {
        assert_eq!(WorkerPool::new(0).unwrap().size(), 1);
        assert_eq!(WorkerPool::new(1000).unwrap().size(), MAX_CONCURRENCY);
        assert_eq!(WorkerPool::new(4).unwrap().size(), 4);
    }

    #[test]
    fn visits_every_item() {
        let pool = WorkerPool::new(4).unwrap();
        let count = AtomicUsize::new(0);
        let items: Vec<u32> = (0..100).collect();
        pool.try_for_each(&items, |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn first_error_is_returned() {
        let pool = WorkerPool::new(2).unwrap();
        let items = ["ok", "bad", "ok"];
        let err = pool
            .try_for_each(&items, |item| {
                if *item == "bad" {
                    Err(TaskError::Template {
                        name: item.to_string(),
                        reason: "rejected".to_string(),
                    })
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, TaskError::Template { .. }));
    }
}

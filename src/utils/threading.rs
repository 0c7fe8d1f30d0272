//! # Threading Configuration
//!
//! Worker pools are built per phase rather than installed globally: the
//! init phase deliberately recreates its pool between batches, and the
//! copy phase sizes its pool from the CLI thread count.

use crate::error::{Result, ShardrError};

/// Create a named rayon thread pool with the given number of threads.
pub fn build_worker_pool(n_threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|i| format!("shardr-worker-{i}"))
        .build()
        .map_err(|e| ShardrError::config(format!("failed to create thread pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_pool_of_the_requested_width() {
        let pool = build_worker_pool(3).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }
}

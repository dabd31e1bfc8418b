use std::sync::atomic::{AtomicUsize, Ordering};
use rayon::prelude::*;

pub trait ParallelProcessor {
    /// Configure the global pool once; later calls keep the existing pool.
    fn init_parallel_processing(threads: usize) {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            log::debug!("Thread pool already initialized: {}", e);
        }
        log::info!("Using {} CPU threads for processing", rayon::current_num_threads());
    }

    fn get_progress_counter() -> AtomicUsize {
        AtomicUsize::new(0)
    }

    /// Run `f` over every item on the pool. Each call succeeds or fails on its
    /// own; all results are collected in input order, nothing is cancelled.
    fn process_isolated<T, R, F>(items: &[T], label: &str, f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        let progress = Self::get_progress_counter();
        let total = items.len();

        items
            .par_iter()
            .map(|item| {
                let result = f(item);
                let processed = progress.fetch_add(1, Ordering::SeqCst) + 1;
                if processed % 100 == 0 || processed == total {
                    log::info!(
                        "{} progress: {}/{} ({:.1}%)",
                        label,
                        processed,
                        total,
                        (processed as f64 / total as f64) * 100.0
                    );
                }
                result
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Worker;
    impl ParallelProcessor for Worker {}

    #[test]
    fn keeps_order_and_isolates_failures() {
        let items: Vec<u32> = (0..50).collect();
        let results = Worker::process_isolated(&items, "test", |&n| {
            if n % 7 == 0 {
                Err(n)
            } else {
                Ok(n * 2)
            }
        });

        assert_eq!(results.len(), 50);
        assert_eq!(results[1], Ok(2));
        assert_eq!(results[7], Err(7));
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 8);
    }
}

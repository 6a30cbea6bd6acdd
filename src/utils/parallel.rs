use log::debug;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParallelError {
    #[error("Thread error: {0}")]
    ThreadError(String),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(usize),
}

/// Configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of threads to use
    pub threads: usize,

    /// Minimum number of items handed to one worker at a time
    pub chunk_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        ParallelConfig {
            threads: num_cpus::get(),
            chunk_size: 256,
        }
    }
}

impl ParallelConfig {
    /// Creates a configuration; `threads == 0` means all logical CPUs.
    pub fn new(threads: usize, chunk_size: usize) -> Self {
        ParallelConfig {
            threads: if threads == 0 { num_cpus::get() } else { threads },
            chunk_size,
        }
    }
}

/// Map every index in `0..len` in parallel and concatenate the per-index
/// outputs in index order.
pub fn parallel_flat_map<U, F>(len: usize, chunk_size: usize, f: F) -> Result<Vec<U>, ParallelError>
where
    U: Send,
    F: Fn(usize) -> Vec<U> + Send + Sync,
{
    if chunk_size == 0 {
        return Err(ParallelError::InvalidChunkSize(0));
    }
    debug!(
        "Processing {} items in parallel (chunk size {})",
        len, chunk_size
    );
    let per_item: Vec<Vec<U>> = (0..len)
        .into_par_iter()
        .with_min_len(chunk_size)
        .map(f)
        .collect();
    Ok(per_item.into_iter().flatten().collect())
}

/// Runs closures on a dedicated thread pool
pub struct ParallelExecutor {
    /// Thread pool
    pool: rayon::ThreadPool,

    /// Configuration
    config: ParallelConfig,
}

impl ParallelExecutor {
    /// Create a new parallel executor
    pub fn new(config: Option<ParallelConfig>) -> Result<Self, ParallelError> {
        let config = config.unwrap_or_default();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| {
                ParallelError::ThreadError(format!("Failed to build thread pool: {}", e))
            })?;

        Ok(ParallelExecutor { pool, config })
    }

    /// Execute a closure with this executor's pool as the rayon context
    pub fn install<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

use hpmc_core::{ErrorInfo, HpmcError};

/// Runs `job` inside a dedicated pool of `threads` workers, or on the global
/// rayon pool when `threads` is zero.
pub(crate) fn install<R, F>(threads: usize, job: F) -> Result<R, HpmcError>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if threads == 0 {
        return Ok(job());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|err| {
            HpmcError::Configuration(
                ErrorInfo::new("thread-pool", err.to_string()).with_context("threads", threads),
            )
        })?;
    Ok(pool.install(job))
}

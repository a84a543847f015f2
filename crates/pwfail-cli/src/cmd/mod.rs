pub mod error_for;
pub mod summary;

use std::future::Future;

pub enum Outcome {
    Completed,
    Cancelled,
}

/// Drive `fut` to completion unless Ctrl-C arrives first. On interrupt the
/// future is dropped, which kills any fetch subprocess it was waiting on.
pub fn run_until_interrupted<F, T>(fut: F) -> anyhow::Result<Option<T>>
where
    F: Future<Output = pwfail_core::Result<T>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        tokio::select! {
            res = fut => res.map(Some).map_err(anyhow::Error::from),
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted, abandoning pending fetch");
                Ok(None)
            }
        }
    })
}

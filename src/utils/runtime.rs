use anyhow::Result;

/// The daemon only runs a handful of tasks, so it doesn't need worker threads.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

///////////////////////////////
/// Resolve the thread count: as given, or all available cores
pub fn determine_thread_counts(total: Option<usize>) -> anyhow::Result<usize> {
    match total {
        Some(0) => anyhow::bail!("Cannot set number of threads to zero"),
        Some(total) => anyhow::Ok(total),
        None => {
            if let Ok(total) = std::thread::available_parallelism() {
                anyhow::Ok(total.get())
            } else {
                log::warn!("Could not autodetect the number of threads available. Setting to 1, but it is better if you specify");
                anyhow::Ok(1)
            }
        }
    }
}

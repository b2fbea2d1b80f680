use std::sync::LazyLock;

/// Thread pool for decoding tiles, kept apart from the tokio workers that download them.
pub static RENDER_POOL: LazyLock<rayon::ThreadPool> = LazyLock::new(|| {
  rayon::ThreadPoolBuilder::new()
    .thread_name(|i| format!("tile-decode-{i}"))
    .build()
    .expect("Failed to create tile decode pool")
});

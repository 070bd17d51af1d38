use tracing::trace;

// Trace-based counters; a metrics backend can subscribe on the
// `feed.metrics` target without the pipeline depending on one.

pub fn row_written(variation_id: u64) {
    trace!(
        target: "feed.metrics",
        variation_id,
        "rows_total_inc"
    );
}

pub fn shard_elapsed(shard: u32, elapsed_ms: u128) {
    trace!(
        target: "feed.metrics",
        shard,
        elapsed_ms = elapsed_ms as u64,
        "shard_elapsed"
    );
}

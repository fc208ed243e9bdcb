//! Database metrics collection.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::future::Future;
use std::time::Instant;

/// Record how long one operation store query took.
pub fn record_query_duration(query_name: &'static str, duration_secs: f64) {
    histogram!("database_query_duration_seconds", "query" => query_name).record(duration_secs);
}

/// Record connection pool gauges. Called periodically by the pool metrics job.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times a single query from construction until [`QueryTimer::record`].
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}

/// Awaits `query` and records its duration under `query_name`, success or not.
pub async fn timed<T, F>(query_name: &'static str, query: F) -> T
where
    F: Future<Output = T>,
{
    let timer = QueryTimer::new(query_name);
    let output = query.await;
    timer.record();
    output
}

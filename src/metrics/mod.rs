mod http;

use prometheus::{
    exponential_buckets, register_histogram, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge, Histogram, HistogramVec, IntCounter,
    IntCounterVec, IntGauge,
};

pub use self::http::PrometheusServer;
use lazy_static::lazy_static;

lazy_static! {
    pub static ref TOTAL_CONNECTION_PROCESSED: IntCounter = register_int_counter!(
        "rukv_total_connection_processed_total",
        "Total connection processed"
    )
    .unwrap();
    pub static ref CURRENT_CONNECTION_COUNTER: IntGauge = register_int_gauge!(
        "rukv_current_connections",
        "Current connection counter"
    )
    .unwrap();
    pub static ref REQUEST_COUNTER: IntCounter =
        register_int_counter!("rukv_requests_total", "Request counter").unwrap();
    pub static ref REQUEST_CMD_COUNTER: IntCounterVec = register_int_counter_vec!(
        "rukv_command_requests_total",
        "Request command counter",
        &["cmd"]
    )
    .unwrap();
    pub static ref REQUEST_CMD_ERROR_COUNTER: IntCounterVec = register_int_counter_vec!(
        "rukv_command_requests_error_total",
        "Request command error counter",
        &["cmd"]
    )
    .unwrap();
    pub static ref REQUEST_CMD_HANDLE_TIME: HistogramVec = register_histogram_vec!(
        "rukv_command_handle_time_duration_seconds",
        "Bucketed histogram of command handle duration",
        &["cmd"],
        exponential_buckets(0.0005, 2.0, 20).unwrap()
    )
    .unwrap();
    pub static ref REMOVED_EXPIRED_KEY_COUNTER: IntCounter = register_int_counter!(
        "rukv_removed_expired_keys_total",
        "The number of expired keys reclaimed by the periodic GC sweep"
    )
    .unwrap();
    pub static ref AOF_REWRITE_COUNTER: IntCounter =
        register_int_counter!("rukv_aof_rewrite_total", "AOF rewrite count").unwrap();
    pub static ref AOF_REWRITE_DURATION: Histogram = register_histogram!(
        "rukv_aof_rewrite_duration_seconds",
        "Bucketed histogram of AOF rewrite duration",
        exponential_buckets(0.01, 2.0, 16).unwrap()
    )
    .unwrap();
}

//! Prometheus metrics for the message bus

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static! {
    /// Total messages published
    pub static ref MESSAGE_PUBLISH_TOTAL: CounterVec = register_counter_vec!(
        "message_bus_publish_total",
        "Total messages published",
        &["topic", "status"]
    )
    .unwrap();

    /// Total messages received
    pub static ref MESSAGE_RECEIVE_TOTAL: CounterVec = register_counter_vec!(
        "message_bus_receive_total",
        "Total messages received",
        &["topic", "status"]
    )
    .unwrap();

    /// Message handling duration
    pub static ref MESSAGE_PROCESS_DURATION: HistogramVec = register_histogram_vec!(
        "message_bus_process_duration_seconds",
        "Message handling duration in seconds",
        &["topic"]
    )
    .unwrap();

    /// Messages routed to a dead-letter topic
    pub static ref MESSAGE_DLQ_TOTAL: CounterVec = register_counter_vec!(
        "message_bus_dlq_total",
        "Messages routed to a dead-letter topic",
        &["topic"]
    )
    .unwrap();
}

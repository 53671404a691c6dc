// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder these are no-ops.

use metrics::describe_counter;

/// Register all Orderlink metric descriptions.
pub fn register_metrics() {
    describe_counter!("orderlink_provision_total", "Group provisioning attempts by result");
    describe_counter!(
        "orderlink_soft_step_failures_total",
        "Soft provisioning step failures by step"
    );
    describe_counter!(
        "orderlink_fallback_tracked_total",
        "Substitute messages sent and recorded for cleanup"
    );
    describe_counter!(
        "orderlink_fallback_cleaned_total",
        "Tracked substitute messages removed after a join"
    );
    describe_counter!("orderlink_notify_total", "Notify calls by result code");
}

pub fn record_provision(result: &'static str) {
    metrics::counter!("orderlink_provision_total", "result" => result).increment(1);
}

pub fn record_soft_failure(step: &str) {
    metrics::counter!("orderlink_soft_step_failures_total", "step" => step.to_string())
        .increment(1);
}

pub fn record_fallback_tracked() {
    metrics::counter!("orderlink_fallback_tracked_total").increment(1);
}

pub fn record_fallback_cleaned() {
    metrics::counter!("orderlink_fallback_cleaned_total").increment(1);
}

pub fn record_notify(result_code: &'static str) {
    metrics::counter!("orderlink_notify_total", "result" => result_code).increment(1);
}

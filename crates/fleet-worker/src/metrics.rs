use std::time::Duration;

/// Per-iteration and per-check counters, via the `metrics` facade +
/// `metrics-exporter-prometheus`.
///
/// The teacher's `state_controller::metrics` module wires the same split
/// (common per-iteration counters plus a per-object-type specific set)
/// through `opentelemetry::metrics`; this crate uses the `metrics` crate
/// instead since that is the one the rest of this workspace's ambient
/// observability stack is built on.
pub fn record_iteration(num_validating: usize, num_provisioning: usize, errored: bool, elapsed: Duration) {
    metrics::counter!("fleet_worker_iterations_total").increment(1);
    if errored {
        metrics::counter!("fleet_worker_iteration_errors_total").increment(1);
    }
    metrics::gauge!("fleet_worker_iteration_validating_count").set(num_validating as f64);
    metrics::gauge!("fleet_worker_iteration_provisioning_count").set(num_provisioning as f64);
    metrics::histogram!("fleet_worker_iteration_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_check_validated(result: &Result<(), fleet_model::FleetError>) {
    metrics::counter!("fleet_worker_check_validated_total").increment(1);
    if result.is_err() {
        metrics::counter!("fleet_worker_check_validated_errors_total").increment(1);
    }
}

pub fn record_check_provisioned(result: &Result<(), fleet_model::FleetError>) {
    metrics::counter!("fleet_worker_check_provisioned_total").increment(1);
    if result.is_err() {
        metrics::counter!("fleet_worker_check_provisioned_errors_total").increment(1);
    }
}

/// Installs the Prometheus exporter and returns the bound `/metrics`
/// handle the HTTP endpoint serves text from.
pub fn install_exporter(
    listen: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
}

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Installs the Prometheus recorder once per process and registers the
    /// service counters with descriptions.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    metrics::describe_counter!("notes_generated_total", "Successful note generations");
    metrics::describe_counter!("notes_saved_total", "Generated notes persisted");
    metrics::describe_counter!(
        "notes_unsaved_total",
        "Generated notes returned without persistence"
    );
    metrics::describe_counter!(
        "subject_override_total",
        "Subject changed by keyword evidence, by stage"
    );
    metrics::describe_counter!("language_retry_total", "Language detection retries");
    metrics::describe_counter!("ai_call_failures_total", "Failed model calls, by purpose");
}

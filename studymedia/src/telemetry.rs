//! Tracing setup: a console subscriber, plus optional OTLP span export.
//!
//! OTLP export is off unless `enable_otel_export` is set. The exporter then reads the standard
//! OpenTelemetry environment variables:
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4318`)
//! - `OTEL_EXPORTER_OTLP_PROTOCOL`: `http/protobuf` (default) or `http/json`
//! - `OTEL_EXPORTER_OTLP_HEADERS`: comma-separated `key=value` pairs, `%20` decoded to a space
//! - `OTEL_SERVICE_NAME` (default `studymedia`)
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_SERVICE_NAME: &str = "studymedia";

/// Kept so pending spans can be flushed on shutdown; `tracing-opentelemetry` only holds the tracer.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global subscriber. Falls back to console-only logging if the exporter cannot be
/// built.
pub fn init_telemetry(enable_otel_export: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer());

    if !enable_otel_export {
        registry.try_init()?;
        info!("Telemetry initialized (OTLP export disabled)");
        return Ok(());
    }

    match create_otlp_tracer() {
        Ok(tracer) => {
            registry.with(tracing_opentelemetry::layer().with_tracer(tracer)).try_init()?;
            info!("Telemetry initialized with OTLP export enabled");
        }
        Err(e) => {
            registry.try_init()?;
            info!("Telemetry initialized without OTLP export: {}", e);
        }
    }

    Ok(())
}

/// Parse `OTEL_EXPORTER_OTLP_HEADERS`-style `k=v,k2=v2` pairs. Entries without `=` are dropped.
fn parse_otlp_headers(raw: &str) -> HashMap<String, String> {
    raw.replace("%20", " ")
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn otlp_protocol(raw: Option<&str>) -> Protocol {
    match raw {
        Some("http/json") => Protocol::HttpJson,
        _ => Protocol::HttpBinary,
    }
}

fn create_otlp_tracer() -> anyhow::Result<opentelemetry_sdk::trace::Tracer> {
    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|_| "http://localhost:4318".to_string());
    let headers = std::env::var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| parse_otlp_headers(&raw))
        .unwrap_or_default();
    let protocol = otlp_protocol(std::env::var("OTEL_EXPORTER_OTLP_PROTOCOL").ok().as_deref());

    // The subscriber is not installed yet
    eprintln!(
        "[OTLP] service={} endpoint={} headers={}",
        service_name,
        endpoint,
        headers.len()
    );

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(&endpoint)
        .with_protocol(protocol)
        .with_headers(headers)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_attribute(KeyValue::new("service.name", service_name.clone()))
                .build(),
        )
        .build();

    let tracer = tracer_provider.tracer(service_name);
    let _ = TRACER_PROVIDER.set(tracer_provider);

    Ok(tracer)
}

/// Flush and stop the OTLP exporter, if one was started.
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::error!("Failed to shutdown tracer provider: {}", e);
    }
}

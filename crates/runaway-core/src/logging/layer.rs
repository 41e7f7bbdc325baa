//! Custom tracing layer for JSONL output.
//!
//! This layer produces machine-parseable JSONL logs on stderr while
//! keeping stdout clean for the check payload. Correlation fields
//! (`event`, `run_id`, `host_id`, `stage`, `pid`) are lifted to the top level
//! whether they come from an enclosing span or from the event itself; every
//! other field lands under `fields`.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::Level;

/// Correlation fields, from a span or an event.
#[derive(Debug, Clone, Default)]
struct Correlation {
    event: Option<String>,
    run_id: Option<String>,
    host_id: Option<String>,
    stage: Option<String>,
    pid: Option<u32>,
}

impl Correlation {
    /// Take `key` if it is a correlation field; returns false otherwise.
    fn absorb_str(&mut self, key: &str, value: String) -> bool {
        let slot = match key {
            "event" => &mut self.event,
            "run_id" => &mut self.run_id,
            "host_id" => &mut self.host_id,
            "stage" => &mut self.stage,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    fn absorb_pid(&mut self, key: &str, value: i128) -> bool {
        if key != "pid" {
            return false;
        }
        if let Ok(pid) = u32::try_from(value) {
            self.pid = Some(pid);
        }
        true
    }

    /// Fill unset fields from an outer scope.
    fn inherit(&mut self, outer: &Correlation) {
        if self.event.is_none() {
            self.event.clone_from(&outer.event);
        }
        if self.run_id.is_none() {
            self.run_id.clone_from(&outer.run_id);
        }
        if self.host_id.is_none() {
            self.host_id.clone_from(&outer.host_id);
        }
        if self.stage.is_none() {
            self.stage.clone_from(&outer.stage);
        }
        if self.pid.is_none() {
            self.pid = outer.pid;
        }
    }
}

/// Extracts field values from tracing events and spans.
#[derive(Default)]
struct JsonFieldVisitor {
    correlation: Correlation,
    fields: serde_json::Map<String, serde_json::Value>,
    message: Option<String>,
}

impl Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else if !self.correlation.absorb_str(field.name(), value.to_string()) {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(s);
        } else if !self.correlation.absorb_str(field.name(), s.clone()) {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::String(s));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if !self.correlation.absorb_pid(field.name(), value.into()) {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::Number(value.into()),
            );
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if !self.correlation.absorb_pid(field.name(), value.into()) {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::Number(value.into()),
            );
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

/// JSONL tracing layer that outputs to stderr.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    /// Create a new JSONL layer writing to stderr.
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Create a new JSONL layer with a custom writer.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = JsonFieldVisitor::default();
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(visitor.correlation);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let ts = Utc::now();

        let mut visitor = JsonFieldVisitor::default();
        event.record(&mut visitor);

        let mut correlation = visitor.correlation;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(outer) = span.extensions().get::<Correlation>() {
                    correlation.inherit(outer);
                }
            }
        }

        let level: Level = (*event.metadata().level()).into();
        let event_name = correlation
            .event
            .unwrap_or_else(|| event.metadata().target().to_string());

        let mut obj = serde_json::Map::new();
        obj.insert("ts".to_string(), serde_json::json!(ts.to_rfc3339()));
        obj.insert("level".to_string(), serde_json::json!(level));
        obj.insert("event".to_string(), serde_json::json!(event_name));

        if let Some(id) = correlation.run_id {
            obj.insert("run_id".to_string(), serde_json::json!(id));
        }
        if let Some(id) = correlation.host_id {
            obj.insert("host_id".to_string(), serde_json::json!(id));
        }
        if let Some(s) = correlation.stage {
            obj.insert("stage".to_string(), serde_json::json!(s));
        }
        if let Some(msg) = visitor.message {
            obj.insert("message".to_string(), serde_json::json!(msg));
        }
        if let Some(p) = correlation.pid {
            obj.insert("pid".to_string(), serde_json::json!(p));
        }
        if !visitor.fields.is_empty() {
            obj.insert(
                "fields".to_string(),
                serde_json::Value::Object(visitor.fields),
            );
        }

        let json = serde_json::to_string(&serde_json::Value::Object(obj)).unwrap_or_default();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{event_names, LogContext, Stage};
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    struct BufWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for BufWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<serde_json::Value> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = JsonlLayer::new(BufWriter(buffer.clone()));
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);

        let output = buffer.lock().unwrap();
        String::from_utf8_lossy(&output)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn plain_event_uses_target_as_name() {
        let lines = capture(|| {
            tracing::warn!(target: "test.warn", message = "danger");
        });
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "warn");
        assert_eq!(lines[0]["event"], "test.warn");
        assert_eq!(lines[0]["message"], "danger");
        assert!(lines[0]["ts"].is_string());
    }

    #[test]
    fn extra_fields_are_nested() {
        let lines = capture(|| {
            tracing::info!(count = 42, active = true, ratio = 0.5, message = "hi");
        });
        assert_eq!(lines[0]["fields"]["count"], 42);
        assert_eq!(lines[0]["fields"]["active"], true);
        assert_eq!(lines[0]["fields"]["ratio"], 0.5);
    }

    #[test]
    fn log_event_fields_are_lifted() {
        let ctx = LogContext::new("run-abc", "host-xyz");
        let lines = capture(|| {
            crate::log_event!(
                ctx,
                INFO,
                event_names::SCAN_PROC_SCORED,
                Stage::Scan,
                "scored",
                pid = 4242u32,
                badness = 0.75
            );
        });
        let line = &lines[0];
        assert_eq!(line["event"], "scan.proc_scored");
        assert_eq!(line["run_id"], "run-abc");
        assert_eq!(line["host_id"], "host-xyz");
        assert_eq!(line["stage"], "scan");
        assert_eq!(line["pid"], 4242);
        assert_eq!(line["fields"]["badness"], 0.75);
        assert!(line["fields"].get("pid").is_none());
    }

    #[test]
    fn span_context_is_inherited() {
        let lines = capture(|| {
            let span = tracing::info_span!("check", run_id = "run-span", pid = 7u32);
            let _guard = span.enter();
            tracing::info!(message = "inside");
        });
        assert_eq!(lines[0]["run_id"], "run-span");
        assert_eq!(lines[0]["pid"], 7);
    }

    #[test]
    fn event_fields_win_over_span() {
        let lines = capture(|| {
            let span = tracing::info_span!("outer", run_id = "run-outer");
            let _guard = span.enter();
            tracing::info!(run_id = "run-inner", message = "x");
        });
        assert_eq!(lines[0]["run_id"], "run-inner");
    }
}

use crate::diagnostics;
use crate::dispatcher::DispatcherHandle;
use crate::event::{ExceptionInfo, Level, LogEvent, PropertyValue, Scalar};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Property carrying the event's target.
pub const SOURCE_CONTEXT_PROPERTY: &str = "SourceContext";

/// Targets ignored unless configured otherwise: the sink's own diagnostics
/// and the HTTP stack it ships through.
pub const DEFAULT_IGNORED_TARGETS: &[&str] =
    &[diagnostics::TARGET, "hyper", "h2", "reqwest", "rustls"];

/// Filtering applied by [`LogzioLayer`] before an event is queued.
#[derive(Clone, Debug)]
pub struct LayerOptions {
    /// Least verbose level still shipped. Defaults to `TRACE` (everything).
    pub min_level: tracing::Level,
    /// Events whose target equals one of these, or lives in a module under
    /// one of them, are skipped.
    pub ignored_targets: Vec<String>,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            min_level: tracing::Level::TRACE,
            ignored_targets: DEFAULT_IGNORED_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// `tracing_subscriber` layer that turns events into [`LogEvent`]s and hands
/// them to a running dispatcher.
///
/// `on_event` only converts and enqueues; formatting and network I/O happen
/// on the dispatcher task.
pub struct LogzioLayer {
    dispatcher: DispatcherHandle,
    options: LayerOptions,
    /// Total events seen by the layer (before filtering).
    pub total_events: Arc<AtomicU64>,
}

impl LogzioLayer {
    pub fn new(dispatcher: DispatcherHandle, options: LayerOptions) -> Self {
        Self {
            dispatcher,
            options,
            total_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn dispatcher(&self) -> &DispatcherHandle {
        &self.dispatcher
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.options.ignored_targets.iter().any(|prefix| {
            target == prefix
                || (target.starts_with(prefix.as_str()) && target[prefix.len()..].starts_with("::"))
        })
    }
}

impl<S> Layer<S> for LogzioLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        // `tracing` orders levels by verbosity: TRACE > DEBUG > ... > ERROR.
        if *meta.level() > self.options.min_level || self.is_ignored(meta.target()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let message = visitor.message.unwrap_or_default();
        let mut log_event = LogEvent::new(Level::from(meta.level()), message);
        log_event.exception = visitor.exception;
        log_event.properties = visitor.properties;
        log_event
            .properties
            .push((SOURCE_CONTEXT_PROPERTY.to_string(), meta.target().into()));

        if let Some(scope) = ctx.event_scope(event) {
            let mut spans = scope.from_root();
            if let Some(root) = spans.next() {
                let leaf = spans.last().map(|span| span.id()).unwrap_or_else(|| root.id());
                log_event = log_event.with_trace(
                    format!("{:016x}", root.id().into_u64()),
                    format!("{:016x}", leaf.into_u64()),
                );
            }
        }

        self.dispatcher.enqueue(log_event);
    }
}

/// Collects the fields of one event.
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    exception: Option<ExceptionInfo>,
    properties: Vec<(String, PropertyValue)>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: Scalar) {
        self.properties.push((field.name().to_string(), PropertyValue::Scalar(value)));
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field, Scalar::Str(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Scalar::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Scalar::U64(value));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        match i64::try_from(value) {
            Ok(v) => self.push(field, Scalar::I64(v)),
            Err(_) => self.push(field, Scalar::Str(value.to_string())),
        }
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        match u64::try_from(value) {
            Ok(v) => self.push(field, Scalar::U64(v)),
            Err(_) => self.push(field, Scalar::Str(value.to_string())),
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Scalar::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Scalar::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.exception.is_none() {
            self.exception = Some(ExceptionInfo::from_error(value));
        } else {
            self.push(field, Scalar::Str(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, Scalar::Other(format!("{:?}", value)));
        }
    }
}

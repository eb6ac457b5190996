use crate::diagnostics;
use crate::error::DropReason;
use crate::event::{ExceptionInfo, LogEvent};
use crate::flatten::flatten;
use crate::naming::{default_rename_table, FieldNaming, FieldTransform};
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

/// Default per-event size limit: 255 KiB.
pub const DEFAULT_EVENT_SIZE_LIMIT_BYTES: usize = 255 * 1024;

/// Trace and span id fields are emitted under these names whatever the
/// naming convention.
const TRACE_ID_FIELD: &str = "traceId";
const SPAN_ID_FIELD: &str = "spanId";

const PROPERTIES_PREFIX: &str = "properties.";

/// How events are turned into JSON documents.
///
/// | option | default | effect |
/// |---|---|---|
/// | `naming` | `CamelCase` | convention applied to generated field names |
/// | `boost_properties` | `false` | drop the `properties.` prefix |
/// | `include_message_template` | `false` | add the raw template |
/// | `lowercase_level` | `true` | `"warning"` instead of `"Warning"` |
/// | `rename_table` | `SourceContext→logger`, `ThreadId→thread` | literal field names per key |
/// | `event_size_limit_bytes` | 255 KiB | larger documents are dropped; `None` disables |
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormattingOptions {
    pub naming: FieldNaming,
    pub boost_properties: bool,
    pub include_message_template: bool,
    pub lowercase_level: bool,
    pub rename_table: HashMap<String, String>,
    pub event_size_limit_bytes: Option<usize>,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            naming: FieldNaming::CamelCase,
            boost_properties: false,
            include_message_template: false,
            lowercase_level: true,
            rename_table: default_rename_table(),
            event_size_limit_bytes: Some(DEFAULT_EVENT_SIZE_LIMIT_BYTES),
        }
    }
}

/// Turns [`LogEvent`]s into single-line Logz.io JSON documents.
///
/// Built once from [`FormattingOptions`]; holds no mutable state, so the
/// same event always formats to the same bytes.
#[derive(Debug, Clone)]
pub struct EventFormatter {
    options: FormattingOptions,
    fields: FieldTransform,
    level_field: String,
    exception_field: String,
    template_field: String,
}

impl EventFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        let fields = FieldTransform::new(options.naming, options.rename_table.clone());
        EventFormatter {
            level_field: fields.resolve("Level"),
            exception_field: fields.resolve("Exception"),
            template_field: fields.resolve("MessageTemplate"),
            fields,
            options,
        }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Format one event, or say why it has to be dropped.
    pub fn format(&self, event: &LogEvent) -> Result<String, DropReason> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.format_unchecked(event))) {
            Ok(result) => result,
            Err(payload) => Err(DropReason::Panicked(panic_message(payload.as_ref()))),
        }
    }

    /// Write the document followed by a newline. Dropped events write
    /// nothing and are reported on the diagnostics target.
    pub fn write_line<W: Write>(&self, event: &LogEvent, output: &mut W) -> io::Result<()> {
        match self.format(event) {
            Ok(json) => {
                output.write_all(json.as_bytes())?;
                output.write_all(b"\n")
            }
            Err(reason) => {
                report_drop(event, &reason);
                Ok(())
            }
        }
    }

    fn format_unchecked(&self, event: &LogEvent) -> Result<String, DropReason> {
        let document = self.document(event);
        let json = serde_json::to_string(&Value::Object(document))
            .map_err(|e| DropReason::Serialization(e.to_string()))?;

        if let Some(limit) = self.options.event_size_limit_bytes {
            if limit > 0 && json.len() > limit {
                return Err(DropReason::Oversized { size: json.len(), limit });
            }
        }
        Ok(json)
    }

    fn document(&self, event: &LogEvent) -> Map<String, Value> {
        let level = if self.options.lowercase_level {
            event.level.name().to_lowercase()
        } else {
            event.level.name().to_string()
        };

        let mut doc = Map::new();
        doc.insert(
            "@timestamp".to_string(),
            Value::String(event.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, false)),
        );
        doc.insert("message".to_string(), Value::String(event.message.clone()));
        doc.insert(self.level_field.clone(), Value::String(level));

        if let Some(exception) = &event.exception {
            doc.insert(self.exception_field.clone(), exception_value(exception));
        }
        if self.options.include_message_template {
            doc.insert(
                self.template_field.clone(),
                Value::String(event.message_template.clone()),
            );
        }
        if let Some(trace_id) = &event.trace_id {
            doc.insert(TRACE_ID_FIELD.to_string(), Value::String(trace_id.clone()));
        }
        if let Some(span_id) = &event.span_id {
            doc.insert(SPAN_ID_FIELD.to_string(), Value::String(span_id.clone()));
        }

        for (key, value) in &event.properties {
            doc.insert(self.property_field(key), flatten(value));
        }
        doc
    }

    fn property_field(&self, key: &str) -> String {
        if let Some(name) = self.fields.rename(key) {
            return name.to_string();
        }
        if self.options.boost_properties {
            self.fields.transform(key)
        } else {
            self.fields.transform(&format!("{PROPERTIES_PREFIX}{key}"))
        }
    }
}

/// Serialize an exception, skipping members that fail to read.
fn exception_value(exception: &ExceptionInfo) -> Value {
    let mut obj = Map::new();
    if let Some(type_name) = &exception.type_name {
        obj.insert("Type".to_string(), Value::String(type_name.clone()));
    }
    obj.insert("Message".to_string(), Value::String(exception.message.clone()));
    if let Some(stack_trace) = &exception.stack_trace {
        obj.insert("StackTrace".to_string(), Value::String(stack_trace.clone()));
    }
    if let Some(inner) = &exception.inner {
        obj.insert("InnerException".to_string(), exception_value(inner));
    }

    for (name, value) in exception.properties() {
        match value {
            Ok(value) => {
                obj.insert(name.to_string(), flatten(&value));
            }
            Err(err) => {
                tracing::warn!(
                    target: diagnostics::TARGET,
                    member = name,
                    exception_type = exception.type_name.as_deref().unwrap_or("<unknown>"),
                    error = %err,
                    "failed to serialize exception member, omitting it"
                );
            }
        }
    }
    Value::Object(obj)
}

/// Emit the diagnostic for an event that will not be shipped.
pub(crate) fn report_drop(event: &LogEvent, reason: &DropReason) {
    tracing::warn!(
        target: diagnostics::TARGET,
        timestamp = %event.timestamp.to_rfc3339(),
        template = %diagnostics::excerpt(&event.message_template),
        reason = %reason,
        "log event could not be formatted and will be dropped"
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Level, PropertyAccessError, PropertyValue, Scalar};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn parse(json: &str) -> Map<String, Value> {
        match serde_json::from_str::<Value>(json).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn format_with(options: FormattingOptions, event: &LogEvent) -> Map<String, Value> {
        parse(&EventFormatter::new(options).format(event).unwrap())
    }

    #[test]
    fn fixed_fields_are_always_present() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 8, 7, 6).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let event =
            LogEvent::new(Level::Information, "This a Information Log Trace").with_timestamp(ts);

        let doc = format_with(FormattingOptions::default(), &event);

        let stamp = doc["@timestamp"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(stamp).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), ts);
        assert_eq!(doc["message"], json!("This a Information Log Trace"));
        assert_eq!(doc["level"], json!("information"));
        assert!(!doc.contains_key("exception"));
        assert!(!doc.contains_key("messageTemplate"));
        assert!(!doc.contains_key("traceId"));
    }

    #[test]
    fn level_case_follows_options() {
        let event = LogEvent::new(Level::Warning, "Test");
        let options = FormattingOptions {
            lowercase_level: false,
            ..Default::default()
        };
        assert_eq!(format_with(options, &event)["level"], json!("Warning"));

        let options = FormattingOptions {
            naming: FieldNaming::AsIs,
            ..Default::default()
        };
        let doc = format_with(options, &event);
        assert_eq!(doc["Level"], json!("warning"));
        assert!(!doc.contains_key("level"));
    }

    #[test]
    fn properties_are_prefixed_unless_boosted() {
        let event = LogEvent::new(Level::Warning, "Test")
            .with_property("PropInt1", 42i64)
            .with_property("EnrichedProperty", "banana")
            .with_property("SourceContext", "app::orders");

        let doc = format_with(FormattingOptions::default(), &event);
        assert_eq!(doc["properties.PropInt1"], json!(42));
        assert_eq!(doc["properties.EnrichedProperty"], json!("banana"));
        assert_eq!(doc["logger"], json!("app::orders"));
        assert_eq!(doc["level"], json!("warning"));
        assert_eq!(doc["message"], json!("Test"));

        let boosted = FormattingOptions {
            boost_properties: true,
            ..Default::default()
        };
        let doc = format_with(boosted, &event);
        assert_eq!(doc["propInt1"], json!(42));
        assert_eq!(doc["enrichedProperty"], json!("banana"));
        assert_eq!(doc["logger"], json!("app::orders"));
        assert!(!doc.contains_key("properties.PropInt1"));
    }

    #[test]
    fn nested_property_values_are_flattened() {
        let event = LogEvent::new(Level::Warning, "Test")
            .with_property("PropArr1", vec![1i64, 2, 3])
            .with_property("PropNull1", Scalar::Null)
            .with_property("PropEnum1", Scalar::Enum("Utc".into()))
            .with_property(
                "PropDic1",
                PropertyValue::Mapping(vec![(Scalar::Str("apple".into()), 5i64.into())]),
            );

        let doc = format_with(FormattingOptions::default(), &event);
        assert_eq!(doc["properties.PropArr1"], json!([1, 2, 3]));
        assert_eq!(doc["properties.PropNull1"], Value::Null);
        assert_eq!(doc["properties.PropEnum1"], json!("Utc"));
        assert_eq!(doc["properties.PropDic1"], json!({"apple": 5}));
    }

    #[test]
    fn last_write_wins_on_collision() {
        let event = LogEvent::new(Level::Information, "original")
            .with_property("message", "overridden")
            .with_property("Dup", 1i64)
            .with_property("Dup", 2i64);
        let options = FormattingOptions {
            boost_properties: true,
            ..Default::default()
        };
        let doc = format_with(options, &event);
        assert_eq!(doc["message"], json!("overridden"));
        assert_eq!(doc["dup"], json!(2));
    }

    #[test]
    fn message_template_and_trace_ids() {
        let event = LogEvent::new(Level::Information, "Hello pear")
            .with_template("Hello {Fruit}")
            .with_trace("00000000000000a1", "00000000000000b2");
        let options = FormattingOptions {
            include_message_template: true,
            ..Default::default()
        };
        let doc = format_with(options, &event);
        assert_eq!(doc["messageTemplate"], json!("Hello {Fruit}"));
        assert_eq!(doc["traceId"], json!("00000000000000a1"));
        assert_eq!(doc["spanId"], json!("00000000000000b2"));
    }

    #[test]
    fn trace_ids_ignore_the_naming_convention() {
        let event = LogEvent::new(Level::Information, "traced").with_trace("01", "02");
        let options = FormattingOptions {
            naming: FieldNaming::AsIs,
            ..Default::default()
        };
        let doc = format_with(options, &event);
        assert_eq!(doc["Level"], json!("information"));
        assert_eq!(doc["traceId"], json!("01"));
        assert_eq!(doc["spanId"], json!("02"));
        assert!(!doc.contains_key("TraceId"));
    }

    #[test]
    fn formatting_is_idempotent() {
        let event = LogEvent::new(Level::Error, "same")
            .with_property("A", 1i64)
            .with_property("B", vec!["x", "y"])
            .with_exception(ExceptionInfo::new("boom").with_value("Code", 3i64));
        let formatter = EventFormatter::new(FormattingOptions::default());
        assert_eq!(formatter.format(&event).unwrap(), formatter.format(&event).unwrap());
    }

    #[test]
    fn oversized_events_are_dropped() {
        let event = LogEvent::new(Level::Information, "x".repeat(200));
        let options = FormattingOptions {
            event_size_limit_bytes: Some(100),
            ..Default::default()
        };
        let formatter = EventFormatter::new(options);
        match formatter.format(&event) {
            Err(DropReason::Oversized { size, limit }) => {
                assert!(size > 100);
                assert_eq!(limit, 100);
            }
            other => panic!("expected oversized drop, got {other:?}"),
        }

        let unlimited = FormattingOptions {
            event_size_limit_bytes: None,
            ..Default::default()
        };
        assert!(EventFormatter::new(unlimited).format(&event).is_ok());
    }

    #[test]
    fn failing_exception_member_is_omitted() {
        let exception =
            ExceptionInfo::new("Exception of type 'ExceptionWithThrowingProperty' was thrown.")
            .with_type_name("ExceptionWithThrowingProperty")
            .with_value("StringProperty", "I'm OK.")
            .with_property("ThrowingProperty", || {
                Err(PropertyAccessError("throws to test JSON serialization".into()))
            })
            .with_inner(ExceptionInfo::new("root cause"));
        let event = LogEvent::new(Level::Error, "Error message").with_exception(exception);

        let doc = format_with(FormattingOptions::default(), &event);
        let ex = doc["exception"].as_object().unwrap();
        assert_eq!(
            ex["Message"],
            json!("Exception of type 'ExceptionWithThrowingProperty' was thrown.")
        );
        assert_eq!(ex["StringProperty"], json!("I'm OK."));
        assert_eq!(ex["InnerException"]["Message"], json!("root cause"));
        assert!(!ex.contains_key("ThrowingProperty"));
        assert!(!ex.contains_key("StackTrace"));
        assert_eq!(doc["message"], json!("Error message"));
        assert!(doc.contains_key("@timestamp"));
    }

    #[test]
    fn panicking_getter_drops_only_that_event() {
        let exception =
            ExceptionInfo::new("boom").with_property("Bad", || panic!("getter exploded"));
        let bad = LogEvent::new(Level::Error, "bad").with_exception(exception);
        let good = LogEvent::new(Level::Information, "good");

        let formatter = EventFormatter::new(FormattingOptions::default());
        match formatter.format(&bad) {
            Err(DropReason::Panicked(msg)) => assert!(msg.contains("getter exploded")),
            other => panic!("expected panic drop, got {other:?}"),
        }
        assert!(formatter.format(&good).is_ok());
    }

    #[test]
    fn write_line_appends_newline_and_skips_drops() {
        let options = FormattingOptions {
            event_size_limit_bytes: Some(120),
            ..Default::default()
        };
        let formatter = EventFormatter::new(options);
        let mut out = Vec::new();
        formatter.write_line(&LogEvent::new(Level::Debug, "short"), &mut out).unwrap();
        formatter
            .write_line(&LogEvent::new(Level::Debug, "y".repeat(500)), &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.ends_with('\n'));
        assert_eq!(parse(text.trim_end())["message"], json!("short"));
    }
}

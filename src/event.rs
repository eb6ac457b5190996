use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Severity of a [`LogEvent`].
///
/// Names follow the Logz.io convention used by the listener dashboards
/// (`Information`, `Warning`, ...), not the short `tracing` spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub fn name(self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level::Verbose,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Information,
            tracing::Level::WARN => Level::Warning,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Leaf value carried by a [`PropertyValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    /// Enumerated constant, emitted as its label.
    Enum(String),
    Timestamp(DateTime<Utc>),
    /// Value only known through its textual representation.
    Other(String),
}

impl Scalar {
    /// Textual form used when the scalar is a mapping key.
    pub fn to_key(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::I64(n) => n.to_string(),
            Scalar::U64(n) => n.to_string(),
            Scalar::F64(n) => n.to_string(),
            Scalar::Str(s) | Scalar::Enum(s) | Scalar::Other(s) => s.clone(),
            Scalar::Timestamp(ts) => ts.to_rfc3339(),
        }
    }
}

/// Structured property value attached to a [`LogEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(Scalar),
    Sequence(Vec<PropertyValue>),
    Mapping(Vec<(Scalar, PropertyValue)>),
    /// Named-property bag, e.g. a destructured object.
    Structure(Vec<(String, PropertyValue)>),
}

impl From<Scalar> for PropertyValue {
    fn from(value: Scalar) -> Self {
        PropertyValue::Scalar(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Scalar(Scalar::Str(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Scalar(Scalar::I64(value))
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Scalar(Scalar::I64(value as i64))
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Scalar(Scalar::U64(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Scalar(Scalar::F64(value))
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(values: Vec<T>) -> Self {
        PropertyValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// Error returned by an exception property getter.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{0}")]
pub struct PropertyAccessError(pub String);

type PropertyGetter = Arc<dyn Fn() -> Result<PropertyValue, PropertyAccessError> + Send + Sync>;

/// Exception attached to an event.
///
/// Extra properties are read lazily through getters so that a property
/// failing on access only costs that member, not the whole event.
#[derive(Clone)]
pub struct ExceptionInfo {
    pub type_name: Option<String>,
    pub message: String,
    pub stack_trace: Option<String>,
    pub inner: Option<Box<ExceptionInfo>>,
    properties: Vec<(String, PropertyGetter)>,
}

impl ExceptionInfo {
    pub fn new(message: impl Into<String>) -> Self {
        ExceptionInfo {
            type_name: None,
            message: message.into(),
            stack_trace: None,
            inner: None,
            properties: Vec::new(),
        }
    }

    /// Capture an error and its `source()` chain.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut info = ExceptionInfo::new(err.to_string());
        if let Some(source) = err.source() {
            info.inner = Some(Box::new(ExceptionInfo::from_error(source)));
        }
        info
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_inner(mut self, inner: ExceptionInfo) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Attach a property whose value is computed when the event is formatted.
    pub fn with_property<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn() -> Result<PropertyValue, PropertyAccessError> + Send + Sync + 'static,
    {
        self.properties.push((name.into(), Arc::new(getter)));
        self
    }

    pub fn with_value(self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        let value = value.into();
        self.with_property(name, move || Ok(value.clone()))
    }

    pub(crate) fn properties(
        &self,
    ) -> impl Iterator<Item = (&str, Result<PropertyValue, PropertyAccessError>)> {
        self.properties
            .iter()
            .map(|(name, getter)| (name.as_str(), getter()))
    }
}

impl fmt::Debug for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionInfo")
            .field("type_name", &self.type_name)
            .field("message", &self.message)
            .field("stack_trace", &self.stack_trace)
            .field("inner", &self.inner)
            .field(
                "properties",
                &self.properties.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A single structured log event as seen by the sink.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub message_template: String,
    pub exception: Option<ExceptionInfo>,
    pub properties: Vec<(String, PropertyValue)>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

impl LogEvent {
    /// Event stamped with the current time whose template equals its message.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        let message = message.into();
        LogEvent {
            timestamp: Utc::now(),
            level,
            message_template: message.clone(),
            message,
            exception: None,
            properties: Vec::new(),
            trace_id: None,
            span_id: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = template.into();
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    pub fn with_trace(mut self, trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self.span_id = Some(span_id.into());
        self
    }
}

//! Assembly of formatted documents into one bulk payload.
//!
//! The Logz.io bulk listener accepts a sequence of independent JSON objects
//! separated by `,\n`, without enclosing brackets.

use crate::diagnostics;

/// Default size limit for a single document inside a batch: 256 KiB.
pub const DEFAULT_DOCUMENT_LIMIT_BYTES: usize = 256 * 1024;

const DELIMITER: &str = ",\n";

/// Result of [`BatchAccumulator::assemble`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledBatch {
    pub payload: String,
    pub included: usize,
    pub dropped: usize,
}

impl AssembledBatch {
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BatchAccumulator {
    document_limit_bytes: Option<usize>,
    rename_rendered_message: bool,
}

impl Default for BatchAccumulator {
    fn default() -> Self {
        BatchAccumulator::new(Some(DEFAULT_DOCUMENT_LIMIT_BYTES))
    }
}

impl BatchAccumulator {
    pub fn new(document_limit_bytes: Option<usize>) -> Self {
        BatchAccumulator {
            document_limit_bytes,
            rename_rendered_message: false,
        }
    }

    /// Rewrite `"RenderedMessage"` keys to `"message"` so documents from
    /// formatters that use the former still show up in the Logz.io UI.
    pub fn rename_rendered_message(mut self, enabled: bool) -> Self {
        self.rename_rendered_message = enabled;
        self
    }

    /// Join documents into one payload, skipping blanks and dropping
    /// documents over the limit.
    pub fn assemble<I, S>(&self, documents: I) -> AssembledBatch
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = AssembledBatch::default();

        for document in documents {
            let document = document.as_ref();
            if document.trim().is_empty() {
                continue;
            }

            let renamed;
            let document = if self.rename_rendered_message {
                renamed = document.replace("\"RenderedMessage\"", "\"message\"");
                renamed.as_str()
            } else {
                document
            };

            if let Some(limit) = self.document_limit_bytes {
                if document.len() > limit {
                    tracing::warn!(
                        target: diagnostics::TARGET,
                        limit,
                        size = document.len(),
                        data = %diagnostics::excerpt(document),
                        "event JSON representation exceeds the byte size limit set for this \
                         sink and will be dropped"
                    );
                    batch.dropped += 1;
                    continue;
                }
            }

            if batch.included > 0 {
                batch.payload.push_str(DELIMITER);
            }
            batch.payload.push_str(document);
            batch.included += 1;
        }

        batch
    }
}

use thiserror::Error;

/// Failures the detection core can report.
///
/// Per-frame failures (`DecodeMalformedInput`, `TransportWriteFailure`) are isolated to the
/// frame that produced them. `ConfigurationMissing` is raised at startup and is fatal.
#[derive(Debug, Error)]
pub enum SentryError {
    #[error("output tensor {tensor} has {columns} columns, expected {expected}")]
    DecodeMalformedInput {
        tensor: usize,
        columns: usize,
        expected: String,
    },

    #[error("bus write incomplete: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("bus write failed: {0}")]
    TransportWriteFailure(#[from] std::io::Error),

    #[error("configuration missing or invalid: {0}")]
    ConfigurationMissing(String),
}

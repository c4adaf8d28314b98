use thiserror::Error;

/// Errors raised while parsing a chart request or drawing it
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("{0}")]
    Usage(String),
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Image encoding failed: {0}")]
    Encoding(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChartError {
    /// Invocation problems end the process with a non-zero status;
    /// everything else is drawn into an error image instead.
    pub fn is_invocation_error(&self) -> bool {
        matches!(
            self,
            ChartError::Usage(_)
                | ChartError::InvalidJson(_)
                | ChartError::InvalidPayload(_)
                | ChartError::Io(_)
        )
    }
}

/// Wrappers added around a failure message on its way to the error image
const ERROR_PREFIXES: [&str; 4] = [
    "Drawing failed: ",
    "Image encoding failed: ",
    "Drawing backend error: ",
    "backend error: ",
];

/// Shorten a drawing error for display inside a chart image
///
/// Only the known wrapper prefixes from `ChartError` and plotters are
/// removed; colons inside the actual message are kept.
pub fn extract_clean_error(error_msg: &str) -> String {
    let mut message = error_msg.trim();
    'strip: loop {
        for prefix in ERROR_PREFIXES {
            if let Some(rest) = message.strip_prefix(prefix) {
                message = rest.trim_start();
                continue 'strip;
            }
        }
        break;
    }
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_errors() {
        assert!(ChartError::Usage("missing".into()).is_invocation_error());
        assert!(ChartError::InvalidPayload("no data".into()).is_invocation_error());
        assert!(!ChartError::Drawing("font".into()).is_invocation_error());
        assert!(!ChartError::Encoding("png".into()).is_invocation_error());
    }

    #[test]
    fn test_json_error_converts() {
        let err: ChartError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, ChartError::InvalidJson(_)));
        assert!(err.to_string().starts_with("Invalid JSON payload"));
    }

    #[test]
    fn test_extract_clean_error() {
        assert_eq!(
            extract_clean_error("Drawing failed: Drawing backend error: font not found"),
            "font not found"
        );
        assert_eq!(
            extract_clean_error("Image encoding failed: Buffer holds 5 bytes"),
            "Buffer holds 5 bytes"
        );
        assert_eq!(extract_clean_error("Invalid value: foo: bar"), "Invalid value: foo: bar");
        assert_eq!(extract_clean_error("plain message"), "plain message");
        assert_eq!(extract_clean_error("Drawing failed:  spaced out"), "spaced out");
    }
}

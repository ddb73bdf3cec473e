use thiserror::Error;

use crate::job::Channel;

/// Errors raised by the label printing pipeline.
/// 標籤列印管線可能發生的錯誤。
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("invalid layout settings: label pitch {pitch} mm must be positive")]
    InvalidLayoutSettings { pitch: f64 },
    #[error("no labels selected")]
    NoLabelsSelected,
    #[error("{channel} printer is not configured")]
    UnconfiguredPrinter { channel: Channel },
    #[error("printer location not found")]
    LocationNotFound,
    #[error("signing failed: {0}")]
    SigningFailed(String),
    #[error("connection to print broker failed: {0}")]
    ConnectionFailed(String),
    #[error("{channel} print submission failed: {cause}")]
    PrintSubmissionFailed { channel: Channel, cause: String },
    #[error("rasterization failed: {0}")]
    Raster(String),
    #[error("document assembly failed: {0}")]
    Assembly(String),
}

impl PrintError {
    /// Geometry, raster and assembly failures abort the whole print action.
    /// 版面、點陣化與組裝錯誤會中止整個列印動作。
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PrintError::InvalidLayoutSettings { .. }
                | PrintError::Raster(_)
                | PrintError::Assembly(_)
        )
    }
}

/// Errors surfaced by a [`PrintTransport`](crate::platform::PrintTransport).
/// 列印傳輸層回報的錯誤。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("signing failed: {0}")]
    SigningFailed(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("broker rejected the job: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Attaches the channel that was being submitted.
    /// 附上正在送出的通道資訊。
    pub fn into_print_error(self, channel: Channel) -> PrintError {
        match self {
            TransportError::SigningFailed(cause) => PrintError::SigningFailed(cause),
            TransportError::ConnectionFailed(cause) => PrintError::ConnectionFailed(cause),
            TransportError::Rejected(cause) => {
                PrintError::PrintSubmissionFailed { channel, cause }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_carries_channel_and_broker_text() {
        let err = TransportError::Rejected("Printer 'Zebra' not found".into())
            .into_print_error(Channel::NonPermanent);
        assert_eq!(
            err.to_string(),
            "non-permanent print submission failed: Printer 'Zebra' not found"
        );
        assert!(!err.is_structural());
    }

    #[test]
    fn unconfigured_printer_names_the_channel() {
        let err = PrintError::UnconfiguredPrinter {
            channel: Channel::Permanent,
        };
        assert_eq!(err.to_string(), "permanent printer is not configured");
    }
}

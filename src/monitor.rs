//! Tolerance policy consulted at every recovery decision point.

use crate::error::{Error, EventKind};

/// Decides, for each parse anomaly, between recovering and aborting.
///
/// One monitor instance is shared by the tokenizer and the transfer
/// decoders of a parse; implementations must be stateless or internally
/// synchronized.
pub trait DecodeMonitor {
    /// Called when an anomaly was met. Returning an error aborts the
    /// surrounding operation; returning `Ok(())` lets it recover with a
    /// best-effort interpretation.
    fn warn(&self, kind: EventKind, detail: &str) -> Result<(), Error>;
}

/// Escalates every anomaly to a fatal [`Error::ParseEvent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl DecodeMonitor for Strict {
    fn warn(&self, kind: EventKind, detail: &str) -> Result<(), Error> {
        Err(Error::event(kind, detail))
    }
}

/// Logs every anomaly and recovers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lenient;

impl DecodeMonitor for Lenient {
    fn warn(&self, kind: EventKind, detail: &str) -> Result<(), Error> {
        tracing::warn!(kind = kind.as_str(), detail, "recovered parse anomaly");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_escalates() {
        let err = Strict.warn(EventKind::InvalidHeader, "junk").unwrap_err();
        assert_eq!(err.kind(), Some(EventKind::InvalidHeader));
    }

    #[test]
    fn test_lenient_recovers() {
        assert!(Lenient.warn(EventKind::InvalidHeader, "junk").is_ok());
    }
}

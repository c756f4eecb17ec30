//! Transfer progress reporting.

/// Whether the transfer should keep going after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFlow {
    Continue,
    /// Abort the transfer; it fails with `TransportError::Cancelled`.
    Cancel,
}

/// Observes one transfer. `started` fires once before the first byte,
/// `progressed` once per chunk; completion is implicit in the operation
/// returning. Either callback may cancel.
pub trait TransferListener: Send {
    /// The transfer is about to move data. `length` is the total expected
    /// byte count when known, counted from the resume offset.
    fn started(&mut self, resource: &str, length: Option<u64>) -> TransferFlow {
        let _ = (resource, length);
        TransferFlow::Continue
    }

    /// A chunk arrived (or departed). `transferred` is the running total.
    fn progressed(&mut self, resource: &str, chunk: &[u8], transferred: u64) -> TransferFlow {
        let _ = (resource, chunk, transferred);
        TransferFlow::Continue
    }
}

/// Listener that ignores everything; useful as a default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransferListener;

impl TransferListener for NoopTransferListener {}

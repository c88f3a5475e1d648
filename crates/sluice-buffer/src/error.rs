use thiserror::Error;

/// Errors produced by `sluice-buffer`.
///
/// `FifoFull` is only returned when growing the backing storage failed —
/// a short append never fails silently, it grows first.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("fifo full: growing by {requested} bytes failed")]
    FifoFull { requested: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_full_display() {
        let err = BufferError::FifoFull { requested: 1024 };
        assert_eq!(err.to_string(), "fifo full: growing by 1024 bytes failed");
    }
}

use serde::{Deserialize, Serialize};

/// A driver-level failure recorded while processing a variant.
///
/// Codes follow the conventional GL error numbering so text output lines up
/// with other conformance tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum DriverError {
    #[error("internal driver error")]
    Internal,
    #[error("invalid value")]
    InvalidValue,
    #[error("invalid operation")]
    InvalidOperation,
    #[error("out of memory")]
    OutOfMemory,
}

impl DriverError {
    pub fn code(self) -> u32 {
        match self {
            DriverError::Internal => 0x0500,
            DriverError::InvalidValue => 0x0501,
            DriverError::InvalidOperation => 0x0502,
            DriverError::OutOfMemory => 0x0505,
        }
    }
}

/// Pending driver status for one variant: the most recent error, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DriverStatus(pub Option<DriverError>);

impl DriverStatus {
    pub const OK: Self = Self(None);

    /// Numeric code; 0 when no error is pending.
    pub fn code(self) -> u32 {
        self.0.map_or(0, DriverError::code)
    }

    pub fn is_ok(self) -> bool {
        self.0.is_none()
    }

    /// Record `err`, replacing any earlier error.
    pub fn record(&mut self, err: DriverError) {
        self.0 = Some(err);
    }
}

impl From<DriverError> for DriverStatus {
    fn from(err: DriverError) -> Self {
        Self(Some(err))
    }
}

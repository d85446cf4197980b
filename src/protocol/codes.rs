//! HMI result codes carried in the `result.code` field of response envelopes.
//!
//! The core service treats any non-zero code as a failed operation; which
//! code a handler picks is domain policy (e.g. `InvalidId` for deleting a
//! submenu that does not exist).

use serde::{Serialize, Serializer};

/// Numeric status code for a completed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ResultCode {
    Success = 0,
    UnsupportedRequest = 1,
    UnsupportedResource = 2,
    Disallowed = 3,
    Rejected = 4,
    Aborted = 5,
    Ignored = 6,
    Retry = 7,
    InUse = 8,
    TimedOut = 10,
    InvalidData = 11,
    CharLimitExceeded = 12,
    InvalidId = 13,
    DuplicateName = 14,
    ApplicationNotRegistered = 15,
    WrongLanguage = 16,
    OutOfMemory = 17,
    TooManyPendingRequests = 18,
    GenericError = 22,
}

impl ResultCode {
    /// Numeric wire value.
    #[inline]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether this code reports a successful operation.
    #[inline]
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl From<ResultCode> for i32 {
    fn from(code: ResultCode) -> i32 {
        code.as_i32()
    }
}

// Codes go on the wire as bare numbers, not variant names.
impl Serialize for ResultCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(ResultCode::Success.as_i32(), 0);
        assert_eq!(ResultCode::UnsupportedRequest.as_i32(), 1);
        assert_eq!(ResultCode::InvalidData.as_i32(), 11);
        assert_eq!(ResultCode::InvalidId.as_i32(), 13);
        assert_eq!(ResultCode::GenericError.as_i32(), 22);
    }

    #[test]
    fn test_is_success() {
        assert!(ResultCode::Success.is_success());
        assert!(!ResultCode::Rejected.is_success());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(ResultCode::InvalidId).unwrap();
        assert_eq!(json, serde_json::json!(13));
    }
}

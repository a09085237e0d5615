//! World Error Types
//!
//! Operations that can fail (handle lookup, configuration, geometry setup)
//! return `Result<T, PhysicsError>` instead of corrupting state or panicking.
//!
//! Author: Moroya Sakamoto

use core::fmt;

/// Unified error type for world operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhysicsError {
    /// Body handle is unknown, or refers to a body that was removed.
    InvalidHandle {
        /// Slot index carried by the handle
        index: u32,
        /// Generation carried by the handle
        generation: u32,
    },
    /// Invalid configuration parameter.
    InvalidConfiguration {
        /// Description of the invalid configuration
        reason: &'static str,
    },
    /// Geometry could not be built from the supplied vertices.
    InvalidShape {
        /// Description of the problem
        reason: &'static str,
    },
    /// A capacity limit was exceeded.
    CapacityExceeded {
        /// What resource was exhausted
        resource: &'static str,
        /// The limit that was exceeded
        limit: usize,
    },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle { index, generation } => {
                write!(f, "invalid body handle (index={index}, generation={generation})")
            }
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
            Self::InvalidShape { reason } => write!(f, "invalid shape: {reason}"),
            Self::CapacityExceeded { resource, limit } => {
                write!(f, "{resource} capacity exceeded (limit={limit})")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PhysicsError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handle_display() {
        let e = PhysicsError::InvalidHandle {
            index: 5,
            generation: 3,
        };
        let s = format!("{}", e);
        assert!(s.contains("index=5"), "Should contain index");
        assert!(s.contains("generation=3"), "Should contain generation");
    }

    #[test]
    fn test_error_variants() {
        let e1 = PhysicsError::InvalidHandle {
            index: 0,
            generation: 0,
        };
        let e2 = PhysicsError::InvalidShape {
            reason: "fewer than three vertices",
        };
        let e3 = PhysicsError::InvalidConfiguration {
            reason: "iterations must be > 0",
        };
        assert_ne!(e1, e2);
        assert_ne!(e2, e3);
        assert!(format!("{}", e3).contains("iterations"));
    }

    #[test]
    fn test_capacity_exceeded() {
        let e = PhysicsError::CapacityExceeded {
            resource: "body slots",
            limit: 10000,
        };
        let s = format!("{}", e);
        assert!(s.contains("body slots"));
        assert!(s.contains("10000"));
    }

    #[test]
    fn test_is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&PhysicsError::InvalidShape { reason: "zero area" });
    }
}

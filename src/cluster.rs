//! Cluster numbers.

use crate::{FatError, FatResult};

/// A FAT cluster number.
///
/// Clusters 0 and 1 are reserved by the FAT format; every allocated file or
/// directory starts at cluster 2 or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cluster(u32);

impl Cluster {
    /// First cluster number usable for data.
    pub const FIRST_VALID: u32 = 2;

    #[must_use]
    #[inline]
    /// Creates a new cluster number.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    #[inline]
    /// Returns the raw cluster number.
    pub const fn value(&self) -> u32 {
        self.0
    }

    #[must_use]
    #[inline]
    /// Returns true if this cluster may start a file or directory chain.
    pub const fn is_valid(&self) -> bool {
        self.0 >= Self::FIRST_VALID
    }

    #[inline]
    /// Validates that this cluster may start a chain.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidArgument` for the reserved clusters 0 and 1.
    pub const fn checked(self) -> FatResult<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(FatError::InvalidArgument)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_clusters() {
        assert!(!Cluster::new(0).is_valid());
        assert!(!Cluster::new(1).is_valid());
        assert!(Cluster::new(2).is_valid());
        assert_eq!(Cluster::new(0).checked(), Err(FatError::InvalidArgument));
        assert_eq!(Cluster::new(7).checked(), Ok(Cluster::new(7)));
    }
}

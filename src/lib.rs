//! Directory-entry layer of a FAT filesystem driver.
//!
//! This crate interprets and mutates the raw 32-byte directory-entry records
//! that FAT volumes use to represent files and subdirectories, including the
//! VFAT long-file-name slots that precede each short (8.3) entry.
//!
//! Raw cluster I/O and FAT-table chain bookkeeping are not performed here:
//! they are reached through the [`ClusterStore`] trait, which the embedding
//! driver implements on top of its block layer.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]

extern crate alloc;
use thiserror::Error;

pub mod cluster;
pub mod dir;
pub mod dirent;
pub mod name;

pub use cluster::Cluster;

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum FatError {
    /// A required input was absent or out of range (e.g. a first-cluster
    /// number below 2, or an unsupported entry-kind request).
    #[error("Invalid argument")]
    InvalidArgument,
    /// The operation is not valid for this entry (e.g. mutating the root's
    /// metadata, or touching the region of an uninitialized entry).
    #[error("Invalid operation")]
    InvalidOperation,
    /// The operation is a known gap (e.g. creating files, which requires
    /// short-name generation).
    #[error("Not implemented")]
    NotImplemented,
    /// No unallocated 32-byte slot is left in the directory region.
    #[error("No free directory entry slot")]
    ResourceExhausted,
    /// The backing store failed to read or write a cluster chain.
    #[error("Storage error")]
    Store,
}

pub type FatResult<T> = Result<T, FatError>;

/// Cluster-chain-backed raw byte access plus FAT-table cluster allocation.
///
/// A directory's contents are the concatenated bytes of its cluster chain.
/// Implementations own chain traversal and free-cluster bookkeeping; this
/// crate only ever addresses a region by its first cluster.
pub trait ClusterStore {
    /// Returns the byte length of the chain starting at `first`.
    ///
    /// `declared_size` is the size stored in the entry's own metadata slot,
    /// needed because for directories the on-disk size field is not
    /// authoritative and the chain must be measured from the FAT itself.
    ///
    /// ## Errors
    ///
    /// Fails if the chain cannot be walked.
    fn chain_length_bytes(&mut self, first: Cluster, declared_size: u32) -> FatResult<usize>;

    /// Reads the whole region starting at `first` into `buf`.
    ///
    /// `buf` must have been sized with [`Self::chain_length_bytes`].
    ///
    /// ## Errors
    ///
    /// Fails if the underlying device read fails.
    fn read_region(&mut self, first: Cluster, buf: &mut [u8]) -> FatResult<()>;

    /// Writes `data` back over the region starting at `first`.
    ///
    /// ## Errors
    ///
    /// Fails if the underlying device write fails.
    fn write_region(&mut self, first: Cluster, data: &[u8]) -> FatResult<()>;

    /// Claims a free cluster from the FAT and returns its number.
    ///
    /// ## Errors
    ///
    /// Fails if the volume has no free cluster left.
    fn allocate_cluster(&mut self) -> FatResult<Cluster>;
}

//! Directory trees: listing, slot allocation and metadata patching.
//!
//! An entry's metadata lives in its *parent's* directory table, so every
//! mutation here is a read-modify-write of the parent's raw region. The
//! region is re-read from the store immediately before each patch; records
//! never carry a stale copy of it across operations.
//!
//! No internal locking is performed. Callers must serialize concurrent
//! structural mutations of the same directory region themselves: two
//! simultaneous `add_entry` calls on one parent can race on the free-slot
//! scan and corrupt the table.

use crate::{
    ClusterStore, FatError, FatResult,
    cluster::Cluster,
    dirent::{
        ATTRIBUTES_OFFSET, Attributes, DIR_ENTRY_SIZE, LFN_TYPE_OFFSET, MetadataField, read_u16,
        read_u32, status,
    },
    name::{LongNameAccumulator, short_name},
};
use alloc::{string::String, vec::Vec};
use log::{debug, trace};

/// What a directory entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Unallocated or uninitialized slot. Never valid for a live record.
    Unknown,
}

/// Index of an entry inside a [`DirTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryId(usize);

/// One logical file or directory entry.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    /// Logical name, reconstructed from the 8.3 fields or a long-name run.
    name: String,
    kind: EntryKind,
    /// Byte length; for directories this is the occupied-cluster footprint,
    /// not a meaningful file size. FAT bounds it to 32 bits.
    size: u32,
    /// Start of this entry's own cluster chain.
    first_cluster: Cluster,
    /// Entry whose raw region contains this entry's 32-byte slot.
    /// `None` only for the filesystem root.
    parent: Option<EntryId>,
    /// Byte offset of this entry's slot within the parent's region.
    /// Meaningless for the root.
    header_offset: u32,
}

impl EntryRecord {
    fn new(
        name: String,
        kind: EntryKind,
        size: u32,
        first_cluster: Cluster,
        parent: Option<EntryId>,
        header_offset: u32,
    ) -> FatResult<Self> {
        let first_cluster = first_cluster.checked()?;
        Ok(Self {
            name,
            kind,
            size,
            first_cluster,
            parent,
            header_offset,
        })
    }

    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    #[inline]
    pub const fn first_cluster(&self) -> Cluster {
        self.first_cluster
    }

    #[must_use]
    #[inline]
    pub const fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    #[must_use]
    #[inline]
    pub const fn header_offset(&self) -> u32 {
        self.header_offset
    }

    #[must_use]
    #[inline]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena of directory entries rooted at the filesystem root.
///
/// Parent back-references are arena indices, so the tree is owned in one
/// place and upward pointers stay non-owning.
pub struct DirTree {
    entries: Vec<EntryRecord>,
}

impl DirTree {
    /// Creates a tree whose root directory starts at `root_cluster`.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidArgument` if `root_cluster` is reserved (< 2).
    pub fn new(root_cluster: Cluster) -> FatResult<Self> {
        let root = EntryRecord::new(
            String::new(),
            EntryKind::Directory,
            0,
            root_cluster,
            None,
            0,
        )?;
        Ok(Self {
            entries: alloc::vec![root],
        })
    }

    #[must_use]
    #[inline]
    /// Returns the root entry.
    pub const fn root(&self) -> EntryId {
        EntryId(0)
    }

    #[must_use]
    #[inline]
    /// Returns the record behind `id`.
    ///
    /// ## Panics
    ///
    /// Panics if `id` does not come from this tree.
    pub fn entry(&self, id: EntryId) -> &EntryRecord {
        &self.entries[id.0]
    }

    fn insert(&mut self, record: EntryRecord) -> EntryId {
        self.entries.push(record);
        EntryId(self.entries.len() - 1)
    }

    /// Fetches the raw region backing `id`'s own contents.
    ///
    /// The buffer is sized from the FAT chain, since for directories the
    /// declared size field does not describe the chain length.
    fn region_of<S: ClusterStore>(&self, store: &mut S, id: EntryId) -> FatResult<Vec<u8>> {
        let entry = self.entry(id);
        if entry.kind == EntryKind::Unknown {
            return Err(FatError::InvalidOperation);
        }

        let len = store.chain_length_bytes(entry.first_cluster, entry.size)?;
        // Region length is a store-layer precondition, not handled here.
        debug_assert!(len % DIR_ENTRY_SIZE == 0, "misaligned directory region");

        let mut buf = alloc::vec![0; len];
        store.read_region(entry.first_cluster, &mut buf)?;
        Ok(buf)
    }

    fn write_region_of<S: ClusterStore>(
        &self,
        store: &mut S,
        id: EntryId,
        data: &[u8],
    ) -> FatResult<()> {
        let entry = self.entry(id);
        if entry.kind == EntryKind::Unknown {
            return Err(FatError::InvalidOperation);
        }
        if data.is_empty() {
            return Ok(());
        }
        store.write_region(entry.first_cluster, data)
    }

    /// Reads the children of `dir` from its raw region.
    ///
    /// Walks the region 32 bytes at a time, reassembling long-name runs and
    /// emitting one record per live short entry. Deleted slots, the Kanji
    /// escape, volume-ID entries and unrecognized attribute combinations
    /// are skipped without failing the listing; a status byte of 0x00
    /// terminates the scan.
    ///
    /// ## Errors
    ///
    /// Fails if the store cannot supply the region, or if a live entry
    /// carries a reserved first-cluster number.
    pub fn read_children<S: ClusterStore>(
        &mut self,
        store: &mut S,
        dir: EntryId,
    ) -> FatResult<Vec<EntryId>> {
        let data = self.region_of(store, dir)?;

        let mut children = Vec::new();
        let mut acc = LongNameAccumulator::new();

        let mut offset = 0;
        while offset + DIR_ENTRY_SIZE <= data.len() {
            let slot = &data[offset..offset + DIR_ENTRY_SIZE];
            let attributes = Attributes::new(slot[ATTRIBUTES_OFFSET]);
            let status = slot[0];

            if attributes.is_long_name() {
                // The ordinal shares the status byte's position.
                if status == status::DELETED {
                    trace!("skipping deleted long-name slot at {offset}");
                } else if slot[LFN_TYPE_OFFSET] == 0 {
                    acc.accept(slot);
                }
                offset += DIR_ENTRY_SIZE;
                continue;
            }

            if status == status::END_OF_ENTRIES {
                break;
            }

            match status {
                status::KANJI_ESCAPE | status::DELETED => {
                    trace!("skipping slot at {offset}, status {status:#04x}");
                }
                s if s >= status::FIRST_PRINTABLE => {
                    if let Some(id) = self.materialize(dir, slot, offset, &mut acc)? {
                        children.push(id);
                    }
                }
                s => {
                    trace!("skipping slot at {offset}, unrecognized status {s:#04x}");
                }
            }

            offset += DIR_ENTRY_SIZE;
        }

        debug!("listed {} entries", children.len());
        Ok(children)
    }

    /// Turns one live short-entry slot into an arena record.
    ///
    /// Returns `None` for slots that produce no record (volume IDs,
    /// unsupported attribute combinations, spurious zero slots).
    fn materialize(
        &mut self,
        dir: EntryId,
        slot: &[u8],
        offset: usize,
        acc: &mut LongNameAccumulator,
    ) -> FatResult<Option<EntryId>> {
        let name = acc.take().unwrap_or_else(|| short_name(slot));
        let first_cluster = Cluster::new(
            u32::from(read_u16(slot, MetadataField::FirstClusterHigh.offset())) << 16
                | u32::from(read_u16(slot, MetadataField::FirstClusterLow.offset())),
        );
        let size = read_u32(slot, MetadataField::Size.offset());
        let header_offset = u32::try_from(offset).map_err(|_| FatError::InvalidArgument)?;

        let attributes = Attributes::new(slot[ATTRIBUTES_OFFSET]);
        let kind = match attributes.classification() {
            0 => {
                // Trailing garbage sometimes decodes as a zero-size file
                // with no name; such slots produce no record.
                if size == 0 && name.is_empty() {
                    return Ok(None);
                }
                EntryKind::File
            }
            a if a == Attributes::DIRECTORY => EntryKind::Directory,
            a if a == Attributes::VOLUME_ID => {
                trace!("skipping volume-id entry at {offset}");
                return Ok(None);
            }
            a => {
                trace!("skipping entry at {offset} with unsupported attributes {a:#04x}");
                return Ok(None);
            }
        };

        let record = EntryRecord::new(name, kind, size, first_cluster, Some(dir), header_offset)?;
        trace!(
            "entry {:?} '{}', {} bytes, cluster {}",
            record.kind,
            record.name,
            record.size,
            record.first_cluster.value()
        );
        Ok(Some(self.insert(record)))
    }

    /// Creates a new entry in `parent`'s directory table.
    ///
    /// Only directories can be created: a cluster is claimed from the FAT,
    /// a free 32-byte slot is located in the parent's region and the new
    /// entry's name, attributes and first-cluster halfwords are patched in.
    ///
    /// ## Errors
    ///
    /// - `NotImplemented` for `EntryKind::File`: file creation needs
    ///   short-name/long-name reconciliation, which does not exist yet.
    /// - `InvalidArgument` for `EntryKind::Unknown`.
    /// - `ResourceExhausted` when the parent's region has no free slot; the
    ///   region is left untouched.
    pub fn add_entry<S: ClusterStore>(
        &mut self,
        store: &mut S,
        parent: EntryId,
        name: &str,
        kind: EntryKind,
    ) -> FatResult<EntryId> {
        debug!("add_entry '{name}' ({kind:?})");
        match kind {
            EntryKind::Directory => {}
            EntryKind::File => return Err(FatError::NotImplemented),
            EntryKind::Unknown => return Err(FatError::InvalidArgument),
        }

        let first_cluster = store.allocate_cluster()?;
        let region = self.region_of(store, parent)?;
        let header_offset = find_free_slot(&region)?;

        let record = EntryRecord::new(
            String::from(name),
            EntryKind::Directory,
            0,
            first_cluster,
            Some(parent),
            header_offset,
        )?;
        let id = self.insert(record);

        self.patch_field_name(store, id, MetadataField::ShortName, name)?;
        self.patch_field_u32(
            store,
            id,
            MetadataField::Attributes,
            u32::from(Attributes::DIRECTORY),
        )?;
        self.patch_field_u32(
            store,
            id,
            MetadataField::FirstClusterHigh,
            first_cluster.value() >> 16,
        )?;
        self.patch_field_u32(
            store,
            id,
            MetadataField::FirstClusterLow,
            first_cluster.value() & 0xFFFF,
        )?;

        Ok(id)
    }

    /// Overwrites one metadata field of `id` with a little-endian integer,
    /// truncated or zero-padded to the field's declared length.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidOperation` for the root, which has no parent region
    /// to patch. Store failures propagate unchanged.
    pub fn patch_field_u32<S: ClusterStore>(
        &self,
        store: &mut S,
        id: EntryId,
        field: MetadataField,
        value: u32,
    ) -> FatResult<()> {
        let mut encoded = alloc::vec![0u8; field.byte_len()];
        let le = value.to_le_bytes();
        let n = field.byte_len().min(le.len());
        encoded[..n].copy_from_slice(&le[..n]);
        self.patch_bytes(store, id, field, &encoded)
    }

    /// Overwrites one metadata field of `id` with a name, truncated or
    /// space-padded to the field's declared length.
    ///
    /// ## Errors
    ///
    /// Same conditions as [`Self::patch_field_u32`].
    pub fn patch_field_name<S: ClusterStore>(
        &self,
        store: &mut S,
        id: EntryId,
        field: MetadataField,
        name: &str,
    ) -> FatResult<()> {
        let mut encoded = alloc::vec![b' '; field.byte_len()];
        let bytes = name.as_bytes();
        let n = field.byte_len().min(bytes.len());
        encoded[..n].copy_from_slice(&bytes[..n]);
        self.patch_bytes(store, id, field, &encoded)
    }

    /// Read-modify-write of the parent's whole region for one field.
    ///
    /// No partial-region optimization: regions are one directory's cluster
    /// chain, so correctness wins over throughput here.
    fn patch_bytes<S: ClusterStore>(
        &self,
        store: &mut S,
        id: EntryId,
        field: MetadataField,
        encoded: &[u8],
    ) -> FatResult<()> {
        debug_assert_eq!(encoded.len(), field.byte_len());

        let entry = self.entry(id);
        let Some(parent) = entry.parent else {
            debug!("rejecting metadata patch on the root entry");
            return Err(FatError::InvalidOperation);
        };
        let slot_offset = entry.header_offset as usize;

        let mut region = self.region_of(store, parent)?;
        if region.is_empty() {
            return Ok(());
        }

        let offset = slot_offset + field.offset();
        trace!("patching {field:?} at region offset {offset}");
        region[offset..offset + encoded.len()].copy_from_slice(encoded);

        self.write_region_of(store, parent, &region)
    }

    /// Renames `id` by patching its short-name field.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` for the root; store failures propagate.
    pub fn set_name<S: ClusterStore>(
        &mut self,
        store: &mut S,
        id: EntryId,
        name: &str,
    ) -> FatResult<()> {
        self.patch_field_name(store, id, MetadataField::ShortName, name)?;
        self.entries[id.0].name = String::from(name);
        Ok(())
    }

    /// Updates `id`'s size field.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` for the root; store failures propagate.
    pub fn set_size<S: ClusterStore>(
        &mut self,
        store: &mut S,
        id: EntryId,
        size: u32,
    ) -> FatResult<()> {
        self.patch_field_u32(store, id, MetadataField::Size, size)?;
        self.entries[id.0].size = size;
        Ok(())
    }
}

/// Scans for an unallocated 32-byte slot.
///
/// A slot is unallocated when the four words at offsets 0, 8, 16 and 24 are
/// all zero. Growing the region by chaining another cluster is not
/// implemented, so a full table is `ResourceExhausted`.
fn find_free_slot(region: &[u8]) -> FatResult<u32> {
    let mut offset = 0;
    while offset + DIR_ENTRY_SIZE <= region.len() {
        if read_u32(region, offset) == 0
            && read_u32(region, offset + 8) == 0
            && read_u32(region, offset + 16) == 0
            && read_u32(region, offset + 24) == 0
        {
            return u32::try_from(offset).map_err(|_| FatError::InvalidArgument);
        }
        offset += DIR_ENTRY_SIZE;
    }
    Err(FatError::ResourceExhausted)
}

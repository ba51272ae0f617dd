//! Debounced record store
//!
//! `RecordStore` owns one decoded record and its persistence lifecycle:
//! load-or-initialize at boot, mutate through `set`, flush on a save-delay
//! timer so bursts of mutations within one control-loop tick coalesce into
//! a single physical write. The in-memory record stays authoritative when
//! a write fails; the store remains dirty until a flush succeeds.

use super::crc::{calculate_crc32, validate_crc32};
use super::error::LoadError;
use super::header::RecordHeader;
use super::{MAX_RECORD_PAYLOAD, RECORD_BLOCK_SIZE};
use crate::traits::storage::{StorageError, StorageInterface};
use log::{info, warn};

/// A fixed-layout record that can live in a storage block.
///
/// Layouts are append-only: a newer version may only add fields after the
/// existing ones, and `decode` must accept every historical version.
pub trait PersistentRecord: Sized {
    /// Record type tag in the header
    const MAGIC: u32;
    /// Current structure format version (never 0)
    const VERSION: u16;
    /// Payload length written by the current version
    const PAYLOAD_LEN: usize;
    /// Debounce window between the last mutation and the physical write
    const SAVE_DELAY_MS: u32;
    /// Short name for log messages
    const NAME: &'static str;

    /// Hard-coded factory defaults
    fn defaults() -> Self;

    /// Serialize into `buf`, which is exactly `PAYLOAD_LEN` bytes
    fn encode(&self, buf: &mut [u8]);

    /// Deserialize a payload written by `version`; `None` if the bytes
    /// cannot be a record of that version
    fn decode(buf: &[u8], version: u16) -> Option<Self>;

    /// Domain range checks over the decoded fields
    fn validate(&self) -> bool;
}

/// How a record came into memory at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Valid record of the current version
    Loaded,
    /// Valid record of an older version; appended fields defaulted
    Upgraded,
    /// Header or validation failure; factory defaults written through
    Defaulted,
}

/// Debounced, validated store for one persistent record.
pub struct RecordStore<R: PersistentRecord> {
    record: R,
    base: u32,
    dirty: bool,
    dirty_since_ms: u64,
}

impl<R: PersistentRecord> RecordStore<R> {
    /// Load the record from storage, falling back to factory defaults on
    /// any corruption.
    ///
    /// Defaults are persisted immediately so the next boot loads cleanly.
    pub fn load_or_init<S: StorageInterface + ?Sized>(
        storage: &mut S,
        base: u32,
        now_ms: u64,
    ) -> (Self, LoadOutcome) {
        match Self::try_load(storage, base) {
            Ok((record, upgraded)) => {
                if upgraded {
                    info!("{} record upgraded from an older layout", R::NAME);
                } else {
                    info!("{} record is valid", R::NAME);
                }
                let store = Self {
                    record,
                    base,
                    dirty: false,
                    dirty_since_ms: now_ms,
                };
                let outcome = if upgraded {
                    LoadOutcome::Upgraded
                } else {
                    LoadOutcome::Loaded
                };
                (store, outcome)
            }
            Err(err) => {
                warn!("{} record not valid ({}), loading defaults", R::NAME, err);
                let mut store = Self {
                    record: R::defaults(),
                    base,
                    dirty: true,
                    dirty_since_ms: now_ms,
                };
                if store.flush(storage, true, now_ms).is_err() {
                    warn!("{} defaults could not be persisted", R::NAME);
                }
                (store, LoadOutcome::Defaulted)
            }
        }
    }

    fn try_load<S: StorageInterface + ?Sized>(
        storage: &mut S,
        base: u32,
    ) -> Result<(R, bool), LoadError> {
        let mut header_buf = [0u8; RecordHeader::SIZE];
        storage.read(base, &mut header_buf)?;
        let header = RecordHeader::from_bytes(&header_buf).ok_or(LoadError::TruncatedHeader)?;

        if header.magic != R::MAGIC {
            return Err(LoadError::WrongMagic);
        }
        if header.version == 0 || header.version > R::VERSION {
            return Err(LoadError::BadVersion);
        }
        let len = header.size as usize;
        if len == 0 || len > R::PAYLOAD_LEN || len > MAX_RECORD_PAYLOAD {
            return Err(LoadError::BadSize);
        }

        let mut payload = [0u8; MAX_RECORD_PAYLOAD];
        storage.read(base + RecordHeader::SIZE as u32, &mut payload[..len])?;
        if !validate_crc32(&payload[..len], header.crc) {
            return Err(LoadError::CrcMismatch);
        }

        let record = R::decode(&payload[..len], header.version).ok_or(LoadError::Undecodable)?;
        if !record.validate() {
            return Err(LoadError::Invalid);
        }

        Ok((record, header.version < R::VERSION))
    }

    /// Read access to the record.
    pub fn get(&self) -> &R {
        &self.record
    }

    /// Mutate the record, marking it dirty and restarting the save-delay
    /// window.
    pub fn set<F: FnOnce(&mut R)>(&mut self, now_ms: u64, mutate: F) {
        mutate(&mut self.record);
        self.dirty = true;
        self.dirty_since_ms = now_ms;
    }

    /// Whether there are unflushed mutations.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the record through to storage if dirty and (forced or the
    /// save delay has elapsed).
    ///
    /// Returns `Ok(true)` when a physical write happened. On failure the
    /// store stays dirty and the in-memory record remains authoritative.
    pub fn flush<S: StorageInterface + ?Sized>(
        &mut self,
        storage: &mut S,
        force: bool,
        now_ms: u64,
    ) -> Result<bool, StorageError> {
        if !self.dirty {
            return Ok(false);
        }
        if !force && now_ms.saturating_sub(self.dirty_since_ms) < u64::from(R::SAVE_DELAY_MS) {
            return Ok(false);
        }

        let mut block = [0u8; RecordHeader::SIZE + MAX_RECORD_PAYLOAD];
        let payload = &mut block[RecordHeader::SIZE..RecordHeader::SIZE + R::PAYLOAD_LEN];
        self.record.encode(payload);
        let checksum = calculate_crc32(&block[RecordHeader::SIZE..RecordHeader::SIZE + R::PAYLOAD_LEN]);
        let header = RecordHeader::new(R::MAGIC, R::VERSION, R::PAYLOAD_LEN as u16, checksum);
        block[..RecordHeader::SIZE].copy_from_slice(&header.to_bytes());

        storage.erase(self.base, RECORD_BLOCK_SIZE)?;
        storage.write(self.base, &block[..RecordHeader::SIZE + R::PAYLOAD_LEN])?;

        self.dirty = false;
        Ok(true)
    }
}

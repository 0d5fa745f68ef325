//! The single current image and its durable copy.
//!
//! The store keeps one decoded frame in memory and writes it through to
//! a [`BlobStore`] slot as encoded PNG on every replacement, so the
//! image survives the process. Every replacement also bumps the
//! [`ImageId`]; the controller uses that id to tell whether async work
//! still refers to the image it started from.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use directories::ProjectDirs;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader};
use log::{info, warn};
use snaptext_types::{ImageId, RgbaFrame};

use crate::error::StoreError;

/// Blob slot key for the persisted current image.
pub const CURRENT_IMAGE_KEY: &str = "captured-image.png";

/// Durable slot for encoded bytes. One value per key; writes replace.
pub trait BlobStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// One file per key under a directory. Keys double as file names, so
/// they must be bare names without path separators.
pub struct FsBlobStore {
    directory: PathBuf,
}

impl FsBlobStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        FsBlobStore {
            directory: directory.into(),
        }
    }

    /// Store under the per-user data directory.
    pub fn user_default() -> Option<Self> {
        ProjectDirs::from("rs", "snaptext", "snaptext")
            .map(|dirs| FsBlobStore::new(dirs.data_dir()))
    }

    pub fn directory(&self) -> &std::path::Path {
        &self.directory
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.directory)
            .map_err(|source| StoreError::storage(key, source))?;
        std::fs::write(self.key_path(key), bytes).map_err(|source| StoreError::storage(key, source))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::storage(key, source)),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::storage(key, source)),
        }
    }
}

/// Blob slot held in memory. Used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        MemoryBlobStore::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// The current image plus its write-through persistence.
pub struct ImageStore {
    blobs: Arc<dyn BlobStore>,
    current: Option<(ImageId, RgbaFrame)>,
    next_id: ImageId,
}

impl ImageStore {
    /// A store with nothing loaded, ignoring any persisted blob.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        ImageStore {
            blobs,
            current: None,
            next_id: ImageId::first(),
        }
    }

    /// Open the store and reload the image persisted by a previous
    /// session. A blob that no longer decodes is dropped with a
    /// warning instead of failing the open.
    pub fn open(blobs: Arc<dyn BlobStore>) -> Result<Self, StoreError> {
        let mut store = ImageStore::new(blobs);
        if let Some(bytes) = store.blobs.get(CURRENT_IMAGE_KEY)? {
            match decode_image(&bytes) {
                Ok(frame) => {
                    let id = store.assign_id();
                    info!(
                        "restored persisted image {id} ({}x{})",
                        frame.width(),
                        frame.height()
                    );
                    store.current = Some((id, frame));
                }
                Err(err) => {
                    warn!("persisted image is unreadable, discarding: {err}");
                    store.blobs.remove(CURRENT_IMAGE_KEY)?;
                }
            }
        }
        Ok(store)
    }

    fn assign_id(&mut self) -> ImageId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    /// Replace the current image and persist it. The encoded blob is
    /// written before the replacement takes effect, so a failed write
    /// leaves the previous image current.
    pub fn set(&mut self, frame: RgbaFrame) -> Result<ImageId, StoreError> {
        let encoded = encode_png(&frame)?;
        self.blobs.put(CURRENT_IMAGE_KEY, &encoded)?;
        let id = self.assign_id();
        self.current = Some((id, frame));
        Ok(id)
    }

    /// Decode arbitrary image bytes (PNG, JPEG, WebP) and make the
    /// result current. The previous image stays current when decoding
    /// fails.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<ImageId, StoreError> {
        let frame = decode_image(bytes)?;
        self.set(frame)
    }

    pub fn get(&self) -> Option<(ImageId, &RgbaFrame)> {
        self.current.as_ref().map(|(id, frame)| (*id, frame))
    }

    pub fn current_id(&self) -> Option<ImageId> {
        self.current.as_ref().map(|(id, _)| *id)
    }

    /// Drop the current image from memory and the blob slot.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.blobs.remove(CURRENT_IMAGE_KEY)?;
        self.current = None;
        Ok(())
    }
}

fn encode_png(frame: &RgbaFrame) -> Result<Vec<u8>, StoreError> {
    let mut encoded = Vec::new();
    let encoder = PngEncoder::new(&mut encoded);
    encoder
        .write_image(
            frame.data(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|err| StoreError::encode(err.to_string()))?;
    Ok(encoded)
}

pub(crate) fn decode_image(bytes: &[u8]) -> Result<RgbaFrame, StoreError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| StoreError::decode(err.to_string()))?;
    let decoded = reader
        .decode()
        .map_err(|err| StoreError::decode(err.to_string()))?;
    let rgba = decoded.into_rgba8();
    let (width, height) = rgba.dimensions();
    RgbaFrame::from_owned(width, height, rgba.into_raw())
        .map_err(|err| StoreError::decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, value: u8) -> RgbaFrame {
        let data = vec![value; width as usize * height as usize * 4];
        RgbaFrame::from_owned(width, height, data).unwrap()
    }

    fn memory_store() -> (Arc<MemoryBlobStore>, ImageStore) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = ImageStore::new(blobs.clone());
        (blobs, store)
    }

    #[test]
    fn set_then_get_returns_the_latest_image() {
        let (_, mut store) = memory_store();
        let first = store.set(frame(2, 2, 10)).unwrap();
        let second = store.set(frame(3, 1, 20)).unwrap();
        assert_ne!(first, second);
        let (id, current) = store.get().unwrap();
        assert_eq!(id, second);
        assert_eq!(current.width(), 3);
        assert_eq!(current.pixel(0, 0), Some([20, 20, 20, 20]));
    }

    #[test]
    fn every_set_writes_through_to_the_blob_slot() {
        let (blobs, mut store) = memory_store();
        store.set(frame(4, 2, 7)).unwrap();
        let bytes = blobs.get(CURRENT_IMAGE_KEY).unwrap().unwrap();
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 2);
        assert_eq!(decoded.data(), frame(4, 2, 7).data());
    }

    #[test]
    fn clear_empties_both_memory_and_slot() {
        let (blobs, mut store) = memory_store();
        store.set(frame(2, 2, 1)).unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());
        assert!(blobs.get(CURRENT_IMAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn clear_on_an_empty_store_is_a_no_op() {
        let (_, mut store) = memory_store();
        store.clear().unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn corrupt_import_leaves_the_current_image() {
        let (_, mut store) = memory_store();
        let id = store.set(frame(2, 2, 5)).unwrap();
        let err = store.import_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
        assert_eq!(store.current_id(), Some(id));
    }

    #[test]
    fn import_round_trips_encoded_pixels() {
        let (_, mut store) = memory_store();
        let source = frame(5, 3, 42);
        let encoded = encode_png(&source).unwrap();
        store.import_bytes(&encoded).unwrap();
        let (_, current) = store.get().unwrap();
        assert_eq!(current.data(), source.data());
    }

    #[test]
    fn open_restores_what_a_previous_store_persisted() {
        let blobs: Arc<MemoryBlobStore> = Arc::new(MemoryBlobStore::new());
        {
            let mut store = ImageStore::new(blobs.clone());
            store.set(frame(6, 4, 9)).unwrap();
        }
        let store = ImageStore::open(blobs).unwrap();
        let (_, restored) = store.get().unwrap();
        assert_eq!(restored.width(), 6);
        assert_eq!(restored.height(), 4);
    }

    #[test]
    fn open_discards_an_unreadable_blob() {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put(CURRENT_IMAGE_KEY, b"garbage").unwrap();
        let store = ImageStore::open(blobs.clone()).unwrap();
        assert!(store.get().is_none());
        assert!(blobs.get(CURRENT_IMAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn ids_keep_increasing_after_reopen_within_a_session() {
        let (_, mut store) = memory_store();
        let a = store.set(frame(1, 1, 1)).unwrap();
        store.clear().unwrap();
        let b = store.set(frame(1, 1, 2)).unwrap();
        assert_ne!(a, b);
    }
}

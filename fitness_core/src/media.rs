//! Media collaborator used when capturing moments.
//!
//! The controller never touches image bytes itself; it hands the capture to a
//! [`MediaStore`] and attaches the returned [`MediaRef`] to the moment.

use crate::{MediaKind, MediaRef, Result};
use std::collections::HashMap;
use uuid::Uuid;

/// Persists a captured image or clip and returns a handle to it
pub trait MediaStore {
    fn persist(&mut self, bytes: &[u8], kind: MediaKind) -> Result<MediaRef>;
}

/// Keeps captures in memory, keyed by generated file name
#[derive(Debug, Default)]
pub struct InMemoryMediaStore {
    items: HashMap<String, Vec<u8>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, media: &MediaRef) -> Option<&[u8]> {
        self.items.get(&media.name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl MediaStore for InMemoryMediaStore {
    fn persist(&mut self, bytes: &[u8], kind: MediaKind) -> Result<MediaRef> {
        let ext = match kind {
            MediaKind::Photo => "jpg",
            MediaKind::Video => "mov",
        };
        let name = format!("moment_{}.{}", Uuid::new_v4(), ext);
        self.items.insert(name.clone(), bytes.to_vec());
        tracing::debug!("Stored {} byte capture as {}", bytes.len(), name);
        Ok(MediaRef { name, kind })
    }
}

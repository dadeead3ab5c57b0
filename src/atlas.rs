//! Named atlas lookups (§6): resolving a sprite sheet's packed region by
//! name is an external-asset-pipeline concern, not something this crate
//! parses itself — it only contracts the lookup interface an embedder's
//! atlas JSON/plist reader implements.

use rustc_hash::FxHashMap;

use crate::errors::Retained2dError;
use crate::texture::TextureRegion;

/// Source of name -> region lookups, supplied by the embedder.
pub trait Atlas {
    fn lookup_by_name(&self, name: &str) -> Option<TextureRegion>;
}

/// A flat in-memory name table: the simplest possible [`Atlas`], useful for
/// tests and for embedders that already parsed their own atlas format into
/// a `name -> region` map.
#[derive(Default)]
pub struct NameTable {
    regions: FxHashMap<String, TextureRegion>,
}

impl NameTable {
    #[must_use]
    pub fn new() -> Self {
        Self { regions: FxHashMap::default() }
    }

    pub fn insert(&mut self, name: impl Into<String>, region: TextureRegion) {
        self.regions.insert(name.into(), region);
    }

    /// Same lookup as [`Atlas::lookup_by_name`], but surfaced as a
    /// [`Retained2dError`] for callers that want the recoverable-error
    /// surface directly rather than an `Option`.
    pub fn get(&self, name: &str) -> Result<TextureRegion, Retained2dError> {
        self.lookup_by_name(name).ok_or_else(|| Retained2dError::RegionNotFound(name.to_string()))
    }
}

impl Atlas for NameTable {
    fn lookup_by_name(&self, name: &str) -> Option<TextureRegion> {
        self.regions.get(name).copied()
    }
}

//! Vendor flag catalog wiring.
//!
//! This module wraps the JSON catalogs under `catalogs/` so the engine sees a
//! validated, typed view of every toggle a vendor release exposes. Use
//! `FlagIndex` for validated loading and name lookup, and `CatalogRepository`
//! when several vendor versions are registered.

pub mod identity;
pub mod index;
pub mod model;
pub mod repository;

pub use identity::{CapabilityName, CatalogKey, FlagCategory, FlagName, Polarity};
pub use index::{CATALOG_SCHEMA_FILE, FlagIndex};
pub use model::{
    CATALOG_SCHEMA_VERSION, CatalogMetadata, DEFAULT_FLAG_PREFIX, Derivation, FlagCatalog,
    FlagDescriptor, ModuleLookup,
};
pub use repository::CatalogRepository;

pub use model::load_catalog_from_path;

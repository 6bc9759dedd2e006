pub mod catalog;
pub mod manifest;

pub use catalog::DirectoryCatalog;
pub use manifest::{parse_manifest, Manifest, ManifestReference};

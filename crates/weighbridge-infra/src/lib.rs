//! Infrastructure layer - loaders and adapters for external collaborators

pub mod identification;
pub mod material_catalog;

pub use identification::CommandIdentifier;
pub use material_catalog::MaterialCatalogLoader;

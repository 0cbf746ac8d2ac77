//! Material reference data

use serde::{Deserialize, Serialize};
use weighbridge_types::{Error, Result};

/// A billable material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    /// Display name
    pub name: String,
    /// Price per kg. Negative means the yard pays the customer.
    pub price_per_kg: f64,
}

impl Material {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price_per_kg: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price_per_kg,
        }
    }

    /// Whether completed tickets for this material are payouts
    pub fn is_payout(&self) -> bool {
        self.price_per_kg < 0.0
    }
}

/// Fixed catalog the operator selects the active material from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialCatalog {
    materials: Vec<Material>,
}

impl MaterialCatalog {
    /// Build a catalog, rejecting empty catalogs and duplicate ids
    pub fn new(materials: Vec<Material>) -> Result<Self> {
        if materials.is_empty() {
            return Err(Error::Catalog("catalog has no materials".to_string()));
        }
        for (i, material) in materials.iter().enumerate() {
            if material.id.trim().is_empty() {
                return Err(Error::Catalog(format!("material #{} has an empty id", i + 1)));
            }
            if !material.price_per_kg.is_finite() {
                return Err(Error::Catalog(format!(
                    "material {} has a non-finite price",
                    material.id
                )));
            }
            if materials[..i].iter().any(|m| m.id == material.id) {
                return Err(Error::Catalog(format!("duplicate material id: {}", material.id)));
            }
        }
        Ok(Self { materials })
    }

    /// The yard's standard price list
    pub fn builtin() -> Self {
        Self {
            materials: vec![
                Material::new("mixed", "Mixed Waste", 0.15),
                Material::new("concrete", "Clean Concrete", 0.05),
                Material::new("wood", "Clean Wood", 0.08),
                Material::new("metal", "Scrap Metal", -0.20),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    /// Look up a material, failing with `UnknownMaterial`
    pub fn require(&self, id: &str) -> Result<&Material> {
        self.get(id)
            .ok_or_else(|| Error::UnknownMaterial(id.to_string()))
    }

    /// First entry, used when nothing else is selected
    pub fn first(&self) -> &Material {
        &self.materials[0]
    }

    pub fn all(&self) -> &[Material] {
        &self.materials
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

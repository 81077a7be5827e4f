//! Product and content-category catalog.
//!
//! Static data loaded once at start-up from YAML. Prices here are the only
//! source of an order's amount.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

const DEFAULT_CATALOG: &str = r#"
products:
  - sku: EBOOK_ASP
    slug: guide-asp
    title: "Guide pratique de l'ASP"
    price: 15000
    currency: XOF
    variants:
      - label: A4
        path: ebooks/guide-asp-a4.pdf
      - label: 6x9
        path: ebooks/guide-asp-6x9.pdf
    grants: [bonus, checklists, outils-pratiques, irregularites]
categories:
  - slug: bonus
    title: Bonus
    protected: true
    required_sku: EBOOK_ASP
    files: [bonus/kit-preparation.pdf]
  - slug: checklists
    title: Checklists
    protected: true
    required_sku: EBOOK_ASP
    files: [checklists/checklist-dossier.pdf]
  - slug: outils-pratiques
    title: Outils pratiques
    protected: true
    required_sku: EBOOK_ASP
    files: [outils/modeles-courriers.docx]
  - slug: irregularites
    title: Irregularites
    protected: true
    required_sku: EBOOK_ASP
    files: [irregularites/recours-types.pdf]
  - slug: ressources
    title: Ressources gratuites
    protected: false
    files: [ressources/sommaire.pdf]
"#;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog YAML invalid: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("catalog inconsistent: {0}")]
    Inconsistent(String),
}

/// One downloadable form of a product's document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentVariant {
    pub label: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub sku: String,
    pub slug: String,
    pub title: String,
    pub price: i64,
    pub currency: String,
    #[serde(default)]
    pub variants: Vec<DocumentVariant>,
    /// Categories a site purchase of this product unlocks.
    #[serde(default)]
    pub grants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtectedCategory {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub protected: bool,
    pub required_sku: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    categories: Vec<ProtectedCategory>,
}

impl Catalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(DEFAULT_CATALOG)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_yaml::from_str(yaml)?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn product(&self, sku: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.sku == sku)
    }

    pub fn product_by_slug(&self, slug: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.slug == slug)
    }

    pub fn category(&self, slug: &str) -> Option<&ProtectedCategory> {
        self.categories.iter().find(|c| c.slug == slug)
    }

    pub fn categories(&self) -> &[ProtectedCategory] {
        &self.categories
    }

    /// Categories a purchase of `sku` unlocks.
    pub fn categories_granted_by(&self, sku: &str) -> Vec<&ProtectedCategory> {
        self.product(sku)
            .map(|p| p.grants.iter().filter_map(|slug| self.category(slug)).collect())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), CatalogError> {
        let mut skus = HashSet::new();
        for product in &self.products {
            if !skus.insert(product.sku.as_str()) {
                return Err(CatalogError::Inconsistent(format!("duplicate sku {}", product.sku)));
            }
            if product.price <= 0 {
                return Err(CatalogError::Inconsistent(format!("{} has no price", product.sku)));
            }
        }
        let mut slugs = HashSet::new();
        for category in &self.categories {
            if !slugs.insert(category.slug.as_str()) {
                return Err(CatalogError::Inconsistent(format!(
                    "duplicate category {}",
                    category.slug
                )));
            }
            if let Some(sku) = &category.required_sku {
                if !skus.contains(sku.as_str()) {
                    return Err(CatalogError::Inconsistent(format!(
                        "category {} requires unknown sku {}",
                        category.slug, sku
                    )));
                }
            }
        }
        for product in &self.products {
            if let Some(missing) = product.grants.iter().find(|g| !slugs.contains(g.as_str())) {
                return Err(CatalogError::Inconsistent(format!(
                    "{} grants unknown category {}",
                    product.sku, missing
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        let product = catalog.product("EBOOK_ASP").unwrap();
        assert_eq!(product.price, 15000);
        assert_eq!(product.currency, "XOF");
        assert_eq!(product.variants.len(), 2);
        assert_eq!(catalog.categories_granted_by("EBOOK_ASP").len(), 4);
        assert!(!catalog.category("ressources").unwrap().protected);
    }

    #[test]
    fn unknown_sku_grants_nothing() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.categories_granted_by("NOPE").is_empty());
        assert!(catalog.product_by_slug("guide-asp").is_some());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "products:\n  - sku: A\n    slug: a\n    title: A\n    price: 10\n    currency: XOF\ncategories: []"
        )
        .unwrap();
        let catalog = Catalog::from_path(file.path()).unwrap();
        assert!(catalog.product("A").is_some());
    }

    #[test]
    fn dangling_required_sku_is_rejected() {
        let yaml = "categories:\n  - slug: x\n    title: X\n    protected: true\n    required_sku: GHOST\n";
        assert!(matches!(
            Catalog::from_yaml(yaml),
            Err(CatalogError::Inconsistent(_))
        ));
    }

    #[test]
    fn duplicate_sku_is_rejected() {
        let yaml = "products:\n  - {sku: A, slug: a, title: A, price: 1, currency: XOF}\n  - {sku: A, slug: b, title: B, price: 1, currency: XOF}\n";
        assert!(Catalog::from_yaml(yaml).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Catalog::from_path("/definitely/not/here.yaml"),
            Err(CatalogError::Io(_))
        ));
    }
}

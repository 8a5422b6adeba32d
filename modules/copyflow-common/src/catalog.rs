//! Read-only product catalog.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::error::CatalogError;
use crate::types::ProductRecord;

pub trait ProductCatalog: Send + Sync {
    fn lookup_by_code(&self, code: &str) -> Option<ProductRecord>;

    fn list_all(&self) -> Vec<ProductRecord>;
}

/// Catalog backed by a JSON array of [`ProductRecord`]s, kept in file order.
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    products: Vec<ProductRecord>,
    by_code: HashMap<String, usize>,
}

impl JsonCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_products(products: Vec<ProductRecord>) -> Self {
        let by_code = products
            .iter()
            .enumerate()
            .map(|(i, p)| (p.code.trim().to_string(), i))
            .collect();
        Self { products, by_code }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let products: Vec<ProductRecord> =
            serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), products = products.len(), "Loaded product catalog");
        Ok(Self::from_products(products))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductCatalog for JsonCatalog {
    fn lookup_by_code(&self, code: &str) -> Option<ProductRecord> {
        self.by_code
            .get(code.trim())
            .map(|&i| self.products[i].clone())
    }

    fn list_all(&self) -> Vec<ProductRecord> {
        self.products.clone()
    }
}

/// Entry in the `goods_list` candidate set offered to the recommender.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateGoods {
    pub k3_code: String,
    pub name: String,
    pub price: f64,
    pub formula_source: String,
    pub product_selling_points: String,
}

/// Products worth recommending: positive price and non-blank selling points.
pub fn recommendation_candidates(catalog: &dyn ProductCatalog) -> Vec<CandidateGoods> {
    catalog
        .list_all()
        .into_iter()
        .filter(|p| p.price > 0.0 && !p.selling_points.trim().is_empty())
        .map(|p| CandidateGoods {
            k3_code: p.code,
            name: p.name,
            price: p.price,
            formula_source: p.formula_source,
            product_selling_points: p.core_selling_point,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn product(code: &str, price: f64, selling_points: &str) -> ProductRecord {
        ProductRecord {
            code: code.to_string(),
            name: format!("product {code}"),
            description: String::new(),
            price,
            category: String::new(),
            brand: String::new(),
            core_selling_point: format!("core {code}"),
            selling_points: selling_points.to_string(),
            formula_source: String::new(),
            usage_method: String::new(),
        }
    }

    #[test]
    fn lookup_trims_codes() {
        let catalog = JsonCatalog::from_products(vec![product("03.11.01", 10.0, "x")]);
        assert_eq!(
            catalog.lookup_by_code(" 03.11.01 ").map(|p| p.name),
            Some("product 03.11.01".to_string())
        );
        assert!(catalog.lookup_by_code("missing").is_none());
    }

    #[test]
    fn candidates_skip_unpriced_and_blank_products() {
        let catalog = JsonCatalog::from_products(vec![
            product("a", 10.0, "good"),
            product("b", 0.0, "good"),
            product("c", 5.0, "   "),
        ]);
        let candidates = recommendation_candidates(&catalog);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].k3_code, "a");
        assert_eq!(candidates[0].product_selling_points, "core a");
    }

    #[test]
    fn loads_json_with_field_aliases() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"k3_code": "52.75.01", "name": "Ear Tea", "price": 59.0, "product_selling_points": "calms"}}]"#
        )
        .unwrap();

        let catalog = JsonCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        let record = catalog.lookup_by_code("52.75.01").unwrap();
        assert_eq!(record.selling_points, "calms");
    }

    #[test]
    fn malformed_catalog_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            JsonCatalog::load(file.path()),
            Err(CatalogError::Parse { .. })
        ));
    }
}

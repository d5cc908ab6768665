//! Read-only catalog of shops, fulfillment methods, products and tags.
//!
//! The catalog is owned by neighbouring subsystems. Order Desk loads a
//! snapshot from a YAML fixture at startup and uses it as the authoritative
//! source for prices, tax settings and product details when placing orders.
//!
//! # Fixture format
//!
//! ```yaml
//! shops:
//!   - id: shop-1
//!     name: Example Shop
//!     currencies: [USD]
//!     default_language: en
//!     tax_rate: "0.08"
//! fulfillment_methods:
//!   - id: ground
//!     shop_id: shop-1
//!     name: ground
//!     display_name: Ground
//!     fulfillment_types: [shipping]
//!     pricing:
//!       USD: { rate: "5.00", handling: "1.00" }
//! products:
//!   - id: prod-1
//!     shop_id: shop-1
//!     title: T-Shirt
//!     variants:
//!       - id: var-1
//!         prices: { USD: "19.99" }
//! tags:
//!   - id: tag-1
//!     shop_id: shop-1
//!     name: apparel
//!     slug: apparel
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use order_desk_core::{CurrencyCode, FulfillmentMethodId, ProductId, ShopId, TagId, VariantId};

use crate::models::{FulfillmentType, ImageSizes, ItemAttribute};

/// Errors that can occur while loading a catalog fixture.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Fixture file could not be read.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Fixture is not valid YAML for the catalog schema.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Fixture parsed but is internally inconsistent.
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// A shop orders can be placed in.
#[derive(Debug, Clone, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    /// Currencies orders may be placed in. The first is the default.
    pub currencies: Vec<CurrencyCode>,
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Sales tax applied to taxable items, e.g. `0.08` for 8%.
    #[serde(default)]
    pub tax_rate: Decimal,
}

fn default_language() -> String {
    "en".to_owned()
}

const fn enabled_by_default() -> bool {
    true
}

/// Rate charged for a fulfillment method in one currency.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MethodPrice {
    pub rate: Decimal,
    #[serde(default)]
    pub handling: Decimal,
}

/// A way of getting items to the customer.
#[derive(Debug, Clone, Deserialize)]
pub struct FulfillmentMethod {
    pub id: FulfillmentMethodId,
    pub shop_id: ShopId,
    pub name: String,
    pub display_name: String,
    pub carrier: Option<String>,
    pub group: Option<String>,
    pub fulfillment_types: Vec<FulfillmentType>,
    pub pricing: BTreeMap<CurrencyCode, MethodPrice>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub title: Option<String>,
    pub prices: BTreeMap<CurrencyCode, Decimal>,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
    /// Overrides the product setting when present.
    pub is_taxable: Option<bool>,
    /// Overrides the product setting when present.
    pub tax_code: Option<String>,
    pub images: Option<ImageSizes>,
}

/// A product with its variants.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub title: String,
    pub slug: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default = "enabled_by_default")]
    pub is_taxable: bool,
    pub tax_code: Option<String>,
    pub images: Option<ImageSizes>,
    pub variants: Vec<Variant>,
}

/// A product tag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub shop_id: ShopId,
    pub name: String,
    pub slug: Option<String>,
    pub display_title: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct CatalogFixture {
    shops: Vec<Shop>,
    #[serde(default)]
    fulfillment_methods: Vec<FulfillmentMethod>,
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    tags: Vec<Tag>,
}

/// In-memory catalog snapshot with ID lookups.
#[derive(Debug, Default)]
pub struct Catalog {
    shops: HashMap<ShopId, Shop>,
    fulfillment_methods: HashMap<FulfillmentMethodId, FulfillmentMethod>,
    products: HashMap<ProductId, Product>,
    tags: HashMap<TagId, Tag>,
}

impl Catalog {
    /// Load and validate a catalog fixture from disk.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            shops = catalog.shops.len(),
            products = catalog.products.len(),
            fulfillment_methods = catalog.fulfillment_methods.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse and validate a catalog fixture.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed YAML and
    /// `CatalogError::Invalid` for duplicate IDs or dangling references.
    pub fn from_yaml_str(raw: &str) -> Result<Self, CatalogError> {
        let fixture: CatalogFixture = serde_yaml::from_str(raw)?;

        let mut catalog = Self::default();
        for shop in fixture.shops {
            if shop.currencies.is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "shop {} has no currencies",
                    shop.id
                )));
            }
            insert_unique(&mut catalog.shops, shop.id.clone(), shop, "shop")?;
        }
        for tag in fixture.tags {
            catalog.require_shop(&tag.shop_id, "tag", tag.id.as_str())?;
            insert_unique(&mut catalog.tags, tag.id.clone(), tag, "tag")?;
        }
        for method in fixture.fulfillment_methods {
            catalog.require_shop(&method.shop_id, "fulfillment method", method.id.as_str())?;
            insert_unique(
                &mut catalog.fulfillment_methods,
                method.id.clone(),
                method,
                "fulfillment method",
            )?;
        }
        for product in fixture.products {
            catalog.require_shop(&product.shop_id, "product", product.id.as_str())?;
            if let Some(tag_id) = product
                .tag_ids
                .iter()
                .find(|id| !catalog.tags.contains_key(*id))
            {
                return Err(CatalogError::Invalid(format!(
                    "product {} references unknown tag {tag_id}",
                    product.id
                )));
            }
            let duplicate_variant = {
                let mut seen = HashSet::new();
                product
                    .variants
                    .iter()
                    .find(|v| !seen.insert(&v.id))
                    .map(|v| v.id.clone())
            };
            if let Some(dup) = duplicate_variant {
                return Err(CatalogError::Invalid(format!(
                    "product {} has duplicate variant {dup}",
                    product.id
                )));
            }
            insert_unique(&mut catalog.products, product.id.clone(), product, "product")?;
        }

        Ok(catalog)
    }

    fn require_shop(&self, shop_id: &ShopId, kind: &str, id: &str) -> Result<(), CatalogError> {
        if self.shops.contains_key(shop_id) {
            Ok(())
        } else {
            Err(CatalogError::Invalid(format!(
                "{kind} {id} references unknown shop {shop_id}"
            )))
        }
    }

    /// Look up a shop.
    #[must_use]
    pub fn shop(&self, id: &ShopId) -> Option<&Shop> {
        self.shops.get(id)
    }

    /// Look up an enabled fulfillment method offered by `shop_id`.
    #[must_use]
    pub fn fulfillment_method(
        &self,
        shop_id: &ShopId,
        id: &FulfillmentMethodId,
    ) -> Option<&FulfillmentMethod> {
        self.fulfillment_methods
            .get(id)
            .filter(|method| method.enabled && &method.shop_id == shop_id)
    }

    /// Look up a product variant.
    #[must_use]
    pub fn variant(
        &self,
        product_id: &ProductId,
        variant_id: &VariantId,
    ) -> Option<(&Product, &Variant)> {
        let product = self.products.get(product_id)?;
        let variant = product.variants.iter().find(|v| &v.id == variant_id)?;
        Some((product, variant))
    }

    /// Resolve tag IDs, skipping any that are unknown.
    #[must_use]
    pub fn tags_by_ids(&self, ids: &[TagId]) -> Vec<Tag> {
        ids.iter().filter_map(|id| self.tags.get(id)).cloned().collect()
    }

    /// Number of shops (used for startup diagnostics).
    #[must_use]
    pub fn shop_count(&self) -> usize {
        self.shops.len()
    }

    /// Number of products (used for startup diagnostics).
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

fn insert_unique<K, V>(
    map: &mut HashMap<K, V>,
    key: K,
    value: V,
    kind: &str,
) -> Result<(), CatalogError>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
{
    if map.contains_key(&key) {
        return Err(CatalogError::Invalid(format!("duplicate {kind} id {key}")));
    }
    map.insert(key, value);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
shops:
  - id: shop-1
    name: Test Shop
    currencies: [USD, EUR]
    tax_rate: "0.1"
fulfillment_methods:
  - id: ground
    shop_id: shop-1
    name: ground
    display_name: Ground
    carrier: Post
    fulfillment_types: [shipping]
    pricing:
      USD: { rate: "5.00", handling: "1.50" }
  - id: retired
    shop_id: shop-1
    name: retired
    display_name: Retired
    fulfillment_types: [shipping]
    enabled: false
    pricing:
      USD: { rate: "1.00" }
products:
  - id: prod-1
    shop_id: shop-1
    title: Shirt
    tag_ids: [tag-b]
    variants:
      - id: var-1
        title: Medium
        prices: { USD: "19.99", EUR: "18.50" }
        attributes:
          - { label: Size, value: M }
tags:
  - id: tag-b
    shop_id: shop-1
    name: apparel
"#;

    #[test]
    fn test_parse_fixture() {
        let catalog = Catalog::from_yaml_str(FIXTURE).unwrap();
        let shop = catalog.shop(&ShopId::new("shop-1")).unwrap();
        assert_eq!(shop.default_language, "en");
        assert_eq!(shop.tax_rate, Decimal::new(1, 1));
        assert_eq!(shop.currencies, [CurrencyCode::USD, CurrencyCode::EUR]);

        let (product, variant) = catalog
            .variant(&ProductId::new("prod-1"), &VariantId::new("var-1"))
            .unwrap();
        assert!(product.is_taxable);
        assert_eq!(variant.prices[&CurrencyCode::EUR], Decimal::new(1850, 2));
        assert_eq!(variant.attributes.len(), 1);
    }

    #[test]
    fn test_fulfillment_method_lookup_respects_shop_and_enabled() {
        let catalog = Catalog::from_yaml_str(FIXTURE).unwrap();
        let shop = ShopId::new("shop-1");
        let method = catalog
            .fulfillment_method(&shop, &FulfillmentMethodId::new("ground"))
            .unwrap();
        assert_eq!(method.pricing[&CurrencyCode::USD].handling, Decimal::new(150, 2));
        assert!(catalog
            .fulfillment_method(&shop, &FulfillmentMethodId::new("retired"))
            .is_none());
        assert!(catalog
            .fulfillment_method(&ShopId::new("other"), &FulfillmentMethodId::new("ground"))
            .is_none());
    }

    #[test]
    fn test_tags_by_ids_skips_unknown() {
        let catalog = Catalog::from_yaml_str(FIXTURE).unwrap();
        let tags = catalog.tags_by_ids(&[TagId::new("tag-b"), TagId::new("nope")]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "apparel");
    }

    #[test]
    fn test_rejects_dangling_shop_reference() {
        let raw = r"
shops: []
products:
  - id: p
    shop_id: missing
    title: X
    variants: []
";
        assert!(matches!(
            Catalog::from_yaml_str(raw),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let raw = r"
shops:
  - { id: s, name: A, currencies: [USD] }
  - { id: s, name: B, currencies: [USD] }
";
        let err = Catalog::from_yaml_str(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate shop id s"));
    }

    #[test]
    fn test_rejects_unknown_tag() {
        let raw = r"
shops:
  - { id: s, name: A, currencies: [USD] }
products:
  - id: p
    shop_id: s
    title: X
    tag_ids: [ghost]
    variants: []
";
        assert!(Catalog::from_yaml_str(raw).is_err());
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        assert!(matches!(
            Catalog::from_yaml_str("shops: {"),
            Err(CatalogError::Parse(_))
        ));
    }
}

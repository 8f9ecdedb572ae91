use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::company::CompanyId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// Catalog entry. `gtin` is globally unique; the
/// `(name, price, brand, net_content, company_id)` combination is unique per
/// catalog. `conversion_factor` is how many of the stated measurement unit
/// make up one sale package (a 500 g bag has unit "gramos", factor 500).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub gtin: String,
    pub name: String,
    pub brand: String,
    pub measurement_unit: String,
    pub conversion_factor: f64,
    pub price: Decimal,
    pub company_id: CompanyId,
    pub net_content: Option<Decimal>,
    pub family: Option<String>,
    pub segment: Option<String>,
}

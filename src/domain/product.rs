use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Money, ProductId};

/// Represents a product in the catalog.
///
/// `stock` is written only by the stock ledger during order placement and by
/// catalog administration; every other field only by catalog administration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            category: self.category.clone(),
        }
    }
}

/// The product fields a cart line is joined with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub category: String,
}

/// Parameters for creating a product.
#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    /// Defaults to zero when omitted
    pub stock: Option<u32>,
}

impl ProductCreate {
    pub fn validate(&self) -> Result<(), String> {
        let missing_text = [&self.name, &self.description, &self.category]
            .iter()
            .any(|field| field.trim().is_empty());
        if missing_text || self.price.is_zero() {
            return Err("name, description, price, category, and stock are required fields".to_string());
        }
        Ok(())
    }
}

/// Partial update of a product. Absent fields are left untouched, as is a zero price.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub stock: Option<u32>,
}

impl ProductPatch {
    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name.filter(|n| !n.trim().is_empty()) {
            product.name = name;
        }
        if let Some(description) = self.description.filter(|d| !d.trim().is_empty()) {
            product.description = description;
        }
        if let Some(price) = self.price.filter(|p| !p.is_zero()) {
            product.price = price;
        }
        if let Some(category) = self.category.filter(|c| !c.trim().is_empty()) {
            product.category = category;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
    }
}

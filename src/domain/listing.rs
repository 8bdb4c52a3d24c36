use serde::{Deserialize, Serialize};

use super::{Money, Product};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Shape of a catalog listing request: filter, sort, and page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingQuery {
    pub page: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// Case-insensitive substring of the product name
    pub search: Option<String>,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    /// Unknown or missing values fall back to newest first.
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some("oldest") => Self::Oldest,
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            _ => Self::Newest,
        }
    }
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            category: None,
            min_price: None,
            max_price: None,
            search: None,
            sort: SortOrder::Newest,
        }
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: usize,
    pub products: Vec<Product>,
}

impl ListingQuery {
    /// Canonical form: equal results imply equal normalized queries.
    pub fn normalized(&self) -> Self {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
            category: clean(&self.category),
            min_price: self.min_price,
            max_price: self.max_price,
            search: clean(&self.search).map(|s| s.to_lowercase()),
            sort: self.sort,
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if &product.category != category {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        match &self.search {
            Some(needle) => product.name.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }

    /// Filter, sort, and paginate `products`.
    pub fn apply(&self, products: Vec<Product>) -> ListingPage {
        let query = self.normalized();
        let mut matching: Vec<Product> = products.into_iter().filter(|p| query.matches(p)).collect();

        // Ties break on id so pages are stable.
        match query.sort {
            SortOrder::Newest => matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))),
            SortOrder::Oldest => matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))),
            SortOrder::PriceAsc => matching.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
            SortOrder::PriceDesc => matching.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id))),
        }

        let total = matching.len();
        let limit = query.limit as usize;
        let skip = (query.page as usize - 1).saturating_mul(limit);
        let products = matching.into_iter().skip(skip).take(limit).collect();

        ListingPage {
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total.div_ceil(limit),
            products,
        }
    }
}

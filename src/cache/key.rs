use crate::domain::{ListingQuery, ProductId, SortOrder};

/// Namespace of single-product entries.
pub const PRODUCT_PREFIX: &str = "product:";
/// Namespace of every listing entry. Listing keys cannot be enumerated from a
/// product write, so writes invalidate this whole prefix.
pub const LISTING_PREFIX: &str = "products:";

/// Typed shape of a cacheable catalog read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Product(ProductId),
    Listing(ListingQuery),
}

impl CacheKey {
    pub fn product(id: &ProductId) -> Self {
        Self::Product(id.clone())
    }

    /// Listing keys are built from the normalized query, so equivalent
    /// requests share one entry.
    pub fn listing(query: &ListingQuery) -> Self {
        Self::Listing(query.normalized())
    }

    /// Canonical string form.
    ///
    /// `product:<id>` or `products:page=..&limit=..&category=..&min=..&max=..&search=..&sort=..`
    /// with `%`, `&` and `=` percent-escaped inside values. Absent filters encode as empty.
    pub fn encode(&self) -> String {
        match self {
            Self::Product(id) => format!("{}{}", PRODUCT_PREFIX, id),
            Self::Listing(query) => {
                let q = query.normalized();
                let text = |value: &Option<String>| value.as_deref().map(escape).unwrap_or_default();
                let cents = |value: Option<crate::domain::Money>| {
                    value.map(|m| m.cents().to_string()).unwrap_or_default()
                };
                format!(
                    "{}page={}&limit={}&category={}&min={}&max={}&search={}&sort={}",
                    LISTING_PREFIX,
                    q.page,
                    q.limit,
                    text(&q.category),
                    cents(q.min_price),
                    cents(q.max_price),
                    text(&q.search),
                    sort_name(q.sort),
                )
            }
        }
    }
}

fn sort_name(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Newest => "newest",
        SortOrder::Oldest => "oldest",
        SortOrder::PriceAsc => "price_asc",
        SortOrder::PriceDesc => "price_desc",
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            other => out.push(other),
        }
    }
    out
}

/// A single invalidation: one exact key or a whole namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Key(String),
    Prefix(String),
}

impl Invalidation {
    pub fn covers(&self, encoded_key: &str) -> bool {
        match self {
            Self::Key(key) => key == encoded_key,
            Self::Prefix(prefix) => encoded_key.starts_with(prefix.as_str()),
        }
    }

    /// True when delivering `self` also delivers `other`.
    pub fn subsumes(&self, other: &Invalidation) -> bool {
        match (self, other) {
            (Self::Prefix(prefix), Self::Prefix(inner)) => inner.starts_with(prefix.as_str()),
            (_, Self::Key(key)) => self.covers(key),
            (Self::Key(_), Self::Prefix(_)) => false,
        }
    }

    /// The whole namespace the invalidation belongs to.
    pub fn widened(&self) -> Invalidation {
        match self {
            Self::Key(key) if key.starts_with(LISTING_PREFIX) => Self::Prefix(LISTING_PREFIX.to_string()),
            Self::Key(key) if key.starts_with(PRODUCT_PREFIX) => Self::Prefix(PRODUCT_PREFIX.to_string()),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Money;

    #[test]
    fn test_product_key() {
        assert_eq!(CacheKey::product(&ProductId::new("product_7")).encode(), "product:product_7");
    }

    #[test]
    fn test_equivalent_listings_share_a_key() {
        let a = ListingQuery { search: Some(" Mug ".into()), page: 0, ..ListingQuery::default() };
        let b = ListingQuery { search: Some("mug".into()), page: 1, ..ListingQuery::default() };
        assert_eq!(CacheKey::listing(&a).encode(), CacheKey::listing(&b).encode());
        assert_eq!(
            CacheKey::listing(&b).encode(),
            "products:page=1&limit=10&category=&min=&max=&search=mug&sort=newest"
        );
    }

    #[test]
    fn test_values_cannot_forge_other_fields() {
        let sneaky = ListingQuery { category: Some("a&sort=oldest".into()), ..ListingQuery::default() };
        let encoded = CacheKey::listing(&sneaky).encode();
        assert!(encoded.contains("category=a%26sort%3Doldest"));
        assert!(encoded.ends_with("&sort=newest"));

        let priced = ListingQuery { min_price: Some(Money::from_cents(500)), ..ListingQuery::default() };
        assert!(CacheKey::listing(&priced).encode().contains("&min=500&"));
    }

    #[test]
    fn test_namespaces_do_not_overlap() {
        let listing = Invalidation::Prefix(LISTING_PREFIX.to_string());
        let product_key = CacheKey::product(&ProductId::new("product_1")).encode();
        assert!(!listing.covers(&product_key));
        assert!(listing.covers(&CacheKey::listing(&ListingQuery::default()).encode()));
        assert!(Invalidation::Key(product_key.clone()).covers(&product_key));
    }

    #[test]
    fn test_widening_stays_in_namespace() {
        let product_key = Invalidation::Key(CacheKey::product(&ProductId::new("product_1")).encode());
        let widened = product_key.widened();
        assert_eq!(widened, Invalidation::Prefix(PRODUCT_PREFIX.to_string()));
        assert!(widened.subsumes(&product_key));
        assert!(!widened.covers(&CacheKey::listing(&ListingQuery::default()).encode()));

        let listing_key = Invalidation::Key(CacheKey::listing(&ListingQuery::default()).encode());
        assert_eq!(listing_key.widened(), Invalidation::Prefix(LISTING_PREFIX.to_string()));
        assert!(!product_key.subsumes(&widened));
    }
}

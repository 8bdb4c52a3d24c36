use crate::domain::Money;

/// Stock ledger actions on a Product.
///
/// Each action is evaluated inside the product actor, so the availability
/// check and the decrement happen in one atomic step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductAction {
    /// Reports the current stock level without modifying it.
    CheckStock,
    /// Decrements stock by the quantity if at least that much is available.
    ///
    /// Never an error when stock is short: the outcome is
    /// [`ProductActionResult::Insufficient`] and nothing is mutated.
    TryReserve(u32),
    /// Compensating increment for a reservation that must be rolled back.
    Release(u32),
}

/// Results from ProductActions - variants match ProductAction outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductActionResult {
    StockLevel(u32),
    /// Reservation held. `price` is the unit price at the moment of reservation.
    Reserved { price: Money, remaining: u32 },
    Insufficient { available: u32 },
    Released { stock: u32 },
}

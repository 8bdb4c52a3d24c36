use chrono::Utc;

use crate::actor_framework::Entity;
use crate::domain::{Product, ProductCreate, ProductId, ProductPatch};
use super::actions::{ProductAction, ProductActionResult};

impl Entity for Product {
    type Id = ProductId;
    type CreateParams = ProductCreate;
    type Patch = ProductPatch;
    type Action = ProductAction;
    type ActionResult = ProductActionResult;

    fn id(&self) -> &ProductId { &self.id }

    fn from_create(id: ProductId, params: ProductCreate) -> Result<Self, String> {
        params.validate()?;
        Ok(Self {
            id,
            name: params.name,
            description: params.description,
            price: params.price,
            stock: params.stock.unwrap_or(0),
            category: params.category,
            created_at: Utc::now(),
        })
    }

    fn on_update(&mut self, patch: ProductPatch) -> Result<(), String> {
        patch.apply(self);
        Ok(())
    }

    /// # Errors
    /// Returns an error only if a release would overflow the stock counter.
    fn handle_action(&mut self, action: ProductAction) -> Result<ProductActionResult, String> {
        match action {
            ProductAction::CheckStock => Ok(ProductActionResult::StockLevel(self.stock)),
            ProductAction::TryReserve(quantity) => {
                if self.stock >= quantity {
                    self.stock -= quantity;
                    Ok(ProductActionResult::Reserved { price: self.price, remaining: self.stock })
                } else {
                    Ok(ProductActionResult::Insufficient { available: self.stock })
                }
            }
            ProductAction::Release(quantity) => {
                self.stock = self
                    .stock
                    .checked_add(quantity)
                    .ok_or_else(|| format!("Releasing {} would overflow stock of {}", quantity, self.id))?;
                Ok(ProductActionResult::Released { stock: self.stock })
            }
        }
    }
}

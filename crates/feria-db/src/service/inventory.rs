//! Inventory ledger surface: direct movements, stock reads, history.

use tracing::info;

use feria_core::dto::{MovementFilter, NewMovement, StockSummary};
use feria_core::phase::{self, GatedAction};
use feria_core::validation::{
    require_exclusive_reference, require_no_duplicate_out, require_stock, validate_quantity, validate_text, Rules,
};
use feria_core::{CoreError, InventoryMovement, MovementType};

use super::{found, new_id, rejected, Services};
use crate::error::ServiceResult;
use crate::repository::event::EventRepository;
use crate::repository::exchange::ExchangeRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

impl Services {
    /// Appends a ledger entry directly.
    ///
    /// IN entries stock a product before its fair opens. OUT entries need
    /// an active fair and enough stock, and at most one OUT may reference a
    /// given (product, sale) pair.
    pub async fn create_inventory_movement(&self, input: NewMovement) -> ServiceResult<InventoryMovement> {
        const OP: &str = "create_inventory_movement";

        require_exclusive_reference(input.sale_id.as_deref(), input.change_id.as_deref())
            .map_err(|e| rejected(OP, e))?;

        let mut tx = self.db.begin_write().await?;
        let product = found(
            OP,
            ProductRepository::find(tx.conn(), &input.product_id).await?,
            "Product",
            &input.product_id,
        )?;
        let event = found(
            OP,
            EventRepository::find(tx.conn(), &product.event_id).await?,
            "Event",
            &product.event_id,
        )?;

        let sale = match &input.sale_id {
            Some(sale_id) => Some(found(OP, SaleRepository::find(tx.conn(), sale_id).await?, "Sale", sale_id)?),
            None => None,
        };
        if let Some(change_id) = &input.change_id {
            found(OP, ExchangeRepository::find(tx.conn(), change_id).await?, "ProductChange", change_id)?;
        }

        let (available, sale_outs) = match input.movement_type {
            MovementType::Out => {
                let available = InventoryRepository::totals(tx.conn(), &product.id).await?.stock();
                let outs = match &sale {
                    Some(sale) => InventoryRepository::count_sale_outs(tx.conn(), &product.id, &sale.id).await?,
                    None => 0,
                };
                (available, outs)
            }
            MovementType::In => (0, 0),
        };

        let now = self.now();
        let action = match input.movement_type {
            MovementType::In => GatedAction::StockIn,
            MovementType::Out => GatedAction::StockOut,
        };

        Rules::new()
            .check(|| Ok(validate_quantity(input.quantity)?))
            .check(|| Ok(validate_text("reason", &input.reason)?))
            .check(|| phase::require(&event, now, action).map(|_| ()))
            .check(|| match &sale {
                Some(sale) if sale.event_id != product.event_id => Err(CoreError::mismatch(format!(
                    "sale {} belongs to event {}, product {} to event {}",
                    sale.id, sale.event_id, product.id, product.event_id
                ))),
                _ => Ok(()),
            })
            .check(|| match (input.movement_type, &sale) {
                (MovementType::Out, Some(sale)) => require_no_duplicate_out(sale_outs, &product.id, &sale.id),
                _ => Ok(()),
            })
            .check(|| match input.movement_type {
                MovementType::Out => require_stock(&product.id, available, input.quantity),
                MovementType::In => Ok(()),
            })
            .run()
            .map_err(|e| rejected(OP, e))?;

        let movement = InventoryMovement {
            id: new_id(),
            movement_type: input.movement_type,
            quantity: input.quantity,
            reason: input.reason.trim().to_string(),
            product_id: product.id.clone(),
            sale_id: input.sale_id.clone(),
            change_id: input.change_id.clone(),
            created_at: now,
        };

        InventoryRepository::append(tx.conn(), &movement).await?;
        tx.commit().await?;

        info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            "Movement appended"
        );
        Ok(movement)
    }

    /// Σ IN − Σ OUT for an existing product.
    pub async fn current_stock(&self, product_id: &str) -> ServiceResult<i64> {
        Ok(self.stock_summary(product_id).await?.stock)
    }

    pub async fn stock_summary(&self, product_id: &str) -> ServiceResult<StockSummary> {
        found(
            "stock_summary",
            self.db.products().get_by_id(product_id).await?,
            "Product",
            product_id,
        )?;
        let totals = InventoryRepository::totals(self.db.pool(), product_id).await?;

        Ok(StockSummary {
            product_id: product_id.to_string(),
            total_in: totals.total_in,
            total_out: totals.total_out,
            stock: totals.stock(),
        })
    }

    pub async fn list_movements(&self, filter: MovementFilter) -> ServiceResult<Vec<InventoryMovement>> {
        Ok(self.db.inventory().list(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::Fixture;
    use feria_core::{Product, ValidationError, REASON_DIRECT_SALE};

    fn movement(product: &Product, movement_type: MovementType, quantity: i64) -> NewMovement {
        NewMovement {
            product_id: product.id.clone(),
            movement_type,
            quantity,
            reason: "restock from workshop".to_string(),
            sale_id: None,
            change_id: None,
        }
    }

    #[tokio::test]
    async fn test_stock_in_only_while_scheduled() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 0).await;

        fx.services
            .create_inventory_movement(movement(&mug, MovementType::In, 4))
            .await
            .unwrap();
        assert_eq!(fx.stock(&mug).await, 4);

        fx.open();
        let err = fx
            .services
            .create_inventory_movement(movement(&mug, MovementType::In, 1))
            .await
            .unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InvalidState { .. })));

        fx.finish();
        let err = fx
            .services
            .create_inventory_movement(movement(&mug, MovementType::In, 1))
            .await
            .unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InvalidState { .. })));
        assert_eq!(fx.stock(&mug).await, 4);
    }

    #[tokio::test]
    async fn test_stock_out_needs_active_event_and_stock() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 3).await;

        let err = fx
            .services
            .create_inventory_movement(movement(&mug, MovementType::Out, 1))
            .await
            .unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InvalidState { .. })));

        fx.open();
        let err = fx
            .services
            .create_inventory_movement(movement(&mug, MovementType::Out, 4))
            .await
            .unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InsufficientStock { .. })));

        fx.services
            .create_inventory_movement(movement(&mug, MovementType::Out, 1))
            .await
            .unwrap();

        let summary = fx.services.stock_summary(&mug.id).await.unwrap();
        assert_eq!((summary.total_in, summary.total_out, summary.stock), (3, 1, 2));
    }

    #[tokio::test]
    async fn test_sale_and_change_are_mutually_exclusive() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 3).await;

        let mut both = movement(&mug, MovementType::In, 1);
        both.sale_id = Some("s-1".to_string());
        both.change_id = Some("c-1".to_string());

        let err = fx.services.create_inventory_movement(both).await.unwrap_err();
        assert!(matches!(
            err.as_rule(),
            Some(CoreError::Validation(ValidationError::MutuallyExclusive { .. }))
        ));
    }

    #[tokio::test]
    async fn test_second_out_for_a_sale_is_a_duplicate() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        fx.open();

        let sale = fx.sell(&mug, 1).await;
        let mut again = movement(&mug, MovementType::Out, 1);
        again.sale_id = Some(sale.id.clone());
        again.reason = REASON_DIRECT_SALE.to_string();

        let err = fx.services.create_inventory_movement(again).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::DuplicateOperation { .. })));
        assert_eq!(fx.stock(&mug).await, 4);
    }

    #[tokio::test]
    async fn test_stock_of_unknown_product() {
        let fx = Fixture::new().await;

        let err = fx.services.current_stock("missing").await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_ledger_history_by_event() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        fx.open();
        fx.sell(&mug, 2).await;

        let history = fx
            .services
            .list_movements(MovementFilter {
                event_id: Some(fx.event.id.clone()),
                ..MovementFilter::default()
            })
            .await
            .unwrap();

        let kinds: Vec<MovementType> = history.iter().map(|m| m.movement_type).collect();
        assert_eq!(kinds, vec![MovementType::In, MovementType::Out]);
    }
}

//! # Product Exchange Workflow
//!
//! ```text
//! no earlier exchange ─► sale ACTIVE, event ACTIVE
//!   ─► returned ≠ delivered, both in the sale's event and artisan
//!   ─► qty ≤ sold ─► delivered stock ≥ qty
//!   ─► value difference ≥ 0 ─► payment of the difference coherent
//!   ─► INSERT change + IN (returned) + OUT (delivered)
//!      [+ sale = CHANGED when qty == sold]                       [one tx]
//! ```
//!
//! A partial exchange leaves the sale ACTIVE, yet the sale can never be
//! exchanged again.

use tracing::info;

use feria_core::dto::{ExchangeFilter, NewExchange};
use feria_core::phase::{self, GatedAction};
use feria_core::validation::{
    exchange_value_difference, require_exchange_payment_coherence, require_exchange_products, require_no_exchange,
    require_sale_active, require_stock, require_within_sold, validate_quantity, Rules,
};
use feria_core::{
    InventoryMovement, MovementType, ProductChange, SaleState, REASON_EXCHANGE_DELIVERY, REASON_EXCHANGE_RETURN,
};

use super::{found, new_id, rejected, Services};
use crate::error::ServiceResult;
use crate::repository::event::EventRepository;
use crate::repository::exchange::ExchangeRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

impl Services {
    pub async fn create_exchange(&self, input: NewExchange) -> ServiceResult<ProductChange> {
        const OP: &str = "create_exchange";

        let mut tx = self.db.begin_write().await?;
        let sale = found(OP, SaleRepository::find(tx.conn(), &input.sale_id).await?, "Sale", &input.sale_id)?;
        let event = found(OP, EventRepository::find(tx.conn(), &sale.event_id).await?, "Event", &sale.event_id)?;
        let returned = found(
            OP,
            ProductRepository::find(tx.conn(), &input.product_returned_id).await?,
            "Product",
            &input.product_returned_id,
        )?;
        let delivered = found(
            OP,
            ProductRepository::find(tx.conn(), &input.product_delivered_id).await?,
            "Product",
            &input.product_delivered_id,
        )?;
        let existing = ExchangeRepository::find_by_sale(tx.conn(), &sale.id).await?;
        let available = InventoryRepository::totals(tx.conn(), &delivered.id).await?.stock();
        let now = self.now();

        Rules::new()
            .check(|| require_no_exchange(existing.as_ref(), &sale.id))
            .check(|| Ok(validate_quantity(input.quantity)?))
            .check(|| require_sale_active(&sale))
            .check(|| phase::require(&event, now, GatedAction::Exchange).map(|_| ()))
            .check(|| require_exchange_products(&sale, &returned, &delivered))
            .check(|| require_within_sold(input.quantity, &sale))
            .check(|| require_stock(&delivered.id, available, input.quantity))
            .run()
            .map_err(|e| rejected(OP, e))?;

        let value_difference = exchange_value_difference(returned.price(), delivered.price(), input.quantity)
            .map_err(|e| rejected(OP, e))?;
        require_exchange_payment_coherence(input.payment_method_difference, input.card_fee_difference_cents)
            .map_err(|e| rejected(OP, e))?;

        let change = ProductChange {
            id: new_id(),
            sale_id: sale.id.clone(),
            product_returned_id: returned.id.clone(),
            product_delivered_id: delivered.id.clone(),
            quantity: input.quantity,
            delivered_product_price_cents: delivered.price_cents,
            value_difference_cents: value_difference.cents(),
            payment_method_difference: input.payment_method_difference,
            card_fee_difference_cents: input.card_fee_difference_cents,
            created_at: now,
        };
        let back_in = InventoryMovement {
            id: new_id(),
            movement_type: MovementType::In,
            quantity: input.quantity,
            reason: REASON_EXCHANGE_RETURN.to_string(),
            product_id: returned.id.clone(),
            sale_id: None,
            change_id: Some(change.id.clone()),
            created_at: now,
        };
        let out = InventoryMovement {
            id: new_id(),
            movement_type: MovementType::Out,
            quantity: input.quantity,
            reason: REASON_EXCHANGE_DELIVERY.to_string(),
            product_id: delivered.id.clone(),
            sale_id: None,
            change_id: Some(change.id.clone()),
            created_at: now,
        };

        ExchangeRepository::insert(tx.conn(), &change).await?;
        InventoryRepository::append(tx.conn(), &back_in).await?;
        InventoryRepository::append(tx.conn(), &out).await?;

        let full = input.quantity == sale.quantity_sold;
        if full {
            SaleRepository::transition(tx.conn(), &sale.id, SaleState::Changed, now).await?;
        }

        tx.commit().await?;

        info!(
            change_id = %change.id,
            sale_id = %change.sale_id,
            quantity = change.quantity,
            value_difference = change.value_difference_cents,
            sale_changed = full,
            "Exchange recorded"
        );
        Ok(change)
    }

    pub async fn find_exchange(&self, id: &str) -> ServiceResult<ProductChange> {
        found("find_exchange", self.db.exchanges().get_by_id(id).await?, "ProductChange", id)
    }

    pub async fn list_exchanges(&self, filter: ExchangeFilter) -> ServiceResult<Vec<ProductChange>> {
        Ok(self.db.exchanges().list(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::Fixture;
    use feria_core::dto::MovementFilter;
    use feria_core::{CoreError, PaymentMethod, Product, Sale};

    fn swap(sale: &Sale, returned: &Product, delivered: &Product, quantity: i64) -> NewExchange {
        NewExchange {
            sale_id: sale.id.clone(),
            product_returned_id: returned.id.clone(),
            product_delivered_id: delivered.id.clone(),
            quantity,
            payment_method_difference: None,
            card_fee_difference_cents: None,
        }
    }

    #[tokio::test]
    async fn test_full_exchange_marks_sale_changed() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        let bowl = fx.product(&ana, "Serving Bowl", 1800, 5).await;
        fx.open();

        let sale = fx.sell(&mug, 2).await;
        let change = fx.services.create_exchange(swap(&sale, &mug, &bowl, 2)).await.unwrap();

        assert_eq!(change.value_difference_cents, 0);
        assert_eq!(change.delivered_product_price_cents, 1800);
        assert_eq!(fx.services.find_sale(&sale.id).await.unwrap().state, SaleState::Changed);
        assert_eq!(fx.stock(&mug).await, 5);
        assert_eq!(fx.stock(&bowl).await, 3);

        let ledger = fx
            .services
            .list_movements(MovementFilter {
                change_id: Some(change.id.clone()),
                ..MovementFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|m| m.sale_id.is_none()));
    }

    #[tokio::test]
    async fn test_partial_exchange_blocks_a_second_one() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        let bowl = fx.product(&ana, "Serving Bowl", 2500, 5).await;
        fx.open();

        let sale = fx.sell(&mug, 3).await;
        let mut first = swap(&sale, &mug, &bowl, 1);
        first.payment_method_difference = Some(PaymentMethod::Card);
        first.card_fee_difference_cents = Some(28);
        let change = fx.services.create_exchange(first).await.unwrap();

        assert_eq!(change.value_difference_cents, 700);
        assert_eq!(fx.services.find_sale(&sale.id).await.unwrap().state, SaleState::Active);

        let err = fx.services.create_exchange(swap(&sale, &mug, &bowl, 1)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::DuplicateOperation { .. })));
        assert_eq!(fx.stock(&bowl).await, 4);
        assert_eq!(
            fx.services
                .list_exchanges(ExchangeFilter {
                    sale_id: Some(sale.id.clone()),
                    ..ExchangeFilter::default()
                })
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_exchanged_sale_cannot_be_exchanged_again() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        let bowl = fx.product(&ana, "Serving Bowl", 1800, 5).await;
        fx.open();

        let sale = fx.sell(&mug, 2).await;
        fx.services.create_exchange(swap(&sale, &mug, &bowl, 2)).await.unwrap();
        assert_eq!(fx.services.find_sale(&sale.id).await.unwrap().state, SaleState::Changed);

        for quantity in [1, 2] {
            let err = fx
                .services
                .create_exchange(swap(&sale, &mug, &bowl, quantity))
                .await
                .unwrap_err();
            assert!(matches!(err.as_rule(), Some(CoreError::DuplicateOperation { .. })));
        }
        assert_eq!(fx.stock(&bowl).await, 3);
    }

    #[tokio::test]
    async fn test_downgrade_is_refused() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let bowl = fx.product(&ana, "Serving Bowl", 3500, 5).await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        fx.open();

        let sale = fx.sell(&bowl, 1).await;
        let err = fx.services.create_exchange(swap(&sale, &bowl, &mug, 1)).await.unwrap_err();

        assert_eq!(
            err.as_rule(),
            Some(&CoreError::DowngradeNotAllowed {
                value_difference: -1700
            })
        );
        assert_eq!(fx.stock(&mug).await, 5);
        assert_eq!(fx.stock(&bowl).await, 4);
    }

    #[tokio::test]
    async fn test_exchange_quantity_and_products_checked() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let luis = fx.artisan("Luis").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        let bowl = fx.product(&ana, "Serving Bowl", 1800, 5).await;
        let spoon = fx.product(&luis, "Carved Spoon", 1800, 5).await;
        fx.open();

        let sale = fx.sell(&mug, 1).await;

        let err = fx.services.create_exchange(swap(&sale, &mug, &bowl, 2)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::Validation(_))));

        let err = fx.services.create_exchange(swap(&sale, &mug, &mug, 1)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::CrossEntityMismatch { .. })));

        let err = fx.services.create_exchange(swap(&sale, &mug, &spoon, 1)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::CrossEntityMismatch { .. })));
    }

    #[tokio::test]
    async fn test_exchange_difference_payment_coherence() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        let bowl = fx.product(&ana, "Serving Bowl", 2500, 5).await;
        fx.open();

        let sale = fx.sell(&mug, 1).await;

        let mut card_without_fee = swap(&sale, &mug, &bowl, 1);
        card_without_fee.payment_method_difference = Some(PaymentMethod::Card);
        let err = fx.services.create_exchange(card_without_fee).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::PaymentCoherenceViolation { .. })));

        let mut fee_without_card = swap(&sale, &mug, &bowl, 1);
        fee_without_card.card_fee_difference_cents = Some(10);
        let err = fx.services.create_exchange(fee_without_card).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::PaymentCoherenceViolation { .. })));

        assert!(fx.services.list_exchanges(ExchangeFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_requires_delivered_stock() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        let bowl = fx.product(&ana, "Serving Bowl", 1800, 1).await;
        fx.open();

        let sale = fx.sell(&mug, 2).await;
        let err = fx.services.create_exchange(swap(&sale, &mug, &bowl, 2)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InsufficientStock { .. })));
    }
}

//! # Sale Workflow
//!
//! ```text
//! create_sale:  event ACTIVE ─► product/artisan in context ─► stock ≥ qty
//!               ─► INSERT sale (ACTIVE) + OUT "direct sale"       [one tx]
//!
//! cancel_sale:  sale ACTIVE ─► event ACTIVE ─► no exchange recorded
//!               ─► sale = CANCELLED + IN "sale cancellation"      [one tx]
//!
//! create_multi_sale: pre-validate basket ─► prorate fee ─► create_sale per
//!               item                                       [one tx per item]
//! ```
//!
//! Basket items commit independently. When item `k` fails, items `0..k`
//! stay committed and are returned inside the error.

use thiserror::Error;
use tracing::{info, warn};

use feria_core::dto::{CreatedSale, MultiSaleItem, NewMultiSale, NewSale, SaleFilter};
use feria_core::money::prorate_fee;
use feria_core::phase::{self, GatedAction};
use feria_core::validation::{
    line_total, require_artisan_active, require_payment_coherence, require_product_context, require_sale_active,
    require_stock, validate_amount_cents, validate_quantity, Rules,
};
use feria_core::{
    CoreError, InventoryMovement, Money, MovementType, Product, Sale, SaleState, ValidationError,
    REASON_DIRECT_SALE, REASON_SALE_CANCELLATION,
};

use super::{found, new_id, rejected, Services};
use crate::error::{ServiceError, ServiceResult};
use crate::repository::artisan::ArtisanRepository;
use crate::repository::event::EventRepository;
use crate::repository::exchange::ExchangeRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;

/// A basket that did not fully go through.
///
/// `failed_index` is `None` when the basket was rejected before any item
/// was attempted.
#[derive(Debug, Error)]
#[error("basket checkout stopped after {} committed sale(s): {source}", .committed.len())]
pub struct MultiSaleError {
    pub committed: Vec<CreatedSale>,
    pub failed_index: Option<usize>,
    pub source: ServiceError,
}

impl MultiSaleError {
    fn rejected(source: ServiceError) -> Self {
        MultiSaleError {
            committed: Vec::new(),
            failed_index: None,
            source,
        }
    }
}

impl Services {
    /// Registers one sale and its stock-out atomically.
    pub async fn create_sale(&self, input: NewSale) -> ServiceResult<CreatedSale> {
        const OP: &str = "create_sale";

        let mut tx = self.db.begin_write().await?;
        let event = found(OP, EventRepository::find(tx.conn(), &input.event_id).await?, "Event", &input.event_id)?;
        let product = found(
            OP,
            ProductRepository::find(tx.conn(), &input.product_id).await?,
            "Product",
            &input.product_id,
        )?;
        let artisan = found(
            OP,
            ArtisanRepository::find(tx.conn(), &input.artisan_id).await?,
            "Artisan",
            &input.artisan_id,
        )?;
        let available = InventoryRepository::totals(tx.conn(), &product.id).await?.stock();
        let now = self.now();

        Rules::new()
            .check(|| Ok(validate_quantity(input.quantity)?))
            .check(|| Ok(validate_amount_cents("value_charged", input.value_charged_cents)?))
            .check(|| require_payment_coherence(input.payment_method, input.card_fee_cents))
            .check(|| phase::require(&event, now, GatedAction::RegisterSale).map(|_| ()))
            .check(|| require_product_context(&product, &event.id, &artisan.id))
            .check(|| require_artisan_active(&artisan))
            .check(|| require_stock(&product.id, available, input.quantity))
            .run()
            .map_err(|e| rejected(OP, e))?;
        let total = line_total("total_amount", product.price(), input.quantity).map_err(|e| rejected(OP, e.into()))?;

        let sale = Sale {
            id: new_id(),
            event_id: event.id.clone(),
            product_id: product.id.clone(),
            artisan_id: artisan.id.clone(),
            quantity_sold: input.quantity,
            value_charged_cents: input.value_charged_cents,
            payment_method: input.payment_method,
            card_fee_cents: input.card_fee_cents,
            state: SaleState::Active,
            date: now,
            created_at: now,
            updated_at: now,
        };
        let movement = InventoryMovement {
            id: new_id(),
            movement_type: MovementType::Out,
            quantity: sale.quantity_sold,
            reason: REASON_DIRECT_SALE.to_string(),
            product_id: product.id.clone(),
            sale_id: Some(sale.id.clone()),
            change_id: None,
            created_at: now,
        };

        SaleRepository::insert(tx.conn(), &sale).await?;
        InventoryRepository::append(tx.conn(), &movement).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            product_id = %sale.product_id,
            quantity = sale.quantity_sold,
            value_charged = sale.value_charged_cents,
            payment_method = %sale.payment_method,
            "Sale created"
        );

        Ok(CreatedSale {
            total_amount_cents: total.cents(),
            sale,
        })
    }

    /// Checks out a basket paid with one payment.
    ///
    /// Each item is charged `price × quantity`; a card fee total is split
    /// across items by charged value, remainder on the last item. Items are
    /// committed one by one and processing stops at the first failure.
    pub async fn create_multi_sale(&self, input: NewMultiSale) -> Result<Vec<CreatedSale>, MultiSaleError> {
        const OP: &str = "create_multi_sale";

        let products = self
            .validate_basket(&input)
            .await
            .map_err(MultiSaleError::rejected)?;

        let charged = input
            .items
            .iter()
            .zip(&products)
            .map(|(item, product)| line_total("value_charged", product.price(), item.quantity))
            .collect::<Result<Vec<Money>, _>>()
            .map_err(|e| MultiSaleError::rejected(rejected(OP, e.into())))?;
        let fees: Vec<Option<i64>> = match input.card_fee_total_cents {
            Some(total) => prorate_fee(Money::from_cents(total), &charged)
                .into_iter()
                .map(|fee| Some(fee.cents()))
                .collect(),
            None => vec![None; charged.len()],
        };

        let mut committed = Vec::with_capacity(input.items.len());
        for (index, item) in input.items.iter().enumerate() {
            let sale = NewSale {
                event_id: input.event_id.clone(),
                product_id: item.product_id.clone(),
                artisan_id: item.artisan_id.clone(),
                quantity: item.quantity,
                value_charged_cents: charged[index].cents(),
                payment_method: input.payment_method,
                card_fee_cents: fees[index],
            };

            match self.create_sale(sale).await {
                Ok(created) => committed.push(created),
                Err(source) => {
                    warn!(
                        operation = OP,
                        failed_index = index,
                        committed = committed.len(),
                        error = %source,
                        "Basket partially applied"
                    );
                    return Err(MultiSaleError {
                        committed,
                        failed_index: Some(index),
                        source,
                    });
                }
            }
        }

        info!(event_id = %input.event_id, items = committed.len(), "Basket checked out");
        Ok(committed)
    }

    /// Basket-level checks run before any item is committed. Returns the
    /// product of each item, in order.
    async fn validate_basket(&self, input: &NewMultiSale) -> ServiceResult<Vec<Product>> {
        const OP: &str = "create_multi_sale";

        if input.items.is_empty() {
            return Err(rejected(
                OP,
                ValidationError::Required {
                    field: "items".to_string(),
                }
                .into(),
            ));
        }
        require_payment_coherence(input.payment_method, input.card_fee_total_cents).map_err(|e| rejected(OP, e))?;

        let event = found(OP, self.db.events().get_by_id(&input.event_id).await?, "Event", &input.event_id)?;

        let mut products = Vec::with_capacity(input.items.len());
        for MultiSaleItem {
            product_id,
            artisan_id,
            quantity,
        } in &input.items
        {
            validate_quantity(*quantity).map_err(|e| rejected(OP, e.into()))?;
            let product = found(OP, self.db.products().get_by_id(product_id).await?, "Product", product_id)?;
            found(OP, self.db.artisans().get_by_id(artisan_id).await?, "Artisan", artisan_id)?;
            require_product_context(&product, &event.id, artisan_id).map_err(|e| rejected(OP, e))?;
            products.push(product);
        }

        Ok(products)
    }

    /// Cancels an ACTIVE sale and puts its units back in stock.
    ///
    /// A sale with an exchange recorded against it cannot be cancelled, even
    /// while it is still ACTIVE after a partial exchange: `InvalidState`.
    pub async fn cancel_sale(&self, sale_id: &str) -> ServiceResult<Sale> {
        const OP: &str = "cancel_sale";

        let mut tx = self.db.begin_write().await?;
        let mut sale = found(OP, SaleRepository::find(tx.conn(), sale_id).await?, "Sale", sale_id)?;
        let event = found(OP, EventRepository::find(tx.conn(), &sale.event_id).await?, "Event", &sale.event_id)?;
        let exchange = ExchangeRepository::find_by_sale(tx.conn(), sale_id).await?;
        let now = self.now();

        Rules::new()
            .check(|| require_sale_active(&sale))
            .check(|| phase::require(&event, now, GatedAction::CancelSale).map(|_| ()))
            .check(|| match &exchange {
                Some(change) => Err(CoreError::invalid_state(
                    "Sale",
                    sale_id,
                    "ACTIVE without exchange",
                    format!("ACTIVE with exchange {}", change.id),
                )),
                None => Ok(()),
            })
            .run()
            .map_err(|e| rejected(OP, e))?;

        let movement = InventoryMovement {
            id: new_id(),
            movement_type: MovementType::In,
            quantity: sale.quantity_sold,
            reason: REASON_SALE_CANCELLATION.to_string(),
            product_id: sale.product_id.clone(),
            sale_id: Some(sale.id.clone()),
            change_id: None,
            created_at: now,
        };

        SaleRepository::transition(tx.conn(), &sale.id, SaleState::Cancelled, now).await?;
        InventoryRepository::append(tx.conn(), &movement).await?;
        tx.commit().await?;

        sale.state = SaleState::Cancelled;
        sale.updated_at = now;

        info!(sale_id = %sale.id, restocked = sale.quantity_sold, "Sale cancelled");
        Ok(sale)
    }

    pub async fn find_sale(&self, id: &str) -> ServiceResult<Sale> {
        found("find_sale", self.db.sales().get_by_id(id).await?, "Sale", id)
    }

    pub async fn list_sales(&self, filter: SaleFilter) -> ServiceResult<Vec<Sale>> {
        Ok(self.db.sales().list(&filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::Fixture;
    use feria_core::dto::{MovementFilter, NewExchange};
    use feria_core::PaymentMethod;

    #[tokio::test]
    async fn test_sale_moves_stock_out() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        fx.open();

        let created = fx.services.create_sale(fx.cash_sale(&mug, 2)).await.unwrap();

        assert_eq!(created.sale.state, SaleState::Active);
        assert_eq!(created.total_amount_cents, 3600);
        assert_eq!(fx.stock(&mug).await, 3);

        let outs = fx
            .services
            .list_movements(MovementFilter {
                sale_id: Some(created.sale.id.clone()),
                ..MovementFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].movement_type, MovementType::Out);
        assert_eq!(outs[0].reason, REASON_DIRECT_SALE);
    }

    #[tokio::test]
    async fn test_sale_requires_active_event() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;

        let err = fx.services.create_sale(fx.cash_sale(&mug, 1)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InvalidState { .. })));

        fx.finish();
        let err = fx.services.create_sale(fx.cash_sale(&mug, 1)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InvalidState { .. })));
        assert_eq!(fx.stock(&mug).await, 5);
    }

    #[tokio::test]
    async fn test_sale_rejects_insufficient_stock() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 2).await;
        fx.open();

        let err = fx.services.create_sale(fx.cash_sale(&mug, 3)).await.unwrap_err();
        assert_eq!(
            err.as_rule(),
            Some(&CoreError::InsufficientStock {
                product_id: mug.id.clone(),
                available: 2,
                requested: 3,
            })
        );
        assert!(fx.services.list_sales(SaleFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sale_payment_coherence() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        fx.open();

        let mut card = fx.cash_sale(&mug, 1);
        card.payment_method = PaymentMethod::Card;
        let err = fx.services.create_sale(card.clone()).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::PaymentCoherenceViolation { .. })));

        card.card_fee_cents = Some(90);
        let created = fx.services.create_sale(card).await.unwrap();
        assert_eq!(created.sale.card_fee_cents, Some(90));

        let mut cash = fx.cash_sale(&mug, 1);
        cash.card_fee_cents = Some(50);
        let err = fx.services.create_sale(cash).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::PaymentCoherenceViolation { .. })));
    }

    #[tokio::test]
    async fn test_overflowing_total_is_rejected_before_writing() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let gold = fx.product(&ana, "Gold Crown", i64::MAX / 2 + 1, 5).await;
        fx.open();

        let mut sale = fx.cash_sale(&gold, 1);
        sale.quantity = 2;
        let err = fx.services.create_sale(sale).await.unwrap_err();
        assert!(matches!(
            err.as_rule(),
            Some(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(fx.stock(&gold).await, 5);
        assert!(fx.services.list_sales(SaleFilter::default()).await.unwrap().is_empty());

        let err = fx
            .services
            .create_multi_sale(NewMultiSale {
                event_id: fx.event.id.clone(),
                payment_method: PaymentMethod::Cash,
                card_fee_total_cents: None,
                items: vec![MultiSaleItem {
                    product_id: gold.id.clone(),
                    artisan_id: ana.id.clone(),
                    quantity: 2,
                }],
            })
            .await
            .unwrap_err();
        assert_eq!(err.failed_index, None);
        assert!(err.committed.is_empty());
        assert_eq!(fx.stock(&gold).await, 5);
    }

    #[tokio::test]
    async fn test_sale_rejects_foreign_product() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let luis = fx.artisan("Luis").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        fx.open();

        let mut sale = fx.cash_sale(&mug, 1);
        sale.artisan_id = luis.id.clone();
        let err = fx.services.create_sale(sale).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::CrossEntityMismatch { .. })));
    }

    #[tokio::test]
    async fn test_inactive_artisan_cannot_sell() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        fx.services.set_artisan_active(&ana.id, false).await.unwrap();
        fx.open();

        let err = fx.services.create_sale(fx.cash_sale(&mug, 1)).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InvalidState { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_cannot_oversell() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let vase = fx.product(&ana, "Flower Vase", 4200, 1).await;
        fx.open();

        let first = tokio::spawn({
            let services = fx.services.clone();
            let sale = fx.cash_sale(&vase, 1);
            async move { services.create_sale(sale).await }
        });
        let second = tokio::spawn({
            let services = fx.services.clone();
            let sale = fx.cash_sale(&vase, 1);
            async move { services.create_sale(sale).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        let sold = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(e) if matches!(e.as_rule(), Some(CoreError::InsufficientStock { .. }))))
            .count();

        assert_eq!(sold, 1);
        assert_eq!(refused, 1);
        assert_eq!(fx.stock(&vase).await, 0);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        fx.open();

        let sale = fx.sell(&mug, 2).await;
        assert_eq!(fx.stock(&mug).await, 3);

        let cancelled = fx.services.cancel_sale(&sale.id).await.unwrap();
        assert_eq!(cancelled.state, SaleState::Cancelled);
        assert_eq!(fx.stock(&mug).await, 5);
        assert_eq!(fx.services.find_sale(&sale.id).await.unwrap().state, SaleState::Cancelled);

        let err = fx.services.cancel_sale(&sale.id).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InvalidState { .. })));
        assert_eq!(fx.stock(&mug).await, 5);
    }

    #[tokio::test]
    async fn test_cancel_refused_after_exchange() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        let bowl = fx.product(&ana, "Serving Bowl", 2000, 5).await;
        fx.open();

        let sale = fx.sell(&mug, 2).await;
        fx.services
            .create_exchange(NewExchange {
                sale_id: sale.id.clone(),
                product_returned_id: mug.id.clone(),
                product_delivered_id: bowl.id.clone(),
                quantity: 1,
                payment_method_difference: Some(PaymentMethod::Cash),
                card_fee_difference_cents: None,
            })
            .await
            .unwrap();

        let err = fx.services.cancel_sale(&sale.id).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::InvalidState { .. })));
        assert_eq!(fx.stock(&mug).await, 4);
        assert_eq!(fx.stock(&bowl).await, 4);
    }

    #[tokio::test]
    async fn test_multi_sale_prorates_card_fee() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let luis = fx.artisan("Luis").await;
        let mug = fx.product(&ana, "Clay Mug", 200, 5).await;
        let spoon = fx.product(&luis, "Carved Spoon", 100, 5).await;
        fx.open();

        let created = fx
            .services
            .create_multi_sale(NewMultiSale {
                event_id: fx.event.id.clone(),
                payment_method: PaymentMethod::Card,
                card_fee_total_cents: Some(15),
                items: vec![
                    MultiSaleItem {
                        product_id: mug.id.clone(),
                        artisan_id: ana.id.clone(),
                        quantity: 1,
                    },
                    MultiSaleItem {
                        product_id: spoon.id.clone(),
                        artisan_id: luis.id.clone(),
                        quantity: 1,
                    },
                ],
            })
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].sale.value_charged_cents, 200);
        assert_eq!(created[0].sale.card_fee_cents, Some(10));
        assert_eq!(created[1].sale.value_charged_cents, 100);
        assert_eq!(created[1].sale.card_fee_cents, Some(5));
        assert_eq!(fx.stock(&mug).await, 4);
        assert_eq!(fx.stock(&spoon).await, 4);
    }

    #[tokio::test]
    async fn test_multi_sale_keeps_committed_items() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let mug = fx.product(&ana, "Clay Mug", 1800, 5).await;
        let vase = fx.product(&ana, "Flower Vase", 4200, 1).await;
        fx.open();

        let err = fx
            .services
            .create_multi_sale(NewMultiSale {
                event_id: fx.event.id.clone(),
                payment_method: PaymentMethod::Cash,
                card_fee_total_cents: None,
                items: vec![
                    MultiSaleItem {
                        product_id: mug.id.clone(),
                        artisan_id: ana.id.clone(),
                        quantity: 2,
                    },
                    MultiSaleItem {
                        product_id: vase.id.clone(),
                        artisan_id: ana.id.clone(),
                        quantity: 3,
                    },
                ],
            })
            .await
            .unwrap_err();

        assert_eq!(err.failed_index, Some(1));
        assert_eq!(err.committed.len(), 1);
        assert!(matches!(err.source.as_rule(), Some(CoreError::InsufficientStock { .. })));
        assert_eq!(fx.stock(&mug).await, 3);
        assert_eq!(fx.stock(&vase).await, 1);
    }

    #[tokio::test]
    async fn test_empty_basket_is_rejected_up_front() {
        let fx = Fixture::new().await;
        fx.open();

        let err = fx
            .services
            .create_multi_sale(NewMultiSale {
                event_id: fx.event.id.clone(),
                payment_method: PaymentMethod::Cash,
                card_fee_total_cents: None,
                items: Vec::new(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.failed_index, None);
        assert!(err.committed.is_empty());
        assert!(matches!(err.source.as_rule(), Some(CoreError::Validation(_))));
    }
}

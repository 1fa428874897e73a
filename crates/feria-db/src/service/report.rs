//! Per-artisan settlement for one fair.

use tracing::info;

use feria_core::dto::{EventSettlement, ExchangeFilter, SaleFilter};
use feria_core::settlement::settle;

use super::{found, Services};
use crate::error::ServiceResult;
use crate::repository::artisan::ArtisanRepository;
use crate::repository::exchange::ExchangeRepository;
use crate::repository::sale::SaleRepository;

impl Services {
    /// Gross, fees, commissions and net payout per artisan. Cancelled sales
    /// are excluded.
    pub async fn event_settlement(&self, event_id: &str) -> ServiceResult<EventSettlement> {
        let event = found("event_settlement", self.db.events().get_by_id(event_id).await?, "Event", event_id)?;
        let pool = self.db.pool();

        let sales = SaleRepository::fetch_filtered(
            pool,
            &SaleFilter {
                event_id: Some(event.id.clone()),
                ..SaleFilter::default()
            },
        )
        .await?;
        let exchanges = ExchangeRepository::fetch_filtered(
            pool,
            &ExchangeFilter {
                event_id: Some(event.id.clone()),
                ..ExchangeFilter::default()
            },
        )
        .await?;
        let artisans = ArtisanRepository::fetch_for_event(pool, &event.id).await?;

        let report = settle(&event, &artisans, &sales, &exchanges, self.now());

        info!(
            event_id = %event.id,
            artisans = report.lines.len(),
            total_gross = report.total_gross_cents,
            "Settlement computed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::service::testing::Fixture;
    use feria_core::dto::NewExchange;
    use feria_core::PaymentMethod;

    #[tokio::test]
    async fn test_settlement_after_a_day_of_sales() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let luis = fx.artisan("Luis").await;
        let mug = fx.product(&ana, "Clay Mug", 10000, 5).await;
        let bowl = fx.product(&ana, "Serving Bowl", 12000, 5).await;
        let spoon = fx.product(&luis, "Carved Spoon", 5000, 5).await;
        fx.open();

        let mut card = fx.cash_sale(&mug, 2);
        card.payment_method = PaymentMethod::Card;
        card.card_fee_cents = Some(500);
        let sale = fx.services.create_sale(card).await.unwrap().sale;

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

        let cancelled = fx.sell(&spoon, 1).await;
        fx.services.cancel_sale(&cancelled.id).await.unwrap();
        fx.sell(&spoon, 1).await;

        let report = fx.services.event_settlement(&fx.event.id).await.unwrap();
        assert_eq!(report.lines.len(), 2);

        let ana_line = &report.lines[0];
        assert_eq!(ana_line.artisan_name, "Ana");
        assert_eq!(ana_line.gross_sales_cents, 22000);
        assert_eq!(ana_line.card_fees_cents, 500);
        assert_eq!(ana_line.net_payout_cents, 22000 - 2200 - 1100 - 500);

        let luis_line = &report.lines[1];
        assert_eq!(luis_line.units_sold, 1);
        assert_eq!(luis_line.gross_sales_cents, 5000);
        assert_eq!(luis_line.net_payout_cents, 5000 - 500 - 250);

        assert_eq!(report.total_gross_cents, 27000);
    }
}

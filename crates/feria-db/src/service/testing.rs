//! In-memory fixture shared by the service tests.
//!
//! The fair runs from `start` for two days; the clock starts one day before
//! it, so the event is SCHEDULED until [`Fixture::open`] is called.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use feria_core::dto::{NewArtisan, NewEvent, NewProduct, NewSale};
use feria_core::{Artisan, Event, FixedClock, PaymentMethod, Product, Sale};

use super::Services;
use crate::config::FairSettings;
use crate::pool::{Database, DbConfig};

pub(crate) struct Fixture {
    pub services: Services,
    pub clock: Arc<FixedClock>,
    pub event: Event,
}

impl Fixture {
    pub async fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2026, 12, 5, 9, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start - Duration::days(1)));
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let services = Services::new(db, clock.clone(), FairSettings::default());

        let event = services
            .create_event(NewEvent {
                name: "Feria de Navidad".to_string(),
                location: "Plaza Mayor".to_string(),
                start_date: start,
                end_date: start + Duration::days(2),
                commission_association_bps: None,
                commission_seller_bps: None,
            })
            .await
            .unwrap();

        Fixture { services, clock, event }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.event.start_date
    }

    /// Moves the clock into the fair window.
    pub fn open(&self) {
        self.clock.set(self.start() + Duration::hours(1));
    }

    /// Moves the clock past the end of the fair.
    pub fn finish(&self) {
        self.clock.set(self.event.end_date + Duration::hours(1));
    }

    pub async fn artisan(&self, name: &str) -> Artisan {
        self.services
            .create_artisan(NewArtisan {
                name: name.to_string(),
                identification: format!("ID-{}", name.to_lowercase()),
            })
            .await
            .unwrap()
    }

    /// Creates a product for the fixture fair. Requires SCHEDULED.
    pub async fn product(&self, artisan: &Artisan, name: &str, price_cents: i64, stock: i64) -> Product {
        self.services
            .create_product(NewProduct {
                name: name.to_string(),
                price_cents,
                event_id: self.event.id.clone(),
                artisan_id: artisan.id.clone(),
                category: "crafts".to_string(),
                initial_stock: (stock > 0).then_some(stock),
            })
            .await
            .unwrap()
            .product
    }

    pub fn cash_sale(&self, product: &Product, quantity: i64) -> NewSale {
        NewSale {
            event_id: self.event.id.clone(),
            product_id: product.id.clone(),
            artisan_id: product.artisan_id.clone(),
            quantity,
            value_charged_cents: product.price_cents * quantity,
            payment_method: PaymentMethod::Cash,
            card_fee_cents: None,
        }
    }

    /// Registers a cash sale at list price. Requires ACTIVE.
    pub async fn sell(&self, product: &Product, quantity: i64) -> Sale {
        self.services
            .create_sale(self.cash_sale(product, quantity))
            .await
            .unwrap()
            .sale
    }

    pub async fn stock(&self, product: &Product) -> i64 {
        self.services.current_stock(&product.id).await.unwrap()
    }
}

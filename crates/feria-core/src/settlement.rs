//! # Event Settlement
//!
//! Computes what each artisan is owed for one fair.
//!
//! ```text
//! gross      = Σ value_charged (ACTIVE + CHANGED sales) + Σ exchange value_difference
//! card_fees  = Σ card_fee + Σ card_fee_difference
//! commission = gross × association rate, gross × seller rate
//! net        = gross − commissions − card_fees
//! ```
//!
//! Cancelled sales, and any exchange recorded against them, contribute
//! nothing.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::dto::{ArtisanSettlement, EventSettlement};
use crate::money::Money;
use crate::types::{Artisan, Event, ProductChange, Sale, SaleState};

#[derive(Default)]
struct Tally {
    units: i64,
    gross: Money,
    fees: Money,
}

/// Builds the settlement for `event` from its sales and exchanges.
///
/// `artisans` only needs to contain the artisans referenced by `sales`; an
/// artisan missing from it is reported under its id.
pub fn settle(
    event: &Event,
    artisans: &[Artisan],
    sales: &[Sale],
    exchanges: &[ProductChange],
    now: DateTime<Utc>,
) -> EventSettlement {
    let counted: HashMap<&str, &Sale> = sales
        .iter()
        .filter(|s| s.event_id == event.id && s.state != SaleState::Cancelled)
        .map(|s| (s.id.as_str(), s))
        .collect();

    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();

    for sale in counted.values() {
        let tally = tallies.entry(sale.artisan_id.as_str()).or_default();
        tally.units += sale.quantity_sold;
        tally.gross += sale.value_charged();
        tally.fees += sale.card_fee();
    }

    for change in exchanges {
        if let Some(sale) = counted.get(change.sale_id.as_str()) {
            let tally = tallies.entry(sale.artisan_id.as_str()).or_default();
            tally.gross += change.value_difference();
            tally.fees += change.card_fee_difference();
        }
    }

    let names: HashMap<&str, &str> = artisans
        .iter()
        .map(|a| (a.id.as_str(), a.name.as_str()))
        .collect();

    let mut lines: Vec<ArtisanSettlement> = tallies
        .into_iter()
        .map(|(artisan_id, tally)| {
            let association = tally.gross.percent_of(event.association_rate());
            let seller = tally.gross.percent_of(event.seller_rate());
            let net = tally.gross - association - seller - tally.fees;

            ArtisanSettlement {
                artisan_id: artisan_id.to_string(),
                artisan_name: names.get(artisan_id).unwrap_or(&artisan_id).to_string(),
                units_sold: tally.units,
                gross_sales_cents: tally.gross.cents(),
                card_fees_cents: tally.fees.cents(),
                association_commission_cents: association.cents(),
                seller_commission_cents: seller.cents(),
                net_payout_cents: net.cents(),
            }
        })
        .collect();

    lines.sort_by(|a, b| {
        a.artisan_name
            .cmp(&b.artisan_name)
            .then_with(|| a.artisan_id.cmp(&b.artisan_id))
    });

    EventSettlement {
        event_id: event.id.clone(),
        phase: event.phase_at(now),
        total_gross_cents: lines.iter().map(|l| l.gross_sales_cents).sum(),
        total_card_fees_cents: lines.iter().map(|l| l.card_fees_cents).sum(),
        total_association_commission_cents: lines.iter().map(|l| l.association_commission_cents).sum(),
        total_seller_commission_cents: lines.iter().map(|l| l.seller_commission_cents).sum(),
        total_net_payout_cents: lines.iter().map(|l| l.net_payout_cents).sum(),
        lines,
    }
}

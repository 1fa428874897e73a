//! Event catalog: create, read, edit while scheduled, close while active.

use tracing::{debug, info};

use feria_core::dto::{EventFilter, EventUpdate, EventView, NewEvent};
use feria_core::phase::{self, GatedAction};
use feria_core::validation::{validate_commission_bps, validate_event_window, validate_text, Rules};
use feria_core::Event;

use super::{found, new_id, rejected, Services};
use crate::error::ServiceResult;
use crate::repository::event::EventRepository;

impl Services {
    pub async fn create_event(&self, input: NewEvent) -> ServiceResult<Event> {
        const OP: &str = "create_event";

        let association_bps = input
            .commission_association_bps
            .unwrap_or(self.fair.default_association_bps);
        let seller_bps = input
            .commission_seller_bps
            .unwrap_or(self.fair.default_seller_bps);

        Rules::new()
            .check(|| Ok(validate_text("name", &input.name)?))
            .check(|| Ok(validate_text("location", &input.location)?))
            .check(|| Ok(validate_event_window(input.start_date, input.end_date)?))
            .check(|| Ok(validate_commission_bps("commission_association", association_bps)?))
            .check(|| Ok(validate_commission_bps("commission_seller", seller_bps)?))
            .run()
            .map_err(|e| rejected(OP, e))?;

        let now = self.now();
        let event = Event {
            id: new_id(),
            name: input.name.trim().to_string(),
            location: input.location.trim().to_string(),
            start_date: input.start_date,
            end_date: input.end_date,
            commission_association_bps: association_bps,
            commission_seller_bps: seller_bps,
            closed: false,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin_write().await?;
        EventRepository::insert(tx.conn(), &event).await?;
        tx.commit().await?;

        info!(event_id = %event.id, name = %event.name, "Event created");
        Ok(event)
    }

    pub async fn find_event(&self, id: &str) -> ServiceResult<EventView> {
        let event = found("find_event", self.db.events().get_by_id(id).await?, "Event", id)?;
        let phase = self.resolve_event_phase(&event);
        Ok(EventView { event, phase })
    }

    /// Events by start date, optionally only those in one phase.
    pub async fn list_events(&self, filter: EventFilter) -> ServiceResult<Vec<EventView>> {
        let now = self.now();
        let views: Vec<EventView> = self
            .db
            .events()
            .list()
            .await?
            .into_iter()
            .map(|event| {
                let phase = event.phase_at(now);
                EventView { event, phase }
            })
            .filter(|view| filter.phase.map_or(true, |p| view.phase == p))
            .collect();

        debug!(count = views.len(), "Listed events");
        Ok(views)
    }

    /// Edits an event that has not started yet.
    pub async fn update_event(&self, id: &str, update: EventUpdate) -> ServiceResult<Event> {
        const OP: &str = "update_event";

        let mut tx = self.db.begin_write().await?;
        let stored = found(OP, EventRepository::find(tx.conn(), id).await?, "Event", id)?;
        let now = self.now();

        let mut event = stored.clone();
        if let Some(name) = update.name {
            event.name = name.trim().to_string();
        }
        if let Some(location) = update.location {
            event.location = location.trim().to_string();
        }
        if let Some(start) = update.start_date {
            event.start_date = start;
        }
        if let Some(end) = update.end_date {
            event.end_date = end;
        }
        if let Some(bps) = update.commission_association_bps {
            event.commission_association_bps = bps;
        }
        if let Some(bps) = update.commission_seller_bps {
            event.commission_seller_bps = bps;
        }

        // Gated on the stored window, not the edited one.
        Rules::new()
            .check(|| phase::require(&stored, now, GatedAction::UpdateEvent).map(|_| ()))
            .check(|| Ok(validate_text("name", &event.name)?))
            .check(|| Ok(validate_text("location", &event.location)?))
            .check(|| Ok(validate_event_window(event.start_date, event.end_date)?))
            .check(|| Ok(validate_commission_bps("commission_association", event.commission_association_bps)?))
            .check(|| Ok(validate_commission_bps("commission_seller", event.commission_seller_bps)?))
            .run()
            .map_err(|e| rejected(OP, e))?;

        event.updated_at = now;
        EventRepository::update(tx.conn(), &event).await?;
        tx.commit().await?;

        info!(event_id = %event.id, "Event updated");
        Ok(event)
    }

    /// Sets the explicit closed flag. Only an ACTIVE event can be closed.
    pub async fn close_event(&self, id: &str) -> ServiceResult<EventView> {
        const OP: &str = "close_event";

        let mut tx = self.db.begin_write().await?;
        let mut event = found(OP, EventRepository::find(tx.conn(), id).await?, "Event", id)?;
        let now = self.now();

        phase::require(&event, now, GatedAction::CloseEvent).map_err(|e| rejected(OP, e))?;

        EventRepository::mark_closed(tx.conn(), id, now).await?;
        tx.commit().await?;

        event.closed = true;
        event.updated_at = now;
        let phase = event.phase_at(now);

        info!(event_id = %event.id, "Event closed");
        Ok(EventView { event, phase })
    }
}

//! Product catalog. Stock is always read from the ledger.

use tracing::{debug, info};

use feria_core::dto::{NewProduct, ProductFilter, ProductUpdate, ProductView};
use feria_core::phase::{self, GatedAction};
use feria_core::validation::{
    require_artisan_active, validate_amount_cents, validate_quantity, validate_text, Rules,
};
use feria_core::{CoreError, InventoryMovement, MovementType, Product, ValidationError, REASON_INITIAL_STOCK};

use super::{found, new_id, rejected, Services};
use crate::error::ServiceResult;
use crate::repository::artisan::ArtisanRepository;
use crate::repository::event::EventRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::product::ProductRepository;

fn duplicate_name(name: &str) -> CoreError {
    ValidationError::Duplicate {
        field: "name".to_string(),
        value: name.to_string(),
    }
    .into()
}

impl Services {
    /// Registers a product for a scheduled fair, optionally with its
    /// opening stock.
    pub async fn create_product(&self, input: NewProduct) -> ServiceResult<ProductView> {
        const OP: &str = "create_product";

        let name = input.name.trim().to_string();
        let category = input.category.trim().to_string();

        let mut tx = self.db.begin_write().await?;
        let event = found(OP, EventRepository::find(tx.conn(), &input.event_id).await?, "Event", &input.event_id)?;
        let artisan = found(
            OP,
            ArtisanRepository::find(tx.conn(), &input.artisan_id).await?,
            "Artisan",
            &input.artisan_id,
        )?;
        let taken = ProductRepository::triple_taken(tx.conn(), &name, &event.id, &artisan.id, None).await?;
        let now = self.now();

        Rules::new()
            .check(|| Ok(validate_text("name", &name)?))
            .check(|| Ok(validate_amount_cents("price", input.price_cents)?))
            .check(|| match input.initial_stock {
                Some(qty) => Ok(validate_quantity(qty)?),
                None => Ok(()),
            })
            .check(|| phase::require(&event, now, GatedAction::CreateProduct).map(|_| ()))
            .check(|| require_artisan_active(&artisan))
            .check(|| if taken { Err(duplicate_name(&name)) } else { Ok(()) })
            .run()
            .map_err(|e| rejected(OP, e))?;

        let product = Product {
            id: new_id(),
            name,
            price_cents: input.price_cents,
            event_id: event.id.clone(),
            artisan_id: artisan.id.clone(),
            category,
            created_at: now,
            updated_at: now,
        };

        ProductRepository::insert(tx.conn(), &product).await?;

        let stock = input.initial_stock.unwrap_or(0);
        if stock > 0 {
            let movement = InventoryMovement {
                id: new_id(),
                movement_type: MovementType::In,
                quantity: stock,
                reason: REASON_INITIAL_STOCK.to_string(),
                product_id: product.id.clone(),
                sale_id: None,
                change_id: None,
                created_at: now,
            };
            InventoryRepository::append(tx.conn(), &movement).await?;
        }

        tx.commit().await?;

        info!(product_id = %product.id, event_id = %product.event_id, stock, "Product created");
        Ok(ProductView { product, stock })
    }

    pub async fn find_product(&self, id: &str) -> ServiceResult<ProductView> {
        let product = found("find_product", self.db.products().get_by_id(id).await?, "Product", id)?;
        let stock = self.db.inventory().current_stock(&product.id).await?;
        Ok(ProductView { product, stock })
    }

    pub async fn list_products(&self, filter: ProductFilter) -> ServiceResult<Vec<ProductView>> {
        let products = self.db.products().list(&filter).await?;
        let inventory = self.db.inventory();

        let mut views = Vec::with_capacity(products.len());
        for product in products {
            let stock = inventory.current_stock(&product.id).await?;
            views.push(ProductView { product, stock });
        }

        debug!(count = views.len(), "Listed products");
        Ok(views)
    }

    /// Edits a product. The price is frozen once the product has any
    /// ledger entry.
    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> ServiceResult<ProductView> {
        const OP: &str = "update_product";

        let mut tx = self.db.begin_write().await?;
        let stored = found(OP, ProductRepository::find(tx.conn(), id).await?, "Product", id)?;
        let movements = InventoryRepository::count_for_product(tx.conn(), id).await?;

        let mut product = stored.clone();
        if let Some(name) = update.name {
            product.name = name.trim().to_string();
        }
        if let Some(category) = update.category {
            product.category = category.trim().to_string();
        }
        if let Some(price) = update.price_cents {
            product.price_cents = price;
        }

        let renamed = product.name != stored.name;
        let taken = if renamed {
            ProductRepository::triple_taken(tx.conn(), &product.name, &product.event_id, &product.artisan_id, Some(id))
                .await?
        } else {
            false
        };
        let repriced = product.price_cents != stored.price_cents;

        Rules::new()
            .check(|| Ok(validate_text("name", &product.name)?))
            .check(|| Ok(validate_amount_cents("price", product.price_cents)?))
            .check(|| {
                if repriced && movements > 0 {
                    Err(CoreError::invalid_state(
                        "Product",
                        id,
                        "without ledger entries",
                        format!("referenced by {} ledger entries", movements),
                    ))
                } else {
                    Ok(())
                }
            })
            .check(|| if taken { Err(duplicate_name(&product.name)) } else { Ok(()) })
            .run()
            .map_err(|e| rejected(OP, e))?;

        product.updated_at = self.now();
        ProductRepository::update(tx.conn(), &product).await?;
        let stock = InventoryRepository::totals(tx.conn(), id).await?.stock();
        tx.commit().await?;

        info!(product_id = %id, "Product updated");
        Ok(ProductView { product, stock })
    }
}

//! Artisan catalog.

use tracing::info;

use feria_core::dto::NewArtisan;
use feria_core::validation::{validate_text, Rules};
use feria_core::{Artisan, CoreError, ValidationError};

use super::{found, new_id, rejected, Services};
use crate::error::ServiceResult;
use crate::repository::artisan::ArtisanRepository;

impl Services {
    pub async fn create_artisan(&self, input: NewArtisan) -> ServiceResult<Artisan> {
        const OP: &str = "create_artisan";

        let name = input.name.trim().to_string();
        let identification = input.identification.trim().to_string();

        let mut tx = self.db.begin_write().await?;
        let existing = ArtisanRepository::find_by_identification(tx.conn(), &identification).await?;

        Rules::new()
            .check(|| Ok(validate_text("name", &name)?))
            .check(|| Ok(validate_text("identification", &identification)?))
            .check(|| match existing {
                Some(_) => Err(ValidationError::Duplicate {
                    field: "identification".to_string(),
                    value: identification.clone(),
                }
                .into()),
                None => Ok(()),
            })
            .run()
            .map_err(|e| rejected(OP, e))?;

        let now = self.now();
        let artisan = Artisan {
            id: new_id(),
            name,
            identification,
            active: true,
            created_at: now,
            updated_at: now,
        };

        ArtisanRepository::insert(tx.conn(), &artisan).await?;
        tx.commit().await?;

        info!(artisan_id = %artisan.id, "Artisan created");
        Ok(artisan)
    }

    pub async fn find_artisan(&self, id: &str) -> ServiceResult<Artisan> {
        found("find_artisan", self.db.artisans().get_by_id(id).await?, "Artisan", id)
    }

    pub async fn list_artisans(&self, active_only: bool) -> ServiceResult<Vec<Artisan>> {
        Ok(self.db.artisans().list(active_only).await?)
    }

    /// Activates or deactivates an artisan. Inactive artisans cannot sell or
    /// list new products; their history is untouched.
    pub async fn set_artisan_active(&self, id: &str, active: bool) -> ServiceResult<Artisan> {
        const OP: &str = "set_artisan_active";

        let mut tx = self.db.begin_write().await?;
        let mut artisan = found(OP, ArtisanRepository::find(tx.conn(), id).await?, "Artisan", id)?;
        let now = self.now();

        ArtisanRepository::set_active(tx.conn(), id, active, now).await?;
        tx.commit().await?;

        artisan.active = active;
        artisan.updated_at = now;

        info!(artisan_id = %id, active, "Artisan active flag changed");
        Ok(artisan)
    }

    /// Deletes an artisan that owns no products and no sales.
    pub async fn delete_artisan(&self, id: &str) -> ServiceResult<()> {
        const OP: &str = "delete_artisan";

        let mut tx = self.db.begin_write().await?;
        found(OP, ArtisanRepository::find(tx.conn(), id).await?, "Artisan", id)?;

        let dependents = ArtisanRepository::dependents(tx.conn(), id).await?;
        if !dependents.is_empty() {
            return Err(rejected(
                OP,
                CoreError::DependentsExist {
                    entity: "Artisan".to_string(),
                    id: id.to_string(),
                    dependents: format!("{} product(s) and {} sale(s)", dependents.products, dependents.sales),
                },
            ));
        }

        ArtisanRepository::delete(tx.conn(), id).await?;
        tx.commit().await?;

        info!(artisan_id = %id, "Artisan deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::Fixture;

    #[tokio::test]
    async fn test_identification_is_unique() {
        let fx = Fixture::new().await;
        fx.artisan("Ana").await;

        let err = fx
            .services
            .create_artisan(NewArtisan {
                name: "Ana Again".to_string(),
                identification: "ID-ana".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_rule(),
            Some(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_guarded_by_dependents() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        let luis = fx.artisan("Luis").await;
        fx.product(&ana, "Clay Mug", 1800, 2).await;

        let err = fx.services.delete_artisan(&ana.id).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::DependentsExist { .. })));

        fx.services.delete_artisan(&luis.id).await.unwrap();
        let err = fx.services.find_artisan(&luis.id).await.unwrap_err();
        assert!(matches!(err.as_rule(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_active_only() {
        let fx = Fixture::new().await;
        let ana = fx.artisan("Ana").await;
        fx.artisan("Luis").await;

        fx.services.set_artisan_active(&ana.id, false).await.unwrap();

        assert_eq!(fx.services.list_artisans(false).await.unwrap().len(), 2);
        let active = fx.services.list_artisans(true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Luis");
    }
}

// src/services/image_service.rs

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CatalogStore, CatalogTx},
    models::image::{ImageFlag, ImageInput, ProductImage},
};

// Por produto: exatamente uma imagem principal, uma estrela e uma de destaque.
// A regra é reposta em cada escrita, dentro do mesmo tx.

#[derive(Clone)]
pub struct ImageService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> ImageService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Para cada flag: se `written` o tem, desliga nas outras; se nenhuma
    /// imagem ficou com ele, passa para a primeira da lista.
    async fn enforce_flags(
        tx: &mut S::Tx,
        product_id: Uuid,
        written: Option<&ProductImage>,
    ) -> Result<(), AppError> {
        for flag in ImageFlag::ALL {
            if let Some(image) = written.filter(|img| flag.get(img)) {
                tx.clear_image_flag(product_id, flag, image.id).await?;
            }
        }

        let images = tx.list_images(product_id).await?;
        let Some(first) = images.first() else {
            return Ok(());
        };

        let mut promoted = first.clone();
        let mut touched = false;
        for flag in ImageFlag::ALL {
            if !images.iter().any(|img| flag.get(img)) {
                flag.set(&mut promoted, true);
                touched = true;
            }
        }
        if touched {
            promoted.updated_at = Utc::now();
            tx.update_image(&promoted).await?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_image(&self, input: ImageInput) -> Result<ProductImage, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        tx.get_product(input.product_id)
            .await?
            .ok_or(AppError::not_found("Produto"))?;

        let now = Utc::now();
        let image = ProductImage {
            id: Uuid::new_v4(),
            product_id: input.product_id,
            path: input.path,
            sort_order: input.sort_order,
            public: input.public,
            principal: input.principal,
            flagship: input.flagship,
            outstanding: input.outstanding,
            created_at: now,
            updated_at: now,
        };
        tx.insert_image(&image).await?;
        Self::enforce_flags(&mut tx, image.product_id, Some(&image)).await?;

        let image = tx.get_image(image.id).await?.ok_or(AppError::not_found("Imagem"))?;
        tx.commit().await?;
        Ok(image)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_image(&self, id: Uuid, input: ImageInput) -> Result<ProductImage, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let old = tx.get_image(id).await?.ok_or(AppError::not_found("Imagem"))?;

        let image = ProductImage {
            path: input.path,
            sort_order: input.sort_order,
            public: input.public,
            principal: input.principal,
            flagship: input.flagship,
            outstanding: input.outstanding,
            updated_at: Utc::now(),
            ..old
        };
        tx.update_image(&image).await?;
        Self::enforce_flags(&mut tx, image.product_id, Some(&image)).await?;

        let image = tx.get_image(image.id).await?.ok_or(AppError::not_found("Imagem"))?;
        tx.commit().await?;
        Ok(image)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_image(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        let image = tx.get_image(id).await?.ok_or(AppError::not_found("Imagem"))?;
        tx.delete_image(id).await?;
        Self::enforce_flags(&mut tx, image.product_id, None).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_images(&self, product_id: Uuid) -> Result<Vec<ProductImage>, AppError> {
        let mut tx = self.store.begin().await?;
        tx.list_images(product_id).await
    }
}

//! Catalog service

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{
    Brand, Category, NewBrand, NewCategory, NewImage, NewProduct, NewTag, NewVariant, Product, ProductDetail,
    ProductFilter, ProductImage, ProductVariant, Tag,
};
use crate::domain::value_objects::Slug;
use crate::error::{EcommerceError, Result};
use crate::pagination::{Page, PaginatedResponse};
use crate::repository::catalog;

pub const SIMILAR_LIMIT: i64 = 8;
pub const FEATURED_LIMIT: i64 = 12;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_products(&self, filter: ProductFilter, page: Page) -> Result<PaginatedResponse<Product>>;
    /// Inactive products are only visible with `include_inactive`.
    async fn get_product(&self, slug: String, include_inactive: bool) -> Result<ProductDetail>;
    async fn similar_products(&self, slug: String) -> Result<Vec<Product>>;
    async fn featured_products(&self) -> Result<Vec<Product>>;
    async fn create_product(&self, product: NewProduct) -> Result<ProductDetail>;
    async fn update_product(&self, slug: String, product: NewProduct) -> Result<ProductDetail>;
    async fn deactivate_product(&self, slug: String) -> Result<()>;
    async fn add_variant(&self, slug: String, variant: NewVariant) -> Result<ProductVariant>;
    async fn add_image(&self, slug: String, image: NewImage) -> Result<ProductImage>;

    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn get_category(&self, slug: String) -> Result<Category>;
    async fn category_products(&self, slug: String, page: Page) -> Result<PaginatedResponse<Product>>;
    async fn create_category(&self, category: NewCategory) -> Result<Category>;
    async fn delete_category(&self, slug: String) -> Result<()>;

    async fn list_brands(&self) -> Result<Vec<Brand>>;
    async fn create_brand(&self, brand: NewBrand) -> Result<Brand>;
    async fn list_tags(&self) -> Result<Vec<Tag>>;
    async fn create_tag(&self, tag: NewTag) -> Result<Tag>;
}

#[derive(Clone, Debug)]
pub struct PgCatalogService {
    pool: PgPool,
}

impl PgCatalogService {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

async fn product_detail(conn: &mut PgConnection, product: Product) -> Result<ProductDetail> {
    let brand = catalog::find_brand(&mut *conn, product.brand_id).await?.ok_or_else(|| EcommerceError::not_found("brand"))?;
    let category = catalog::find_category(&mut *conn, product.category_id).await?.ok_or_else(|| EcommerceError::not_found("category"))?;
    let tags = catalog::product_tags(&mut *conn, product.id).await?;
    let variants = catalog::product_variants(&mut *conn, product.id).await?;
    let images = catalog::product_images(&mut *conn, product.id).await?;
    let (average_rating, rating_count) = catalog::rating_summary(&mut *conn, product.id).await?;
    Ok(ProductDetail { product, brand, category, tags, variants, images, average_rating, rating_count })
}

async fn product_by_slug(conn: &mut PgConnection, slug: &str, include_inactive: bool) -> Result<Product> {
    catalog::find_product_by_slug(conn, slug, include_inactive).await?.ok_or_else(|| EcommerceError::not_found("product"))
}

#[async_trait]
impl CatalogService for PgCatalogService {
    async fn list_products(&self, filter: ProductFilter, page: Page) -> Result<PaginatedResponse<Product>> {
        let mut conn = self.pool.acquire().await?;
        let (products, total) = catalog::list_products(&mut conn, &filter, page).await?;
        Ok(PaginatedResponse::new(products, total, page))
    }

    async fn get_product(&self, slug: String, include_inactive: bool) -> Result<ProductDetail> {
        let mut conn = self.pool.acquire().await?;
        let product = product_by_slug(&mut conn, &slug, include_inactive).await?;
        product_detail(&mut conn, product).await
    }

    async fn similar_products(&self, slug: String) -> Result<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        let product = product_by_slug(&mut conn, &slug, false).await?;
        Ok(catalog::similar_products(&mut conn, &product, SIMILAR_LIMIT).await?)
    }

    async fn featured_products(&self) -> Result<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::featured_products(&mut conn, FEATURED_LIMIT).await?)
    }

    async fn create_product(&self, product: NewProduct) -> Result<ProductDetail> {
        let slug = Slug::from_optional(product.slug.as_deref(), &product.name)?;
        let mut tx = self.pool.begin().await?;
        let created = catalog::insert_product(&mut tx, Uuid::now_v7(), slug.as_str(), &product).await?;
        catalog::replace_product_tags(&mut tx, created.id, &product.tag_ids).await?;
        let detail = product_detail(&mut tx, created).await?;
        tx.commit().await?;
        info!(product_id = %detail.product.id, slug = %detail.product.slug, "product created");
        Ok(detail)
    }

    async fn update_product(&self, slug: String, product: NewProduct) -> Result<ProductDetail> {
        let new_slug = Slug::from_optional(product.slug.as_deref().or(Some(slug.as_str())), &product.name)?;
        let mut tx = self.pool.begin().await?;
        let updated = catalog::update_product(&mut tx, &slug, new_slug.as_str(), &product).await?
            .ok_or_else(|| EcommerceError::not_found("product"))?;
        catalog::replace_product_tags(&mut tx, updated.id, &product.tag_ids).await?;
        let detail = product_detail(&mut tx, updated).await?;
        tx.commit().await?;
        Ok(detail)
    }

    async fn deactivate_product(&self, slug: String) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        if catalog::deactivate_product(&mut conn, &slug).await? == 0 {
            return Err(EcommerceError::not_found("product"));
        }
        info!(%slug, "product deactivated");
        Ok(())
    }

    async fn add_variant(&self, slug: String, variant: NewVariant) -> Result<ProductVariant> {
        let mut conn = self.pool.acquire().await?;
        let product = product_by_slug(&mut conn, &slug, true).await?;
        Ok(catalog::insert_variant(&mut conn, product.id, &variant).await?)
    }

    async fn add_image(&self, slug: String, image: NewImage) -> Result<ProductImage> {
        let mut tx = self.pool.begin().await?;
        let product = product_by_slug(&mut tx, &slug, true).await?;
        let image = catalog::insert_image(&mut tx, product.id, &image).await?;
        tx.commit().await?;
        Ok(image)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::list_categories(&mut conn).await?)
    }

    async fn get_category(&self, slug: String) -> Result<Category> {
        let mut conn = self.pool.acquire().await?;
        catalog::find_category_by_slug(&mut conn, &slug).await?.ok_or_else(|| EcommerceError::not_found("category"))
    }

    async fn category_products(&self, slug: String, page: Page) -> Result<PaginatedResponse<Product>> {
        let mut conn = self.pool.acquire().await?;
        catalog::find_category_by_slug(&mut conn, &slug).await?.ok_or_else(|| EcommerceError::not_found("category"))?;
        let filter = ProductFilter { category: Some(slug), ..ProductFilter::default() };
        let (products, total) = catalog::list_products(&mut conn, &filter, page).await?;
        Ok(PaginatedResponse::new(products, total, page))
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category> {
        let slug = Slug::from_optional(category.slug.as_deref(), &category.name)?;
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::insert_category(&mut conn, &category.name, slug.as_str(), category.parent_id).await?)
    }

    async fn delete_category(&self, slug: String) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        match catalog::delete_category(&mut conn, &slug).await {
            Ok(0) => Err(EcommerceError::not_found("category")),
            Ok(_) => Ok(()),
            Err(e) => match EcommerceError::from(e) {
                EcommerceError::InvalidInput(_) => Err(EcommerceError::Conflict("category still has products".into())),
                other => Err(other),
            },
        }
    }

    async fn list_brands(&self) -> Result<Vec<Brand>> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::list_brands(&mut conn).await?)
    }

    async fn create_brand(&self, brand: NewBrand) -> Result<Brand> {
        let slug = Slug::new(&brand.name)?;
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::insert_brand(&mut conn, &brand.name, slug.as_str(), &brand.description).await?)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::list_tags(&mut conn).await?)
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag> {
        let slug = Slug::new(&tag.name)?;
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::insert_tag(&mut conn, &tag.name, slug.as_str()).await?)
    }
}

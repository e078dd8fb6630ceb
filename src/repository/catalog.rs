//! Catalog queries: products, categories, brands, tags, variants, images

use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::aggregates::{
    Brand, Category, NewImage, NewProduct, NewVariant, Product, ProductFilter, ProductImage, ProductOrdering,
    ProductVariant, Tag,
};
use crate::pagination::Page;

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.base_price, p.brand_id, p.category_id, p.is_active, p.created_at, p.updated_at";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" FROM products p JOIN categories c ON c.id = p.category_id JOIN brands b ON b.id = p.brand_id WHERE p.is_active");
    if let Some(min) = filter.min_price {
        qb.push(" AND p.base_price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.base_price <= ").push_bind(max);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND c.slug = ").push_bind(category.clone());
    }
    if let Some(brand) = &filter.brand {
        qb.push(" AND LOWER(b.name) = LOWER(").push_bind(brand.clone()).push(")");
    }
    if let Some(tag) = &filter.tag {
        qb.push(" AND EXISTS (SELECT 1 FROM product_tags pt JOIN tags t ON t.id = pt.tag_id WHERE pt.product_id = p.id AND t.slug = ")
            .push_bind(tag.clone())
            .push(")");
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        qb.push(" AND (p.name ILIKE ").push_bind(pattern.clone())
            .push(" OR p.description ILIKE ").push_bind(pattern).push(")");
    }
}

fn order_clause(ordering: ProductOrdering) -> &'static str {
    match ordering {
        ProductOrdering::PriceAsc => " ORDER BY p.base_price ASC, p.id",
        ProductOrdering::PriceDesc => " ORDER BY p.base_price DESC, p.id",
        ProductOrdering::CreatedAsc => " ORDER BY p.created_at ASC, p.id",
        ProductOrdering::CreatedDesc => " ORDER BY p.created_at DESC, p.id",
        ProductOrdering::NameAsc => " ORDER BY p.name ASC, p.id",
        ProductOrdering::NameDesc => " ORDER BY p.name DESC, p.id",
    }
}

pub async fn list_products(conn: &mut PgConnection, filter: &ProductFilter, page: Page) -> sqlx::Result<(Vec<Product>, i64)> {
    let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS}"));
    push_filters(&mut qb, filter);
    qb.push(order_clause(filter.ordering));
    qb.push(" LIMIT ").push_bind(page.limit()).push(" OFFSET ").push_bind(page.offset());
    let products = qb.build_query_as::<Product>().fetch_all(&mut *conn).await?;

    let mut count = QueryBuilder::new("SELECT COUNT(*)");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok((products, total))
}

pub async fn find_product_by_slug(conn: &mut PgConnection, slug: &str, include_inactive: bool) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.slug = $1 AND (p.is_active OR $2)"))
        .bind(slug).bind(include_inactive).fetch_optional(conn).await
}

pub async fn find_product(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"))
        .bind(id).fetch_optional(conn).await
}

pub async fn similar_products(conn: &mut PgConnection, product: &Product, limit: i64) -> sqlx::Result<Vec<Product>> {
    sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.category_id = $1 AND p.id <> $2 AND p.is_active ORDER BY p.created_at DESC LIMIT $3"))
        .bind(product.category_id).bind(product.id).bind(limit).fetch_all(conn).await
}

pub async fn featured_products(conn: &mut PgConnection, limit: i64) -> sqlx::Result<Vec<Product>> {
    sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.is_active ORDER BY p.created_at DESC LIMIT $1"))
        .bind(limit).fetch_all(conn).await
}

pub async fn insert_product(conn: &mut PgConnection, id: Uuid, slug: &str, p: &NewProduct) -> sqlx::Result<Product> {
    sqlx::query_as::<_, Product>("INSERT INTO products (id, name, slug, description, base_price, brand_id, category_id, is_active) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id, name, slug, description, base_price, brand_id, category_id, is_active, created_at, updated_at")
        .bind(id).bind(&p.name).bind(slug).bind(&p.description).bind(p.base_price).bind(p.brand_id).bind(p.category_id).bind(p.is_active)
        .fetch_one(conn).await
}

pub async fn update_product(conn: &mut PgConnection, current_slug: &str, slug: &str, p: &NewProduct) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>("UPDATE products SET name = $2, slug = $3, description = $4, base_price = $5, brand_id = $6, category_id = $7, is_active = $8, updated_at = NOW() WHERE slug = $1 RETURNING id, name, slug, description, base_price, brand_id, category_id, is_active, created_at, updated_at")
        .bind(current_slug).bind(&p.name).bind(slug).bind(&p.description).bind(p.base_price).bind(p.brand_id).bind(p.category_id).bind(p.is_active)
        .fetch_optional(conn).await
}

/// Soft-disable; carts and order history keep their references.
pub async fn deactivate_product(conn: &mut PgConnection, slug: &str) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE slug = $1").bind(slug).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn replace_product_tags(conn: &mut PgConnection, product_id: Uuid, tag_ids: &[Uuid]) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM product_tags WHERE product_id = $1").bind(product_id).execute(&mut *conn).await?;
    sqlx::query("INSERT INTO product_tags (product_id, tag_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING")
        .bind(product_id).bind(tag_ids).execute(&mut *conn).await?;
    Ok(())
}

pub async fn product_tags(conn: &mut PgConnection, product_id: Uuid) -> sqlx::Result<Vec<Tag>> {
    sqlx::query_as::<_, Tag>("SELECT t.id, t.name, t.slug FROM tags t JOIN product_tags pt ON pt.tag_id = t.id WHERE pt.product_id = $1 ORDER BY t.name")
        .bind(product_id).fetch_all(conn).await
}

pub async fn product_variants(conn: &mut PgConnection, product_id: Uuid) -> sqlx::Result<Vec<ProductVariant>> {
    sqlx::query_as::<_, ProductVariant>("SELECT id, product_id, size, color, sku, price_adjustment FROM product_variants WHERE product_id = $1 ORDER BY sku")
        .bind(product_id).fetch_all(conn).await
}

pub async fn product_images(conn: &mut PgConnection, product_id: Uuid) -> sqlx::Result<Vec<ProductImage>> {
    sqlx::query_as::<_, ProductImage>("SELECT id, product_id, url, alt_text, is_main, position FROM product_images WHERE product_id = $1 ORDER BY position, id")
        .bind(product_id).fetch_all(conn).await
}

/// Average rating (2dp) and number of ratings.
pub async fn rating_summary(conn: &mut PgConnection, product_id: Uuid) -> sqlx::Result<(Option<Decimal>, i64)> {
    sqlx::query_as("SELECT ROUND(AVG(value), 2), COUNT(*) FROM ratings WHERE product_id = $1")
        .bind(product_id).fetch_one(conn).await
}

pub async fn insert_variant(conn: &mut PgConnection, product_id: Uuid, v: &NewVariant) -> sqlx::Result<ProductVariant> {
    sqlx::query_as::<_, ProductVariant>("INSERT INTO product_variants (id, product_id, size, color, sku, price_adjustment) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id, product_id, size, color, sku, price_adjustment")
        .bind(Uuid::now_v7()).bind(product_id).bind(&v.size).bind(&v.color).bind(&v.sku).bind(v.price_adjustment)
        .fetch_one(conn).await
}

pub async fn insert_image(conn: &mut PgConnection, product_id: Uuid, i: &NewImage) -> sqlx::Result<ProductImage> {
    if i.is_main {
        sqlx::query("UPDATE product_images SET is_main = FALSE WHERE product_id = $1 AND is_main").bind(product_id).execute(&mut *conn).await?;
    }
    sqlx::query_as::<_, ProductImage>("INSERT INTO product_images (id, product_id, url, alt_text, is_main, position) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id, product_id, url, alt_text, is_main, position")
        .bind(Uuid::now_v7()).bind(product_id).bind(&i.url).bind(&i.alt_text).bind(i.is_main).bind(i.position)
        .fetch_one(&mut *conn).await
}

pub async fn list_categories(conn: &mut PgConnection) -> sqlx::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>("SELECT id, name, slug, parent_id FROM categories ORDER BY name").fetch_all(conn).await
}

pub async fn find_category(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT id, name, slug, parent_id FROM categories WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn find_category_by_slug(conn: &mut PgConnection, slug: &str) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT id, name, slug, parent_id FROM categories WHERE slug = $1").bind(slug).fetch_optional(conn).await
}

pub async fn insert_category(conn: &mut PgConnection, name: &str, slug: &str, parent_id: Option<Uuid>) -> sqlx::Result<Category> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, slug, parent_id) VALUES ($1, $2, $3, $4) RETURNING id, name, slug, parent_id")
        .bind(Uuid::now_v7()).bind(name).bind(slug).bind(parent_id).fetch_one(conn).await
}

pub async fn delete_category(conn: &mut PgConnection, slug: &str) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM categories WHERE slug = $1").bind(slug).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn list_brands(conn: &mut PgConnection) -> sqlx::Result<Vec<Brand>> {
    sqlx::query_as::<_, Brand>("SELECT id, name, slug, description FROM brands ORDER BY name").fetch_all(conn).await
}

pub async fn find_brand(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Brand>> {
    sqlx::query_as::<_, Brand>("SELECT id, name, slug, description FROM brands WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn insert_brand(conn: &mut PgConnection, name: &str, slug: &str, description: &str) -> sqlx::Result<Brand> {
    sqlx::query_as::<_, Brand>("INSERT INTO brands (id, name, slug, description) VALUES ($1, $2, $3, $4) RETURNING id, name, slug, description")
        .bind(Uuid::now_v7()).bind(name).bind(slug).bind(description).fetch_one(conn).await
}

pub async fn list_tags(conn: &mut PgConnection) -> sqlx::Result<Vec<Tag>> {
    sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name").fetch_all(conn).await
}

pub async fn insert_tag(conn: &mut PgConnection, name: &str, slug: &str) -> sqlx::Result<Tag> {
    sqlx::query_as::<_, Tag>("INSERT INTO tags (id, name, slug) VALUES ($1, $2, $3) RETURNING id, name, slug")
        .bind(Uuid::now_v7()).bind(name).bind(slug).fetch_one(conn).await
}

// storefront/src/flows/product_flow.rs

//! Admin create and update of a product, from the multipart form.

use crate::db::is_unique_violation;
use crate::errors::{AppError, ValidationFailure};
use crate::flows::contexts::{ProductFields, ProductForm, SaveProductCtx};
use crate::models::Product;
use crate::services::media::{self, destroy_quietly, ImageUpload, PRODUCT_IMAGE_TYPES};
use crate::services::{pricing, slugs};
use storeflow::{Control, Flow, Registry, Shared};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub fn register_save_product_flow(registry: &Registry<AppError>) {
  let mut flow = Flow::<SaveProductCtx, AppError>::new(
    "save_product",
    &[
      "validate_product_form",
      "load_existing",
      "check_category",
      "upload_image",
      "assign_slug",
      "persist_product",
      "destroy_replaced_image",
    ],
  );

  flow.on("validate_product_form", validate_product_form);
  flow.on("load_existing", load_existing);
  flow.on("check_category", check_category);
  flow.on("upload_image", upload_image);
  flow.on("assign_slug", assign_slug);
  flow.on("persist_product", persist_product);
  flow.on("destroy_replaced_image", |ctx: Shared<SaveProductCtx>| async move {
    let (media, replaced) = {
      let guard = ctx.read();
      let replaced = guard
        .existing
        .as_ref()
        .and_then(|p| p.image_public_id.clone());
      (guard.app_state.media.clone(), replaced)
    };
    destroy_quietly(media.as_ref(), replaced.as_deref()).await;
    Ok::<_, AppError>(Control::Continue)
  });

  flow
    .skip_when("load_existing", |ctx: &SaveProductCtx| ctx.product_id.is_none())
    .skip_when("upload_image", |ctx: &SaveProductCtx| ctx.image.is_none())
    .optional("destroy_replaced_image")
    .skip_when("destroy_replaced_image", |ctx: &SaveProductCtx| {
      ctx.uploaded.is_none() || ctx.existing.is_none()
    });

  registry.register(flow);
}

/// Field rules of the product form. Collects every message before failing.
pub fn validate_form(
  form: &ProductForm,
  image: Option<&ImageUpload>,
  image_required: bool,
  max_image_bytes: usize,
) -> Result<ProductFields, ValidationFailure> {
  let mut failure = ValidationFailure::default();

  let name = form.name.as_deref().map(str::trim).unwrap_or_default();
  if name.is_empty() {
    failure.add("name", "The name field is required.");
  } else if name.chars().count() > 255 {
    failure.add("name", "The name may not be greater than 255 characters.");
  }

  let price_cents = match pricing::parse_price_to_cents(form.price.as_deref().unwrap_or_default()) {
    Ok(cents) => cents,
    Err(message) => {
      failure.add("price", message);
      0
    }
  };

  let category_id = match form.category_id.as_deref().map(str::trim) {
    None | Some("") => {
      failure.add("category_id", "The category id field is required.");
      Uuid::nil()
    }
    Some(raw) => Uuid::parse_str(raw).unwrap_or_else(|_| {
      failure.add("category_id", "The selected category id is invalid.");
      Uuid::nil()
    }),
  };

  let stock = match form.stock.as_deref().map(str::trim) {
    None | Some("") => 0,
    Some(raw) => match raw.parse::<i32>() {
      Ok(stock) if stock >= 0 => stock,
      Ok(_) => {
        failure.add("stock", "The stock must be at least 0.");
        0
      }
      Err(_) => {
        failure.add("stock", "The stock must be an integer.");
        0
      }
    },
  };

  match image {
    Some(image) => {
      if let Err(message) = media::check_image(image, "image", PRODUCT_IMAGE_TYPES, max_image_bytes) {
        failure.add("image", message);
      }
    }
    None if image_required => failure.add("image", "The image field is required."),
    None => {}
  }

  if !failure.is_empty() {
    return Err(failure);
  }

  let text = |value: &Option<String>| value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
  Ok(ProductFields {
    name: name.to_string(),
    price_cents,
    category_id,
    description: text(&form.description),
    details: text(&form.details),
    stock,
    featured: form.featured,
  })
}

async fn validate_product_form(ctx: Shared<SaveProductCtx>) -> Result<Control, AppError> {
  let mut guard = ctx.write();
  let fields = validate_form(
    &guard.form,
    guard.image.as_ref(),
    guard.product_id.is_none(),
    guard.app_state.config.max_image_bytes,
  )
  .map_err(AppError::Validation)?;
  guard.fields = Some(fields);
  Ok(Control::Continue)
}

async fn load_existing(ctx: Shared<SaveProductCtx>) -> Result<Control, AppError> {
  let (product_id, pool) = {
    let guard = ctx.read();
    (guard.product_id, guard.app_state.db_pool.clone())
  };

  let existing: Product = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", Product::COLUMNS))
    .bind(product_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found.".to_string()))?;
  ctx.write().existing = Some(existing);
  Ok(Control::Continue)
}

async fn check_category(ctx: Shared<SaveProductCtx>) -> Result<Control, AppError> {
  let (category_id, pool) = {
    let guard = ctx.read();
    (guard.fields.as_ref().map(|f| f.category_id), guard.app_state.db_pool.clone())
  };

  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
    .bind(category_id)
    .fetch_one(&pool)
    .await?;
  if !exists {
    return Err(AppError::validation("category_id", "The selected category id is invalid."));
  }
  Ok(Control::Continue)
}

#[instrument(name = "product::upload_image", skip_all, err(Display))]
async fn upload_image(ctx: Shared<SaveProductCtx>) -> Result<Control, AppError> {
  let (image, media, folder) = {
    let guard = ctx.read();
    (
      guard.image.clone(),
      guard.app_state.media.clone(),
      guard.app_state.config.cloudinary_folder.clone(),
    )
  };
  let Some(image) = image else {
    return Ok(Control::Continue);
  };

  let uploaded = media.upload(image, &folder).await?;
  info!(public_id = %uploaded.public_id, "Product image uploaded.");
  ctx.write().uploaded = Some(uploaded);
  Ok(Control::Continue)
}

/// A new product always gets a slug. An update only gets a new one when the
/// name changed.
async fn assign_slug(ctx: Shared<SaveProductCtx>) -> Result<Control, AppError> {
  let (name, existing, pool) = {
    let guard = ctx.read();
    let name = guard
      .fields
      .as_ref()
      .map(|f| f.name.clone())
      .ok_or_else(|| AppError::Internal("Slug assignment before validation.".to_string()))?;
    let existing = guard.existing.as_ref().map(|p| (p.id, p.name.clone(), p.slug.clone()));
    (name, existing, guard.app_state.db_pool.clone())
  };

  let slug = match existing {
    Some((_, old_name, old_slug)) if old_name == name => old_slug,
    Some((id, _, _)) => {
      let mut conn = pool.acquire().await?;
      slugs::unique_product_slug(&mut conn, &name, Some(id)).await?
    }
    None => {
      let mut conn = pool.acquire().await?;
      slugs::unique_product_slug(&mut conn, &name, None).await?
    }
  };
  ctx.write().slug = Some(slug);
  Ok(Control::Continue)
}

#[instrument(name = "product::persist_product", skip_all, err(Display))]
async fn persist_product(ctx: Shared<SaveProductCtx>) -> Result<Control, AppError> {
  let (fields, slug, existing, uploaded, pool, media) = {
    let guard = ctx.read();
    let fields = guard
      .fields
      .clone()
      .ok_or_else(|| AppError::Internal("Product persisted before validation.".to_string()))?;
    let slug = guard
      .slug
      .clone()
      .ok_or_else(|| AppError::Internal("Product persisted without a slug.".to_string()))?;
    (
      fields,
      slug,
      guard.existing.clone(),
      guard.uploaded.clone(),
      guard.app_state.db_pool.clone(),
      guard.app_state.media.clone(),
    )
  };

  let (image_url, image_public_id) = match (&uploaded, &existing) {
    (Some(up), _) => (Some(up.secure_url.clone()), Some(up.public_id.clone())),
    (None, Some(old)) => (old.image_url.clone(), old.image_public_id.clone()),
    (None, None) => (None, None),
  };

  let result = match &existing {
    None => {
      sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products (name, slug, category_id, price_cents, description, details, image_url, image_public_id, stock, featured) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
        Product::COLUMNS
      ))
      .bind(&fields.name)
      .bind(&slug)
      .bind(fields.category_id)
      .bind(fields.price_cents)
      .bind(&fields.description)
      .bind(&fields.details)
      .bind(&image_url)
      .bind(&image_public_id)
      .bind(fields.stock)
      .bind(fields.featured)
      .fetch_one(&pool)
      .await
    }
    Some(old) => {
      sqlx::query_as::<_, Product>(&format!(
        "UPDATE products SET name = $1, slug = $2, category_id = $3, price_cents = $4, description = $5, details = $6, \
           image_url = $7, image_public_id = $8, stock = $9, featured = $10, updated_at = NOW() \
         WHERE id = $11 RETURNING {}",
        Product::COLUMNS
      ))
      .bind(&fields.name)
      .bind(&slug)
      .bind(fields.category_id)
      .bind(fields.price_cents)
      .bind(&fields.description)
      .bind(&fields.details)
      .bind(&image_url)
      .bind(&image_public_id)
      .bind(fields.stock)
      .bind(fields.featured)
      .bind(old.id)
      .fetch_one(&pool)
      .await
    }
  };

  let product = match result {
    Ok(product) => product,
    Err(e) => {
      // The row was not written, so the fresh upload is orphaned.
      destroy_quietly(media.as_ref(), uploaded.as_ref().map(|u| u.public_id.as_str())).await;
      if is_unique_violation(&e) {
        warn!(%slug, "Product slug taken concurrently.");
        return Err(AppError::validation("name", "A product with a similar name was just saved. Please retry."));
      }
      return Err(e.into());
    }
  };

  info!(product_id = %product.id, slug = %product.slug, created = existing.is_none(), "Product saved.");
  ctx.write().saved = Some(product);
  Ok(Control::Continue)
}

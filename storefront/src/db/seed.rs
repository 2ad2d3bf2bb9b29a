// storefront/src/db/seed.rs

use crate::errors::Result;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

struct SeedProduct {
  name: &'static str,
  slug: &'static str,
  category: &'static str,
  price_cents: i64,
  description: &'static str,
  details: &'static str,
  image_url: &'static str,
  stock: i32,
  featured: bool,
}

const CATEGORIES: [(&str, &str, &str); 3] = [
  ("Speakers", "speakers", "Premium wireless speakers with exceptional sound quality"),
  ("Headphones", "headphones", "High-fidelity headphones for immersive audio experience"),
  ("Amplifiers", "amplifiers", "Professional-grade amplifiers for audiophiles"),
];

const PRODUCTS: [SeedProduct; 6] = [
  SeedProduct {
    name: "Phantom I",
    slug: "phantom-i",
    category: "speakers",
    price_cents: 399_000,
    description: "108dB, 4500 Watts, Ultra-dense sound",
    details: "The Phantom I is our most powerful speaker, delivering an incredible 4500 watts of power with crystal-clear sound at 108dB.",
    image_url: "/images/phantom-i.jpg",
    stock: 15,
    featured: true,
  },
  SeedProduct {
    name: "Phantom II",
    slug: "phantom-ii",
    category: "speakers",
    price_cents: 249_000,
    description: "103dB, 3000 Watts, Precise sound",
    details: "The Phantom II offers exceptional audio quality with 3000 watts of power.",
    image_url: "/images/phantom-ii.jpg",
    stock: 25,
    featured: true,
  },
  SeedProduct {
    name: "Dione",
    slug: "dione",
    category: "speakers",
    price_cents: 219_000,
    description: "Dolby Atmos Soundbar, 5.1.2 channels",
    details: "Premium soundbar with Dolby Atmos support, featuring 5.1.2 channels for immersive home theater experience.",
    image_url: "/images/dione.jpg",
    stock: 30,
    featured: false,
  },
  SeedProduct {
    name: "Mania",
    slug: "mania",
    category: "headphones",
    price_cents: 79_000,
    description: "Wireless ANC Headphones, 30h battery",
    details: "Premium wireless headphones with active noise cancellation and 30-hour battery life.",
    image_url: "/images/mania.jpg",
    stock: 50,
    featured: true,
  },
  SeedProduct {
    name: "Gemini II",
    slug: "gemini-ii",
    category: "headphones",
    price_cents: 29_900,
    description: "True Wireless Earbuds, Premium sound",
    details: "Compact true wireless earbuds with premium audio quality.",
    image_url: "/images/gemini-ii.jpg",
    stock: 100,
    featured: false,
  },
  SeedProduct {
    name: "Expert Pro",
    slug: "expert-pro",
    category: "amplifiers",
    price_cents: 649_000,
    description: "Reference amplifier, 250W per channel",
    details: "Professional-grade reference amplifier delivering 250 watts per channel.",
    image_url: "/images/expert-pro.jpg",
    stock: 8,
    featured: true,
  },
];

/// Inserts the demo catalogue when no category exists yet.
#[instrument(name = "db::seed_catalog", skip(pool), err(Display))]
pub async fn seed_catalog(pool: &PgPool) -> Result<bool> {
  let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories").fetch_one(pool).await?;
  if existing > 0 {
    info!(existing, "Catalog already present, skipping seed.");
    return Ok(false);
  }

  let mut tx = pool.begin().await?;
  for (name, slug, description) in CATEGORIES {
    sqlx::query("INSERT INTO categories (name, slug, description) VALUES ($1, $2, $3)")
      .bind(name)
      .bind(slug)
      .bind(description)
      .execute(&mut *tx)
      .await?;
  }

  for product in &PRODUCTS {
    let category_id: Uuid = sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
      .bind(product.category)
      .fetch_one(&mut *tx)
      .await?;
    sqlx::query(
      "INSERT INTO products (name, slug, category_id, price_cents, description, details, image_url, stock, featured) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(product.name)
    .bind(product.slug)
    .bind(category_id)
    .bind(product.price_cents)
    .bind(product.description)
    .bind(product.details)
    .bind(product.image_url)
    .bind(product.stock)
    .bind(product.featured)
    .execute(&mut *tx)
    .await?;
  }
  tx.commit().await?;

  info!(categories = CATEGORIES.len(), products = PRODUCTS.len(), "Seeded demo catalog.");
  Ok(true)
}

// storefront/src/services/slugs.rs

use crate::errors::AppError;
use sqlx::PgConnection;
use std::collections::HashSet;
use uuid::Uuid;

pub fn base_slug(name: &str) -> String {
  let slug = slug::slugify(name);
  if slug.is_empty() {
    "product".to_string()
  } else {
    slug
  }
}

/// `base`, or `base-1`, `base-2`, ... whichever is free first.
pub fn first_free_slug(base: &str, taken: &HashSet<String>) -> String {
  if !taken.contains(base) {
    return base.to_string();
  }
  let mut counter = 1u32;
  loop {
    let candidate = format!("{}-{}", base, counter);
    if !taken.contains(&candidate) {
      return candidate;
    }
    counter += 1;
  }
}

/// Picks a product slug for `name` that no other product uses. `exclude`
/// is the product being renamed, whose own slug does not count as taken.
pub async fn unique_product_slug(conn: &mut PgConnection, name: &str, exclude: Option<Uuid>) -> Result<String, AppError> {
  let base = base_slug(name);
  let taken: Vec<String> = sqlx::query_scalar(
    "SELECT slug FROM products WHERE (slug = $1 OR slug LIKE $1 || '-%') AND ($2::uuid IS NULL OR id <> $2)",
  )
  .bind(&base)
  .bind(exclude)
  .fetch_all(conn)
  .await?;
  Ok(first_free_slug(&base, &taken.into_iter().collect()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn taken(slugs: &[&str]) -> HashSet<String> {
    slugs.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn slugify_names() {
    assert_eq!(base_slug("Phantom I"), "phantom-i");
    assert_eq!(base_slug("  Gold Phantom (Opéra de Paris) "), "gold-phantom-opera-de-paris");
    assert_eq!(base_slug("!!!"), "product");
  }

  #[test]
  fn free_base_is_used_as_is() {
    assert_eq!(first_free_slug("dione", &taken(&["mania"])), "dione");
  }

  #[test]
  fn taken_base_gets_the_first_free_suffix() {
    assert_eq!(first_free_slug("mania", &taken(&["mania"])), "mania-1");
    assert_eq!(first_free_slug("mania", &taken(&["mania", "mania-1", "mania-3"])), "mania-2");
  }
}

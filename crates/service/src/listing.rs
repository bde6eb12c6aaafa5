//! Paged queries returning `{items, page, per_page, total}`.

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QuerySelect, Select};

use common::geo::BoundingBox;

use common::pagination::Pagination;
use common::types::Paged;

use crate::errors::ServiceError;

pub async fn fetch_page<E, M>(db: &DatabaseConnection, select: Select<E>, opts: Pagination) -> Result<Paged<M>, ServiceError>
where
    E: EntityTrait<Model = M>,
    M: FromQueryResult + Sized + Send + Sync + 'static,
{
    let (page_idx, per_page) = opts.normalize();
    let paginator = select.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page_idx).await?;
    let (page, per_page) = opts.effective();
    Ok(Paged { items, page, per_page, total })
}

/// `%term%` for case-insensitive LIKE filters; `None` when blank.
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    let t = term?.trim();
    if t.is_empty() { return None; }
    let escaped = t.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    Some(format!("%{}%", escaped.to_lowercase()))
}

/// `lower(col) LIKE pattern`; pair with [`like_pattern`].
pub fn ilike<C: IntoColumnRef>(col: C, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(pattern)
}

/// Any of `cols` matching the search term, or `None` for a blank term.
pub fn search_any<C: IntoColumnRef>(term: Option<&str>, cols: impl IntoIterator<Item = C>) -> Option<Condition> {
    let pattern = like_pattern(term)?;
    Some(cols.into_iter().fold(Condition::any(), |cond, col| cond.add(ilike(col, &pattern))))
}

/// Rows whose coordinates fall inside `bbox`.
pub fn within_box<C: ColumnTrait>(lat: C, lng: C, bbox: &BoundingBox) -> Condition {
    Condition::all()
        .add(lat.between(bbox.min_lat, bbox.max_lat))
        .add(lng.between(bbox.min_lng, bbox.max_lng))
}

/// `base`, or `base-N` with the smallest N >= 2 not already taken.
pub fn next_slug(base: &str, taken: &[String]) -> String {
    let base = if base.is_empty() { "item" } else { base };
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    (2u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|c| !taken.contains(c))
        .unwrap_or_else(|| format!("{base}-{}", uuid::Uuid::new_v4().simple()))
}

/// Slug derived from `title`, unique within `col` of entity `E`.
pub async fn unique_slug<E>(db: &DatabaseConnection, col: E::Column, title: &str) -> Result<String, ServiceError>
where
    E: EntityTrait,
{
    let base = models::validate::slugify(title);
    let taken: Vec<String> = E::find()
        .select_only()
        .column(col)
        .filter(col.starts_with(&base))
        .into_tuple()
        .all(db)
        .await?;
    Ok(next_slug(&base, &taken))
}

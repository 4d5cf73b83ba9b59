//! Translation of the listing model into SeaORM conditions and orderings.

use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{ColumnTrait, Condition, QueryOrder, Select};

use inkpost_core::domain::{PostFilter, SortMode};

use super::entity::post::{Column, Entity as PostEntity};

/// Escape `%`, `_` and `\` so user input is matched literally by LIKE.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// AND of all present filters; search is an OR over title, description and
/// content compared in lower case.
pub(crate) fn filter_condition(filter: &PostFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(category) = filter.category {
        condition = condition.add(Column::Category.eq(category.as_str()));
    }
    if let Some(author_id) = filter.author_id {
        condition = condition.add(Column::UserId.eq(author_id));
    }
    if let Some(featured) = filter.featured {
        condition = condition.add(Column::IsFeatured.eq(featured));
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        let any_field = [Column::Title, Column::Description, Column::Content]
            .into_iter()
            .fold(Condition::any(), |any, column| {
                any.add(
                    Expr::expr(Func::lower(Expr::col(column)))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                )
            });
        condition = condition.add(any_field);
    }

    condition
}

/// Order a post query. `id` is appended as a final tie-break so pages stay
/// stable across requests.
pub(crate) fn apply_sort(select: Select<PostEntity>, sort: SortMode) -> Select<PostEntity> {
    let select = match sort {
        SortMode::Newest => select.order_by_desc(Column::CreatedAt),
        SortMode::Oldest => select.order_by_asc(Column::CreatedAt),
        SortMode::Popular => select.order_by_desc(Column::Visit),
        SortMode::Trending => select
            .order_by_desc(Column::Visit)
            .order_by_desc(Column::CreatedAt),
    };
    select.order_by_asc(Column::Id)
}

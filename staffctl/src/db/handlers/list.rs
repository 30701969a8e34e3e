//! Query fragments shared by the list and count queries of every repository.

use sqlx::{QueryBuilder, Sqlite};

use crate::api::models::pagination::Sort;

/// Case-insensitive substring match on `name`. `%` and `_` in the input match literally.
pub(crate) fn push_name_filter(query: &mut QueryBuilder<'_, Sqlite>, name: Option<&str>) {
    if let Some(name) = name {
        query.push(" AND LOWER(name) LIKE ");
        query.push_bind(like_pattern(name));
        query.push(" ESCAPE '\\'");
    }
}

/// `ORDER BY` from the whitelisted sort, ties broken by id, followed by `LIMIT`/`OFFSET`.
pub(crate) fn push_order_and_page(query: &mut QueryBuilder<'_, Sqlite>, sort: &Sort, skip: i64, limit: i64) {
    query.push(format!(" ORDER BY {} {}, id ASC", sort.field.column(), sort.direction.sql()));
    query.push(" LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(skip);
}

fn like_pattern(name: &str) -> String {
    let mut pattern = String::with_capacity(name.len() + 2);
    pattern.push('%');
    for c in name.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::pagination::{SortDirection, SortField};

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Acme"), "%acme%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_order_uses_whitelisted_column() {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM companies WHERE 1=1");
        let sort = Sort {
            field: SortField::Email,
            direction: SortDirection::Desc,
        };
        push_order_and_page(&mut query, &sort, 0, 20);

        assert_eq!(
            query.sql(),
            "SELECT * FROM companies WHERE 1=1 ORDER BY email DESC, id ASC LIMIT ? OFFSET ?"
        );
    }
}

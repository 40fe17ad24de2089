use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

pub const MAX_PER_PAGE: i64 = 100;
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn normalize(&self) -> (i64, i64, i64) {
        // Bounded so the offset below cannot overflow.
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, MAX_PER_PAGE);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategorySortBy {
    Name,
    Slug,
    CreatedAt,
}

// Pagination fields are inlined: `serde(flatten)` loses the numeric types
// when the query string is decoded.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CategoryQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub parent_id: Option<Uuid>,
    pub roots_only: Option<bool>,
    pub q: Option<String>,
    pub sort_by: Option<CategorySortBy>,
    pub sort_order: Option<SortOrder>,
}

impl CategoryQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_applies_defaults_and_bounds() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        assert_eq!(Pagination::new(3, 10).normalize(), (3, 10, 20));
        assert_eq!(Pagination::new(0, 1000).normalize(), (1, 100, 0));
        assert_eq!(Pagination::new(-4, 0).normalize(), (1, 1, 0));
    }

    #[test]
    fn normalize_caps_huge_pages() {
        let (page, per_page, offset) = Pagination::new(i64::MAX, 20).normalize();
        assert_eq!(page, MAX_PAGE);
        assert_eq!(per_page, 20);
        assert!(offset > 0);

        let (_, _, offset) = Pagination::new(i64::MAX, i64::MAX).normalize();
        assert!(offset > 0);
    }

    #[test]
    fn category_query_exposes_pagination() {
        let query = CategoryQuery {
            page: Some(2),
            per_page: Some(5),
            ..Default::default()
        };
        assert_eq!(query.pagination().normalize(), (2, 5, 5));
    }
}

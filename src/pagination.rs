use serde::Deserialize;

use crate::errors::BackendError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Raw pagination/sorting query parameters, as deserialized from the
/// query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
}

/// The closed set of sortable recipe fields, named as they appear on the
/// wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortField {
    CreatedAt,
    Title,
    PrepTime,
    CookTime,
    Servings,
    Difficulty,
    Rating,
}

impl SortField {
    fn parse(name: &str) -> Option<SortField> {
        match name {
            "createdAt" => Some(SortField::CreatedAt),
            "title" => Some(SortField::Title),
            "prepTime" => Some(SortField::PrepTime),
            "cookTime" => Some(SortField::CookTime),
            "servings" => Some(SortField::Servings),
            "difficulty" => Some(SortField::Difficulty),
            "rating" => Some(SortField::Rating),
            _ => None,
        }
    }

    /// The SQL expression this field sorts by.
    pub fn order_expression(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::PrepTime => "prep_time",
            SortField::CookTime => "cook_time",
            SortField::Servings => "servings",
            SortField::Difficulty => {
                "CASE difficulty WHEN 'Easy' THEN 0 WHEN 'Medium' THEN 1 ELSE 2 END"
            }
            SortField::Rating => "rating",
        }
    }
}

/// A parsed sort order: field plus direction. A leading `-` on the field
/// name means descending.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sort {
    pub field: SortField,
    pub descending: bool,
}

impl Sort {
    pub fn parse(raw: &str) -> Result<Sort, BackendError> {
        let (name, descending) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw, false),
        };

        SortField::parse(name)
            .map(|field| Sort { field, descending })
            .ok_or_else(|| BackendError::validation(format!("Unknown sort field: {}", name)))
    }
}

impl Default for Sort {
    /// Creation time, newest first.
    fn default() -> Self {
        Sort {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

/// Validated pagination parameters.
#[derive(Clone, Copy, Debug)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
    pub sort: Sort,
}

impl PageParams {
    pub fn from_query(query: &ListQuery) -> Result<Self, BackendError> {
        let page = query.page.unwrap_or(DEFAULT_PAGE);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

        if page < 1 {
            return Err(BackendError::validation(
                "The page must be a positive integer",
            ));
        }
        if limit < 1 {
            return Err(BackendError::validation(
                "The limit must be a positive integer",
            ));
        }

        let sort = match &query.sort {
            Some(raw) => Sort::parse(raw)?,
            None => Sort::default(),
        };

        Ok(PageParams { page, limit, sort })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// `ceil(total / limit)`.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

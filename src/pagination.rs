use serde::{Deserialize, Deserializer, de};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Raw `?page=&pageSize=` query. An empty value counts as omitted.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page: Option<i64>,
    #[serde(default, rename = "pageSize", deserialize_with = "blank_as_none")]
    pub page_size: Option<i64>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("page must be at least 1, got {0}")]
    InvalidPage(i64),
    #[error("pageSize must be at least 1, got {0}")]
    InvalidPageSize(i64),
}

/// A validated page request. Both fields are >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TryFrom<PageParams> for PageRequest {
    type Error = PaginationError;

    fn try_from(params: PageParams) -> Result<Self, Self::Error> {
        PageRequest::new(
            params.page.unwrap_or(DEFAULT_PAGE),
            params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Result<Self, PaginationError> {
        if page < 1 {
            return Err(PaginationError::InvalidPage(page));
        }
        if page_size < 1 {
            return Err(PaginationError::InvalidPageSize(page_size));
        }
        Ok(PageRequest { page, page_size })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self, total_items: i64) -> i64 {
        if total_items <= 0 {
            return 0;
        }
        (total_items - 1) / self.page_size + 1
    }
}

/// One window of an id-ordered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub request: PageRequest,
    pub total_items: i64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, total_items: i64, items: Vec<T>) -> Self {
        Page {
            request,
            total_items,
            items,
        }
    }

    pub fn total_pages(&self) -> i64 {
        self.request.total_pages(self.total_items)
    }
}

use axum::http::StatusCode;
use serde::Serialize;

use crate::pagination::Page;

#[derive(Debug, Serialize)]
pub struct ItemResponse<T> {
    pub success: bool,
    pub item: T,
}

impl<T> ItemResponse<T> {
    pub fn new(item: T) -> Self {
        ItemResponse {
            success: true,
            item,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub success: bool,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items: Vec<T>,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        PageResponse {
            success: true,
            page: page.request.page(),
            page_size: page.request.page_size(),
            total_pages: page.total_pages(),
            total_items: page.total_items,
            items: page.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: String) -> Self {
        ErrorResponse {
            success: false,
            error: status.as_u16(),
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResults {
    pub access_token: String,
    pub expires_in: Option<String>,
    pub token_type: Option<String>,
}

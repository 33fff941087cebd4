//! `robots.txt`
//!
//! Served without the page middleware: crawlers neither need a token nor
//! open a session.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use crate::middleware::PageContext;
use crate::views;

/// `GET /robots.txt`
pub async fn robots(page: PageContext) -> Response {
    let body = views::robots_txt(page.allow_indexing, &page.urls.sitemap());
    ([(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

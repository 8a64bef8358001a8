mod url;

use serde::Serialize;

pub use self::url::{CreateUrlRequest, CreateUrlResponse, ErrorResponse, GetUrlResponse};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

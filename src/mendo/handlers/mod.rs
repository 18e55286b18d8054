pub mod health;
pub use self::health::health;

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod order_details;
pub mod orders;
pub mod reminders;
pub mod templates;

use serde::Serialize;

// Common envelope shapes shared by the collection handlers.

#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse<T> {
    pub item: T,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}

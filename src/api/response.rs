//! Standard API response types

use serde::Serialize;

/// Envelope for successful responses: `{"data": ...}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::{codes, AppError};

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new(codes::INDEX_SAVE_FAILED, "Failed to format timestamp")
            .with_details(e.to_string())
    })
}

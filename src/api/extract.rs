use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` extractor that reports bad bodies through [`AppError`]
///
/// A missing field, a wrong type or an unknown reference id becomes a
/// `400` with the usual `{"error": ..}` body instead of axum's plain-text
/// rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

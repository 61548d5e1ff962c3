use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` whose rejections render as a 400 with the usual error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

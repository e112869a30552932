//! Text form fields from either a multipart or a urlencoded body.

use std::collections::HashMap;

use axum::extract::{Form, FromRequest, Multipart, Request};
use axum::http::header;

use filexfer_core::error::AppError;

use crate::error::ApiError;

/// The text fields of a form submission, keyed by name.
///
/// Multipart file parts are skipped; when a name repeats, the first value
/// wins.
#[derive(Debug, Clone, Default)]
pub struct FormFields(pub HashMap<String, String>);

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(format!("get form err: {}", e.body_text())))?;
            return Ok(Self(fields));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(format!("get form err: {}", e.body_text())))?;

        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            if field.file_name().is_some() || fields.contains_key(&name) {
                continue;
            }
            let value = field.text().await?;
            fields.insert(name, value);
        }
        Ok(Self(fields))
    }
}

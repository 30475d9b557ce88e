//! Multipart reading for the spreadsheet upload routes.

use crate::error::{StoreError, StoreResult};
use actix_multipart::{Field, Multipart};
use futures_util::StreamExt;

/// Upper bound for an uploaded file.
const MAX_UPLOAD: usize = 10 * 1024 * 1024;

/// Fields of an upload form. Unknown fields are ignored.
pub(crate) struct UploadForm {
    /// Contents of the `file` field.
    pub file: Vec<u8>,
    /// The optional `taken_at` text field.
    pub taken_at: Option<String>,
}

/// Reads the whole form. A missing `file` field is an invalid request.
pub(crate) async fn read_upload(mut payload: Multipart) -> StoreResult<UploadForm> {
    let mut taken_at: Option<String> = None;
    let mut file: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let field = item.map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match name.as_deref() {
            Some("taken_at") => {
                let bytes = read_field(field).await?;
                let text = String::from_utf8(bytes)
                    .map_err(|_| StoreError::InvalidRequest("taken_at is not UTF-8".into()))?;
                taken_at = Some(text);
            }
            Some("file") => file = Some(read_field(field).await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| StoreError::InvalidRequest("missing file field".into()))?;
    Ok(UploadForm { file, taken_at })
}

async fn read_field(mut field: Field) -> StoreResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
        if bytes.len() + chunk.len() > MAX_UPLOAD {
            return Err(StoreError::InvalidRequest("upload too large".into()));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Builds a `multipart/form-data` body for route tests.
#[cfg(test)]
pub(crate) fn encode(fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "daybook-form-boundary";
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        if *name == "file" {
            body.push_str(
                "Content-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
                 Content-Type: text/csv\r\n\r\n",
            );
        } else {
            body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                name
            ));
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    (
        format!("multipart/form-data; boundary={}", BOUNDARY),
        body.into_bytes(),
    )
}

/// Serves files written by the local blob store
use actix_web::{http::header, web, HttpResponse};

use crate::errors::{ApiError, ApiResult};
use crate::services::{BlobStore, FileKind};

pub async fn serve_upload(
    store: web::Data<BlobStore>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (folder, file) = path.into_inner();
    let local = match store.get_ref() {
        BlobStore::Local(local) => local,
        // Remote backends hand out their own URLs
        _ => return Err(ApiError::not_found("File not found")),
    };

    let full_path = local.resolve(&folder, &file).ok_or_else(|| {
        log::warn!("Rejected upload path {}/{}", folder, file);
        ApiError::bad_request("Invalid file path")
    })?;

    let data = match tokio::fs::read(&full_path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("File not found"))
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = FileKind::detect(&data)
        .map(FileKind::mime)
        .unwrap_or("application/octet-stream");

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=86400"))
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .body(data))
}

//! # Menu API
//!
//! Listing is public. Creating, updating, deleting items and uploading item
//! images is restricted to admin and staff.

use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use futures::StreamExt;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::path::{Path, PathBuf};

use super::middleware::CurrentUser;
use super::{AppError, AppResult, ResultExt};
use crate::auth::{authorize, STAFF_ROLES};
use crate::db::{MenuItemChanges, NewMenuItem, SqlRepo};
use crate::validation::require_non_blank;

/// Largest accepted image file
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Directory uploaded menu images are written to, served under `/uploads`.
#[derive(Debug, Clone)]
pub struct UploadDir(pub PathBuf);

#[derive(Deserialize)]
struct CreateMenuItem {
    name: String,
    description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    image_url: Option<String>,
    #[serde(default = "default_available")]
    is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Absent fields stay `None`; an explicit `null` becomes `Some(None)`.
#[derive(Deserialize)]
struct UpdateMenuItem {
    name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    description: Option<Option<String>>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    price: Option<Decimal>,
    #[serde(default, deserialize_with = "present")]
    image_url: Option<Option<String>>,
    is_available: Option<bool>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Prices are stored with two fractional digits and may not be negative.
fn normalize_price(price: Decimal) -> AppResult<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::validation_field("price", "must not be negative"));
    }
    Ok(price.round_dp(2))
}

/// Lists every menu item, newest first
#[get("/menu")]
async fn list_menu(repo: web::Data<SqlRepo>) -> AppResult<impl Responder> {
    let items = repo.list_menu_items().await?;
    Ok(HttpResponse::Ok().json(items))
}

/// Creates a menu item
///
/// # Errors
/// - `401 Unauthorized` / `403 Forbidden`: caller is not admin or staff
/// - `422 Unprocessable Entity`: blank name or negative price
#[post("/menu")]
async fn create_menu_item(
    repo: web::Data<SqlRepo>,
    user: CurrentUser,
    data: web::Json<CreateMenuItem>,
) -> AppResult<impl Responder> {
    authorize(Some(user.0), STAFF_ROLES)?;
    let data = data.into_inner();

    let item = repo
        .create_menu_item(NewMenuItem {
            name: require_non_blank("name", &data.name)?.to_string(),
            description: data.description,
            price: normalize_price(data.price)?,
            image_url: data.image_url,
            is_available: data.is_available,
        })
        .await?;

    tracing::info!(menu_item_id = item.id, "Menu item created");
    Ok(HttpResponse::Ok().json(item))
}

/// Updates the supplied fields of a menu item
///
/// # Errors
/// - `401 Unauthorized` / `403 Forbidden`: caller is not admin or staff
/// - `404 Not Found`: no item with that id
/// - `422 Unprocessable Entity`: blank name or negative price
#[put("/menu/{id}")]
async fn update_menu_item(
    repo: web::Data<SqlRepo>,
    user: CurrentUser,
    path: web::Path<i64>,
    data: web::Json<UpdateMenuItem>,
) -> AppResult<impl Responder> {
    authorize(Some(user.0), STAFF_ROLES)?;
    let id = path.into_inner();
    let data = data.into_inner();

    let name = match data.name.as_deref() {
        Some(name) => Some(require_non_blank("name", name)?.to_string()),
        None => None,
    };
    let changes = MenuItemChanges {
        name,
        description: data.description,
        price: data.price.map(normalize_price).transpose()?,
        image_url: data.image_url,
        is_available: data.is_available,
    };

    let item = repo
        .update_menu_item(id, changes)
        .await?
        .ok_or_else(|| AppError::not_found_id("Menu item", id))?;

    tracing::info!(menu_item_id = id, "Menu item updated");
    Ok(HttpResponse::Ok().json(item))
}

#[delete("/menu/{id}")]
async fn delete_menu_item(
    repo: web::Data<SqlRepo>,
    user: CurrentUser,
    path: web::Path<i64>,
) -> AppResult<impl Responder> {
    authorize(Some(user.0), STAFF_ROLES)?;
    let id = path.into_inner();

    if !repo.delete_menu_item(id).await? {
        return Err(AppError::not_found_id("Menu item", id));
    }

    tracing::info!(menu_item_id = id, "Menu item deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Suffix of the uploaded file name including the dot, `.jpg` when the
/// name has no usable extension.
fn image_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".jpg".to_string())
}

/// Stores the `file` part of a multipart form as a menu image
///
/// The part must carry an `image/*` content type.
///
/// # Response
///
/// ```json
/// { "url": "/uploads/menu/3f2b...c1.png" }
/// ```
///
/// # Errors
/// - `401 Unauthorized` / `403 Forbidden`: caller is not admin or staff
/// - `422 Unprocessable Entity`: no `file` part, non-image part, empty or oversized file
#[post("/menu/upload")]
async fn upload_menu_image(
    user: CurrentUser,
    upload_dir: web::Data<UploadDir>,
    mut payload: Multipart,
) -> AppResult<impl Responder> {
    authorize(Some(user.0), STAFF_ROLES)?;

    let malformed = |e: actix_multipart::MultipartError| {
        AppError::Validation(format!("Malformed multipart body: {}", e))
    };

    let mut upload = None;
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(malformed)?;
        if field.name() != Some("file") {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|mime| mime.type_().as_str() == "image");
        if !is_image {
            return Err(AppError::Validation("Invalid image type".to_string()));
        }
        let extension = image_extension(
            field
                .content_disposition()
                .and_then(|disposition| disposition.get_filename()),
        );

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(malformed)?;
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::validation_field("file", "exceeds the 5 MiB limit"));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some((extension, bytes));
        break;
    }

    let (extension, bytes) =
        upload.ok_or_else(|| AppError::validation_field("file", "is required"))?;
    if bytes.is_empty() {
        return Err(AppError::validation_field("file", "is empty"));
    }

    let file_name = format!("{}{}", uuid::Uuid::new_v4().simple(), extension);
    let menu_dir = upload_dir.0.join("menu");

    tokio::fs::create_dir_all(&menu_dir)
        .await
        .map_err_internal("creating upload directory")?;
    tokio::fs::write(menu_dir.join(&file_name), &bytes)
        .await
        .map_err_internal("writing uploaded image")?;

    tracing::info!(file = %file_name, bytes = bytes.len(), "Menu image uploaded");
    Ok(HttpResponse::Ok().json(json!({ "url": format!("/uploads/menu/{}", file_name) })))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_menu);
    cfg.service(create_menu_item);
    cfg.service(upload_menu_image);
    cfg.service(update_menu_item);
    cfg.service(delete_menu_item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn negative_prices_are_rejected() {
        assert!(normalize_price(Decimal::from_str("-0.01").unwrap()).is_err());
        assert_eq!(
            normalize_price(Decimal::from_str("9.999").unwrap()).unwrap(),
            Decimal::from_str("10.00").unwrap()
        );
    }

    #[test]
    fn extensions_come_from_the_file_name() {
        assert_eq!(image_extension(Some("dish.png")), ".png");
        assert_eq!(image_extension(Some("photos/Dish.JPEG")), ".JPEG");
        assert_eq!(image_extension(Some("no-extension")), ".jpg");
        assert_eq!(image_extension(Some(".hidden")), ".jpg");
        assert_eq!(image_extension(None), ".jpg");
    }

    #[test]
    fn explicit_null_is_distinct_from_an_absent_field() {
        let cleared: UpdateMenuItem =
            serde_json::from_str(r#"{"description": null, "image_url": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert_eq!(cleared.image_url, Some(None));

        let untouched: UpdateMenuItem = serde_json::from_str(r#"{"price": 4.5}"#).unwrap();
        assert_eq!(untouched.description, None);
        assert_eq!(untouched.image_url, None);

        let set: UpdateMenuItem = serde_json::from_str(r#"{"description": "Hot"}"#).unwrap();
        assert_eq!(set.description, Some(Some("Hot".to_string())));
    }
}

/// Admin moderation of listings, book orders, print orders and coupons
use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::bson::{doc, to_bson, Document};
use mongodb::Database;
use serde_json::json;
use validator::Validate;

use crate::db::{self, BOOK_ORDERS, COUPONS, LISTINGS, PRINT_ORDERS};
use crate::errors::{ApiError, ApiResult};
use crate::handlers::form::form_enum;
use crate::handlers::{collect_all, listings_by_id, load_user, user_summaries};
use crate::middleware::require_admin;
use crate::models::{
    normalize_code, BookOrder, BookOrderResponse, Coupon, CouponResponse, CreateCouponRequest,
    Listing, ListingQuery, ListingResponse, ModerateListingRequest, ModerationStatus, PrintOrder,
    timestamps, PrintOrderResponse, StatusChange, StockStatus, UpdatePrintStatusRequest,
};
use crate::services::mailer as emails;
use crate::services::Mailer;
use crate::utils::{parse_object_id, Claims};

// ========== Print orders ==========

/// All print orders, newest first
pub async fn list_print_orders(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
) -> ApiResult<HttpResponse> {
    require_admin(&claims)?;

    let cursor = db
        .collection::<PrintOrder>(PRINT_ORDERS)
        .find(doc! {})
        .sort(doc! { "order_date": -1 })
        .await?;
    let orders = collect_all(cursor).await?;
    let users = user_summaries(&db, orders.iter().map(|o| o.user_id.as_str())).await?;

    let data: Vec<PrintOrderResponse> = orders
        .into_iter()
        .map(|order| {
            let user = users.get(&order.user_id).cloned();
            PrintOrderResponse::new(order, user)
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

async fn find_print_order(db: &Database, raw_id: &str) -> ApiResult<PrintOrder> {
    let oid = parse_object_id(raw_id, "order")?;
    db.collection::<PrintOrder>(PRINT_ORDERS)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::not_found("Print order not found"))
}

/// One print order with customer contact
pub async fn get_print_order(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_admin(&claims)?;

    let order = find_print_order(&db, &path).await?;
    let user = user_summaries(&db, [order.user_id.as_str()])
        .await?
        .remove(&order.user_id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "order": PrintOrderResponse::new(order, user),
    })))
}

/// Move a print order along its status machine
pub async fn update_print_status(
    db: web::Data<Database>,
    mailer: web::Data<Mailer>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    req: web::Json<UpdatePrintStatusRequest>,
) -> ApiResult<HttpResponse> {
    require_admin(&claims)?;

    let mut order = find_print_order(&db, &path).await?;
    let next = req.status;
    if order.status.is_terminal() {
        return Err(ApiError::conflict(format!(
            "Order is already {} and can no longer change",
            order.status.as_str()
        )));
    }
    if !order.status.can_transition_to(next) {
        return Err(ApiError::conflict(format!(
            "Cannot move order from {} to {}",
            order.status.as_str(),
            next.as_str()
        )));
    }

    let change = StatusChange {
        from: order.status,
        to: next,
        changed_by: claims.sub.clone(),
        note: req.note.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        changed_at: Utc::now(),
    };

    let updated = db
        .collection::<PrintOrder>(PRINT_ORDERS)
        .update_one(
            doc! { "_id": order.id, "status": to_bson(&order.status)? },
            doc! {
                "$set": { "status": to_bson(&next)? },
                "$push": { "history": to_bson(&change)? },
            },
        )
        .await?;
    if updated.matched_count == 0 {
        return Err(ApiError::conflict("Order status changed, please retry"));
    }

    log::info!("🖨️ Print order {} {} -> {}", path.as_str(), order.status.as_str(), next.as_str());
    order.status = next;
    order.history.push(change);

    let recipient = match order.email.clone() {
        Some(email) => Some(email),
        None => load_user(&db, &order.user_id).await.ok().map(|u| u.email),
    };
    if let Some(to) = recipient {
        mailer.send_in_background(emails::print_status_changed(&to, &order, next));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Order status updated",
        "order": PrintOrderResponse::new(order, None),
    })))
}

// ========== Listings ==========

fn admin_listing_filter(query: &ListingQuery) -> ApiResult<Document> {
    let mut filter = Document::new();
    if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        let status: ModerationStatus = form_enum(status, "status")?;
        filter.insert("status", to_bson(&status)?);
    }
    Ok(filter)
}

/// All listings, optionally filtered by moderation status
pub async fn list_books(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    query: web::Query<ListingQuery>,
) -> ApiResult<HttpResponse> {
    require_admin(&claims)?;

    let cursor = db
        .collection::<Listing>(LISTINGS)
        .find(admin_listing_filter(&query)?)
        .sort(doc! { "created_at": -1 })
        .await?;
    let books = collect_all(cursor).await?;
    let sellers = user_summaries(&db, books.iter().map(|b| b.user_id.as_str())).await?;

    let data: Vec<ListingResponse> = books
        .into_iter()
        .map(|book| {
            let seller = sellers.get(&book.user_id).cloned();
            ListingResponse::new(book, seller)
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

/// Fields written when a listing is moderated
fn moderation_update(next: ModerationStatus, updated_price: Option<f64>) -> ApiResult<Document> {
    let mut set = doc! {
        "status": to_bson(&next)?,
        "updated_at": timestamps::now(),
    };
    if let Some(price) = updated_price {
        set.insert("updated_price", price);
    }
    if next == ModerationStatus::Rejected {
        set.insert("soldstatus", to_bson(&StockStatus::Rejected)?);
    }
    Ok(set)
}

/// Accept or reject a listing
pub async fn moderate_book(
    db: web::Data<Database>,
    mailer: web::Data<Mailer>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    req: web::Json<ModerateListingRequest>,
) -> ApiResult<HttpResponse> {
    require_admin(&claims)?;

    let next = req.status;
    if next == ModerationStatus::Pending {
        return Err(ApiError::bad_request("status must be Accepted or Rejected"));
    }
    if req.updated_price.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(ApiError::bad_request("updatedPrice cannot be negative"));
    }

    let oid = parse_object_id(&path, "book")?;
    let listings = db.collection::<Listing>(LISTINGS);
    let book = listings
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::not_found("Book not found"))?;

    if !book.status.can_transition_to(next, book.soldstatus) {
        return Err(ApiError::conflict(format!(
            "Cannot move listing from {:?} to {:?} while {:?}",
            book.status, next, book.soldstatus
        )));
    }

    let updated = listings
        .find_one_and_update(
            doc! {
                "_id": oid,
                "status": to_bson(&book.status)?,
                "soldstatus": to_bson(&book.soldstatus)?,
            },
            doc! { "$set": moderation_update(next, req.updated_price)? },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::conflict("Listing changed, please retry"))?;

    log::info!("📚 Listing {} moderated: {:?}", path.as_str(), next);

    let seller = load_user(&db, &updated.user_id).await.ok();
    if let Some(seller) = &seller {
        mailer.send_in_background(emails::listing_moderated(seller, &updated));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Book {:?}", next).to_lowercase(),
        "book": ListingResponse::new(updated, seller.as_ref().map(Into::into)),
    })))
}

/// All book orders with buyer, seller and book name
pub async fn ordered_books(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
) -> ApiResult<HttpResponse> {
    require_admin(&claims)?;

    let cursor = db
        .collection::<BookOrder>(BOOK_ORDERS)
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await?;
    let orders = collect_all(cursor).await?;

    let books = listings_by_id(&db, orders.iter().map(|o| o.book_id.as_str())).await?;
    let people = user_summaries(
        &db,
        orders
            .iter()
            .flat_map(|o| [o.buyer_id.as_str(), o.seller_id.as_str()]),
    )
    .await?;

    let data: Vec<BookOrderResponse> = orders
        .into_iter()
        .map(|order| {
            let book_name = books.get(&order.book_id).map(|b| b.name.clone());
            let buyer = people.get(&order.buyer_id).cloned();
            let seller = people.get(&order.seller_id).cloned();
            BookOrderResponse::new(order, book_name).with_parties(buyer, seller)
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

// ========== Coupons ==========

pub async fn create_coupon(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    req: web::Json<CreateCouponRequest>,
) -> ApiResult<HttpResponse> {
    require_admin(&claims)?;
    req.validate()?;

    let mut coupon = Coupon {
        id: None,
        code: normalize_code(&req.code),
        discount_percentage: req.discount_percentage,
        active: true,
        max_uses: req.max_uses,
        used_count: 0,
        expires_at: req.expires_at,
        created_at: Utc::now(),
    };

    match db.collection::<Coupon>(COUPONS).insert_one(&coupon).await {
        Ok(result) => coupon.id = result.inserted_id.as_object_id(),
        Err(e) if db::is_duplicate_key(&e) => return Err(ApiError::conflict("Coupon code already exists")),
        Err(e) => return Err(e.into()),
    }

    log::info!("🎟️ Coupon {} created ({}% off)", coupon.code, coupon.discount_percentage);
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "coupon": CouponResponse::from(coupon),
    })))
}

pub async fn list_coupons(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
) -> ApiResult<HttpResponse> {
    require_admin(&claims)?;

    let cursor = db
        .collection::<Coupon>(COUPONS)
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await?;
    let coupons: Vec<CouponResponse> = collect_all(cursor)
        .await?
        .into_iter()
        .map(CouponResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": coupons.len(),
        "data": coupons,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_also_pulls_stock() {
        let set = moderation_update(ModerationStatus::Rejected, None).unwrap();
        assert_eq!(set.get_str("status").unwrap(), "Rejected");
        assert_eq!(set.get_str("soldstatus").unwrap(), "Rejected");
        assert!(!set.contains_key("updated_price"));
        assert!(set.get_datetime("updated_at").is_ok());

        let set = moderation_update(ModerationStatus::Accepted, Some(150.0)).unwrap();
        assert_eq!(set.get_str("status").unwrap(), "Accepted");
        assert_eq!(set.get_f64("updated_price").unwrap(), 150.0);
        assert!(!set.contains_key("soldstatus"));
    }

    #[test]
    fn test_admin_status_filter() {
        let query = ListingQuery {
            status: Some("Pending".to_string()),
            ..Default::default()
        };
        assert_eq!(admin_listing_filter(&query).unwrap(), doc! { "status": "Pending" });
        assert!(admin_listing_filter(&ListingQuery::default()).unwrap().is_empty());

        let query = ListingQuery {
            status: Some("Archived".to_string()),
            ..Default::default()
        };
        assert!(admin_listing_filter(&query).is_err());
    }
}

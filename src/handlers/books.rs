/// Book listings and book orders
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::bson::{doc, to_bson, Document};
use mongodb::Database;
use serde_json::json;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::{BOOK_ORDERS, LISTINGS};
use crate::errors::{ApiError, ApiResult};
use crate::handlers::form::{form_enum, FormData};
use crate::handlers::{collect_all, load_user, user_summaries};
use crate::models::{
    BookCategory, BookOrder, BookOrderResponse, BookOrderStatus, BuyBookRequest,
    ConfirmOrderRequest, Listing, ListingQuery, ListingResponse, ModerationStatus, NewListing,
    OrderAction, ReviewRequest, SellType, StockStatus, UpdateStockRequest, UserSummary,
};
use crate::models::timestamps;
use crate::services::mailer as emails;
use crate::services::{BlobStore, FileKind, Mailer};
use crate::utils::{parse_object_id, PaginatedResponse, PaginationParams};

const LISTING_FOLDER: &str = "sellbooks";
const REQUIRED_LISTING_FIELDS: [&str; 5] = ["name", "price", "condition", "description", "location"];

/// Text part of the sell-book form
fn parse_listing_form(form: &FormData) -> ApiResult<NewListing> {
    form.require(&REQUIRED_LISTING_FIELDS)?;
    // Older clients spell the category fields "categeory" / "subcategeory"
    let category_raw = form
        .text_any(&["category", "categeory"])
        .ok_or_else(|| ApiError::bad_request("Missing required fields: category"))?;
    let selltype_raw = form
        .text_any(&["selltype", "sellType"])
        .ok_or_else(|| ApiError::bad_request("Missing required fields: selltype"))?;

    let text = |name: &str| form.text(name).unwrap_or_default();
    let selltype: SellType = form_enum(&selltype_raw, "selltype")?;
    let price = text("price")
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| ApiError::bad_request("Price must be a number"))?;

    let listing = NewListing {
        name: text("name"),
        // Donations are always free
        price: if selltype == SellType::Donate { 0.0 } else { price },
        condition: form_enum(&text("condition"), "condition")?,
        description: text("description"),
        location: text("location"),
        category: form_enum(&category_raw, "category")?,
        subcategory: form.text_any(&["subcategory", "subcategeory"]),
        selltype,
    };
    listing.validate()?;
    Ok(listing)
}

/// List a book for sale or donation (multipart with an `image` file)
pub async fn sell_book(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    store: web::Data<BlobStore>,
    mailer: web::Data<Mailer>,
    user_id: web::ReqData<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = FormData::read(payload, &[("image", config.max_image_bytes)]).await?;
    let new_listing = parse_listing_form(&form)?;
    let image = form
        .take_file("image")
        .ok_or_else(|| ApiError::bad_request("Image is required"))?;
    let kind = image.kind("image", FileKind::is_image)?;

    let seller = load_user(&db, &user_id).await?;

    let stored = store.put(LISTING_FOLDER, kind, &image.file_name, image.data).await?;

    let now = Utc::now();
    let mut listing = Listing {
        id: None,
        name: new_listing.name,
        image: stored.url,
        image_key: stored.key,
        price: new_listing.price,
        condition: new_listing.condition,
        description: new_listing.description,
        location: new_listing.location,
        category: new_listing.category,
        subcategory: new_listing.subcategory,
        selltype: new_listing.selltype,
        user_id: user_id.to_string(),
        status: ModerationStatus::Pending,
        updated_price: None,
        soldstatus: StockStatus::Instock,
        created_at: now,
        updated_at: now,
    };

    match db.collection::<Listing>(LISTINGS).insert_one(&listing).await {
        Ok(result) => listing.id = result.inserted_id.as_object_id(),
        Err(e) => {
            store.delete_quietly(&listing.image_key).await;
            return Err(e.into());
        }
    }

    log::info!("📚 New listing \"{}\" by {}", listing.name, seller.email);
    mailer.send_in_background(emails::new_listing_for_admin(mailer.admin_email(), &listing, &seller));

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Book submitted for review",
        "book": ListingResponse::new(listing, Some(UserSummary::from(&seller))),
    })))
}

fn public_listing_filter(query: &ListingQuery) -> ApiResult<Document> {
    let mut filter = doc! { "status": to_bson(&ModerationStatus::Accepted)? };
    if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        let category: BookCategory = form_enum(category, "category")?;
        filter.insert("category", to_bson(&category)?);
    }
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        filter.insert("name", doc! { "$regex": regex::escape(q), "$options": "i" });
    }
    Ok(filter)
}

/// Public catalogue: accepted listings, newest first
pub async fn list_books(
    db: web::Data<Database>,
    pagination: web::Query<PaginationParams>,
    query: web::Query<ListingQuery>,
) -> ApiResult<HttpResponse> {
    let filter = public_listing_filter(&query)?;
    let listings = db.collection::<Listing>(LISTINGS);

    let total = listings.count_documents(filter.clone()).await?;
    let sort_doc = pagination.build_sort_doc("created_at", &[("newest", "created_at"), ("price", "price"), ("name", "name")]);

    let cursor = listings
        .find(filter)
        .sort(sort_doc)
        .skip(pagination.skip())
        .limit(pagination.limit())
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

    Ok(HttpResponse::Ok().json(PaginatedResponse::new(data, total, &pagination)))
}

async fn find_listing(db: &Database, raw_id: &str) -> ApiResult<Listing> {
    let oid = parse_object_id(raw_id, "book")?;
    db.collection::<Listing>(LISTINGS)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::not_found("Book not found"))
}

/// One listing with seller contact
pub async fn get_book(db: web::Data<Database>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let book = find_listing(&db, &path).await?;
    let seller = user_summaries(&db, [book.user_id.as_str()])
        .await?
        .remove(&book.user_id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "book": ListingResponse::new(book, seller),
    })))
}

/// Owner marks a listing in stock / sold out
pub async fn update_sold_status(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
    path: web::Path<String>,
    req: web::Json<UpdateStockRequest>,
) -> ApiResult<HttpResponse> {
    let next = req.soldstatus;
    if next == StockStatus::Rejected {
        return Err(ApiError::bad_request("soldstatus must be Instock, Ordered or Soldout"));
    }

    let book = find_listing(&db, &path).await?;
    if book.user_id != *user_id {
        return Err(ApiError::forbidden("You can only update your own books"));
    }
    if !book.soldstatus.owner_can_set(next) {
        return Err(ApiError::conflict(format!(
            "Cannot change stock status from {:?} to {:?}",
            book.soldstatus, next
        )));
    }

    let updated = db
        .collection::<Listing>(LISTINGS)
        .update_one(
            doc! { "_id": book.id, "soldstatus": to_bson(&book.soldstatus)? },
            doc! { "$set": { "soldstatus": to_bson(&next)?, "updated_at": timestamps::now() } },
        )
        .await?;
    if updated.matched_count == 0 {
        return Err(ApiError::conflict("Book status changed, please retry"));
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Sold status updated",
        "soldstatus": next,
    })))
}

/// Owner removes a listing
pub async fn delete_book(
    db: web::Data<Database>,
    store: web::Data<BlobStore>,
    user_id: web::ReqData<String>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let book = find_listing(&db, &path).await?;
    if book.user_id != *user_id {
        return Err(ApiError::forbidden("You can only delete your own books"));
    }

    let deleted = db
        .collection::<Listing>(LISTINGS)
        .delete_one(doc! { "_id": book.id, "soldstatus": { "$ne": to_bson(&StockStatus::Ordered)? } })
        .await?;
    if deleted.deleted_count == 0 {
        return Err(ApiError::conflict("Book has an open order and cannot be deleted"));
    }

    store.delete_quietly(&book.image_key).await;
    log::info!("🗑️ Listing {} deleted by {}", path.as_str(), user_id.as_str());

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Book deleted" })))
}

/// Buy an accepted, in-stock listing
pub async fn buy_book(
    db: web::Data<Database>,
    mailer: web::Data<Mailer>,
    user_id: web::ReqData<String>,
    req: web::Json<BuyBookRequest>,
) -> ApiResult<HttpResponse> {
    if req.book_id.trim().is_empty() {
        return Err(ApiError::bad_request("bookId is required"));
    }
    let book = find_listing(&db, &req.book_id).await?;
    if book.user_id == *user_id {
        return Err(ApiError::forbidden("You cannot buy your own book"));
    }
    if !book.is_available() {
        return Err(ApiError::conflict("Book is not available"));
    }
    let buyer = load_user(&db, &user_id).await?;

    let listings = db.collection::<Listing>(LISTINGS);
    // Reserve the copy; only one buyer wins
    let reserved = listings
        .update_one(
            doc! {
                "_id": book.id,
                "status": to_bson(&ModerationStatus::Accepted)?,
                "soldstatus": to_bson(&StockStatus::Instock)?,
            },
            doc! { "$set": { "soldstatus": to_bson(&StockStatus::Ordered)?, "updated_at": timestamps::now() } },
        )
        .await?;
    if reserved.matched_count == 0 {
        return Err(ApiError::conflict("Book is not available"));
    }

    let book_id = book.id.map(|oid| oid.to_hex()).unwrap_or_default();
    let mut order = BookOrder::new(user_id.to_string(), book.user_id.clone(), book_id, book.effective_price());

    match db.collection::<BookOrder>(BOOK_ORDERS).insert_one(&order).await {
        Ok(result) => order.id = result.inserted_id.as_object_id(),
        Err(e) => {
            if let Err(revert) = listings
                .update_one(
                    doc! { "_id": book.id, "soldstatus": to_bson(&StockStatus::Ordered)? },
                    doc! { "$set": { "soldstatus": to_bson(&StockStatus::Instock)? } },
                )
                .await
            {
                log::error!("Failed to release reserved book {:?}: {}", book.id, revert);
            }
            return Err(e.into());
        }
    }

    log::info!("🛒 {} ordered \"{}\"", buyer.email, book.name);

    if let Ok(seller) = load_user(&db, &book.user_id).await {
        mailer.send_in_background(emails::book_ordered(&seller.email, &book, &buyer));
    }
    mailer.send_in_background(emails::book_ordered(mailer.admin_email(), &book, &buyer));

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Book ordered successfully",
        "order": BookOrderResponse::new(order, Some(book.name)),
    })))
}

async fn find_order(db: &Database, raw_id: &str) -> ApiResult<BookOrder> {
    let oid = parse_object_id(raw_id, "order")?;
    db.collection::<BookOrder>(BOOK_ORDERS)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))
}

/// Buyer confirms receipt or cancels an open order
pub async fn confirm_order(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
    path: web::Path<String>,
    req: web::Json<ConfirmOrderRequest>,
) -> ApiResult<HttpResponse> {
    let action = req
        .parsed_action()
        .ok_or_else(|| ApiError::bad_request("action must be confirm or cancel"))?;
    let order = find_order(&db, &path).await?;
    if order.buyer_id != *user_id {
        return Err(ApiError::forbidden("Only the buyer can update this order"));
    }

    let (next, stock) = match action {
        OrderAction::Confirm => (BookOrderStatus::Confirmed, StockStatus::Soldout),
        OrderAction::Cancel => (BookOrderStatus::Cancelled, StockStatus::Instock),
    };
    if !order.status.can_transition_to(next) {
        return Err(ApiError::conflict(format!("Order is already {:?}", order.status)));
    }

    let now = timestamps::now();
    let updated = db
        .collection::<BookOrder>(BOOK_ORDERS)
        .update_one(
            doc! { "_id": order.id, "status": to_bson(&BookOrderStatus::Ordered)? },
            doc! { "$set": { "status": to_bson(&next)?, "updated_at": now } },
        )
        .await?;
    if updated.matched_count == 0 {
        return Err(ApiError::conflict("Order status changed, please retry"));
    }

    let book_oid = parse_object_id(&order.book_id, "book")?;
    db.collection::<Listing>(LISTINGS)
        .update_one(
            doc! { "_id": book_oid, "soldstatus": to_bson(&StockStatus::Ordered)? },
            doc! { "$set": { "soldstatus": to_bson(&stock)?, "updated_at": now } },
        )
        .await?;

    log::info!("📦 Book order {} is now {:?}", path.as_str(), next);
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Order {:?}", next).to_lowercase(),
        "status": next,
    })))
}

/// Buyer reviews a confirmed order
pub async fn review_order(
    db: web::Data<Database>,
    user_id: web::ReqData<String>,
    path: web::Path<String>,
    req: web::Json<ReviewRequest>,
) -> ApiResult<HttpResponse> {
    req.validate()?;
    let order = find_order(&db, &path).await?;
    if order.buyer_id != *user_id {
        return Err(ApiError::forbidden("Only the buyer can review this order"));
    }
    if order.status != BookOrderStatus::Confirmed {
        return Err(ApiError::conflict("Only confirmed orders can be reviewed"));
    }

    db.collection::<BookOrder>(BOOK_ORDERS)
        .update_one(
            doc! { "_id": order.id },
            doc! { "$set": { "review": req.review.trim(), "updated_at": timestamps::now() } },
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Review saved" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookCondition;

    fn complete_form(selltype: &str, price: &str) -> FormData {
        FormData::from_fields(&[
            ("name", "Engineering Physics"),
            ("price", price),
            ("condition", "Like New"),
            ("description", "Few highlights"),
            ("location", "Vizag"),
            ("category", "College & University Books"),
            ("selltype", selltype),
        ])
    }

    #[test]
    fn test_listing_form_parses_display_strings() {
        let listing = parse_listing_form(&complete_form("sell", "120.5")).unwrap();
        assert_eq!(listing.condition, BookCondition::LikeNew);
        assert_eq!(listing.category, BookCategory::CollegeBooks);
        assert_eq!(listing.price, 120.5);
    }

    #[test]
    fn test_legacy_category_spelling() {
        let form = FormData::from_fields(&[
            ("name", "Wings of Fire"),
            ("price", "90"),
            ("condition", "Good"),
            ("description", "Paperback"),
            ("location", "Vizag"),
            ("categeory", "Novels & Storybooks"),
            ("subcategeory", "Biography"),
            ("selltype", "sell"),
        ]);
        let listing = parse_listing_form(&form).unwrap();
        assert_eq!(listing.category, BookCategory::Novels);
        assert_eq!(listing.subcategory.as_deref(), Some("Biography"));
    }

    #[test]
    fn test_donations_are_free() {
        let listing = parse_listing_form(&complete_form("donate", "300")).unwrap();
        assert_eq!(listing.price, 0.0);
    }

    #[test]
    fn test_listing_form_rejects_bad_values() {
        assert!(parse_listing_form(&complete_form("sell", "cheap")).is_err());
        assert!(parse_listing_form(&complete_form("sell", "-5")).is_err());
        assert!(parse_listing_form(&complete_form("rent", "10")).is_err());

        let err = parse_listing_form(&FormData::from_fields(&[("name", "x")])).unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_search_terms_are_literal() {
        let query = ListingQuery {
            q: Some(" c++ (3rd ed.) ".to_string()),
            ..Default::default()
        };
        let filter = public_listing_filter(&query).unwrap();
        let name = filter.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), "c\\+\\+ \\(3rd ed\\.\\)");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_public_filter() {
        let query = ListingQuery {
            category: Some("GATE".to_string()),
            q: Some("  ".to_string()),
            status: None,
        };
        let filter = public_listing_filter(&query).unwrap();
        assert_eq!(filter, doc! { "status": "Accepted", "category": "GATE" });

        let query = ListingQuery {
            category: Some("Cooking".to_string()),
            ..Default::default()
        };
        assert!(public_listing_filter(&query).is_err());
    }
}

/// Print orders and previous-year papers
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::bson::doc;
use mongodb::Database;
use serde_json::json;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::{PAPERS, PRINT_ORDERS};
use crate::errors::{ApiError, ApiResult};
use crate::handlers::form::{form_enum, FormData, UploadedFile};
use crate::handlers::{collect_all, load_user, user_summaries};
use crate::models::{
    Coupon, NewPrintOrder, Paper, PaperResponse, PrintOrder, PrintOrderResponse, PrintOrderStatus,
    User, UserSummary,
};
use crate::services::mailer as emails;
use crate::services::{BlobStore, CouponService, FileKind, Mailer};
use crate::utils::{parse_object_id, Claims};

const PRINT_FOLDER: &str = "prints";
/// Multipart field carrying the payment screenshot
const PAYMENT_PROOF_FIELD: &str = "transctionid";
const PREVIOUS_YEARS_LIMIT: i64 = 50;

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Text part of the print order form
fn parse_print_form(form: &FormData) -> ApiResult<NewPrintOrder> {
    form.require(&["name", "color", "sides"])?;
    let mobile = form
        .text_any(&["mobile", "mobileNumber"])
        .ok_or_else(|| ApiError::bad_request("Missing required fields: mobile"))?;

    let text = |name: &str| form.text(name).unwrap_or_default();
    let copies = match form.text("copies") {
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| ApiError::bad_request("Copies must be a whole number"))?,
        None => 1,
    };
    let binding = match form.text("binding") {
        Some(raw) => form_enum(&raw, "binding")?,
        None => Default::default(),
    };

    let order = NewPrintOrder {
        name: text("name"),
        mobile,
        email: non_blank(form.text("email")).map(|e| e.to_lowercase()),
        color: form_enum(&text("color"), "color")?,
        sides: form_enum(&text("sides"), "sides")?,
        binding,
        copies,
        transaction_id: non_blank(form.text_any(&["transactionId", "transaction_id"])),
        address: non_blank(form.text("address")),
        college: non_blank(form.text("college")),
        year: non_blank(form.text("year")),
        section: non_blank(form.text("section")),
        description: non_blank(form.text("description")),
        coupon_code: non_blank(form.text_any(&["couponCode", "coupon_code"])),
    };
    order.validate()?;
    Ok(order)
}

fn accepts_payment_proof(kind: FileKind) -> bool {
    kind.is_image() || kind == FileKind::Pdf
}

/// Upload both files and insert the order, cleaning up stored files on failure
async fn store_print_order(
    db: &Database,
    store: &BlobStore,
    user_id: &str,
    new_order: NewPrintOrder,
    (document, document_kind): (UploadedFile, FileKind),
    (proof, proof_kind): (UploadedFile, FileKind),
    coupon: Option<&Coupon>,
) -> ApiResult<PrintOrder> {
    let stored_document = store
        .put(PRINT_FOLDER, document_kind, &document.file_name, document.data)
        .await?;
    let stored_proof = match store.put(PRINT_FOLDER, proof_kind, &proof.file_name, proof.data).await {
        Ok(stored) => stored,
        Err(e) => {
            store.delete_quietly(&stored_document.key).await;
            return Err(e);
        }
    };

    let mut order = PrintOrder {
        id: None,
        user_id: user_id.to_string(),
        name: new_order.name,
        mobile: new_order.mobile,
        email: new_order.email,
        file: stored_document.url,
        file_key: stored_document.key,
        file_name: document.file_name,
        payment_proof: stored_proof.url,
        payment_proof_key: stored_proof.key,
        transaction_id: new_order.transaction_id,
        color: new_order.color,
        sides: new_order.sides,
        binding: new_order.binding,
        copies: new_order.copies,
        address: new_order.address,
        college: new_order.college,
        year: new_order.year,
        section: new_order.section,
        description: new_order.description,
        coupon_code: coupon.map(|c| c.code.clone()),
        discount_percentage: coupon.map(|c| c.discount_percentage),
        status: PrintOrderStatus::Pending,
        history: Vec::new(),
        order_date: Utc::now(),
    };

    match db.collection::<PrintOrder>(PRINT_ORDERS).insert_one(&order).await {
        Ok(result) => {
            order.id = result.inserted_id.as_object_id();
            Ok(order)
        }
        Err(e) => {
            store.delete_quietly(&order.file_key).await;
            store.delete_quietly(&order.payment_proof_key).await;
            Err(e.into())
        }
    }
}

fn notify_new_print_order(mailer: &Mailer, order: &PrintOrder, customer: &User) {
    mailer.send_in_background(emails::print_order_for_admin(mailer.admin_email(), order));
    let to = order.email.as_deref().unwrap_or(&customer.email);
    mailer.send_in_background(emails::print_order_received(to, order));
}

/// Place a print order (multipart: `file` document, `transctionid` payment screenshot)
pub async fn order_print(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    store: web::Data<BlobStore>,
    mailer: web::Data<Mailer>,
    user_id: web::ReqData<String>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = FormData::read(
        payload,
        &[
            ("file", config.max_document_bytes),
            (PAYMENT_PROOF_FIELD, config.max_image_bytes),
        ],
    )
    .await?;

    let new_order = parse_print_form(&form)?;
    let document = form
        .take_file("file")
        .ok_or_else(|| ApiError::bad_request("Document file is required"))?;
    let proof = form
        .take_file(PAYMENT_PROOF_FIELD)
        .ok_or_else(|| ApiError::bad_request("Payment screenshot is required"))?;
    // Every detectable type is printable
    let document_kind = document.kind("file", |_| true)?;
    let proof_kind = proof.kind(PAYMENT_PROOF_FIELD, accepts_payment_proof)?;

    let customer = load_user(&db, &user_id).await?;

    let coupon = match new_order.coupon_code.as_deref() {
        Some(code) => Some(CouponService::redeem(&db, &user_id, code).await?),
        None => None,
    };

    let order = match store_print_order(
        &db,
        &store,
        &user_id,
        new_order,
        (document, document_kind),
        (proof, proof_kind),
        coupon.as_ref(),
    )
    .await
    {
        Ok(order) => order,
        Err(e) => {
            if let Some(coupon) = &coupon {
                CouponService::release(&db, &user_id, &coupon.code).await;
            }
            return Err(e);
        }
    };

    log::info!("🖨️ New print order from {} ({} copies)", customer.email, order.copies);
    notify_new_print_order(&mailer, &order, &customer);

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Print order placed successfully",
        "order": PrintOrderResponse::new(order, Some(UserSummary::from(&customer))),
    })))
}

/// One print order; visible to its owner and to admins
pub async fn get_print_order(
    db: web::Data<Database>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let oid = parse_object_id(&path, "order")?;
    let order = db
        .collection::<PrintOrder>(PRINT_ORDERS)
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::not_found("Print order not found"))?;

    if order.user_id != claims.sub && !claims.is_admin() {
        return Err(ApiError::forbidden("You can only view your own orders"));
    }

    let user = user_summaries(&db, [order.user_id.as_str()])
        .await?
        .remove(&order.user_id);

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "order": PrintOrderResponse::new(order, user),
    })))
}

/// Previous-year exam papers, most recent first
pub async fn previous_years(db: web::Data<Database>) -> ApiResult<HttpResponse> {
    let cursor = db
        .collection::<Paper>(PAPERS)
        .find(doc! {})
        .sort(doc! { "year": -1 })
        .limit(PREVIOUS_YEARS_LIMIT)
        .await?;

    let papers: Vec<PaperResponse> = collect_all(cursor)
        .await?
        .into_iter()
        .map(PaperResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": papers.len(),
        "data": papers,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Binding, ColorMode, Sides};

    #[test]
    fn test_print_form_defaults() {
        let form = FormData::from_fields(&[
            ("name", "Sita"),
            ("mobile", "9876543210"),
            ("color", "b/w"),
            ("sides", "2"),
            ("couponCode", " welcome10 "),
        ]);
        let order = parse_print_form(&form).unwrap();
        assert_eq!(order.color, ColorMode::BlackWhite);
        assert_eq!(order.sides, Sides::Double);
        assert_eq!(order.binding, Binding::None);
        assert_eq!(order.copies, 1);
        assert_eq!(order.coupon_code.as_deref(), Some("welcome10"));
    }

    #[test]
    fn test_print_form_rejects_bad_enums_and_counts() {
        let base = [("name", "Sita"), ("mobile", "9876543210"), ("sides", "1")];

        let mut fields = base.to_vec();
        fields.push(("color", "sepia"));
        assert!(parse_print_form(&FormData::from_fields(&fields)).is_err());

        let mut fields = base.to_vec();
        fields.extend([("color", "colour"), ("copies", "0")]);
        assert!(parse_print_form(&FormData::from_fields(&fields)).is_err());

        let mut fields = base.to_vec();
        fields.extend([("color", "colour"), ("copies", "two")]);
        assert!(parse_print_form(&FormData::from_fields(&fields)).is_err());
    }

    #[test]
    fn test_print_form_requires_contact() {
        let form = FormData::from_fields(&[("name", "Sita"), ("color", "b/w"), ("sides", "1")]);
        let err = parse_print_form(&form).unwrap_err();
        assert!(err.to_string().contains("mobile"));

        let form = FormData::from_fields(&[("name", "Sita"), ("mobile", "12345"), ("color", "b/w"), ("sides", "1")]);
        assert!(parse_print_form(&form).is_err());
    }

    #[test]
    fn test_payment_proof_types() {
        assert!(accepts_payment_proof(FileKind::Png));
        assert!(accepts_payment_proof(FileKind::Pdf));
        assert!(!accepts_payment_proof(FileKind::OfficeXml));
    }
}

use actix_web::{http::StatusCode, test};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;
use serde_json::{json, Value};

#[macro_use]
mod common;
use common::{bearer, test_config};
use printkart::db::{ensure_indexes, BOOK_ORDERS, LISTINGS, PRINT_ORDERS, USERS};
use printkart::models::{
    Binding, BookCategory, BookCondition, BookOrder, BookOrderStatus, ColorMode, Listing,
    ModerationStatus, PrintOrder, PrintOrderStatus, Role, SellType, Sides, StockStatus, User,
};
use printkart::utils::create_token;

/// Insert an account and return its id with a token for it
async fn account(db: &Database, name: &str, mobile: &str, role: Role) -> (String, String) {
    let mut user = User::new(
        name.to_string(),
        mobile.to_string(),
        format!("{}@example.com", name.to_lowercase()),
        "not-a-real-hash".to_string(),
    );
    user.role = role;
    let id = db
        .collection::<User>(USERS)
        .insert_one(&user)
        .await
        .unwrap()
        .inserted_id
        .as_object_id()
        .unwrap()
        .to_hex();
    let token = create_token(&id, role, &test_config().jwt).unwrap();
    (id, token)
}

async fn listing(db: &Database, owner: &str, soldstatus: StockStatus) -> String {
    let now = Utc::now();
    let listing = Listing {
        id: None,
        name: "Engineering Physics".to_string(),
        image: "http://localhost:5000/uploads/sellbooks/a.png".to_string(),
        image_key: String::new(),
        price: 120.0,
        condition: BookCondition::Good,
        description: "Few highlights".to_string(),
        location: "Vizag".to_string(),
        category: BookCategory::CollegeBooks,
        subcategory: None,
        selltype: SellType::Sell,
        user_id: owner.to_string(),
        status: ModerationStatus::Accepted,
        updated_price: None,
        soldstatus,
        created_at: now,
        updated_at: now,
    };
    db.collection::<Listing>(LISTINGS)
        .insert_one(&listing)
        .await
        .unwrap()
        .inserted_id
        .as_object_id()
        .unwrap()
        .to_hex()
}

async fn print_order(db: &Database, owner: &str) -> String {
    let order = PrintOrder {
        id: None,
        user_id: owner.to_string(),
        name: "Asha".to_string(),
        mobile: "9876543210".to_string(),
        email: None,
        file: "http://localhost:5000/uploads/prints/a.pdf".to_string(),
        file_key: String::new(),
        file_name: "notes.pdf".to_string(),
        payment_proof: "http://localhost:5000/uploads/payments/a.png".to_string(),
        payment_proof_key: String::new(),
        transaction_id: None,
        color: ColorMode::BlackWhite,
        sides: Sides::Single,
        binding: Binding::None,
        copies: 1,
        address: None,
        college: None,
        year: None,
        section: None,
        description: None,
        coupon_code: None,
        discount_percentage: None,
        status: PrintOrderStatus::Pending,
        history: Vec::new(),
        order_date: Utc::now(),
    };
    db.collection::<PrintOrder>(PRINT_ORDERS)
        .insert_one(&order)
        .await
        .unwrap()
        .inserted_id
        .as_object_id()
        .unwrap()
        .to_hex()
}

async fn stock_of(db: &Database, id: &str) -> StockStatus {
    let oid = ObjectId::parse_str(id).unwrap();
    db.collection::<Listing>(LISTINGS)
        .find_one(doc! { "_id": oid })
        .await
        .unwrap()
        .unwrap()
        .soldstatus
}

#[actix_web::test]
async fn test_only_the_owner_changes_a_listing() {
    let Some(db) = common::live_db().await else {
        return;
    };
    ensure_indexes(&db).await.unwrap();
    let (owner, owner_token) = account(&db, "Asha", "9876543210", Role::User).await;
    let (_, other_token) = account(&db, "Ravi", "9876543211", Role::User).await;
    let book = listing(&db, &owner, StockStatus::Instock).await;
    let app = test_app!(db.clone());

    let req = test::TestRequest::put()
        .uri(&format!("/api/books/updateSoldStatus/{}", book))
        .insert_header(bearer(&other_token))
        .set_json(json!({ "soldstatus": "Soldout" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/books/{}", book))
        .insert_header(bearer(&other_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(stock_of(&db, &book).await, StockStatus::Instock);

    // The owner cannot fake a purchase by hand
    let req = test::TestRequest::put()
        .uri(&format!("/api/books/updateSoldStatus/{}", book))
        .insert_header(bearer(&owner_token))
        .set_json(json!({ "soldstatus": "Ordered" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::put()
        .uri(&format!("/api/books/updateSoldStatus/{}", book))
        .insert_header(bearer(&owner_token))
        .set_json(json!({ "soldstatus": "Soldout" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert_eq!(stock_of(&db, &book).await, StockStatus::Soldout);

    db.drop().await.unwrap();
}

#[actix_web::test]
async fn test_print_orders_are_private() {
    let Some(db) = common::live_db().await else {
        return;
    };
    let (owner, owner_token) = account(&db, "Asha", "9876543210", Role::User).await;
    let (_, other_token) = account(&db, "Ravi", "9876543211", Role::User).await;
    let (_, admin_token) = account(&db, "Admin", "9876543212", Role::Admin).await;
    let order = print_order(&db, &owner).await;
    let app = test_app!(db.clone());
    let uri = format!("/api/papers/orderprints/{}", order);

    let req = test::TestRequest::get().uri(&uri).insert_header(bearer(&other_token)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    for token in [&owner_token, &admin_token] {
        let req = test::TestRequest::get().uri(&uri).insert_header(bearer(token)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["order"]["fileName"], "notes.pdf");
    }

    db.drop().await.unwrap();
}

#[actix_web::test]
async fn test_buy_then_confirm_sells_the_book() {
    let Some(db) = common::live_db().await else {
        return;
    };
    ensure_indexes(&db).await.unwrap();
    let (seller, seller_token) = account(&db, "Asha", "9876543210", Role::User).await;
    let (buyer, buyer_token) = account(&db, "Ravi", "9876543211", Role::User).await;
    let (_, late_token) = account(&db, "Mina", "9876543213", Role::User).await;
    let book = listing(&db, &seller, StockStatus::Instock).await;
    let app = test_app!(db.clone());

    let req = test::TestRequest::post()
        .uri("/api/books/buybook")
        .insert_header(bearer(&seller_token))
        .set_json(json!({ "bookId": book }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/books/buybook")
        .insert_header(bearer(&buyer_token))
        .set_json(json!({ "bookId": book }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(stock_of(&db, &book).await, StockStatus::Ordered);

    // The copy is reserved; a second buyer loses
    let req = test::TestRequest::post()
        .uri("/api/books/buybook")
        .insert_header(bearer(&late_token))
        .set_json(json!({ "bookId": book }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    // Neither the seller nor anyone else can reopen or delete it meanwhile
    let req = test::TestRequest::put()
        .uri(&format!("/api/books/updateSoldStatus/{}", book))
        .insert_header(bearer(&seller_token))
        .set_json(json!({ "soldstatus": "Instock" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/books/{}", book))
        .insert_header(bearer(&seller_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    // Only the buyer confirms
    let req = test::TestRequest::post()
        .uri(&format!("/api/books/confirm-order/{}", order_id))
        .insert_header(bearer(&late_token))
        .set_json(json!({ "action": "confirm" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/api/books/confirm-order/{}", order_id))
        .insert_header(bearer(&buyer_token))
        .set_json(json!({ "action": "confirm" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert_eq!(stock_of(&db, &book).await, StockStatus::Soldout);

    let order = db
        .collection::<BookOrder>(BOOK_ORDERS)
        .find_one(doc! { "_id": ObjectId::parse_str(&order_id).unwrap() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, BookOrderStatus::Confirmed);
    assert_eq!(order.buyer_id, buyer);

    let req = test::TestRequest::post()
        .uri(&format!("/api/books/confirm-order/{}", order_id))
        .insert_header(bearer(&buyer_token))
        .set_json(json!({ "action": "cancel" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    db.drop().await.unwrap();
}

#[actix_web::test]
async fn test_cancel_returns_the_book_to_stock() {
    let Some(db) = common::live_db().await else {
        return;
    };
    ensure_indexes(&db).await.unwrap();
    let (seller, _) = account(&db, "Asha", "9876543210", Role::User).await;
    let (_, buyer_token) = account(&db, "Ravi", "9876543211", Role::User).await;
    let book = listing(&db, &seller, StockStatus::Instock).await;
    let app = test_app!(db.clone());

    let req = test::TestRequest::post()
        .uri("/api/books/buybook")
        .insert_header(bearer(&buyer_token))
        .set_json(json!({ "bookId": book }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/books/confirm-order/{}", order_id))
        .insert_header(bearer(&buyer_token))
        .set_json(json!({ "action": "cancel" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert_eq!(stock_of(&db, &book).await, StockStatus::Instock);

    db.drop().await.unwrap();
}

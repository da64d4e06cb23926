/// Route table shared by the server binary and the integration tests
use actix_web::{guard, web};

use crate::handlers::{self, admin, books, coupons, locations, prints, uploads, users};
use crate::middleware::AuthMiddleware;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/uploads/{folder}/{file}", web::get().to(uploads::serve_upload))
        .service(
            web::scope("/api/user")
                .route("/register", web::post().to(users::register))
                .route("/login", web::post().to(users::login))
                .route("/forgot-password", web::post().to(users::forgot_password))
                .route("/reset-password", web::post().to(users::reset_password))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(users::me))
                        .route(web::patch().to(users::update_me)),
                )
                .service(
                    web::resource("/printorders")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(users::my_print_orders)),
                )
                .service(
                    web::resource("/soldbooks")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(users::my_sold_books)),
                )
                .service(
                    web::resource("/bookorders")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(users::my_book_orders)),
                ),
        )
        .service(
            web::scope("/api/books")
                .route("", web::get().to(books::list_books))
                .service(
                    web::resource("/sellbook")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(books::sell_book)),
                )
                .service(
                    web::resource("/buybook")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(books::buy_book)),
                )
                .service(
                    web::resource("/updateSoldStatus/{bookId}")
                        .wrap(AuthMiddleware)
                        .route(web::put().to(books::update_sold_status)),
                )
                .service(
                    web::resource("/confirm-order/{orderId}")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(books::confirm_order)),
                )
                .service(
                    web::resource("/orders/{orderId}/review")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(books::review_order)),
                )
                // Reading a listing is public, deleting it is not
                .service(
                    web::resource("/{id}")
                        .guard(guard::Get())
                        .route(web::get().to(books::get_book)),
                )
                .service(
                    web::resource("/{id}")
                        .guard(guard::Delete())
                        .wrap(AuthMiddleware)
                        .route(web::delete().to(books::delete_book)),
                ),
        )
        .service(
            web::scope("/api/papers")
                .route("/previous-years", web::get().to(prints::previous_years))
                .service(
                    web::resource("/orderprints")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(prints::order_print)),
                )
                .service(
                    web::resource("/orderprints/{id}")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(prints::get_print_order)),
                ),
        )
        // Older clients post print orders here
        .service(
            web::scope("/api/orders")
                .wrap(AuthMiddleware)
                .route("/orderprints", web::post().to(prints::order_print)),
        )
        .service(
            web::scope("/api/coupons")
                .wrap(AuthMiddleware)
                .route("/verify", web::post().to(coupons::verify_coupon))
                .route("/redeem", web::post().to(coupons::redeem_coupon)),
        )
        .service(
            web::scope("/api/location")
                .wrap(AuthMiddleware)
                .route("/add-location", web::post().to(locations::add_location))
                .route("/mylocations", web::get().to(locations::my_locations))
                .route("/{id}", web::delete().to(locations::delete_location)),
        )
        .service(
            web::scope("/api/admin")
                .wrap(AuthMiddleware)
                .route("/printorders", web::get().to(admin::list_print_orders))
                .route("/printorders/{orderId}", web::get().to(admin::get_print_order))
                .route("/printorders/{orderId}/status", web::patch().to(admin::update_print_status))
                .route("/books", web::get().to(admin::list_books))
                .route("/book/{bookId}/status", web::patch().to(admin::moderate_book))
                .route("/ordered-books", web::get().to(admin::ordered_books))
                .route("/coupons", web::post().to(admin::create_coupon))
                .route("/coupons", web::get().to(admin::list_coupons)),
        );
}

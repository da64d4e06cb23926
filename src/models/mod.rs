pub mod book_order;
pub mod coupon;
pub mod listing;
pub mod location;
pub mod paper;
pub mod print_order;
pub mod timestamps;
pub mod user;

pub use user::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, Role,
    UpdateProfileRequest, User, UserResponse, UserSummary,
};
pub use listing::{
    BookCategory, BookCondition, Listing, ListingQuery, ListingResponse, ModerateListingRequest,
    ModerationStatus, NewListing, SellType, StockStatus, UpdateStockRequest,
};
pub use book_order::{
    BookOrder, BookOrderResponse, BookOrderStatus, BuyBookRequest, ConfirmOrderRequest,
    OrderAction, ReviewRequest,
};
pub use print_order::{
    Binding, ColorMode, NewPrintOrder, PrintOrder, PrintOrderResponse, PrintOrderStatus, Sides,
    StatusChange, StatusChangeResponse, UpdatePrintStatusRequest,
};
pub use coupon::{
    normalize_code, Coupon, CouponCodeRequest, CouponRedemption, CouponResponse, CouponState,
    CreateCouponRequest,
};
pub use location::{AddLocationRequest, Location, LocationResponse};
pub use paper::{Paper, PaperResponse};

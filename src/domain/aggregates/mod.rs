//! Aggregates module
pub mod account;
pub mod analytics;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod payment;
pub mod product;
pub mod review;

pub use account::{Address, AddressDefault, NewAddress, NewUser, User, UserDetail, UserUpdate};
pub use analytics::{
    DailyTotals, DashboardStats, NewPageView, NewProductView, PageView, ProductView, ReportSummary, RevenueAnalytics,
    RevenuePoint, SalesReport, SalesReportView, SessionTotals, TrendingProduct, UserBehavior,
};
pub use cart::{ApplyCoupon, Cart, CartItemUpdate, CartLine, CartPricing, CartRecord, CartView, NewCartItem, MAX_LINE_QUANTITY};
pub use coupon::{Coupon, CouponError, CouponView, NewCoupon};
pub use order::{
    CheckoutPlan, CheckoutRequest, Order, OrderDetail, OrderError, OrderItem, OrderStatus, OrderSummary, OrderUpdate,
    OrderWithCount, ShippingMethod,
};
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentRow, PaymentStatus, PaymentStatusUpdate, PaymentView};
pub use product::{
    Brand, Category, NewBrand, NewCategory, NewImage, NewProduct, NewTag, NewVariant, Product, ProductDetail,
    ProductFilter, ProductImage, ProductOrdering, ProductVariant, Tag,
};
pub use review::{NewRating, NewReview, Rating, Review, ReviewDetail, ReviewError};

//! Request handler definitions
//!
//! Define each route and it handler here. Payment routes live in [`crate::payment_routes`].
//! Handlers that are more than a line or two MUST go into a separate function. Keep this module neat and tidy 🙏
//!
//! Every route in this module is mounted under `/api`, behind the
//! [`IdentityMiddlewareFactory`](crate::middleware::IdentityMiddlewareFactory), so handlers can take [`JwtClaims`] as
//! an argument. The first time a principal calls any route, a customer record is created for them.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use spg_engine::{
    db_types::{Customer, NewReview, Role, UpdateReview},
    order_objects::OrderQueryFilter,
    traits::{CartManagement, CustomerManagement, OrderManagement, ReviewManagement},
    CartApi,
    CustomerApi,
    OrderFlowApi,
    ReviewApi,
};

use crate::{
    auth::JwtClaims,
    data_objects::{
        AddCartItem,
        JsonResponse,
        ManualOrderRequest,
        OrderStatusUpdate,
        ReviewRequest,
        ReviewResult,
        UpdateCartItem,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// Maps the authenticated principal onto their customer record, creating it on their first visit.
pub async fn current_customer<B: CustomerManagement>(
    claims: &JwtClaims,
    api: &CustomerApi<B>,
) -> Result<Customer, ServerError> {
    let customer = api.customer_for_principal(&claims.sub, claims.email.as_deref(), claims.name.as_deref()).await?;
    Ok(customer)
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl CustomerManagement, CartManagement);
pub async fn my_cart<BCust, BCart>(
    claims: JwtClaims,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<CartApi<BCart>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BCart: CartManagement,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    debug!("💻️ GET cart for customer #{}", customer.id);
    let cart = api.cart(customer.id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_cart_item => Post "/cart/items" impl CustomerManagement, CartManagement);
/// Adds a product to the cart. If the product is already in the cart, the quantities are added together.
pub async fn add_cart_item<BCust, BCart>(
    claims: JwtClaims,
    body: web::Json<AddCartItem>,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<CartApi<BCart>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BCart: CartManagement,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    let item = body.into_inner();
    debug!("💻️ POST cart item {} x{} for customer #{}", item.product_id, item.quantity, customer.id);
    let cart = api.add_item(customer.id, item.product_id, item.quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(update_cart_item => Patch "/cart/items/{product_id}" impl CustomerManagement, CartManagement);
pub async fn update_cart_item<BCust, BCart>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<UpdateCartItem>,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<CartApi<BCart>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BCart: CartManagement,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    let product_id = path.into_inner();
    let quantity = body.into_inner().quantity;
    debug!("💻️ PATCH cart item {product_id} to x{quantity} for customer #{}", customer.id);
    let cart = api.update_item(customer.id, product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_cart_item => Delete "/cart/items/{product_id}" impl CustomerManagement, CartManagement);
pub async fn remove_cart_item<BCust, BCart>(
    claims: JwtClaims,
    path: web::Path<i64>,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<CartApi<BCart>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BCart: CartManagement,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    let product_id = path.into_inner();
    debug!("💻️ DELETE cart item {product_id} for customer #{}", customer.id);
    let cart = api.remove_item(customer.id, product_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(clear_cart => Delete "/cart" impl CustomerManagement, CartManagement);
pub async fn clear_cart<BCust, BCart>(
    claims: JwtClaims,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<CartApi<BCart>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BCart: CartManagement,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    debug!("💻️ DELETE cart for customer #{}", customer.id);
    let cart = api.clear_cart(customer.id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl CustomerManagement, OrderManagement);
/// Route handler for the orders endpoint
///
/// Authenticated users fetch their own orders, oldest first, with this endpoint.
pub async fn my_orders<BCust, BOrder>(
    claims: JwtClaims,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<OrderFlowApi<BOrder>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BOrder: OrderManagement,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    debug!("💻️ GET my_orders for customer #{}", customer.id);
    let orders = api.orders_for_customer(customer.id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl CustomerManagement, OrderManagement);
/// Fetches a single order. Customers can only see their own orders; any other id returns 404, whether it exists or
/// not. Admins can see every order.
pub async fn order_by_id<BCust, BOrder>(
    claims: JwtClaims,
    path: web::Path<i64>,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<OrderFlowApi<BOrder>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BOrder: OrderManagement,
{
    let id = path.into_inner();
    debug!("💻️ GET order #{id} for {}", claims.sub);
    let not_found = || ServerError::NoRecordFound(format!("Order {id}"));
    let order = api.fetch_order(id).await?.ok_or_else(not_found)?;
    if claims.is_admin() {
        return Ok(HttpResponse::Ok().json(order));
    }
    let customer = current_customer(&claims, customers.as_ref()).await?;
    if order.customer_id == customer.id {
        Ok(HttpResponse::Ok().json(order))
    } else {
        debug!("💻️ Customer #{} asked for order #{id}, which belongs to someone else", customer.id);
        Err(not_found())
    }
}

route!(manual_order => Post "/orders/manual" impl OrderManagement where requires [Role::Admin]);
/// Admins enter orders directly with this endpoint, e.g. for phone orders. Stock for every item is taken in the same
/// transaction as the order is written.
pub async fn manual_order<B: OrderManagement>(
    body: web::Json<ManualOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST manual order for customer #{} ({} items)", request.customer_id, request.items.len());
    let order = api.create_manual_order(request.into()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Patch "/orders/{id}/status" impl OrderManagement where requires [Role::Admin]);
pub async fn update_order_status<B: OrderManagement>(
    path: web::Path<i64>,
    body: web::Json<OrderStatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let status = body.into_inner().status()?;
    debug!("💻️ PATCH order #{id} status to {status}");
    let order = api.update_order_status(id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(orders_search => Post "/orders/search" impl OrderManagement where requires [Role::Admin]);
pub async fn orders_search<B: OrderManagement>(
    body: web::Json<OrderQueryFilter>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = body.into_inner();
    debug!("💻️ POST orders search for [{query}]");
    let orders = api.search_orders(query).await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Reviews  ----------------------------------------------------
route!(product_reviews => Get "/products/{id}/reviews" impl ReviewManagement);
pub async fn product_reviews<B: ReviewManagement>(
    path: web::Path<i64>,
    api: web::Data<ReviewApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    trace!("💻️ GET reviews for product {product_id}");
    let reviews = api.reviews_for_product(product_id).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

route!(create_review => Post "/reviews" impl CustomerManagement, ReviewManagement);
/// Reviews can only be left for products in one of the customer's delivered orders, once per product.
pub async fn create_review<BCust, BReview>(
    claims: JwtClaims,
    body: web::Json<ReviewRequest>,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<ReviewApi<BReview>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BReview: ReviewManagement,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    let req = body.into_inner();
    debug!("💻️ POST review of product {} by customer #{}", req.product_id, customer.id);
    let review = NewReview {
        product_id: req.product_id,
        customer_id: customer.id,
        order_id: req.order_id,
        rating: req.rating,
        comment: req.comment,
    };
    let (review, product) = api.create_review(review).await?;
    Ok(HttpResponse::Ok().json(ReviewResult { review, product }))
}

route!(update_review => Patch "/reviews/{id}" impl CustomerManagement, ReviewManagement);
pub async fn update_review<BCust, BReview>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<UpdateReview>,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<ReviewApi<BReview>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BReview: ReviewManagement,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    let id = path.into_inner();
    debug!("💻️ PATCH review #{id} by customer #{}", customer.id);
    let (review, product) = api.update_review(id, customer.id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ReviewResult { review, product }))
}

route!(delete_review => Delete "/reviews/{id}" impl CustomerManagement, ReviewManagement);
/// Customers can delete their own reviews. Admins can delete any review.
pub async fn delete_review<BCust, BReview>(
    claims: JwtClaims,
    path: web::Path<i64>,
    customers: web::Data<CustomerApi<BCust>>,
    api: web::Data<ReviewApi<BReview>>,
) -> Result<HttpResponse, ServerError>
where
    BCust: CustomerManagement,
    BReview: ReviewManagement,
{
    let id = path.into_inner();
    let owner = if claims.is_admin() {
        None
    } else {
        Some(current_customer(&claims, customers.as_ref()).await?.id)
    };
    debug!("💻️ DELETE review #{id} by {}", claims.sub);
    let product = api.delete_review(id, owner).await?;
    info!("💻️ Review #{id} deleted. Product {} now rated {}", product.id, product.ratings_average);
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Review {id} deleted"))))
}

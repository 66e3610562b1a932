use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::{info, warn};
use spg_engine::{CartApi, CheckoutApi, CustomerApi, OrderFlowApi, ReviewApi, SqliteDatabase};

use crate::{
    auth::TokenValidator,
    config::ServerConfig,
    errors::ServerError,
    integrations::stripe::{StripeProcessor, WebhookVerifier},
    middleware::IdentityMiddlewareFactory,
    payment_routes::{CreatePaymentIntentRoute, PaymentWebhookRoute},
    reaper_worker::start_reaper_worker,
    routes::{
        health,
        AddCartItemRoute,
        ClearCartRoute,
        CreateReviewRoute,
        DeleteReviewRoute,
        ManualOrderRoute,
        MyCartRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrdersSearchRoute,
        ProductReviewsRoute,
        RemoveCartItemRoute,
        UpdateCartItemRoute,
        UpdateOrderStatusRoute,
        UpdateReviewRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?
        .with_transaction_timeout(config.tx_timeout);
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    info!("🚀️ Database {} is ready", db.url());
    if config.reaper.enabled {
        let _reaper = start_reaper_worker(db.clone(), config.reaper.clone());
    } else {
        warn!("🚀️ The stale order reaper is not running");
    }
    let processor = StripeProcessor::from_config(config.stripe_config.clone())?;
    let srv = create_server_instance(config, db, processor)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    processor: StripeProcessor,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let customer_api = CustomerApi::new(db.clone());
        let cart_api = CartApi::new(db.clone());
        let checkout_api = CheckoutApi::new(db.clone(), processor.clone(), config.pricing);
        let orders_api = OrderFlowApi::new(db.clone());
        let review_api = ReviewApi::new(db.clone());
        let verifier = WebhookVerifier::from_config(&config.stripe_config);
        let validator = TokenValidator::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(web::Data::new(customer_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(review_api))
            .app_data(web::Data::new(verifier));
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(IdentityMiddlewareFactory::new(validator))
            .service(MyCartRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(AddCartItemRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(UpdateCartItemRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(RemoveCartItemRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(ClearCartRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(CreatePaymentIntentRoute::<SqliteDatabase, StripeProcessor>::new())
            .service(MyOrdersRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(ManualOrderRoute::<SqliteDatabase>::new())
            .service(OrdersSearchRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(ProductReviewsRoute::<SqliteDatabase>::new())
            .service(CreateReviewRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(UpdateReviewRoute::<SqliteDatabase, SqliteDatabase>::new())
            .service(DeleteReviewRoute::<SqliteDatabase, SqliteDatabase>::new());
        app.service(health).service(PaymentWebhookRoute::<SqliteDatabase>::new()).service(auth_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

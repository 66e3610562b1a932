//----------------------------------------------   Checkout  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error, info, trace, warn};
use spg_engine::{
    order_objects::MaterializeResult,
    traits::{CheckoutDatabase, OrderManagement, PaymentProcessor},
    CheckoutApi,
    CustomerApi,
    OrderFlowApi,
};
use stripe_tools::{webhook::SIGNATURE_HEADER, WebhookSignatureError};

use crate::{
    auth::JwtClaims,
    data_objects::{JsonResponse, PaymentIntentRequest},
    errors::ServerError,
    integrations::stripe::{confirmation_from_event, WebhookVerifier},
    route,
    routes::current_customer,
};

route!(create_payment_intent => Post "/payment-intent" impl CheckoutDatabase, PaymentProcessor);
/// Prices the customer's cart and opens a payment intent for the total with the payment processor.
///
/// The response carries the `client_secret` the storefront needs to collect the payment. Nothing is reserved: stock is
/// only taken, and the order only created, once the processor confirms the payment via the webhook.
pub async fn create_payment_intent<B, P>(
    claims: JwtClaims,
    body: web::Json<PaymentIntentRequest>,
    customers: web::Data<CustomerApi<B>>,
    api: web::Data<CheckoutApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutDatabase,
    P: PaymentProcessor,
{
    let customer = current_customer(&claims, customers.as_ref()).await?;
    debug!("💳️ POST payment intent for customer #{}", customer.id);
    let request = body.into_inner();
    let result = api.create_payment_intent(&customer, request.shipping_address).await.map_err(|e| {
        debug!("💳️ Could not create a payment intent for customer #{}. {e}", customer.id);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(result))
}

route!(payment_webhook => Post "/payment-webhook" impl OrderManagement);
/// Receives payment notifications from the payment processor.
///
/// The signature is checked against the raw body before anything else happens; a bad or missing signature gets a 400.
/// A correctly signed body that is not a readable event is acknowledged like any other failure.
/// After that, the response is always 200, whatever happens to the notification, otherwise the processor would keep
/// retrying a notification that can never succeed. Failures are logged and reported in the JSON body.
pub async fn payment_webhook<B: OrderManagement>(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<WebhookVerifier>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💳️ Received payment webhook request: {}", req.uri());
    let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).ok_or_else(|| {
        warn!("💳️ Payment webhook called without a {SIGNATURE_HEADER} header");
        ServerError::InvalidWebhookSignature(format!("Missing {SIGNATURE_HEADER} header"))
    })?;
    let event = match verifier.verify(&body, signature) {
        Ok(event) => event,
        Err(WebhookSignatureError::InvalidPayload(e)) => {
            warn!("💳️ Payment notification is correctly signed, but is not a valid event. {e}");
            return Ok(HttpResponse::Ok().json(JsonResponse::failure(format!("Unreadable payment notification. {e}"))));
        },
        Err(e) => {
            warn!("💳️ Rejecting payment notification. {e}");
            return Err(e.into());
        },
    };
    debug!("💳️ Payment notification {} ({}) verified", event.id, event.event_type);
    let result = match confirmation_from_event(&event) {
        Ok(None) => JsonResponse::success(format!("Event type {} ignored.", event.event_type)),
        Err(e) => {
            warn!("💳️ Could not read payment notification {}. {e}", event.id);
            JsonResponse::failure(e)
        },
        Ok(Some(confirmation)) => {
            let intent_id = confirmation.payment_intent_id.clone();
            match api.process_payment_confirmation(confirmation).await {
                Ok(MaterializeResult::Created(order)) => {
                    info!("💳️ Order #{} created for payment intent {intent_id}", order.id);
                    JsonResponse::success(format!("Order {} created.", order.id))
                },
                Ok(MaterializeResult::AlreadyProcessed(order)) => {
                    info!("💳️ Payment intent {intent_id} was already processed as order #{}", order.id);
                    JsonResponse::success("Order already exists.")
                },
                Ok(MaterializeResult::EmptyCart) => {
                    warn!("💳️ Payment intent {intent_id} was paid, but the cart is empty. No order was created.");
                    JsonResponse::failure("The cart is empty. No order was created.")
                },
                Err(e) => {
                    error!("💳️ Could not create an order for payment intent {intent_id}. {e}");
                    JsonResponse::failure(e)
                },
            }
        },
    };
    Ok(HttpResponse::Ok().json(result))
}

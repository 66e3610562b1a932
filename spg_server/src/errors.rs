use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use spg_engine::{
    CartApiError,
    CheckoutError,
    CustomerApiError,
    OrderFlowError,
    PaymentProcessorError,
    ReviewApiError,
};
use stripe_tools::WebhookSignatureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Invalid order status. {0}")]
    InvalidStatus(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state of the store. {0}")]
    Conflict(String),
    #[error("The payment processor could not complete the request. {0}")]
    PaymentProcessorError(String),
    #[error("The payment notification signature is invalid. {0}")]
    InvalidWebhookSignature(String),
    #[error("The database is busy. Please try again. {0}")]
    TransactionTimeout(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::InvalidWebhookSignature(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentProcessorError(_) => StatusCode::BAD_GATEWAY,
            Self::TransactionTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}

impl From<CartApiError> for ServerError {
    fn from(e: CartApiError) -> Self {
        match e {
            CartApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            CartApiError::ProductNotFound(_) | CartApiError::ItemNotInCart(_) => Self::NoRecordFound(e.to_string()),
            CartApiError::InvalidQuantity(_) | CartApiError::QuantityTooLarge { .. } => {
                Self::InvalidRequestBody(e.to_string())
            },
        }
    }
}

impl From<CustomerApiError> for ServerError {
    fn from(e: CustomerApiError) -> Self {
        match e {
            CustomerApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            CustomerApiError::CustomerNotFound(_) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<PaymentProcessorError> for ServerError {
    fn from(e: PaymentProcessorError) -> Self {
        Self::PaymentProcessorError(e.to_string())
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart | CheckoutError::InvalidShippingAddress(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            CheckoutError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::InsufficientStock { .. } => Self::Conflict(e.to_string()),
            CheckoutError::PaymentProcessor(e) => e.into(),
            CheckoutError::CustomerError(e) => e.into(),
            CheckoutError::CartError(e) => e.into(),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            OrderFlowError::ProductNotFound(_) |
            OrderFlowError::CustomerNotFound(_) |
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::InsufficientStock { .. } | OrderFlowError::OrderAlreadyExists(_) => {
                Self::Conflict(e.to_string())
            },
            OrderFlowError::EmptyCart |
            OrderFlowError::EmptyOrder |
            OrderFlowError::InvalidQuantity { .. } |
            OrderFlowError::InvalidMetadata(_) => Self::InvalidRequestBody(e.to_string()),
            OrderFlowError::InvalidStatusTransition(_) => Self::InvalidStatus(e.to_string()),
            OrderFlowError::TransactionTimeout => Self::TransactionTimeout(e.to_string()),
        }
    }
}

impl From<ReviewApiError> for ServerError {
    fn from(e: ReviewApiError) -> Self {
        match e {
            ReviewApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
            ReviewApiError::ReviewNotFound(_) | ReviewApiError::ProductNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            ReviewApiError::OrderNotEligible => Self::InsufficientPermissions(e.to_string()),
            ReviewApiError::AlreadyReviewed(_) => Self::Conflict(e.to_string()),
            ReviewApiError::InvalidRating(_) | ReviewApiError::ReviewModificationNoOp => {
                Self::InvalidRequestBody(e.to_string())
            },
            ReviewApiError::TransactionTimeout => Self::TransactionTimeout(e.to_string()),
        }
    }
}

impl From<WebhookSignatureError> for ServerError {
    fn from(e: WebhookSignatureError) -> Self {
        Self::InvalidWebhookSignature(e.to_string())
    }
}

//! Bearer token middleware.
//!
//! Wrap a scope with this middleware to require a valid identity provider token on every route in it. The token is
//! read from the `Authorization` header and checked with a [`TokenValidator`]. On success the [`JwtClaims`] are put
//! into the request extensions, where the [`AclMiddlewareFactory`](super::AclMiddlewareFactory) and the handlers find
//! them. Otherwise the request is rejected with a 401.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::{debug, trace};

use crate::{
    auth::{bearer_token, JwtClaims, TokenValidator},
    errors::{AuthError, ServerError},
};

pub struct IdentityMiddlewareFactory {
    validator: TokenValidator,
}

impl IdentityMiddlewareFactory {
    pub fn new(validator: TokenValidator) -> Self {
        IdentityMiddlewareFactory { validator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = IdentityMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(IdentityMiddlewareService { validator: Rc::new(self.validator.clone()), service: Rc::new(service) })
    }
}

pub struct IdentityMiddlewareService<S> {
    validator: Rc<TokenValidator>,
    service: Rc<S>,
}

fn claims_for_request(req: &ServiceRequest, validator: &TokenValidator) -> Result<JwtClaims, AuthError> {
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let header = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = bearer_token(header)?;
    validator.validate(token)
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let validator = Rc::clone(&self.validator);
        Box::pin(async move {
            match claims_for_request(&req, &validator) {
                Ok(claims) => {
                    trace!("🔑️ {} {} authenticated as {}", req.method(), req.path(), claims.sub);
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                },
                Err(e) => {
                    debug!("🔑️ Rejecting unauthenticated request to {}. {e}", req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use subtle::ConstantTimeEq;

/// Bearer-token guard for the control routes
///
/// With no token configured every request passes through.
#[derive(Clone)]
pub struct AdminAuth {
    token: Option<Rc<str>>,
}

impl AdminAuth {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token.map(Rc::from),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthService {
            service,
            token: self.token.clone(),
        }))
    }
}

pub struct AdminAuthService<S> {
    service: S,
    token: Option<Rc<str>>,
}

fn bearer_matches(req: &ServiceRequest, expected: &str) -> bool {
    let provided = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(provided) => {
            provided.len() == expected.len() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
        }
        None => false,
    }
}

impl<S, B> Service<ServiceRequest> for AdminAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Skip auth for OPTIONS requests (CORS preflight)
        let allowed = req.method() == actix_web::http::Method::OPTIONS
            || match self.token.as_deref() {
                Some(expected) => bearer_matches(&req, expected),
                None => true,
            };

        if allowed {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res)
            });
        }

        log::warn!("Rejected control request to {}", req.path());
        Box::pin(async move {
            let response = HttpResponse::Unauthorized().body("Missing or invalid authorization header");
            Err(actix_web::error::InternalError::from_response(
                "Missing or invalid authorization header",
                response,
            )
            .into())
        })
    }
}

//! Per-scope module permission gate.
//!
//! Wrap a scope with [`ModuleGate`] to reject requests before any handler
//! runs: `401` when the session carries no principal, `403` when the
//! principal holds none of the required modules. The scope must sit inside
//! the session middleware.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::debug;

use crate::domain::{authorize_any, Module};

use super::session::SessionContext;

/// Middleware factory holding the any-of module requirement.
///
/// # Examples
/// ```
/// use actix_web::web;
/// use crm_backend::domain::Module;
/// use crm_backend::inbound::http::module_gate::ModuleGate;
///
/// let scope = web::scope("/deals").wrap(ModuleGate::require(Module::Crm));
/// ```
#[derive(Clone)]
pub struct ModuleGate {
    modules: Rc<[Module]>,
}

impl ModuleGate {
    /// Require a single module.
    pub fn require(module: Module) -> Self {
        Self::any_of(&[module])
    }

    /// Require at least one of `modules`.
    pub fn any_of(modules: &[Module]) -> Self {
        Self {
            modules: Rc::from(modules),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ModuleGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ModuleGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ModuleGateMiddleware {
            service: Rc::new(service),
            modules: Rc::clone(&self.modules),
        }))
    }
}

/// Service wrapper produced by [`ModuleGate`].
pub struct ModuleGateMiddleware<S> {
    service: Rc<S>,
    modules: Rc<[Module]>,
}

impl<S, B> Service<ServiceRequest> for ModuleGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let modules = Rc::clone(&self.modules);

        // Evaluated inside the future so errors pick up the request trace id.
        Box::pin(async move {
            let session = SessionContext::from_http_request(req.request());
            let principal = session.principal();
            let decision = authorize_any(principal.as_ref(), &modules).map(|_| ());
            if let Err(error) = decision {
                debug!(
                    path = req.path(),
                    code = ?error.code(),
                    "request rejected by module gate"
                );
                return Ok(req.error_response(error).map_into_right_body());
            }
            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}

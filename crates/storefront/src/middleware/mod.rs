//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (fills the span's `request_id`)
//! 4. CSP nonce (per-request nonce for inline scripts)
//! 5. Security headers (CSP with the nonce, frame and isolation headers)
//! 6. Session layer (tower-sessions, added by the caller)
//! 7. Rate limiting on credential forms (governor)

pub mod auth;
pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, fresh_id_token, is_safe_redirect, sign_in_session,
    sign_out_session, update_current_user,
};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{RequestId, make_request_span, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;

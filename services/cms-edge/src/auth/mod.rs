//! Per-request identity at the edge.
//!
//! The auth layer checks the bearer token, then attaches the token payload,
//! a [`Viewer`](crate::viewer::Viewer), the operator envelope and
//! authorization claims to the request before calling the handler.

pub mod context;
pub mod layer;
pub mod options;

pub use context::{AuthzClaims, OperatorFields, token_payload};
pub use layer::{AuthLayer, AuthService};
pub use options::AuthOptions;

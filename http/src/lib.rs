//! # Formway HTTP Ingress
//!
//! Wires HTTP requests to the questionnaire services: a matchit router over
//! a hyper 1.0 accept loop, JSON DTOs on the wire, and a 1:1 mapping from
//! the tagged service result to transport status codes.

pub mod dto;
pub mod error;
pub mod ingress;
pub mod routes;

pub use error::{status_for, IngressError};
pub use ingress::{AppState, HttpIngress, RawIngressService};
pub use routes::{router, Endpoint};

//! # API Client
//!
//! Bearer-token REST client for the dashboard backend.
//!
//! - Every request carries the token from a [`TokenStore`]
//! - A 401 triggers one token refresh and one retry
//! - Every call returns an [`ApiResponse`] envelope instead of an error
//! - Failures raise an `error` toast when a queue is attached
//!
//! ## Example
//!
//! ```rust,ignore
//! let api = ApiClient::new("https://api.example.com")?
//!     .with_tokens(tokens.clone())
//!     .with_toasts(toasts.queue());
//!
//! let listings: ApiResponse<Vec<Listing>> = api.get("/marketplace/listings").await;
//! ```

pub mod client;
pub mod envelope;
pub mod error;
pub mod token;

pub use client::ApiClient;
pub use envelope::ApiResponse;
pub use error::{ApiError, Result};
pub use token::{BearerHeaders, MemoryTokenStore, TokenRefresher, TokenStore};

//! # Hermes Test
//!
//! In-memory testing for Hermes applications: dispatch requests through a
//! [`Dispatcher`](hermes_router::Dispatcher) without binding a port.
//!
//! ## Example
//!
//! ```ignore
//! use hermes_test::TestClient;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_stream() {
//!     let client = TestClient::new(dispatcher);
//!
//!     let response = client
//!         .post("/streams")
//!         .json(&json!({"name": "alpha"}))
//!         .send()
//!         .await;
//!
//!     response.assert_status(http::StatusCode::CREATED);
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;

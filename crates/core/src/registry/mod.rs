//! Container registry tag client
//!
//! Lists every tag of an image through the registry HTTP API
//! (`GET /v2/<image>/tags/list`). Anonymous bearer-token challenges are
//! answered automatically and `Link` pagination is followed to the end.

pub mod auth;
pub mod client;
pub mod tags;

pub use auth::{exchange_token, BearerChallenge};
pub use client::{HttpClient, HttpError, HttpResponse, MockHttpClient, RecordedRequest, ReqwestClient};
pub use tags::{parse_next_link, RegistryClient};

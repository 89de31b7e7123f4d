//! Integration tests for Sumi-Flow
//!
//! These tests use wiremock to stand up local HTTP servers and drive the real
//! reqwest transport and dispatcher against them.

mod dispatch_tests;
mod http_client_tests;

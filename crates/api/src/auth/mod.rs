//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access-token generation and validation.
//! - [`api_key`] -- third-party API key validation.

pub mod api_key;
pub mod jwt;
pub mod password;

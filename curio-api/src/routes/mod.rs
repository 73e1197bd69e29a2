/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Identity endpoints (create account, tokens, own profile)
/// - `tags`: Tag listing and creation
/// - `items`: Item listing and creation
/// - `collections`: Collection CRUD, filtering, and image upload

pub mod collections;
pub mod health;
pub mod items;
pub mod tags;
pub mod users;

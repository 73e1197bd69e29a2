/// Authentication utilities
///
/// # Modules
///
/// - `password`: Argon2id password hashing and verification
/// - `jwt`: Bearer token issuance and validation (HS256)
///
/// Authorization is purely owner-scoping: every store operation takes
/// the authenticated user id, so there is no separate role layer here.

pub mod jwt;
pub mod password;

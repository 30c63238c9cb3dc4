//! Record identifiers.
//!
//! Users, roles and endpoints are keyed by opaque strings on the wire and in
//! storage. Generated ids are UUIDv7 (time-ordered) so that listings ordered by
//! id follow creation order.

use uuid::Uuid;

/// Length of generated one-time passwords.
pub const GENERATED_PASSWORD_LEN: usize = 10;

/// Create a new record identifier.
pub fn new_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Create a random password for new accounts and password resets.
pub fn new_password() -> String {
    let mut raw = Uuid::new_v4().simple().to_string();
    raw.truncate(GENERATED_PASSWORD_LEN);
    raw
}

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Prefix of every payment transaction reference
pub const TX_REF_PREFIX: &str = "TX-";

/// Mint a new payment transaction reference.
///
/// `TX-` followed by the 32 lowercase hex digits of a v4 UUID. The 122
/// random bits come from the OS CSPRNG; the store still rejects duplicates.
pub fn new_transaction_ref() -> String {
    format!("{TX_REF_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

/// Opaque order identifier
pub fn new_order_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Structural check for references accepted from URLs
pub fn is_valid_transaction_ref(value: &str) -> bool {
    value.strip_prefix(TX_REF_PREFIX).is_some_and(|rest| {
        !rest.is_empty()
            && rest.len() <= 64
            && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

//! Fixed feature schema shared by training and serving.
//!
//! The schema is a compile-time constant rather than a negotiated or
//! versioned artifact: both the training program and the serving pipeline
//! build their vectors from this exact ordered list, so a training/serving
//! mismatch cannot be expressed.

/// Ordered feature slots. Vector position i always holds the value of
/// `FEATURE_SCHEMA[i]`.
pub const FEATURE_SCHEMA: [&str; 5] = [
    "amount",
    "velocity_1h",
    "is_international",
    "card_present",
    "device_type",
];

/// Number of feature slots.
pub const FEATURE_COUNT: usize = FEATURE_SCHEMA.len();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_order_is_stable() {
        assert_eq!(FEATURE_COUNT, 5);
        assert_eq!(FEATURE_SCHEMA[0], "amount");
        assert_eq!(FEATURE_SCHEMA[4], "device_type");
    }
}

use md5::{Digest, Md5};
use std::sync::Arc;

/// A pluggable function that maps a key to the value actually stored
pub type HashFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Default digest: MD5 of the key as 32 lowercase hex characters.
///
/// Distinct keys with the same digest are indistinguishable to the tracker.
pub fn hash_it(key: &str) -> String {
    hex::encode(Md5::digest(key.as_bytes()))
}

/// Returns the default hash function as a shareable [`HashFn`]
pub fn default_hash_fn() -> HashFn {
    Arc::new(hash_it)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_it_known_digest() {
        assert_eq!(hash_it(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(hash_it("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_hash_it_fixed_size() {
        let long_key = "k".repeat(10_000);
        assert_eq!(hash_it(&long_key).len(), 32);
        assert_eq!(hash_it("order-42").len(), 32);
    }

    #[test]
    fn test_default_hash_fn_matches_hash_it() {
        let f = default_hash_fn();
        assert_eq!(f("order-42"), hash_it("order-42"));
    }
}

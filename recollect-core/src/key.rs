//! Collection key construction and random ID generation.

use rand::rngs::OsRng;
use rand::TryRngCore;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// Alphabet used by [`nid`]. 64 symbols, so a random byte masked to 6 bits maps without bias.
const ID_ALPHABET: &[u8; 64] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ-_";

/// Generates a short random identifier.
///
/// `length` is the number of random symbols; a non-empty `prefix` is prepended
/// as `prefix_` and does not count towards it. If the OS random source fails the
/// identifier falls back to the current Unix time in microseconds.
pub fn nid(prefix: &str, length: usize) -> String {
    let mut bytes = vec![0u8; length];
    let id = match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => bytes
            .iter()
            .map(|b| ID_ALPHABET[(b & 0x3f) as usize] as char)
            .collect::<String>(),
        Err(e) => {
            tracing::warn!("random source unavailable, using timestamp id: {}", e);
            unix_micros().to_string()
        }
    };

    if prefix.is_empty() {
        id
    } else {
        format!("{}_{}", prefix, id)
    }
}

fn unix_micros() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or_default()
}

/// Joins `prefix` and `parts` with `separator`.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if the prefix or any part is empty.
///
/// # Example
///
/// ```rust
/// use recollect_core::create_key;
///
/// let key = create_key(&["orders", "eu"], "history", ":").unwrap();
/// assert_eq!(key, "history:orders:eu");
/// ```
pub fn create_key<S: AsRef<str>>(parts: &[S], prefix: &str, separator: &str) -> Result<String, Error> {
    let all_parts: Vec<&str> = std::iter::once(prefix)
        .chain(parts.iter().map(AsRef::as_ref))
        .collect();

    if all_parts.iter().any(|p| p.is_empty()) {
        return Err(Error::InvalidArgument("empty key part not allowed".to_string()));
    }

    Ok(all_parts.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_nid_length_and_alphabet() {
        let id = nid("", 16);
        assert_eq!(id.len(), 16);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_nid_prefix_not_counted() {
        let id = nid("h", 16);
        assert!(id.starts_with("h_"));
        assert_eq!(id.len(), 2 + 16);
    }

    #[test]
    fn test_nid_is_unique_enough() {
        let ids: HashSet<String> = (0..1000).map(|_| nid("", 16)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_create_key() {
        assert_eq!(create_key(&["orders"], "history", ":").unwrap(), "history:orders");
        assert_eq!(create_key(&["a", "b", "c"], "p", "/").unwrap(), "p/a/b/c");
    }

    #[test]
    fn test_create_key_without_parts() {
        let parts: [&str; 0] = [];
        assert_eq!(create_key(&parts, "history", ":").unwrap(), "history");
    }

    #[test]
    fn test_create_key_rejects_empty_part() {
        let err = create_key(&["orders", ""], "history", ":").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_create_key_rejects_empty_prefix() {
        assert!(create_key(&["orders"], "", ":").is_err());
    }
}

//! Customer-facing identifiers and secrets.

use rand::Rng;
use rand::distr::Alphanumeric;
use rand::seq::IndexedRandom;

/// Characters a reference ID is drawn from. Omits `0`, `1`, `I` and `O`,
/// which are easy to confuse when read aloud or typed.
pub const REFERENCE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Length of a reference ID.
pub const REFERENCE_LENGTH: usize = 10;

/// Length of an anonymous access token.
pub const ACCESS_TOKEN_LENGTH: usize = 32;

/// Generate a random order reference ID.
#[must_use]
pub fn generate_reference_id() -> String {
    let mut rng = rand::rng();
    (0..REFERENCE_LENGTH)
        .filter_map(|_| REFERENCE_ALPHABET.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect()
}

/// Generate a random secret that lets an anonymous buyer read their order.
#[must_use]
pub fn generate_access_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_id_shape() {
        for _ in 0..100 {
            let id = generate_reference_id();
            assert_eq!(id.len(), REFERENCE_LENGTH);
            assert!(id.bytes().all(|b| REFERENCE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_reference_ids_differ() {
        assert_ne!(generate_reference_id(), generate_reference_id());
    }

    #[test]
    fn test_access_token_shape() {
        let token = generate_access_token();
        assert_eq!(token.len(), ACCESS_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

//! Cryptographic utility functions

use rand::RngCore;

/// Generate a cryptographically secure random key
pub fn generate_key(len: usize) -> Vec<u8> {
    let mut key = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_length() {
        assert_eq!(generate_key(16).len(), 16);
        assert_eq!(generate_key(32).len(), 32);
    }

    #[test]
    fn test_generate_key_uniqueness() {
        assert_ne!(generate_key(32), generate_key(32));
    }
}

//! Public code generation for outdoors

use rand::Rng;

/// Number of random bytes in a public code (hex-encoded to twice as many chars)
pub const PUBLIC_CODE_BYTES: usize = 4;

/// Generate a candidate public code: 4 random bytes, hex-encoded.
///
/// Uniqueness is not guaranteed here; the storage layer reserves the code
/// against existing ones and retries on collision.
pub fn generate_public_code() -> String {
    let bytes: [u8; PUBLIC_CODE_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        let code = generate_public_code();
        assert_eq!(code.len(), PUBLIC_CODE_BYTES * 2);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_codes_vary() {
        // Not a uniqueness proof, just a sanity check on the generator.
        let a = generate_public_code();
        let b = generate_public_code();
        let c = generate_public_code();
        assert!(a != b || b != c);
    }
}

//! Room-key symmetric codec
//!
//! Stateless end-to-end encryption used by clients only; the relay
//! never sees a key. ChaCha20-Poly1305 with a fresh random 96-bit nonce
//! per message and no associated data.
//!
//! Wire form of a ciphertext: `base64(nonce || ciphertext || tag)`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CryptoError;

/// Key size in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Nonce size in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Generate a new random room key, Base64 encoded
pub fn generate_key() -> Result<String, CryptoError> {
    let mut key = [0u8; KEY_SIZE];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|_| CryptoError::RandomSourceFailure)?;
    Ok(BASE64.encode(key))
}

/// True iff `encoded` is standard Base64 for exactly 32 bytes
pub fn validate_key(encoded: &str) -> bool {
    decode_key(encoded).is_ok()
}

/// Encrypt a message under a Base64 room key
pub fn encrypt(plaintext: &str, key: &str) -> Result<String, CryptoError> {
    let key = decode_key(key)?;
    let cipher = ChaCha20Poly1305::new(&key);

    // Fresh nonce per call, never reused under a key
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|_| CryptoError::RandomSourceFailure)?;

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|_| CryptoError::InvalidKey)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&sealed);
    Ok(BASE64.encode(out))
}

/// Decrypt a Base64 ciphertext produced by [`encrypt`]
///
/// Any tag mismatch is reported as `AuthenticationFailed`, whether the
/// cause is a wrong key or modified data.
pub fn decrypt(ciphertext: &str, key: &str) -> Result<String, CryptoError> {
    let key = decode_key(key)?;
    let data = BASE64
        .decode(ciphertext)
        .map_err(|_| CryptoError::Malformed)?;

    if data.len() < NONCE_SIZE {
        return Err(CryptoError::Malformed);
    }
    let (nonce, body) = data.split_at(NONCE_SIZE);

    let cipher = ChaCha20Poly1305::new(&key);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Malformed)
}

fn decode_key(encoded: &str) -> Result<Key, CryptoError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|_| CryptoError::InvalidKey)?;
    if bytes.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey);
    }
    Ok(Key::clone_from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_key().unwrap();
        for msg in ["hi", "", "привет, мир", "a line with [brackets] and spaces"] {
            let ct = encrypt(msg, &key).unwrap();
            assert_eq!(decrypt(&ct, &key).unwrap(), msg);
        }
    }

    #[test]
    fn test_generated_keys_are_valid_and_distinct() {
        let k1 = generate_key().unwrap();
        let k2 = generate_key().unwrap();
        assert!(validate_key(&k1));
        assert_eq!(k1.len(), 44);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_same_plaintext_encrypts_differently() {
        let key = generate_key().unwrap();
        let a = encrypt("hello", &key).unwrap();
        let b = encrypt("hello", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_ciphertext_length() {
        let key = generate_key().unwrap();
        let msg = "exactly twenty bytes";
        let raw = BASE64.decode(encrypt(msg, &key).unwrap()).unwrap();
        assert_eq!(raw.len(), msg.len() + NONCE_SIZE + TAG_SIZE);
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let k1 = generate_key().unwrap();
        let k2 = generate_key().unwrap();
        let ct = encrypt("secret", &k1).unwrap();
        assert_eq!(decrypt(&ct, &k2), Err(CryptoError::AuthenticationFailed));
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let key = generate_key().unwrap();
        let mut raw = BASE64.decode(encrypt("secret", &key).unwrap()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(&raw);
        assert_eq!(
            decrypt(&tampered, &key),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_malformed_ciphertext() {
        let key = generate_key().unwrap();
        assert_eq!(decrypt("!!!not base64!!!", &key), Err(CryptoError::Malformed));
        let short = BASE64.encode([0u8; NONCE_SIZE - 1]);
        assert_eq!(decrypt(&short, &key), Err(CryptoError::Malformed));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key(&BASE64.encode([7u8; 32])));
        assert!(!validate_key(&BASE64.encode([7u8; 31])));
        assert!(!validate_key(&BASE64.encode([7u8; 33])));
        assert!(!validate_key("not a key"));
        let padded = format!(" {} ", BASE64.encode([7u8; 32]));
        assert!(!validate_key(&padded));
        assert!(!validate_key(""));
    }

    #[test]
    fn test_invalid_key_rejected_before_crypto() {
        assert_eq!(encrypt("hi", "short"), Err(CryptoError::InvalidKey));
        assert_eq!(decrypt("AAAA", "short"), Err(CryptoError::InvalidKey));
    }
}

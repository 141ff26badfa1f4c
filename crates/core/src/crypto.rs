//! Deterministic field cipher used for sealed database columns and the
//! request/response payload envelope.
//!
//! The key is the SHA-256 digest of the deployment secret. Values are
//! encrypted with AES-256 in ECB mode with PKCS#7 padding and carried as
//! standard base64 text. ECB has no IV, so equal plaintexts produce equal
//! ciphertexts; existing data and clients depend on that encoding.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use sha2::{Digest, Sha256};

type Aes256EcbEnc = ecb::Encryptor<Aes256>;
type Aes256EcbDec = ecb::Decryptor<Aes256>;

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

/// Format used when sealing calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Ciphertext is not valid base64")]
    InvalidBase64,

    #[error("Ciphertext length is not a multiple of the block size")]
    InvalidLength,

    #[error("Ciphertext padding is invalid")]
    InvalidPadding,

    #[error("Decrypted bytes are not valid UTF-8")]
    InvalidUtf8,

    #[error("Decrypted value is not a valid date: {0}")]
    InvalidDate(String),

    #[error("Value could not be serialized: {0}")]
    Serialize(String),
}

/// Symmetric cipher bound to one deployment secret.
///
/// Cheap to clone; holds only the derived key.
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    pub fn new(secret: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self { key }
    }

    /// Whether `value` already decodes and unpads as ciphertext under this key.
    pub fn is_encrypted(&self, value: &str) -> bool {
        self.decrypt_bytes(value).is_ok()
    }

    /// Encrypt `value`. Values that are already ciphertext are returned as-is
    /// so that sealing twice never double-encrypts.
    pub fn encrypt(&self, value: &str) -> String {
        if self.is_encrypted(value) {
            return value.to_string();
        }
        let ciphertext =
            Aes256EcbEnc::new(&self.key.into()).encrypt_padded_vec_mut::<Pkcs7>(value.as_bytes());
        STANDARD.encode(ciphertext)
    }

    pub fn decrypt(&self, value: &str) -> Result<String, CryptoError> {
        let bytes = self.decrypt_bytes(value)?;
        String::from_utf8(bytes).map_err(|_| CryptoError::InvalidUtf8)
    }

    /// Decrypt `value`, returning the input unchanged when it is not
    /// ciphertext. Only for columns that may still hold legacy plaintext.
    pub fn decrypt_or_passthrough(&self, value: &str) -> String {
        self.decrypt(value).unwrap_or_else(|_| value.to_string())
    }

    // -----------------------------------------------------------------------
    // Typed helpers
    // -----------------------------------------------------------------------

    /// Encrypt a JSON value. Strings are encrypted as-is, everything else is
    /// serialized to JSON text first.
    pub fn encrypt_json(&self, value: &serde_json::Value) -> Result<String, CryptoError> {
        match value {
            serde_json::Value::String(s) => Ok(self.encrypt(s)),
            other => serde_json::to_string(other)
                .map(|text| self.encrypt(&text))
                .map_err(|e| CryptoError::Serialize(e.to_string())),
        }
    }

    /// Decrypt a JSON value. Plaintext that is not JSON comes back as a
    /// JSON string.
    pub fn decrypt_json(&self, value: &str) -> Result<serde_json::Value, CryptoError> {
        let text = self.decrypt(value)?;
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    pub fn encrypt_date(&self, date: NaiveDate) -> String {
        self.encrypt(&date.format(DATE_FORMAT).to_string())
    }

    pub fn decrypt_date(&self, value: &str) -> Result<NaiveDate, CryptoError> {
        let text = self.decrypt(value)?;
        NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|_| CryptoError::InvalidDate(text))
    }

    fn decrypt_bytes(&self, value: &str) -> Result<Vec<u8>, CryptoError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.len() % 4 != 0 {
            return Err(CryptoError::InvalidBase64);
        }
        let decoded = STANDARD
            .decode(trimmed)
            .map_err(|_| CryptoError::InvalidBase64)?;
        if decoded.is_empty() || decoded.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidLength);
        }
        Aes256EcbDec::new(&self.key.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&decoded)
            .map_err(|_| CryptoError::InvalidPadding)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn cipher() -> FieldCipher {
        FieldCipher::new("test-secret-key")
    }

    #[test]
    fn string_round_trip() {
        let c = cipher();
        let sealed = c.encrypt("+15551234567");
        assert_ne!(sealed, "+15551234567");
        assert_eq!(c.decrypt(&sealed).unwrap(), "+15551234567");
    }

    #[test]
    fn object_round_trip() {
        let c = cipher();
        let value = json!({"patient": {"first_name": "Ada"}, "pages": 3});
        let sealed = c.encrypt_json(&value).unwrap();
        assert_eq!(c.decrypt_json(&sealed).unwrap(), value);
    }

    #[test]
    fn list_round_trip() {
        let c = cipher();
        let value = json!(["99213", "J45.909"]);
        let sealed = c.encrypt_json(&value).unwrap();
        assert_eq!(c.decrypt_json(&sealed).unwrap(), value);
    }

    #[test]
    fn date_round_trip() {
        let c = cipher();
        let dob = NaiveDate::from_ymd_opt(1984, 2, 29).unwrap();
        let sealed = c.encrypt_date(dob);
        assert_eq!(c.decrypt(&sealed).unwrap(), "1984-02-29");
        assert_eq!(c.decrypt_date(&sealed).unwrap(), dob);
    }

    #[test]
    fn ciphertext_is_detected() {
        let c = cipher();
        let sealed = c.encrypt("hello");
        assert!(c.is_encrypted(&sealed));
        assert!(!c.is_encrypted("hello"));
    }

    #[test]
    fn encrypting_ciphertext_is_idempotent() {
        let c = cipher();
        let once = c.encrypt("hello");
        let twice = c.encrypt(&once);
        assert_eq!(once, twice);
        assert_eq!(c.decrypt(&twice).unwrap(), "hello");
    }

    #[test]
    fn output_is_deterministic() {
        assert_eq!(cipher().encrypt("same"), cipher().encrypt("same"));
    }

    #[test]
    fn different_secrets_do_not_decrypt_each_other() {
        let sealed = cipher().encrypt("hello");
        let other = FieldCipher::new("another-secret");
        assert_ne!(other.decrypt(&sealed).ok().as_deref(), Some("hello"));
    }

    #[test]
    fn garbage_is_an_error() {
        let c = cipher();
        assert_matches!(c.decrypt("not base64!"), Err(CryptoError::InvalidBase64));
        assert_matches!(c.decrypt("abc"), Err(CryptoError::InvalidBase64));
        // Valid base64, wrong length for a block cipher.
        assert_matches!(c.decrypt("aGVsbG8="), Err(CryptoError::InvalidLength));
    }

    #[test]
    fn passthrough_returns_input_on_failure() {
        let c = cipher();
        assert_eq!(c.decrypt_or_passthrough("plain text"), "plain text");
        let sealed = c.encrypt("secret");
        assert_eq!(c.decrypt_or_passthrough(&sealed), "secret");
    }

    #[test]
    fn non_json_plaintext_decrypts_to_string_value() {
        let c = cipher();
        let sealed = c.encrypt("just words");
        assert_eq!(c.decrypt_json(&sealed).unwrap(), json!("just words"));
    }

    #[test]
    fn bad_date_is_an_error() {
        let c = cipher();
        let sealed = c.encrypt("02/29/1984");
        assert_matches!(c.decrypt_date(&sealed), Err(CryptoError::InvalidDate(_)));
    }
}

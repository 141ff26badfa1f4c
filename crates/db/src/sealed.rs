//! Column type for values stored as field-cipher ciphertext.
//!
//! A [`Sealed`] is what the database holds: base64 ciphertext. It has no
//! `Serialize` impl, so it cannot leak into a response without being opened
//! with the deployment's [`FieldCipher`] first.

use chrono::NaiveDate;
use intake_core::crypto::{CryptoError, FieldCipher};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct Sealed(String);

impl Sealed {
    /// Encrypt `plaintext`. Already-sealed input is stored as-is.
    pub fn seal(cipher: &FieldCipher, plaintext: &str) -> Self {
        Self(cipher.encrypt(plaintext))
    }

    pub fn seal_json(cipher: &FieldCipher, value: &serde_json::Value) -> Result<Self, CryptoError> {
        cipher.encrypt_json(value).map(Self)
    }

    pub fn seal_date(cipher: &FieldCipher, date: NaiveDate) -> Self {
        Self(cipher.encrypt_date(date))
    }

    /// Wrap a value read back from a sealed column.
    pub fn from_ciphertext(ciphertext: impl Into<String>) -> Self {
        Self(ciphertext.into())
    }

    pub fn ciphertext(&self) -> &str {
        &self.0
    }

    pub fn open(&self, cipher: &FieldCipher) -> Result<String, CryptoError> {
        cipher.decrypt(&self.0)
    }

    pub fn open_json(&self, cipher: &FieldCipher) -> Result<serde_json::Value, CryptoError> {
        cipher.decrypt_json(&self.0)
    }

    pub fn open_date(&self, cipher: &FieldCipher) -> Result<NaiveDate, CryptoError> {
        cipher.decrypt_date(&self.0)
    }

    /// Open the value, falling back to the stored text for rows written
    /// before the column was sealed.
    pub fn open_or_raw(&self, cipher: &FieldCipher) -> String {
        match self.open(cipher) {
            Ok(plain) => plain,
            Err(e) => {
                tracing::warn!(error = %e, "Sealed column is not ciphertext, returning stored value");
                self.0.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open() {
        let cipher = FieldCipher::new("k");
        let sealed = Sealed::seal(&cipher, "555-0100");
        assert_ne!(sealed.ciphertext(), "555-0100");
        assert_eq!(sealed.open(&cipher).unwrap(), "555-0100");
    }

    #[test]
    fn resealing_does_not_double_encrypt() {
        let cipher = FieldCipher::new("k");
        let sealed = Sealed::seal(&cipher, "x");
        let again = Sealed::seal(&cipher, sealed.ciphertext());
        assert_eq!(sealed, again);
    }

    #[test]
    fn legacy_plaintext_opens_raw() {
        let cipher = FieldCipher::new("k");
        let legacy = Sealed::from_ciphertext("555-0100");
        assert!(legacy.open(&cipher).is_err());
        assert_eq!(legacy.open_or_raw(&cipher), "555-0100");
    }
}

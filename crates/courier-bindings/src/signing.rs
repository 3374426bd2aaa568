//! HMAC-SHA256 message signing.
//!
//! The signed payload is the key-value form of every serialized field except
//! the signature itself, sorted by key:
//!
//! ```text
//! created_at:1700000000\nmode:id_res\nnonce:9f2c...\nrealm:https://rp.example/\n
//! ```
//!
//! Sorting makes the payload independent of the order the serializer or the
//! wire happened to use. The signature is the lowercase hex HMAC of that
//! payload. Verification compares in constant time.

use std::fmt;

use courier_core::{
    binding::{BindingContext, BindingElement, BindingOutcome},
    error::BindingError,
    message::ProtocolMessage,
};
use courier_proto::{ProtectionKind, kvf};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, trace};

use crate::error::KeyError;

type HmacSha256 = Hmac<Sha256>;

/// Signing configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Shared secret, hex encoded
    pub key_hex: String,
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig").field("key_hex", &"<redacted>").finish()
    }
}

/// Tamper protection through a shared-secret HMAC.
#[derive(Clone)]
pub struct SigningElement {
    mac: HmacSha256,
}

impl SigningElement {
    /// Element signing with `key`.
    ///
    /// # Errors
    ///
    /// `KeyError::Empty` for a zero-length key.
    pub fn new(key: &[u8]) -> Result<Self, KeyError> {
        if key.is_empty() {
            return Err(KeyError::Empty);
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| KeyError::InvalidLength)?;
        Ok(Self { mac })
    }

    /// Element built from configuration.
    ///
    /// # Errors
    ///
    /// `KeyError::InvalidHex` if the key is not hex, `KeyError::Empty` if it
    /// decodes to nothing.
    pub fn from_config(config: &SigningConfig) -> Result<Self, KeyError> {
        let key = hex::decode(config.key_hex.trim())?;
        Self::new(&key)
    }

    /// MAC over the signed payload of `message`, ready to finalize or verify.
    fn keyed_digest(
        &self,
        cx: &BindingContext<'_>,
        message: &dyn ProtocolMessage,
        signature_field: &str,
    ) -> Result<HmacSha256, BindingError> {
        let mut fields = cx.serializer.serialize(message)?;
        fields.remove(signature_field);
        let payload = kvf::encode(&fields.sorted())?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

impl fmt::Debug for SigningElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningElement").finish_non_exhaustive()
    }
}

impl BindingElement for SigningElement {
    fn protection(&self) -> Option<ProtectionKind> {
        Some(ProtectionKind::TamperProtection)
    }

    fn name(&self) -> &str {
        "hmac-sha256-signing"
    }

    fn prepare_for_sending(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        let Some(field) = message.as_tamper_resistant().map(|slot| slot.signature_field()) else {
            return Ok(BindingOutcome::NotApplicable);
        };

        let digest = self.keyed_digest(cx, message, field)?;
        let signature = hex::encode(digest.finalize().into_bytes());
        if let Some(slot) = message.as_tamper_resistant_mut() {
            slot.set_signature(Some(signature));
        }

        trace!(message_type = message.message_type(), field, "message signed");
        Ok(BindingOutcome::Applied)
    }

    fn prepare_for_receiving(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        let Some(slot) = message.as_tamper_resistant() else {
            return Ok(BindingOutcome::NotApplicable);
        };
        let field = slot.signature_field();
        let presented = slot.signature().ok_or(BindingError::MissingSignature)?;
        let presented = hex::decode(presented).map_err(|_| BindingError::InvalidSignature)?;

        let digest = self.keyed_digest(cx, message, field)?;
        if digest.verify_slice(&presented).is_err() {
            debug!(message_type = message.message_type(), "signature mismatch");
            return Err(BindingError::InvalidSignature);
        }

        Ok(BindingOutcome::Applied)
    }
}

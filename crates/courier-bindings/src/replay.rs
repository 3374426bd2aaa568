//! Replay protection.
//!
//! Every outgoing message gets a fresh random nonce. Every incoming nonce is
//! recorded in a [`NonceStore`]; a nonce seen twice in the same context is a
//! replay. Entries older than the replay window are purged on each receive.
//!
//! Purging is only sound while expiration rejects every message whose nonce
//! has been forgotten, so the window never drops below the acceptance window
//! of the [`ExpirationConfig`] the element is built with.

use std::{sync::Arc, time::Duration};

use courier_core::{
    binding::{BindingContext, BindingElement, BindingOutcome},
    error::BindingError,
    message::ProtocolMessage,
};
use courier_proto::ProtectionKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    expiration::ExpirationConfig,
    nonce_store::{MemoryNonceStore, NonceStore},
};

/// Default nonce length in bytes, before hex encoding.
pub const DEFAULT_NONCE_LENGTH: usize = 8;

/// Replay protection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Random bytes per nonce; the wire value is twice as many hex digits
    pub nonce_length: usize,
    /// How long nonces are remembered, at least the expiration acceptance
    /// window
    pub window: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            nonce_length: DEFAULT_NONCE_LENGTH,
            window: ExpirationConfig::default().acceptance_window(),
        }
    }
}

/// Replay protection backed by a shared nonce store.
#[derive(Clone)]
pub struct ReplayElement {
    config: ReplayConfig,
    store: Arc<dyn NonceStore>,
}

impl ReplayElement {
    /// Element recording nonces in `store`, paired with the expiration
    /// limits the same channel enforces.
    ///
    /// A configured window shorter than `expiration`'s acceptance window is
    /// raised to it.
    pub fn new(
        mut config: ReplayConfig,
        expiration: &ExpirationConfig,
        store: Arc<dyn NonceStore>,
    ) -> Self {
        let floor = expiration.acceptance_window();
        if config.window < floor {
            warn!(
                configured = ?config.window,
                window = ?floor,
                "replay window shorter than expiration acceptance window, raising it"
            );
            config.window = floor;
        }
        Self { config, store }
    }

    /// Element with its own [`MemoryNonceStore`]
    pub fn in_memory(config: ReplayConfig, expiration: &ExpirationConfig) -> Self {
        Self::new(config, expiration, Arc::new(MemoryNonceStore::new()))
    }

    /// Effective settings
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }
}

impl std::fmt::Debug for ReplayElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayElement").field("config", &self.config).finish_non_exhaustive()
    }
}

impl BindingElement for ReplayElement {
    fn protection(&self) -> Option<ProtectionKind> {
        Some(ProtectionKind::ReplayProtection)
    }

    fn name(&self) -> &str {
        "replay-protection"
    }

    fn prepare_for_sending(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        let Some(slot) = message.as_replay_protected_mut() else {
            return Ok(BindingOutcome::NotApplicable);
        };

        let mut nonce = vec![0u8; self.config.nonce_length.max(1)];
        cx.env.random_bytes(&mut nonce);
        slot.set_nonce(hex::encode(nonce));
        Ok(BindingOutcome::Applied)
    }

    fn prepare_for_receiving(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        let now = cx.env.now();
        let timestamp = message.as_expiring().and_then(|slot| slot.created_at()).unwrap_or(now);
        let Some(slot) = message.as_replay_protected() else {
            return Ok(BindingOutcome::NotApplicable);
        };
        let nonce = slot.nonce().ok_or(BindingError::MissingNonce)?;
        let context = slot.nonce_context();

        if let Some(cutoff) = now.checked_sub(self.config.window) {
            self.store.purge_before(cutoff);
        }
        if !self.store.store_nonce(context, nonce, timestamp) {
            warn!(context, nonce, "replayed nonce");
            return Err(BindingError::ReplayDetected {
                context: context.to_string(),
                nonce: nonce.to_string(),
            });
        }

        Ok(BindingOutcome::Applied)
    }
}

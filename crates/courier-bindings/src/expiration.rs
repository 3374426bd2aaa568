//! Message expiration.
//!
//! Outgoing messages are stamped with the environment's current time.
//! Incoming messages must be younger than the maximum age and may be dated
//! ahead of local time by at most the clock skew allowance.

use std::time::Duration;

use courier_core::{
    binding::{BindingContext, BindingElement, BindingOutcome},
    error::BindingError,
    message::ProtocolMessage,
};
use courier_proto::ProtectionKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default maximum message age: 13 minutes.
pub const DEFAULT_MAXIMUM_MESSAGE_AGE: Duration = Duration::from_secs(13 * 60);

/// Default clock skew allowance: 10 minutes.
pub const DEFAULT_MAXIMUM_CLOCK_SKEW: Duration = Duration::from_secs(10 * 60);

/// Expiration limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationConfig {
    /// Oldest acceptable message
    pub maximum_message_age: Duration,
    /// How far in the future a message may be dated
    pub maximum_clock_skew: Duration,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            maximum_message_age: DEFAULT_MAXIMUM_MESSAGE_AGE,
            maximum_clock_skew: DEFAULT_MAXIMUM_CLOCK_SKEW,
        }
    }
}

impl ExpirationConfig {
    /// How long a message can stay acceptable from the receiver's point of
    /// view: its age limit plus the skew it may have been dated ahead by.
    pub fn acceptance_window(&self) -> Duration {
        self.maximum_message_age.saturating_add(self.maximum_clock_skew)
    }
}

/// Expiration protection.
#[derive(Debug, Clone, Default)]
pub struct ExpirationElement {
    config: ExpirationConfig,
}

impl ExpirationElement {
    /// Element enforcing `config`
    pub fn new(config: ExpirationConfig) -> Self {
        Self { config }
    }

    /// Current limits
    pub fn config(&self) -> &ExpirationConfig {
        &self.config
    }
}

impl BindingElement for ExpirationElement {
    fn protection(&self) -> Option<ProtectionKind> {
        Some(ProtectionKind::Expiration)
    }

    fn name(&self) -> &str {
        "expiration"
    }

    fn prepare_for_sending(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        let Some(slot) = message.as_expiring_mut() else {
            return Ok(BindingOutcome::NotApplicable);
        };
        slot.set_created_at(cx.env.now());
        Ok(BindingOutcome::Applied)
    }

    fn prepare_for_receiving(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        let Some(slot) = message.as_expiring() else {
            return Ok(BindingOutcome::NotApplicable);
        };
        let created_at = slot.created_at().ok_or(BindingError::MissingTimestamp)?;
        let now = cx.env.now();

        match now.duration_since(created_at) {
            Ok(age) if age > self.config.maximum_message_age => {
                debug!(?age, "message expired");
                Err(BindingError::Expired { age, maximum: self.config.maximum_message_age })
            },
            Ok(_) => Ok(BindingOutcome::Applied),
            Err(ahead) if ahead.duration() > self.config.maximum_clock_skew => {
                debug!(ahead = ?ahead.duration(), "message dated in the future");
                Err(BindingError::FromTheFuture {
                    ahead: ahead.duration(),
                    skew: self.config.maximum_clock_skew,
                })
            },
            Err(_) => Ok(BindingOutcome::Applied),
        }
    }
}

//! Binding elements for exercising the pipeline.

use std::sync::{Arc, Mutex, PoisonError};

use courier_core::{
    binding::{BindingContext, BindingElement, BindingOutcome},
    error::BindingError,
    message::ProtocolMessage,
};
use courier_proto::ProtectionKind;

/// Shared, ordered record of element invocations.
///
/// Entries look like `send:name` or `recv:name`.
#[derive(Debug, Clone, Default)]
pub struct OrderLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OrderLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: String) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).push(entry);
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Element names recorded for one direction (`"send"` or `"recv"`)
    pub fn names(&self, direction: &str) -> Vec<String> {
        let prefix = format!("{direction}:");
        self.entries()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

/// Element that records each invocation and reports a fixed outcome.
///
/// As a protection it claims `protection` without touching the message,
/// which is enough for ordering and coverage tests.
#[derive(Debug, Clone)]
pub struct RecordingElement {
    name: String,
    protection: Option<ProtectionKind>,
    outcome: BindingOutcome,
    log: OrderLog,
}

impl RecordingElement {
    /// Element providing `kind`, named after it
    pub fn providing(kind: ProtectionKind, log: &OrderLog) -> Self {
        Self {
            name: kind.to_string(),
            protection: Some(kind),
            outcome: BindingOutcome::Applied,
            log: log.clone(),
        }
    }

    /// Transformation element named `name`
    pub fn transform(name: &str, log: &OrderLog) -> Self {
        Self {
            name: name.to_string(),
            protection: None,
            outcome: BindingOutcome::Applied,
            log: log.clone(),
        }
    }

    /// Report `NotApplicable` instead of `Applied`
    #[must_use]
    pub fn declining(mut self) -> Self {
        self.outcome = BindingOutcome::NotApplicable;
        self
    }
}

impl BindingElement for RecordingElement {
    fn protection(&self) -> Option<ProtectionKind> {
        self.protection
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn prepare_for_sending(
        &self,
        _cx: &BindingContext<'_>,
        _message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        self.log.push(format!("send:{}", self.name));
        Ok(self.outcome)
    }

    fn prepare_for_receiving(
        &self,
        _cx: &BindingContext<'_>,
        _message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        self.log.push(format!("recv:{}", self.name));
        Ok(self.outcome)
    }
}

/// Reversible transformation: adds an extra field going out, requires and
/// strips it coming in.
#[derive(Debug, Clone)]
pub struct ExtraFieldElement {
    key: String,
    value: String,
}

impl ExtraFieldElement {
    /// Element managing `key = value`
    pub fn new(key: &str, value: &str) -> Self {
        Self { key: key.to_string(), value: value.to_string() }
    }
}

impl BindingElement for ExtraFieldElement {
    fn protection(&self) -> Option<ProtectionKind> {
        None
    }

    fn name(&self) -> &str {
        "extra-field"
    }

    fn prepare_for_sending(
        &self,
        _cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        message.extra_data_mut().set(self.key.as_str(), self.value.as_str());
        Ok(BindingOutcome::Applied)
    }

    fn prepare_for_receiving(
        &self,
        _cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        match message.extra_data_mut().remove(&self.key) {
            Some(value) if value == self.value => Ok(BindingOutcome::Applied),
            Some(value) => {
                Err(BindingError::Rejected(format!("unexpected {} value {value:?}", self.key)))
            },
            None => Ok(BindingOutcome::NotApplicable),
        }
    }
}

/// Element that fails in the chosen directions.
#[derive(Debug, Clone)]
pub struct FailingElement {
    protection: Option<ProtectionKind>,
    on_send: bool,
    on_receive: bool,
}

impl FailingElement {
    /// Fails both ways while claiming `protection`
    pub fn new(protection: Option<ProtectionKind>) -> Self {
        Self { protection, on_send: true, on_receive: true }
    }

    /// Fails only when receiving
    pub fn on_receive(protection: Option<ProtectionKind>) -> Self {
        Self { protection, on_send: false, on_receive: true }
    }

    fn check(&self, fail: bool) -> Result<BindingOutcome, BindingError> {
        if fail {
            return Err(BindingError::Rejected("failing element".to_string()));
        }
        Ok(BindingOutcome::Applied)
    }
}

impl BindingElement for FailingElement {
    fn protection(&self) -> Option<ProtectionKind> {
        self.protection
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn prepare_for_sending(
        &self,
        _cx: &BindingContext<'_>,
        _message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        self.check(self.on_send)
    }

    fn prepare_for_receiving(
        &self,
        _cx: &BindingContext<'_>,
        _message: &mut dyn ProtocolMessage,
    ) -> Result<BindingOutcome, BindingError> {
        self.check(self.on_receive)
    }
}

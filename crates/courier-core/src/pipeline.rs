//! Binding element pipeline.
//!
//! Holds a channel's validated, ordered binding elements and runs them over
//! messages: forward when sending, in exactly the reverse order when
//! receiving. Each pass returns the union of the protections contributed by
//! elements that acted.
//!
//! The pipeline does not decide whether the accumulated protections are
//! enough; the channel compares them against what the message requires.
//!
//! # Invariants
//!
//! - The element list is fixed at construction
//! - At most one element per protection kind
//! - Every configured kind's dependencies are also configured

use courier_proto::{ProtectionKind, Protections};
use tracing::trace;

use crate::{
    binding::{BindingContext, BindingElement, BindingOutcome},
    error::{BindingError, ConfigurationError},
    message::ProtocolMessage,
    ordering,
};

/// Element failure surfaced by a pipeline pass.
#[derive(Debug)]
pub struct ElementFailure {
    /// Name of the failing element
    pub element: String,
    /// Protection the element provides
    pub protection: Option<ProtectionKind>,
    /// What went wrong
    pub error: BindingError,
}

/// Ordered, validated binding elements.
pub struct BindingPipeline {
    /// Elements in send order
    elements: Vec<Box<dyn BindingElement>>,
    /// Union of every element's protection
    configured: Protections,
}

impl BindingPipeline {
    /// Validate `elements` and fix their order.
    ///
    /// # Errors
    ///
    /// `DuplicateProtection` if two elements claim the same kind;
    /// `MissingDependency` if a kind's dependency chain is incomplete.
    pub fn new(elements: Vec<Box<dyn BindingElement>>) -> Result<Self, ConfigurationError> {
        let elements = ordering::validate_and_order(elements, |element| element.protection())?;
        let configured = ordering::configured_protections(&elements, |element| element.protection())?;
        Ok(Self { elements, configured })
    }

    /// Elements in send order
    pub fn elements(&self) -> &[Box<dyn BindingElement>] {
        &self.elements
    }

    /// Element names in send order
    pub fn element_names(&self) -> Vec<&str> {
        self.elements.iter().map(|element| element.name()).collect()
    }

    /// Every protection some element can provide
    pub fn configured_protections(&self) -> Protections {
        self.configured
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if there are no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Run every element's send step, in send order.
    pub fn prepare_for_sending(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<Protections, ElementFailure> {
        run_pass(self.elements.iter(), cx, message, Direction::Sending)
    }

    /// Run every element's receive step, in reverse send order.
    pub fn prepare_for_receiving(
        &self,
        cx: &BindingContext<'_>,
        message: &mut dyn ProtocolMessage,
    ) -> Result<Protections, ElementFailure> {
        run_pass(self.elements.iter().rev(), cx, message, Direction::Receiving)
    }
}

impl std::fmt::Debug for BindingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingPipeline")
            .field("elements", &self.element_names())
            .field("configured", &self.configured)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Sending,
    Receiving,
}

fn run_pass<'e>(
    elements: impl Iterator<Item = &'e Box<dyn BindingElement>>,
    cx: &BindingContext<'_>,
    message: &mut dyn ProtocolMessage,
    direction: Direction,
) -> Result<Protections, ElementFailure> {
    let mut applied = Protections::empty();

    for element in elements {
        let result = match direction {
            Direction::Sending => element.prepare_for_sending(cx, message),
            Direction::Receiving => element.prepare_for_receiving(cx, message),
        };

        let outcome = result.map_err(|error| ElementFailure {
            element: element.name().to_string(),
            protection: element.protection(),
            error,
        })?;

        trace!(
            element = element.name(),
            ?direction,
            ?outcome,
            message_type = message.message_type(),
            "binding element ran"
        );

        if outcome == BindingOutcome::Applied
            && let Some(kind) = element.protection()
        {
            applied |= kind.flag();
        }
    }

    Ok(applied)
}

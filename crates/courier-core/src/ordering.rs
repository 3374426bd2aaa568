//! Binding element validation and ordering.
//!
//! Given the elements a channel was configured with, decide whether they
//! form a coherent set and in which order they run when sending:
//!
//! 1. Pure transformations (no protection) first, in the order supplied.
//!    Protection elements may depend on their side effects, e.g.
//!    canonicalization, so they always precede.
//! 2. Protection elements by descending [`rank`](ProtectionKind::rank).
//!    The foundational protection (tamper protection) runs last so that its
//!    signature covers the nonce and timestamp added before it. Receiving
//!    runs the reverse, so the signature is verified before the timestamp
//!    and nonce it vouches for are trusted.
//!
//! The set is rejected if two elements claim the same kind, or if an
//! element's kind depends on a kind nobody provides.
//!
//! Everything here is generic over the item type so the ordering rules can
//! be tested without constructing real elements.

use std::cmp::Reverse;

use courier_proto::{ProtectionKind, Protections};

use crate::error::ConfigurationError;

/// Sort key for protection elements in send order.
#[must_use]
pub fn send_order_key(kind: ProtectionKind) -> Reverse<u8> {
    Reverse(kind.rank())
}

/// Validate `items` and return them in send order.
///
/// `protection_of` reports the kind each item provides. Sorting is stable,
/// so transformations keep their relative order.
pub fn validate_and_order<T, F>(items: Vec<T>, protection_of: F) -> Result<Vec<T>, ConfigurationError>
where
    F: Fn(&T) -> Option<ProtectionKind>,
{
    let configured = configured_protections(&items, &protection_of)?;

    for kind in configured.kinds() {
        let missing = kind.dependencies() - configured;
        if !missing.is_empty() {
            return Err(ConfigurationError::MissingDependency { protection: kind, missing });
        }
    }

    let (mut protecting, transforming): (Vec<T>, Vec<T>) =
        items.into_iter().partition(|item| protection_of(item).is_some());

    protecting.sort_by_key(|item| protection_of(item).map(send_order_key));

    let mut ordered = transforming;
    ordered.extend(protecting);

    debug_assert_eq!(configured_protections(&ordered, &protection_of).ok(), Some(configured));
    Ok(ordered)
}

/// Union of the kinds provided by `items`, failing on duplicates.
pub fn configured_protections<T, F>(
    items: &[T],
    protection_of: F,
) -> Result<Protections, ConfigurationError>
where
    F: Fn(&T) -> Option<ProtectionKind>,
{
    let mut configured = Protections::empty();
    for kind in items.iter().filter_map(&protection_of) {
        if configured.contains(kind.flag()) {
            return Err(ConfigurationError::DuplicateProtection(kind));
        }
        configured |= kind.flag();
    }
    Ok(configured)
}

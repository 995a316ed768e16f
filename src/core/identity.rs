//! Purpose: Boundary to the host capability that rewrites the caller's group identifier.
//! Exports: `IdentityOverride`, `GroupId`, `UnavailableIdentity`.
//! Role: The crate only validates and forwards; locating namespace-scoped id tables is the host's job.
//! Invariants: The id forwarded is exactly the one the caller wrote.
//! Invariants: Ids outside `0..=i32::MAX` never reach the host.
use std::fmt;

use crate::core::error::{Error, ErrorKind};

/// A process-group identifier as the host's process table stores it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct GroupId(i32);

impl GroupId {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for GroupId {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match i32::try_from(value) {
            Ok(id) if id >= 0 => Ok(Self(id)),
            _ => Err(Error::new(ErrorKind::MalformedInput)
                .with_message(format!("{value} is not a valid group id"))),
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-provided mutation entry point for the identity override file.
///
/// Implementations apply `new_id` to the calling execution context, scoped to
/// its current namespace.
pub trait IdentityOverride: Send + Sync {
    fn override_group_id(&self, new_id: GroupId) -> Result<(), Error>;
}

/// Used when the host offers no identity override capability.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableIdentity;

impl IdentityOverride for UnavailableIdentity {
    fn override_group_id(&self, _new_id: GroupId) -> Result<(), Error> {
        Err(Error::new(ErrorKind::Permission)
            .with_message("identity override not provided by host"))
    }
}

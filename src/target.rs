// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::*;

use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYNTHETIC_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
    Type(TypeId),
    Synthetic(u64),
}

/// Identity of the construct that declares a type or owns a set of resolvers.
///
/// Two targets are equal when they denote the same construct, regardless of
/// the name they carry. The name is only used in diagnostics and as the
/// default GraphQL name of a type declared on the target.
#[derive(Clone)]
pub struct Target {
    identity: Identity,
    name: Rc<str>,
}

impl Target {
    /// Creates a fresh identity. Every call yields a target distinct from all
    /// others in the process, even when the names match.
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            identity: Identity::Synthetic(NEXT_SYNTHETIC_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
        }
    }

    /// Identity of a Rust type. Repeated calls with the same `T` yield equal
    /// targets, named after the last path segment of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        let full = core::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base);
        Self {
            identity: Identity::Type(TypeId::of::<T>()),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_rc(&self) -> Rc<str> {
        self.name.clone()
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Target {}

impl Hash for Target {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity {
            Identity::Type(_) => write!(f, "Target({})", self.name),
            Identity::Synthetic(id) => write!(f, "Target({}#{id})", self.name),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::*;

/// Errors raised while registering declarations or building a schema.
///
/// All of them abort the build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The same construct was registered twice with different descriptors.
    #[error("duplicate registration of {kind} `{name}` on `{target}` with a different descriptor")]
    DuplicateRegistration {
        kind: &'static str,
        name: Rc<str>,
        target: Rc<str>,
    },

    #[error("{kind} registration failed: the name '{name}' is invalid (empty or whitespace-only names are not allowed)")]
    InvalidName { kind: &'static str, name: Rc<str> },

    /// A field declaration was registered without an owning type.
    #[error("field `{field}` has no owner")]
    MissingOwner { field: Rc<str> },

    /// A type reference names a type that is not part of the emitted schema.
    #[error("cannot resolve type `{type_name}` referenced by `{referenced_by}`{}", reason_suffix(.reason))]
    UnresolvedTypeReference {
        type_name: Rc<str>,
        referenced_by: Rc<str>,
        reason: Option<&'static str>,
    },

    /// Two independent ancestors contribute incompatible definitions of a field.
    #[error("type `{type_name}` inherits field `{field}` with conflicting types from `{first}` and `{second}`")]
    AmbiguousInheritance {
        type_name: Rc<str>,
        field: Rc<str>,
        first: Rc<str>,
        second: Rc<str>,
    },

    #[error("type `{type_name}` inherits from itself")]
    InheritanceCycle { type_name: Rc<str> },

    #[error("invalid type argument `{argument}` for generic `{generic}`: {reason}")]
    InvalidTypeArgument {
        generic: Rc<str>,
        argument: Rc<str>,
        reason: &'static str,
    },

    #[error("type name `{name}` is used by more than one emitted type")]
    DuplicateTypeName { name: Rc<str> },

    #[error("query `{name}` is declared by both `{first}` and `{second}`")]
    DuplicateQuery {
        name: Rc<str>,
        first: Rc<str>,
        second: Rc<str>,
    },

    #[error("no resolver containers were provided; at least one is required to build a schema")]
    MissingResolvers,

    #[error("the selected resolver containers declare no queries; the root `Query` type would be empty")]
    MissingRootQuery,

    /// Consistency checks that `skip_check` disables.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid schema document: {0}")]
    InvalidDocument(String),

    /// The executor rejected the lowered schema.
    #[error("executor rejected schema: {0}")]
    Executable(String),
}

fn reason_suffix(reason: &Option<&'static str>) -> String {
    match reason {
        Some(reason) => format!(" ({reason})"),
        None => String::new(),
    }
}

impl From<serde_json::Error> for BuildError {
    fn from(error: serde_json::Error) -> Self {
        BuildError::InvalidDocument(format!("{error}"))
    }
}

#[cfg(feature = "yaml")]
impl From<serde_yaml::Error> for BuildError {
    fn from(error: serde_yaml::Error) -> Self {
        BuildError::InvalidDocument(format!("{error}"))
    }
}

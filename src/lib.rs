// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod build;
mod compiler;
pub mod document;
mod error;
mod execution;
pub mod generic;
pub mod registry;
mod resolver;
mod schema;
mod target;
mod types;

// Declarations and compiled values cross threads with the executor.
pub(crate) use std::sync::Arc as Rc;

pub use build::{build_schema, BuildSchemaOptions, DateScalarMode, NumberScalarMode};
pub use document::{LoadedDocument, SchemaDocument};
pub use error::BuildError;
pub use execution::{ExecutionError, Response, INTROSPECTION_QUERY};
pub use generic::GenericFactory;
pub use registry::{Declaration, Declarations, MetadataRegistry};
pub use resolver::{ResolvedType, ResolvedTypes, TypeResolver};
pub use schema::{CompiledArgument, CompiledField, CompiledSchema, CompiledType};
pub use target::Target;
pub use types::*;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::compiler::Compiler;
}

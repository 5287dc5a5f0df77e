// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::compiler::Compiler;
use crate::error::BuildError;
use crate::registry::MetadataRegistry;
use crate::resolver::TypeResolver;
use crate::schema::CompiledSchema;
use crate::*;

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// GraphQL scalar emitted for [`Scalar::Date`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateScalarMode {
    /// `DateTimeISO`, an ISO 8601 string.
    #[default]
    IsoDate,
    /// `Timestamp`, milliseconds since the Unix epoch.
    Timestamp,
}

/// GraphQL scalar emitted for [`Scalar::Number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberScalarMode {
    #[default]
    Float,
    Integer,
}

/// Options of [`build_schema`].
#[derive(Debug, Clone, Default)]
pub struct BuildSchemaOptions {
    /// Resolver containers whose queries form the root `Query` type. Required.
    pub resolvers: Vec<Target>,
    /// Skip the consistency checks run on the compiled schema.
    pub skip_check: bool,
    pub date_scalar_mode: DateScalarMode,
    pub number_scalar_mode: NumberScalarMode,
}

impl BuildSchemaOptions {
    pub fn new<'a>(resolvers: impl IntoIterator<Item = &'a Target>) -> Self {
        Self::default().resolvers(resolvers)
    }

    /// Adds resolver containers. Containers already listed are ignored.
    #[must_use]
    pub fn resolvers<'a>(mut self, resolvers: impl IntoIterator<Item = &'a Target>) -> Self {
        for container in resolvers {
            if !self.resolvers.contains(container) {
                self.resolvers.push(container.clone());
            }
        }
        self
    }

    #[must_use]
    pub fn skip_check(mut self, skip_check: bool) -> Self {
        self.skip_check = skip_check;
        self
    }

    #[must_use]
    pub fn date_scalar_mode(mut self, mode: DateScalarMode) -> Self {
        self.date_scalar_mode = mode;
        self
    }

    #[must_use]
    pub fn number_scalar_mode(mut self, mode: NumberScalarMode) -> Self {
        self.number_scalar_mode = mode;
        self
    }
}

/// Resolves and compiles the declarations of `registry` into an executable
/// schema.
///
/// Resolvers registered in containers not listed in `options` are left out.
/// The registry is only read; the returned schema does not change when the
/// registry does.
pub fn build_schema(
    registry: &MetadataRegistry,
    options: &BuildSchemaOptions,
) -> Result<CompiledSchema, BuildError> {
    if options.resolvers.is_empty() {
        return Err(BuildError::MissingResolvers);
    }

    let resolved = TypeResolver::new(registry).resolve()?;

    let mut resolvers = vec![];
    for (i, container) in options.resolvers.iter().enumerate() {
        if options.resolvers[..i].contains(container) {
            continue;
        }
        let declared = registry.resolvers_of(container);
        if declared.is_empty() {
            warn!("resolver container `{container}` declares no queries");
        }
        resolvers.extend(declared.iter().cloned());
    }

    let schema = Compiler::new(options).compile(&resolved, &resolvers)?;
    info!(
        "built schema with {} types and {} queries",
        schema.types().len(),
        schema.query_type().fields.len()
    );
    Ok(schema)
}

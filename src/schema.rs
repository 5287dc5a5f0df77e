// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::execution::{Response, INTROSPECTION_QUERY};
use crate::*;

use core::fmt;

use async_graphql::dynamic;
use serde_json::Value;

/// Argument of an emitted field.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArgument {
    pub name: Rc<str>,
    pub ty: WireType,
    pub default_value: Option<Value>,
    pub description: Option<Rc<str>>,
}

/// Field of an emitted type.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledField {
    pub name: Rc<str>,
    pub ty: WireType,
    pub args: Vec<CompiledArgument>,
    pub description: Option<Rc<str>>,
    pub deprecation_reason: Option<Rc<str>>,
}

/// Object or interface type of a compiled schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledType {
    pub name: Rc<str>,
    pub kind: TypeKind,
    /// Emitted interfaces the type implements.
    pub interfaces: Vec<Rc<str>>,
    pub fields: Vec<CompiledField>,
    pub description: Option<Rc<str>>,
}

impl CompiledType {
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|f| f.name.as_ref() == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_ref()).collect()
    }
}

struct SchemaData {
    types: Vec<CompiledType>,
    query: CompiledType,
    scalars: Vec<Rc<str>>,
    executable: dynamic::Schema,
}

/// An immutable, executable schema.
///
/// The schema owns everything it was compiled from; registering further
/// declarations afterwards does not change it. Cloning is cheap.
#[derive(Clone)]
pub struct CompiledSchema {
    inner: Rc<SchemaData>,
}

impl CompiledSchema {
    pub(crate) fn new(
        types: Vec<CompiledType>,
        query: CompiledType,
        scalars: Vec<Rc<str>>,
        executable: dynamic::Schema,
    ) -> Self {
        Self {
            inner: Rc::new(SchemaData {
                types,
                query,
                scalars,
                executable,
            }),
        }
    }

    /// Emitted object and interface types in registration order. The root
    /// query type is not included; see [`CompiledSchema::query_type`].
    pub fn types(&self) -> &[CompiledType] {
        &self.inner.types
    }

    /// Looks up an emitted type, the root query type included.
    pub fn get_type(&self, name: &str) -> Option<&CompiledType> {
        if self.inner.query.name.as_ref() == name {
            return Some(&self.inner.query);
        }
        self.inner.types.iter().find(|t| t.name.as_ref() == name)
    }

    /// Names of the emitted types followed by the root query type.
    pub fn type_names(&self) -> Vec<&str> {
        self.inner
            .types
            .iter()
            .chain(core::iter::once(&self.inner.query))
            .map(|t| t.name.as_ref())
            .collect()
    }

    pub fn query_type(&self) -> &CompiledType {
        &self.inner.query
    }

    /// Custom scalars the schema declares, e.g. `DateTimeISO`.
    pub fn scalars(&self) -> &[Rc<str>] {
        &self.inner.scalars
    }

    /// Executes a query document without variables.
    pub async fn execute(&self, query: &str) -> Response {
        self.execute_request(query, Value::Null).await
    }

    /// Executes a query document with `variables`, a JSON object or `null`.
    pub async fn execute_request(&self, query: &str, variables: Value) -> Response {
        let request =
            async_graphql::Request::new(query).variables(async_graphql::Variables::from_json(variables));
        Response::from(self.inner.executable.execute(request).await)
    }

    /// Runs the standard introspection query.
    pub async fn introspect(&self) -> Response {
        self.execute(INTROSPECTION_QUERY).await
    }

    /// The schema in GraphQL schema definition language.
    pub fn sdl(&self) -> String {
        self.inner.executable.sdl()
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("types", &self.inner.types)
            .field("query", &self.inner.query)
            .field("scalars", &self.inner.scalars)
            .finish_non_exhaustive()
    }
}

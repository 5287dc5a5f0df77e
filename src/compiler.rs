// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Compilation of resolved declarations into an emitted schema.
//!
//! The compiler maps every declared type reference onto the name of an
//! emitted type, builds the root `Query` type from the selected resolvers and
//! checks the result for consistency before handing it to the executor.

use crate::build::{BuildSchemaOptions, DateScalarMode, NumberScalarMode};
use crate::error::BuildError;
use crate::execution::{self, RuntimeBindings};
use crate::resolver::{ResolvedType, ResolvedTypes};
use crate::schema::{CompiledArgument, CompiledField, CompiledSchema, CompiledType};
use crate::*;

use std::collections::HashSet;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;


/// Name of the root query type.
pub const QUERY_TYPE: &str = "Query";

lazy_static! {
    static ref GRAPHQL_NAME: Regex = Regex::new("^[_A-Za-z][_0-9A-Za-z]*$").expect("name pattern is valid");
}

/// Compiles [`ResolvedTypes`] into a [`CompiledSchema`].
///
/// Compilation does not touch the registry the types were resolved from, and
/// compiling the same input twice yields equal schemas.
pub struct Compiler<'a> {
    options: &'a BuildSchemaOptions,
}

struct Compilation<'c> {
    options: &'c BuildSchemaOptions,
    resolved: &'c ResolvedTypes,
    scalars: Vec<Rc<str>>,
    bindings: RuntimeBindings,
}

impl<'a> Compiler<'a> {
    pub fn new(options: &'a BuildSchemaOptions) -> Self {
        Self { options }
    }

    /// Compiles every emitted type of `resolved` and a root `Query` type made
    /// of `resolvers`.
    pub fn compile(
        &self,
        resolved: &ResolvedTypes,
        resolvers: &[ResolverDeclaration],
    ) -> Result<CompiledSchema, BuildError> {
        let mut compilation = Compilation {
            options: self.options,
            resolved,
            scalars: vec![],
            bindings: RuntimeBindings::default(),
        };

        let mut names: HashSet<Rc<str>> = HashSet::new();
        names.insert(QUERY_TYPE.into());

        let mut types = vec![];
        for ty in resolved.emitted() {
            if !names.insert(ty.declaration.name.clone()) {
                return Err(BuildError::DuplicateTypeName {
                    name: ty.declaration.name.clone(),
                });
            }
            types.push(compilation.compile_type(ty)?);
        }
        let query = compilation.compile_query(resolvers)?;

        if let Some(name) = compilation.scalars.iter().find(|s| names.contains(*s)) {
            return Err(BuildError::DuplicateTypeName { name: name.clone() });
        }

        if !self.options.skip_check {
            validate(&types, &query)?;
        }

        let Compilation {
            scalars, bindings, ..
        } = compilation;
        let executable = execution::build_executable(&types, &query, &scalars, bindings)?;
        Ok(CompiledSchema::new(types, query, scalars, executable))
    }
}

impl Compilation<'_> {
    fn compile_type(&mut self, ty: &ResolvedType) -> Result<CompiledType, BuildError> {
        let name = ty.declaration.name.clone();

        let interfaces = ty
            .interfaces
            .iter()
            .filter_map(|target| self.resolved.get(target))
            .filter(|interface| !interface.is_abstract())
            .map(|interface| interface.declaration.name.clone())
            .collect();

        let mut fields = Vec::with_capacity(ty.fields.len());
        for field in &ty.fields {
            let referenced_by = format!("{name}.{}", field.name);
            fields.push(CompiledField {
                name: field.name.clone(),
                ty: self.wire_type(&field.ty, &referenced_by)?,
                args: self.compile_arguments(&field.args, &referenced_by)?,
                description: field.description.clone(),
                deprecation_reason: field.deprecation_reason.clone(),
            });
            if let (TypeKind::Object, Some(resolver)) = (ty.kind(), &field.resolver) {
                self.bindings
                    .field_resolvers
                    .insert((name.clone(), field.name.clone()), resolver.clone());
            }
        }

        if let (TypeKind::Interface, Some(hook)) = (ty.kind(), &ty.declaration.resolve_type) {
            self.bindings.resolve_type.insert(name.clone(), hook.clone());
        }
        self.bindings
            .names
            .insert(ty.declaration.target.clone(), name.clone());

        debug!("compiled {} `{name}`", ty.kind());
        Ok(CompiledType {
            name,
            kind: ty.kind(),
            interfaces,
            fields,
            description: ty.declaration.description.clone(),
        })
    }

    fn compile_query(
        &mut self,
        resolvers: &[ResolverDeclaration],
    ) -> Result<CompiledType, BuildError> {
        let mut containers: IndexMap<Rc<str>, Rc<str>> = IndexMap::new();
        let mut fields = Vec::with_capacity(resolvers.len());

        for resolver in resolvers {
            if let Some(first) = containers.get(&resolver.name) {
                return Err(BuildError::DuplicateQuery {
                    name: resolver.name.clone(),
                    first: first.clone(),
                    second: resolver.container.name_rc(),
                });
            }
            containers.insert(resolver.name.clone(), resolver.container.name_rc());

            let referenced_by = format!("{QUERY_TYPE}.{}", resolver.name);
            fields.push(CompiledField {
                name: resolver.name.clone(),
                ty: self.wire_type(&resolver.return_type, &referenced_by)?,
                args: self.compile_arguments(&resolver.args, &referenced_by)?,
                description: resolver.description.clone(),
                deprecation_reason: resolver.deprecation_reason.clone(),
            });
            self.bindings
                .queries
                .insert(resolver.name.clone(), resolver.callback.clone());
        }

        if fields.is_empty() {
            return Err(BuildError::MissingRootQuery);
        }
        Ok(CompiledType {
            name: QUERY_TYPE.into(),
            kind: TypeKind::Object,
            interfaces: vec![],
            fields,
            description: None,
        })
    }

    fn compile_arguments(
        &mut self,
        args: &[ArgumentDeclaration],
        referenced_by: &str,
    ) -> Result<Vec<CompiledArgument>, BuildError> {
        args.iter()
            .map(|arg| {
                if !self.options.skip_check && !arg.ty.is_scalar() {
                    return Err(BuildError::InvalidSchema(format!(
                        "argument `{}` of `{referenced_by}` has type `{}`; arguments must be scalars or lists of scalars",
                        arg.name, arg.ty
                    )));
                }
                Ok(CompiledArgument {
                    name: arg.name.clone(),
                    ty: self.wire_type(&arg.ty, referenced_by)?,
                    default_value: arg.default_value.clone(),
                    description: arg.description.clone(),
                })
            })
            .collect()
    }

    fn wire_type(&mut self, ty: &TypeRef, referenced_by: &str) -> Result<WireType, BuildError> {
        Ok(match ty {
            TypeRef::Scalar(scalar) => WireType::Named(self.scalar_name(*scalar)),
            TypeRef::Target(target) => match self.resolved.get(target) {
                Some(resolved) => self.emitted_name(resolved, referenced_by)?,
                None => {
                    return Err(unresolved(
                        target.name_rc(),
                        referenced_by,
                        "no type is declared on it",
                    ))
                }
            },
            TypeRef::Named(name) => match self.resolved.by_name(name) {
                Some(resolved) => self.emitted_name(resolved, referenced_by)?,
                None => {
                    return Err(unresolved(
                        name.clone(),
                        referenced_by,
                        "no type with this name is declared",
                    ))
                }
            },
            TypeRef::List(inner) => WireType::List(Box::new(self.wire_type(inner, referenced_by)?)),
            TypeRef::NonNull(inner) => {
                WireType::NonNull(Box::new(self.wire_type(inner, referenced_by)?))
            }
        })
    }

    fn emitted_name(
        &self,
        resolved: &ResolvedType,
        referenced_by: &str,
    ) -> Result<WireType, BuildError> {
        if resolved.is_abstract() {
            return Err(unresolved(
                resolved.declaration.name.clone(),
                referenced_by,
                "it is abstract and not part of the schema",
            ));
        }
        Ok(WireType::Named(resolved.declaration.name.clone()))
    }

    fn scalar_name(&mut self, scalar: Scalar) -> Rc<str> {
        let name = match scalar {
            Scalar::Number => match self.options.number_scalar_mode {
                NumberScalarMode::Float => "Float",
                NumberScalarMode::Integer => "Int",
            },
            Scalar::Date => {
                let name = match self.options.date_scalar_mode {
                    DateScalarMode::IsoDate => "DateTimeISO",
                    DateScalarMode::Timestamp => "Timestamp",
                };
                if !self.scalars.iter().any(|s| s.as_ref() == name) {
                    self.scalars.push(name.into());
                }
                name
            }
            other => other.declared_name(),
        };
        name.into()
    }
}

fn unresolved(type_name: Rc<str>, referenced_by: &str, reason: &'static str) -> BuildError {
    BuildError::UnresolvedTypeReference {
        type_name,
        referenced_by: referenced_by.into(),
        reason: Some(reason),
    }
}

fn check_name(name: &str, what: &str) -> Result<(), BuildError> {
    if !GRAPHQL_NAME.is_match(name) {
        return Err(BuildError::InvalidSchema(format!(
            "{what} `{name}` is not a valid GraphQL name"
        )));
    }
    if name.starts_with("__") {
        return Err(BuildError::InvalidSchema(format!(
            "{what} `{name}` uses the reserved `__` prefix"
        )));
    }
    Ok(())
}

/// Whether a field of type `actual` may implement an interface field of type
/// `expected`: non-null may narrow nullable, list items are compared
/// recursively, and an object or interface may stand in for an interface it
/// implements.
fn is_subtype(types: &[CompiledType], actual: &WireType, expected: &WireType) -> bool {
    match (actual, expected) {
        (WireType::NonNull(actual), WireType::NonNull(expected)) => is_subtype(types, actual, expected),
        (WireType::NonNull(actual), expected) => is_subtype(types, actual, expected),
        (_, WireType::NonNull(_)) => false,
        (WireType::List(actual), WireType::List(expected)) => is_subtype(types, actual, expected),
        (WireType::Named(actual), WireType::Named(expected)) => {
            actual == expected
                || types
                    .iter()
                    .find(|t| &t.name == actual)
                    .is_some_and(|t| t.interfaces.contains(expected))
        }
        _ => false,
    }
}

/// Checks disabled by [`BuildSchemaOptions::skip_check`].
fn validate(types: &[CompiledType], query: &CompiledType) -> Result<(), BuildError> {
    for ty in types.iter().chain(core::iter::once(query)) {
        check_name(&ty.name, "type name")?;
        if ty.fields.is_empty() {
            return Err(BuildError::InvalidSchema(format!(
                "{} type `{}` must define one or more fields",
                ty.kind, ty.name
            )));
        }
        for field in &ty.fields {
            check_name(&field.name, "field name")?;
            for arg in &field.args {
                check_name(&arg.name, "argument name")?;
            }
        }
    }

    for ty in types {
        for interface_name in &ty.interfaces {
            let Some(interface) = types.iter().find(|t| &t.name == interface_name) else {
                continue;
            };
            for expected in &interface.fields {
                let satisfied = ty
                    .field(&expected.name)
                    .is_some_and(|field| is_subtype(types, &field.ty, &expected.ty));
                if !satisfied {
                    return Err(BuildError::InvalidSchema(format!(
                        "`{}` does not provide field `{}: {}` required by interface `{}`",
                        ty.name, expected.name, expected.ty, interface.name
                    )));
                }
            }
        }
    }
    Ok(())
}

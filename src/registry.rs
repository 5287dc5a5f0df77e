// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::BuildError;
use crate::*;

use std::collections::HashMap;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::debug;
use parking_lot::{Mutex, MutexGuard};


/// Validates that a name is not empty or whitespace-only.
pub fn validate_name(name: &str, kind: &'static str) -> Result<(), BuildError> {
    if name.trim().is_empty() {
        Err(BuildError::InvalidName {
            kind,
            name: name.into(),
        })
    } else {
        Ok(())
    }
}

/// Any declaration accepted by [`MetadataRegistry::register`].
#[derive(Debug, Clone)]
pub enum Declaration {
    Type(TypeDeclaration),
    Field(FieldDeclaration),
    Resolver(ResolverDeclaration),
}

impl From<TypeDeclaration> for Declaration {
    fn from(decl: TypeDeclaration) -> Self {
        Declaration::Type(decl)
    }
}

impl From<FieldDeclaration> for Declaration {
    fn from(decl: FieldDeclaration) -> Self {
        Declaration::Field(decl)
    }
}

impl From<ResolverDeclaration> for Declaration {
    fn from(decl: ResolverDeclaration) -> Self {
        Declaration::Resolver(decl)
    }
}

/// Everything registered against one target.
#[derive(Debug, Clone, Copy)]
pub struct Declarations<'a> {
    pub type_declaration: Option<&'a TypeDeclaration>,
    pub fields: &'a [FieldDeclaration],
    pub interfaces: &'a [Target],
    pub resolvers: &'a [ResolverDeclaration],
}

impl Declarations<'_> {
    pub fn is_empty(&self) -> bool {
        self.type_declaration.is_none()
            && self.fields.is_empty()
            && self.interfaces.is_empty()
            && self.resolvers.is_empty()
    }
}

/// Key of a generic factory instantiation: factory id and derived type name.
pub(crate) type InstantiationKey = (u64, Rc<str>);

/// Arguments an instantiation was created with, and its target.
pub(crate) type Instantiation = (Vec<TypeRef>, Target);

/// Accumulator of type, field and resolver declarations keyed by target.
///
/// Registration order is preserved; it determines the order of emitted types
/// and fields. A registry is cleared with [`MetadataRegistry::clear`] before
/// it is reused for an unrelated build.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    types: IndexMap<Target, TypeDeclaration>,
    fields: IndexMap<Target, Vec<FieldDeclaration>>,
    implementations: IndexMap<Target, Vec<Target>>,
    resolvers: IndexMap<Target, Vec<ResolverDeclaration>>,
    instantiations: HashMap<InstantiationKey, Instantiation>,
}

impl MetadataRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register any declaration. Fields must name their owner.
    pub fn register(&mut self, declaration: impl Into<Declaration>) -> Result<(), BuildError> {
        match declaration.into() {
            Declaration::Type(decl) => self.register_type(decl),
            Declaration::Field(field) => match field.owner.clone() {
                Some(owner) => self.register_field(&owner, field),
                None => Err(BuildError::MissingOwner { field: field.name }),
            },
            Declaration::Resolver(resolver) => self.register_resolver(resolver),
        }
    }

    /// Register a type. Registering an identical descriptor again is a no-op.
    pub fn register_type(&mut self, decl: TypeDeclaration) -> Result<(), BuildError> {
        validate_name(&decl.name, "type")?;

        use indexmap::map::Entry;
        match self.types.entry(decl.target.clone()) {
            Entry::Occupied(e) if e.get().same_descriptor(&decl) => {
                debug!("type `{}` registered again with the same descriptor", decl.name);
                Ok(())
            }
            Entry::Occupied(e) => Err(BuildError::DuplicateRegistration {
                kind: "type",
                name: decl.name,
                target: e.key().name_rc(),
            }),
            Entry::Vacant(e) => {
                debug!(
                    "registered {} `{}`{}",
                    decl.kind,
                    decl.name,
                    if decl.is_abstract { " (abstract)" } else { "" }
                );
                e.insert(decl);
                Ok(())
            }
        }
    }

    /// Register a field on `owner`. The owner type may be registered later.
    pub fn register_field(
        &mut self,
        owner: &Target,
        mut field: FieldDeclaration,
    ) -> Result<(), BuildError> {
        validate_name(&field.name, "field")?;
        field.owner = Some(owner.clone());

        let fields = self.fields.entry(owner.clone()).or_default();
        match fields.iter().find(|f| f.name == field.name) {
            Some(existing) if existing.same_declaration(&field) => Ok(()),
            Some(_) => Err(BuildError::DuplicateRegistration {
                kind: "field",
                name: field.name,
                target: owner.name_rc(),
            }),
            None => {
                debug!("registered field `{}.{}`", owner, field.name);
                fields.push(field);
                Ok(())
            }
        }
    }

    /// Record that the type declared on `target` implements `interface`.
    pub fn register_interface_implementation(
        &mut self,
        target: &Target,
        interface: &Target,
    ) -> Result<(), BuildError> {
        let interfaces = self.implementations.entry(target.clone()).or_default();
        if !interfaces.contains(interface) {
            debug!("registered `{target}` implements `{interface}`");
            interfaces.push(interface.clone());
        }
        Ok(())
    }

    /// Register a root query in its container.
    pub fn register_resolver(&mut self, resolver: ResolverDeclaration) -> Result<(), BuildError> {
        validate_name(&resolver.name, "query")?;

        let resolvers = self.resolvers.entry(resolver.container.clone()).or_default();
        match resolvers.iter().find(|r| r.name == resolver.name) {
            Some(existing) if existing.same_declaration(&resolver) => Ok(()),
            Some(_) => Err(BuildError::DuplicateRegistration {
                kind: "query",
                name: resolver.name,
                target: resolver.container.name_rc(),
            }),
            None => {
                debug!(
                    "registered query `{}` in `{}`",
                    resolver.name, resolver.container
                );
                resolvers.push(resolver);
                Ok(())
            }
        }
    }

    /// All declarations associated with `target`. Empty if there are none.
    pub fn get(&self, target: &Target) -> Declarations<'_> {
        Declarations {
            type_declaration: self.types.get(target),
            fields: self.fields_of(target),
            interfaces: self.interfaces_of(target),
            resolvers: self.resolvers_of(target),
        }
    }

    pub fn type_declaration(&self, target: &Target) -> Option<&TypeDeclaration> {
        self.types.get(target)
    }

    pub fn fields_of(&self, target: &Target) -> &[FieldDeclaration] {
        self.fields.get(target).map(Vec::as_slice).unwrap_or_default()
    }

    /// Interfaces registered through [`Self::register_interface_implementation`].
    pub fn interfaces_of(&self, target: &Target) -> &[Target] {
        self.implementations
            .get(target)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn resolvers_of(&self, container: &Target) -> &[ResolverDeclaration] {
        self.resolvers
            .get(container)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Registered types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDeclaration> + '_ {
        self.types.values()
    }

    /// Every registered resolver, grouped by container.
    pub fn resolvers(&self) -> impl Iterator<Item = &ResolverDeclaration> + '_ {
        self.resolvers.values().flatten()
    }

    /// Targets that carry fields, in registration order.
    pub fn field_owners(&self) -> impl Iterator<Item = &Target> + '_ {
        self.fields.keys()
    }

    /// Targets with registered interface implementations.
    pub fn implementors(&self) -> impl Iterator<Item = &Target> + '_ {
        self.implementations.keys()
    }

    /// Resolver containers in registration order.
    pub fn containers(&self) -> impl Iterator<Item = &Target> + '_ {
        self.resolvers.keys()
    }

    /// Check if a type is declared on `target`.
    pub fn contains(&self, target: &Target) -> bool {
        self.types.contains_key(target)
    }

    /// Get the number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if nothing at all has been registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.fields.is_empty()
            && self.implementations.is_empty()
            && self.resolvers.is_empty()
    }

    /// Discard all declarations and cached generic instantiations.
    pub fn clear(&mut self) {
        self.types.clear();
        self.fields.clear();
        self.implementations.clear();
        self.resolvers.clear();
        self.instantiations.clear();
    }

    pub(crate) fn instantiation(&self, key: &InstantiationKey) -> Option<&Instantiation> {
        self.instantiations.get(key)
    }

    pub(crate) fn record_instantiation(&mut self, key: InstantiationKey, instantiation: Instantiation) {
        self.instantiations.insert(key, instantiation);
    }
}

lazy_static! {
    /// Process-wide registry for callers that register declarations ambiently.
    static ref GLOBAL_REGISTRY: Mutex<MetadataRegistry> = Mutex::new(MetadataRegistry::new());
}

/// Lock the process-wide registry.
///
/// Independent builds should prefer their own [`MetadataRegistry`]; users of the
/// global one must [`MetadataRegistry::clear`] it between builds.
pub fn global() -> MutexGuard<'static, MetadataRegistry> {
    GLOBAL_REGISTRY.lock()
}

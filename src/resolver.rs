// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::BuildError;
use crate::registry::MetadataRegistry;
use crate::*;

use indexmap::IndexMap;
use log::debug;


/// A declared type together with the fields and interfaces it ends up with
/// after inheritance has been applied.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub declaration: TypeDeclaration,
    /// Inherited fields first, own fields last; an own field replaces an
    /// inherited field of the same name in place.
    pub fields: Vec<FieldDeclaration>,
    /// Every implemented interface, transitively, abstract ones included.
    pub interfaces: Vec<Target>,
}

impl ResolvedType {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn kind(&self) -> TypeKind {
        self.declaration.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.declaration.is_abstract
    }

    pub fn field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name.as_ref() == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_ref()).collect()
    }
}

/// Output of [`TypeResolver::resolve`], in registration order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTypes {
    types: IndexMap<Target, ResolvedType>,
}

impl ResolvedTypes {
    pub fn get(&self, target: &Target) -> Option<&ResolvedType> {
        self.types.get(target)
    }

    /// Looks a type up by its GraphQL name, preferring emitted types.
    pub fn by_name(&self, name: &str) -> Option<&ResolvedType> {
        self.emitted()
            .find(|t| t.name() == name)
            .or_else(|| self.iter().find(|t| t.name() == name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedType> + '_ {
        self.types.values()
    }

    /// Types that belong in the compiled schema.
    pub fn emitted(&self) -> impl Iterator<Item = &ResolvedType> + '_ {
        self.types.values().filter(|t| !t.is_abstract())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A field collected from an ancestor together with the name of that ancestor.
struct Inherited {
    origin: Rc<str>,
    field: FieldDeclaration,
}

/// Resolves inheritance for every type of a registry.
///
/// A type's supertype is resolved first and contributes its complete resolved
/// field set, so a walk never continues past a supertype: farther ancestors
/// are already folded into it. Interfaces contribute their resolved fields
/// the same way.
pub struct TypeResolver<'a> {
    registry: &'a MetadataRegistry,
    resolved: IndexMap<Target, ResolvedType>,
    visiting: Vec<Target>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registry: &'a MetadataRegistry) -> Self {
        Self {
            registry,
            resolved: IndexMap::new(),
            visiting: vec![],
        }
    }

    pub fn resolve(mut self) -> Result<ResolvedTypes, BuildError> {
        let registry = self.registry;
        check_owners(registry)?;
        for decl in registry.types() {
            self.resolve_target(&decl.target, &decl.name)?;
        }

        // Restore registration order; resolution inserted supertypes first.
        let mut types = IndexMap::with_capacity(self.resolved.len());
        for decl in registry.types() {
            if let Some(resolved) = self.resolved.swap_remove(&decl.target) {
                types.insert(decl.target.clone(), resolved);
            }
        }
        Ok(ResolvedTypes { types })
    }

    fn resolve_target(&mut self, target: &Target, referenced_by: &str) -> Result<(), BuildError> {
        if self.resolved.contains_key(target) {
            return Ok(());
        }

        let registry = self.registry;
        let decl = registry.type_declaration(target).ok_or_else(|| {
            BuildError::UnresolvedTypeReference {
                type_name: target.name_rc(),
                referenced_by: referenced_by.into(),
                reason: Some("no type is declared on it"),
            }
        })?;

        if self.visiting.contains(target) {
            return Err(BuildError::InheritanceCycle {
                type_name: decl.name.clone(),
            });
        }
        self.visiting.push(target.clone());

        let mut fields: IndexMap<Rc<str>, Inherited> = IndexMap::new();
        let mut interfaces: Vec<Target> = vec![];

        if let Some(supertype) = &decl.extends {
            self.resolve_target(supertype, &decl.name)?;
            let parent = &self.resolved[supertype];
            for field in &parent.fields {
                fields.insert(
                    field.name.clone(),
                    Inherited {
                        origin: parent.declaration.name.clone(),
                        field: field.clone(),
                    },
                );
            }
            if decl.kind == TypeKind::Interface && parent.kind() == TypeKind::Interface {
                push_unique(&mut interfaces, core::slice::from_ref(supertype));
            }
            push_unique(&mut interfaces, &parent.interfaces);
        }

        let mut declared = decl.implements.clone();
        push_unique(&mut declared, registry.interfaces_of(target));
        for interface in &declared {
            self.resolve_target(interface, &decl.name)?;
            let resolved = &self.resolved[interface];
            if resolved.kind() != TypeKind::Interface {
                return Err(BuildError::UnresolvedTypeReference {
                    type_name: resolved.declaration.name.clone(),
                    referenced_by: decl.name.clone(),
                    reason: Some("it is not an interface"),
                });
            }
            push_unique(&mut interfaces, core::slice::from_ref(interface));
            push_unique(&mut interfaces, &resolved.interfaces);
            for field in &resolved.fields {
                merge_inherited(&mut fields, &decl.name, &resolved.declaration.name, field)?;
            }
        }

        for field in registry.fields_of(target) {
            // Replacing keeps the inherited field's position.
            fields.insert(
                field.name.clone(),
                Inherited {
                    origin: decl.name.clone(),
                    field: field.clone(),
                },
            );
        }

        self.visiting.pop();
        let resolved = ResolvedType {
            declaration: decl.clone(),
            fields: fields.into_values().map(|i| i.field).collect(),
            interfaces,
        };
        debug!(
            "resolved {} `{}`: fields {:?}",
            resolved.kind(),
            resolved.name(),
            resolved.field_names()
        );
        self.resolved.insert(target.clone(), resolved);
        Ok(())
    }
}

/// Fields and interface implementations need a type on their target.
fn check_owners(registry: &MetadataRegistry) -> Result<(), BuildError> {
    for owner in registry.field_owners() {
        if let (false, Some(field)) = (registry.contains(owner), registry.fields_of(owner).first()) {
            return Err(BuildError::UnresolvedTypeReference {
                type_name: owner.name_rc(),
                referenced_by: format!("{owner}.{}", field.name).into(),
                reason: Some("no type is declared on it"),
            });
        }
    }
    for implementor in registry.implementors() {
        if let (false, Some(interface)) = (
            registry.contains(implementor),
            registry.interfaces_of(implementor).first(),
        ) {
            return Err(BuildError::UnresolvedTypeReference {
                type_name: implementor.name_rc(),
                referenced_by: interface.name_rc(),
                reason: Some("no type is declared on it"),
            });
        }
    }
    Ok(())
}

fn push_unique(into: &mut Vec<Target>, from: &[Target]) {
    for target in from {
        if !into.contains(target) {
            into.push(target.clone());
        }
    }
}

/// Adds a field reached through another ancestor. Identical types merge; a
/// nullable and a non-null version of the same type merge to the non-null one.
fn merge_inherited(
    fields: &mut IndexMap<Rc<str>, Inherited>,
    type_name: &Rc<str>,
    origin: &Rc<str>,
    field: &FieldDeclaration,
) -> Result<(), BuildError> {
    let Some(existing) = fields.get_mut(&field.name) else {
        fields.insert(
            field.name.clone(),
            Inherited {
                origin: origin.clone(),
                field: field.clone(),
            },
        );
        return Ok(());
    };

    if existing.field.ty == field.ty {
        return Ok(());
    }
    match (&existing.field.ty, &field.ty) {
        (TypeRef::NonNull(inner), other) if inner.as_ref() == other => Ok(()),
        (other, TypeRef::NonNull(inner)) if inner.as_ref() == other => {
            existing.origin = origin.clone();
            existing.field = field.clone();
            Ok(())
        }
        _ => Err(BuildError::AmbiguousInheritance {
            type_name: type_name.clone(),
            field: field.name.clone(),
            first: existing.origin.clone(),
            second: origin.clone(),
        }),
    }
}

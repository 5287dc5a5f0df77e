// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use gqlmeta::*;

use anyhow::{bail, Result};
use futures::executor::block_on;
use serde_json::{json, Value};

struct Pets {
    registry: MetadataRegistry,
    pet: Target,
    dog: Target,
    cat: Target,
    queries: Target,
}

fn pets(pet: TypeDeclaration) -> Result<Pets> {
    let mut registry = MetadataRegistry::new();
    let pet_target = pet.target.clone();
    registry.register_type(pet)?;
    registry.register_field(
        &pet_target,
        FieldDeclaration::new("name", TypeRef::named("String").required()),
    )?;

    let dog = Target::new("Dog");
    registry.register_type(TypeDeclaration::object(&dog).implements(&pet_target))?;
    registry.register_field(
        &dog,
        FieldDeclaration::new("canBark", TypeRef::named("Boolean").required()),
    )?;

    let cat = Target::new("Cat");
    registry.register_type(TypeDeclaration::object(&cat).implements(&pet_target))?;
    registry.register_field(&cat, FieldDeclaration::new("lives", TypeRef::named("Int")))?;

    Ok(Pets {
        registry,
        pet: pet_target,
        dog,
        cat,
        queries: Target::new("PetQueries"),
    })
}

impl Pets {
    fn serve(&mut self, name: &str, ty: TypeRef, data: Value) -> Result<CompiledSchema> {
        self.registry
            .register_resolver(ResolverDeclaration::constant(&self.queries, name, ty, data))?;
        Ok(build_schema(
            &self.registry,
            &BuildSchemaOptions::new([&self.queries]),
        )?)
    }
}

const PETS_QUERY: &str =
    "{ pets { __typename name ... on Dog { canBark } ... on Cat { lives } } }";

#[test]
fn interface_values_dispatch_on_typename() -> Result<()> {
    let mut pets = pets(TypeDeclaration::interface(&Target::new("Pet")))?;
    let list = TypeRef::list(TypeRef::target(&pets.pet).required()).required();
    let schema = pets.serve(
        "pets",
        list,
        json!([
            { "__typename": "Dog", "name": "Rex", "canBark": true },
            { "__typename": "Cat", "name": "Tom", "lives": 9 }
        ]),
    )?;

    let response = block_on(schema.execute(PETS_QUERY));
    assert!(response.is_ok(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({ "pets": [
            { "__typename": "Dog", "name": "Rex", "canBark": true },
            { "__typename": "Cat", "name": "Tom", "lives": 9 }
        ] })
    );
    Ok(())
}

#[test]
fn interface_values_dispatch_on_hook() -> Result<()> {
    let pet = Target::new("Pet");
    let targets = std::sync::Arc::new(std::sync::OnceLock::<(Target, Target)>::new());
    let slot = targets.clone();
    let mut pets = pets(TypeDeclaration::interface(&pet).resolve_type(move |value| {
        let (dog, cat) = slot.get()?;
        Some(if value.get("canBark").is_some() {
            dog.clone()
        } else {
            cat.clone()
        })
    }))?;
    let _ = targets.set((pets.dog.clone(), pets.cat.clone()));

    let list = TypeRef::list(TypeRef::target(&pets.pet).required()).required();
    let schema = pets.serve(
        "pets",
        list,
        json!([{ "name": "Rex", "canBark": false }, { "name": "Tom", "lives": 3 }]),
    )?;

    let response = block_on(schema.execute(PETS_QUERY));
    assert_eq!(
        response.data,
        json!({ "pets": [
            { "__typename": "Dog", "name": "Rex", "canBark": false },
            { "__typename": "Cat", "name": "Tom", "lives": 3 }
        ] })
    );
    Ok(())
}

#[test]
fn undecidable_interface_value_is_a_field_error() -> Result<()> {
    let mut pets = pets(TypeDeclaration::interface(&Target::new("Pet")))?;
    let ty = TypeRef::target(&pets.pet);
    pets.registry.register_resolver(ResolverDeclaration::constant(
        &pets.queries,
        "greeting",
        TypeRef::named("String"),
        json!("hi"),
    ))?;
    let schema = pets.serve("pet", ty, json!({ "name": "Nemo" }))?;

    let response = block_on(schema.execute("{ greeting pet { name } }"));
    assert_eq!(response.data, json!({ "greeting": "hi", "pet": null }));
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0]
        .message
        .contains("cannot determine the concrete type"));
    assert_eq!(response.errors[0].path, [json!("pet")]);
    Ok(())
}

#[test]
fn field_resolvers_receive_parent_and_arguments() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let user = Target::new("User");
    registry.register_type(TypeDeclaration::object(&user))?;
    registry.register_field(&user, FieldDeclaration::new("name", TypeRef::named("String")))?;
    registry.register_field(
        &user,
        FieldDeclaration::new("greeting", TypeRef::named("String").required())
            .argument(
                ArgumentDeclaration::new("prefix", TypeRef::named("String"))
                    .default_value(json!("Hello")),
            )
            .resolver(|args| async move {
                let prefix: String = args.arg("prefix")?;
                let name = args
                    .parent()
                    .and_then(|parent| parent.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("stranger");
                Ok(json!(format!("{prefix}, {name}")))
            }),
    )?;

    let queries = Target::new("Queries");
    registry.register_resolver(
        ResolverDeclaration::new(
            &queries,
            "user",
            TypeRef::target(&user),
            |args| async move {
                let name: Option<String> = args.arg("name")?;
                Ok(json!({ "name": name }))
            },
        )
        .argument(ArgumentDeclaration::new("name", TypeRef::named("String"))),
    )?;

    let schema = build_schema(&registry, &BuildSchemaOptions::new([&queries]))?;

    let response = block_on(schema.execute(r#"{ user(name: "Ada") { greeting } }"#));
    assert_eq!(response.data, json!({ "user": { "greeting": "Hello, Ada" } }));

    let response = block_on(schema.execute(r#"{ user { greeting(prefix: "Hi") } }"#));
    assert_eq!(response.data, json!({ "user": { "greeting": "Hi, stranger" } }));
    Ok(())
}

#[test]
fn resolver_failures_are_reported_per_field() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let queries = Target::new("Queries");
    registry.register_resolver(ResolverDeclaration::new(
        &queries,
        "broken",
        TypeRef::named("String"),
        |_| async { Err(anyhow::anyhow!("backend unavailable")) },
    ))?;
    registry.register_resolver(ResolverDeclaration::constant(
        &queries,
        "fine",
        TypeRef::named("String"),
        json!("ok"),
    ))?;
    let schema = build_schema(&registry, &BuildSchemaOptions::new([&queries]))?;

    let response = block_on(schema.execute("{ broken fine }"));
    assert_eq!(response.data, json!({ "broken": null, "fine": "ok" }));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "backend unavailable");
    assert_eq!(response.errors[0].path, [json!("broken")]);

    let serialized = serde_json::to_value(&response)?;
    assert_eq!(serialized["errors"][0]["path"], json!(["broken"]));
    Ok(())
}

#[test]
fn variables_are_passed_to_resolvers() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let queries = Target::new("Math");
    registry.register_resolver(
        ResolverDeclaration::new(&queries, "double", TypeRef::named("Int").required(), |args| async move {
            let n: i64 = args.arg("n")?;
            Ok(json!(n * 2))
        })
        .argument(ArgumentDeclaration::new("n", TypeRef::named("Int").required())),
    )?;
    let schema = build_schema(&registry, &BuildSchemaOptions::new([&queries]))?;

    let response = block_on(schema.execute_request(
        "query Double($n: Int!) { double(n: $n) }",
        json!({ "n": 21 }),
    ));
    assert_eq!(response.data, json!({ "double": 42 }));

    let serialized = serde_json::to_value(&response)?;
    assert!(serialized.get("errors").is_none());
    Ok(())
}

#[test]
fn introspection_lists_emitted_types() -> Result<()> {
    let mut registry = MetadataRegistry::new();
    let base = Target::new("BaseType");
    let sample = Target::new("SampleType");
    registry.register_type(TypeDeclaration::object(&base).abstract_type(true))?;
    registry.register_field(&base, FieldDeclaration::new("baseField", TypeRef::named("String")))?;
    registry.register_type(
        TypeDeclaration::object(&sample)
            .extends(&base)
            .description("A sample"),
    )?;
    registry.register_field(
        &sample,
        FieldDeclaration::new("old", TypeRef::named("String")).deprecated("gone"),
    )?;
    let queries = Target::new("Queries");
    registry.register_resolver(ResolverDeclaration::constant(
        &queries,
        "sample",
        TypeRef::target(&sample),
        json!({}),
    ))?;
    let schema = build_schema(&registry, &BuildSchemaOptions::new([&queries]))?;

    let response = block_on(schema.introspect());
    assert!(response.is_ok(), "{:?}", response.errors);
    let introspected = &response.data["__schema"];
    assert_eq!(introspected["queryType"]["name"], json!("Query"));

    let Some(types) = introspected["types"].as_array() else {
        bail!("introspection returned no types");
    };
    let names: Vec<&str> = types.iter().filter_map(|t| t["name"].as_str()).collect();
    assert!(names.contains(&"SampleType"));
    assert!(!names.contains(&"BaseType"));

    let Some(sample) = types.iter().find(|t| t["name"] == json!("SampleType")) else {
        bail!("SampleType is missing");
    };
    assert_eq!(sample["kind"], json!("OBJECT"));
    assert_eq!(sample["description"], json!("A sample"));
    assert_eq!(sample["fields"][1]["deprecationReason"], json!("gone"));
    Ok(())
}

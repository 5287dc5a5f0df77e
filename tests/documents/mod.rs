// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use gqlmeta::*;

use anyhow::{bail, Result};
use futures::executor::block_on;
use serde::Deserialize;
use serde_json::Value;
use test_generator::test_resources;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct WantType {
    name: String,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    interfaces: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    document: SchemaDocument,
    want_types: Option<Vec<WantType>>,
    query: Option<String>,
    variables: Option<Value>,
    want_result: Option<Value>,
    want_error: Option<String>,
    skip: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn check_types(schema: &CompiledSchema, want: &[WantType]) -> Result<()> {
    let names: Vec<&str> = schema.types().iter().map(|t| t.name.as_ref()).collect();
    let want_names: Vec<&str> = want.iter().map(|t| t.name.as_str()).collect();
    if names != want_names {
        bail!("emitted types {names:?}, want {want_names:?}");
    }

    for want in want {
        let Some(actual) = schema.get_type(&want.name) else {
            bail!("type `{}` is missing", want.name);
        };
        if actual.field_names() != want.fields {
            bail!(
                "type `{}` has fields {:?}, want {:?}",
                want.name,
                actual.field_names(),
                want.fields
            );
        }
        let interfaces: Vec<&str> = actual.interfaces.iter().map(|i| i.as_ref()).collect();
        if interfaces != want.interfaces {
            bail!(
                "type `{}` implements {interfaces:?}, want {:?}",
                want.name,
                want.interfaces
            );
        }
    }
    Ok(())
}

fn run_case(case: &TestCase) -> Result<()> {
    let schema = match (case.document.build(), &case.want_error) {
        (Ok(schema), _) => schema,
        (Err(actual), Some(expected)) if case.query.is_none() => {
            if !actual.to_string().contains(expected) {
                bail!("`{actual}` does not contain `{expected}`");
            }
            return Ok(());
        }
        (Err(actual), _) => bail!("build failed unexpectedly: {actual}"),
    };

    if let Some(want) = &case.want_types {
        check_types(&schema, want)?;
    }

    let Some(query) = &case.query else {
        if case.want_error.is_some() {
            bail!("build succeeded but an error was expected");
        }
        return Ok(());
    };

    let variables = case.variables.clone().unwrap_or(Value::Null);
    let response = block_on(schema.execute_request(query, variables));

    if let Some(expected) = &case.want_result {
        if &response.data != expected {
            bail!("result {} does not match {expected}", response.data);
        }
    }
    match (&case.want_error, response.errors.as_slice()) {
        (None, []) => {}
        (None, errors) => bail!("query raised {errors:?} unexpectedly"),
        (Some(expected), errors) => {
            if !errors.iter().any(|e| e.message.contains(expected)) {
                bail!("no error in {errors:?} contains `{expected}`");
            }
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    std::eprintln!("running {file}");

    for case in &test.cases {
        std::eprint!("case {} ", case.note);
        if case.skip == Some(true) {
            std::eprintln!("skipped");
            continue;
        }
        run_case(case).map_err(|e| e.context(format!("case `{}`", case.note)))?;
        std::eprintln!("passed");
    }
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{e:#}");
        }
    }
}

#[test_resources("tests/documents/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
#[ignore = "intended for inspecting a single schema document"]
fn one_file() -> Result<()> {
    env_logger::init();

    for a in std::env::args() {
        let text = if a.ends_with(".json") || a.ends_with(".yaml") {
            std::fs::read_to_string(&a)?
        } else {
            continue;
        };
        let document = if a.ends_with(".json") {
            SchemaDocument::from_json_str(&text)?
        } else {
            SchemaDocument::from_yaml_str(&text)?
        };
        std::println!("{}", document.build()?.sdl());
    }
    Ok(())
}

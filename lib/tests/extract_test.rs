use oxigraph::model::Term;
use rdf_lens::extract::{extract_shapes_with, ApplyFn};
use rdf_lens::lens::Lens;
use rdf_lens::test_utils::{container, named, quads_from_turtle};
use rdf_lens::{extract_shapes, Container, Extractor, LensErrorKind, Value};
use serde_json::json;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

const PREFIXES: &str = "@prefix sh: <http://www.w3.org/ns/shacl#> .\n\
                        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n\
                        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
                        @prefix rdfl: <https://w3id.org/rdf-lens/ontology#> .\n\
                        @prefix ex: <http://example.com/> .\n";

// Surfaces the engine's log output under RUST_LOG; repeat calls are fine.
fn setup() {
    let _ = env_logger::try_init();
}

fn ex(local: &str) -> Term {
    Term::from(named(&format!("http://example.com/{}", local)))
}

fn point_shape() -> String {
    format!(
        "{PREFIXES}\
         ex:PointShape a sh:NodeShape ;\n\
           sh:targetClass ex:Point ;\n\
           sh:description \"A 2D point\" ;\n\
           sh:property [ sh:path ex:x ; sh:name \"x\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] ;\n\
           sh:property [ sh:path ex:y ; sh:name \"y\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] .\n"
    )
}

#[test]
fn extracts_a_point() {
    setup();
    let shapes = extract_shapes(&quads_from_turtle(&point_shape())).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:a ex:x 5 ; ex:y 8 ."));
    let lens = shapes.lens(&ex("Point")).unwrap();
    let value = lens.execute(&container(named("http://example.com/a"), &data)).unwrap();
    assert_eq!(value.to_json(), json!({"x": 5, "y": 8}));
}

#[test]
fn extraction_is_deterministic() {
    setup();
    let shapes = extract_shapes(&quads_from_turtle(&point_shape())).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:a ex:x 5 ; ex:y 8 ."));
    let lens = shapes.lens(&ex("Point")).unwrap();
    let focus = container(named("http://example.com/a"), &data);
    let first = lens.execute(&focus).unwrap();
    let second = lens.execute(&focus).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json(), second.to_json());
}

#[test]
fn missing_required_field_fails_with_its_name_in_the_lineage() {
    setup();
    let shapes = extract_shapes(&quads_from_turtle(&point_shape())).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:a ex:x 5 ."));
    let lens = shapes.lens(&ex("Point")).unwrap();
    let err = lens
        .execute(&container(named("http://example.com/a"), &data))
        .unwrap_err();
    assert_eq!(err.kind, LensErrorKind::MissingRequired);
    assert!(err.lineage.iter().any(|step| step.name == "y"));
    assert!(err.to_string().contains("y"));
}

#[test]
fn two_values_for_a_scalar_field_fail() {
    setup();
    let shapes = extract_shapes(&quads_from_turtle(&point_shape())).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:a ex:x 5 ; ex:x 6 ; ex:y 8 ."));
    let lens = shapes.lens(&ex("Point")).unwrap();
    let err = lens
        .execute(&container(named("http://example.com/a"), &data))
        .unwrap_err();
    assert_eq!(err.kind, LensErrorKind::Cardinality);
}

#[test]
fn alternative_and_sequence_paths_combine() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Shape a sh:NodeShape ;\n\
           sh:targetClass ex:Thing ;\n\
           sh:property [\n\
             sh:path [ sh:alternativePath (ex:a (ex:b ex:c)) ] ;\n\
             sh:name \"vals\" ;\n\
             sh:datatype xsd:integer\n\
           ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:t ex:b [ ex:c 42 ] ; ex:a 43 ."));
    let lens = shapes.lens(&ex("Thing")).unwrap();
    let value = lens.execute(&container(named("http://example.com/t"), &data)).unwrap();
    // Branches run in list order, so the ex:a value comes first.
    assert_eq!(value.to_json(), json!({"vals": [43, 42]}));
}

#[test]
fn inverse_path_reaches_the_subject() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Shape a sh:NodeShape ;\n\
           sh:targetClass ex:Thing ;\n\
           sh:property [\n\
             sh:path [ sh:inversePath ex:x ] ;\n\
             sh:name \"origin\" ;\n\
             sh:minCount 1 ; sh:maxCount 1 ;\n\
             sh:datatype xsd:anyURI\n\
           ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:x ex:x ex:abc ."));
    let lens = shapes.lens(&ex("Thing")).unwrap();
    let value = lens
        .execute(&container(named("http://example.com/abc"), &data))
        .unwrap();
    assert_eq!(value.to_json(), json!({"origin": "http://example.com/x"}));
}

#[test]
fn rdf_list_values_fill_a_sequence_field() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Shape a sh:NodeShape ;\n\
           sh:targetClass ex:Thing ;\n\
           sh:property [ sh:path ex:string ; sh:name \"strings\" ; sh:datatype xsd:string ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let lens = shapes.lens(&ex("Thing")).unwrap();

    let listed = quads_from_turtle(&format!("{PREFIXES}ex:p ex:string (\"1\" \"2\" \"3\") ."));
    let value = lens
        .execute(&container(named("http://example.com/p"), &listed))
        .unwrap();
    assert_eq!(value.to_json(), json!({"strings": ["1", "2", "3"]}));

    // The same field accepts a repeated predicate.
    let repeated = quads_from_turtle(&format!(
        "{PREFIXES}ex:p ex:string \"1\" . ex:p ex:string \"2\" ."
    ));
    let value = lens
        .execute(&container(named("http://example.com/p"), &repeated))
        .unwrap();
    assert_eq!(value.to_json(), json!({"strings": ["1", "2"]}));

    // And yields an empty list on no matches at all.
    let nothing = quads_from_turtle(&format!("{PREFIXES}ex:p ex:other \"1\" ."));
    let value = lens
        .execute(&container(named("http://example.com/p"), &nothing))
        .unwrap();
    assert_eq!(value.to_json(), json!({"strings": []}));
}

fn typed_extract_shapes() -> String {
    format!(
        "{PREFIXES}\
         ex:HolderShape a sh:NodeShape ;\n\
           sh:targetClass ex:Holder ;\n\
           sh:property [ sh:path ex:dataPoint ; sh:name \"dataPoint\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:class rdfl:TypedExtract ] .\n\
         ex:DirectShape a sh:NodeShape ;\n\
           sh:targetClass ex:Direct ;\n\
           sh:property [ sh:path ex:dataPoint ; sh:name \"directPoint\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:class ex:Point ] .\n\
         ex:PointShape a sh:NodeShape ;\n\
           sh:targetClass ex:Point ;\n\
           sh:property [ sh:path ex:x ; sh:name \"x\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] ;\n\
           sh:property [ sh:path ex:y ; sh:name \"y\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] .\n\
         ex:3DPointShape a sh:NodeShape ;\n\
           sh:targetClass ex:3DPoint ;\n\
           sh:property [ sh:path ex:z ; sh:name \"z\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] .\n\
         ex:3DPoint rdfs:subClassOf ex:Point .\n"
    )
}

#[test]
fn typed_extract_unions_subclass_and_parent_fields() {
    setup();
    let extractor = Extractor::from_quads(&quads_from_turtle(&typed_extract_shapes())).unwrap();
    let data = quads_from_turtle(&format!(
        "{PREFIXES}ex:root ex:dataPoint ex:p . ex:p a ex:3DPoint ; ex:x 1 ; ex:y 2 ; ex:z 3 ."
    ));
    let value = extractor
        .extract(&ex("Holder"), named("http://example.com/root"), &data)
        .unwrap();
    assert_eq!(value.to_json(), json!({"dataPoint": {"x": 1, "y": 2, "z": 3}}));
}

#[test]
fn typed_extract_uses_only_the_declared_type() {
    setup();
    let extractor = Extractor::from_quads(&quads_from_turtle(&typed_extract_shapes())).unwrap();
    let data = quads_from_turtle(&format!(
        "{PREFIXES}ex:root ex:dataPoint ex:p . ex:p a ex:Point ; ex:x 1 ; ex:y 2 ; ex:z 3 ."
    ));
    let value = extractor
        .extract(&ex("Holder"), named("http://example.com/root"), &data)
        .unwrap();
    assert_eq!(value.to_json(), json!({"dataPoint": {"x": 1, "y": 2}}));
}

#[test]
fn typed_extract_without_a_type_fails_but_direct_class_succeeds() {
    setup();
    let extractor = Extractor::from_quads(&quads_from_turtle(&typed_extract_shapes())).unwrap();
    let data = quads_from_turtle(&format!(
        "{PREFIXES}ex:root ex:dataPoint ex:p . ex:p ex:x 1 ; ex:y 2 ."
    ));

    let err = extractor
        .extract(&ex("Holder"), named("http://example.com/root"), &data)
        .unwrap_err();
    assert_eq!(err.kind, LensErrorKind::NoType);

    let value = extractor
        .extract(&ex("Direct"), named("http://example.com/root"), &data)
        .unwrap();
    assert_eq!(value.to_json(), json!({"directPoint": {"x": 1, "y": 2}}));
}

#[test]
fn cyclic_shape_references_share_one_record() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:NodeShapeDef a sh:NodeShape ;\n\
           sh:targetClass ex:Node ;\n\
           sh:property [ sh:path ex:label ; sh:name \"label\" ; sh:maxCount 1 ; sh:datatype xsd:string ] ;\n\
           sh:property [ sh:path ex:next ; sh:name \"next\" ; sh:maxCount 1 ; sh:class ex:Node ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let data = quads_from_turtle(&format!(
        "{PREFIXES}ex:a ex:label \"a\" ; ex:next ex:b . ex:b ex:label \"b\" ; ex:next ex:a ."
    ));
    let lens = shapes.lens(&ex("Node")).unwrap();
    let value = lens.execute(&container(named("http://example.com/a"), &data)).unwrap();

    // Two hops land back on the shared record for ex:a; two more hops land
    // on the very same object again.
    let back_on_a = value.get("next").unwrap().get("next").unwrap();
    let around_again = back_on_a.get("next").unwrap().get("next").unwrap();
    match (&back_on_a, &around_again) {
        (Value::Record(first), Value::Record(second)) => assert!(Rc::ptr_eq(first, second)),
        _ => panic!("expected records"),
    }
    assert_eq!(back_on_a.get("label"), Some(Value::String("a".to_string())));
}

#[test]
fn duplicate_targets_fall_through_to_the_second_shape() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:First a sh:NodeShape ;\n\
           sh:targetClass ex:Thing ;\n\
           sh:property [ sh:path ex:a ; sh:name \"a\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] .\n\
         ex:Second a sh:NodeShape ;\n\
           sh:targetClass ex:Thing ;\n\
           sh:property [ sh:path ex:b ; sh:name \"b\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let lens = shapes.lens(&ex("Thing")).unwrap();

    let only_b = quads_from_turtle(&format!("{PREFIXES}ex:t ex:b 2 ."));
    let value = lens.execute(&container(named("http://example.com/t"), &only_b)).unwrap();
    assert_eq!(value.to_json(), json!({"b": 2}));

    let only_a = quads_from_turtle(&format!("{PREFIXES}ex:t ex:a 1 ."));
    let value = lens.execute(&container(named("http://example.com/t"), &only_a)).unwrap();
    assert_eq!(value.to_json(), json!({"a": 1}));
}

#[test]
fn implicit_target_class_applies_to_class_typed_shapes() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Sensor a sh:NodeShape, rdfs:Class ;\n\
           sh:property [ sh:path ex:unit ; sh:name \"unit\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:string ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:s ex:unit \"celsius\" ."));
    let lens = shapes.lens(&ex("Sensor")).unwrap();
    let value = lens.execute(&container(named("http://example.com/s"), &data)).unwrap();
    assert_eq!(value.to_json(), json!({"unit": "celsius"}));
}

#[test]
fn unknown_class_reference_fails_at_execute_time() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Shape a sh:NodeShape ;\n\
           sh:targetClass ex:Thing ;\n\
           sh:property [ sh:path ex:p ; sh:name \"p\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:class ex:Missing ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:t ex:p ex:u ."));
    let lens = shapes.lens(&ex("Thing")).unwrap();
    let err = lens
        .execute(&container(named("http://example.com/t"), &data))
        .unwrap_err();
    assert_eq!(err.kind, LensErrorKind::UnknownClass);
}

#[test]
fn path_lens_builtin_yields_an_executable_lens() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Shape a sh:NodeShape ;\n\
           sh:targetClass ex:Config ;\n\
           sh:property [ sh:path ex:select ; sh:name \"select\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:class rdfl:PathLens ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let data = quads_from_turtle(&format!(
        "{PREFIXES}ex:cfg ex:select ex:name . ex:alice ex:name \"Alice\" ."
    ));
    let lens = shapes.lens(&ex("Config")).unwrap();
    let value = lens
        .execute(&container(named("http://example.com/cfg"), &data))
        .unwrap();

    let extracted = match value.get("select") {
        Some(Value::Lens(path)) => path,
        other => panic!("expected a lens value, got {:?}", other),
    };
    let out = extracted
        .execute(&container(named("http://example.com/alice"), &data))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id.to_string(), "\"Alice\"");
}

#[test]
fn cbd_and_context_builtins_return_quads() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Shape a sh:NodeShape ;\n\
           sh:targetClass ex:Holder ;\n\
           sh:property [ sh:path ex:blob ; sh:name \"blob\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:class rdfl:CBD ] ;\n\
           sh:property [ sh:path ex:blob ; sh:name \"everything\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:class rdfl:Context ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let data = quads_from_turtle(&format!(
        "{PREFIXES}ex:h ex:blob ex:d . ex:d ex:p [ ex:q \"nested\" ] . ex:other ex:r ex:s ."
    ));
    let lens = shapes.lens(&ex("Holder")).unwrap();
    let value = lens.execute(&container(named("http://example.com/h"), &data)).unwrap();

    match value.get("blob") {
        Some(Value::Quads(quads)) => assert_eq!(quads.len(), 2),
        other => panic!("expected quads, got {:?}", other),
    }
    match value.get("everything") {
        Some(Value::Quads(quads)) => assert_eq!(quads.len(), 4),
        other => panic!("expected quads, got {:?}", other),
    }
}

#[test]
fn apply_post_processors_run_after_dispatch() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:PointShape a sh:NodeShape ;\n\
           sh:targetClass ex:Point ;\n\
           sh:property [ sh:path ex:x ; sh:name \"x\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] .\n\
         ex:HolderShape a sh:NodeShape ;\n\
           sh:targetClass ex:Holder ;\n\
           sh:property [ sh:path ex:dataPoint ; sh:name \"dataPoint\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:class rdfl:TypedExtract ] .\n"
    );
    let stamp: ApplyFn = Arc::new(|value: Value| {
        let mut tagged = value;
        tagged.merge_from(&Value::record_of("tagged", Value::Bool(true)));
        Ok(tagged)
    });
    let mut apply = HashMap::new();
    apply.insert(ex("Point"), stamp);

    let shapes =
        extract_shapes_with(&quads_from_turtle(&shapes_ttl), apply, HashMap::new()).unwrap();
    let data = quads_from_turtle(&format!(
        "{PREFIXES}ex:root ex:dataPoint ex:p . ex:p a ex:Point ; ex:x 7 ."
    ));
    let lens = shapes.lens(&ex("Holder")).unwrap();
    let value = lens
        .execute(&container(named("http://example.com/root"), &data))
        .unwrap();
    assert_eq!(
        value.to_json(),
        json!({"dataPoint": {"x": 7, "tagged": true}})
    );
}

#[test]
fn custom_class_lenses_join_the_cache() {
    setup();
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Shape a sh:NodeShape ;\n\
           sh:targetClass ex:Thing ;\n\
           sh:property [ sh:path ex:p ; sh:name \"label\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:class ex:Custom ] .\n"
    );
    let custom: Lens<Container, Value> =
        Lens::new(|c: &Container, _| Ok(Value::String(format!("custom:{}", c.id))));
    let mut classes = HashMap::new();
    classes.insert(ex("Custom"), custom);

    let shapes =
        extract_shapes_with(&quads_from_turtle(&shapes_ttl), HashMap::new(), classes).unwrap();
    let data = quads_from_turtle(&format!("{PREFIXES}ex:t ex:p ex:u ."));
    let lens = shapes.lens(&ex("Thing")).unwrap();
    let value = lens
        .execute(&container(named("http://example.com/t"), &data))
        .unwrap();
    assert_eq!(
        value.to_json(),
        json!({"label": "custom:<http://example.com/u>"})
    );
}

#[test]
fn env_variables_resolve_inside_datatype_fields() {
    setup();
    std::env::set_var("RDF_LENS_E2E_PORT", "9090");
    let shapes_ttl = format!(
        "{PREFIXES}\
         ex:Shape a sh:NodeShape ;\n\
           sh:targetClass ex:Config ;\n\
           sh:property [ sh:path ex:port ; sh:name \"port\" ; sh:minCount 1 ; sh:maxCount 1 ; sh:datatype xsd:integer ] .\n"
    );
    let shapes = extract_shapes(&quads_from_turtle(&shapes_ttl)).unwrap();
    let data = quads_from_turtle(&format!(
        "{PREFIXES}ex:cfg ex:port ex:portVar .\n\
         ex:portVar a rdfl:EnvVariable ; rdfl:envKey \"RDF_LENS_E2E_PORT\" ."
    ));
    let lens = shapes.lens(&ex("Config")).unwrap();
    let value = lens
        .execute(&container(named("http://example.com/cfg"), &data))
        .unwrap();
    assert_eq!(value.to_json(), json!({"port": 9090}));
}

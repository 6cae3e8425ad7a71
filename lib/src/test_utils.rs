//! Helpers for building quad sets in tests. Turtle parsing lives here and
//! only here; the engine itself consumes already-parsed quads.

use crate::types::Container;
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{NamedNode, Quad, Term};
use std::io::Cursor;

/// Parses a Turtle document into a quad vector, panicking on syntax errors.
pub fn quads_from_turtle(turtle: &str) -> Vec<Quad> {
    let parser = RdfParser::from_format(RdfFormat::Turtle)
        .with_base_iri("http://example.com/")
        .expect("valid base IRI");
    parser
        .for_reader(Cursor::new(turtle.as_bytes().to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .expect("valid turtle")
}

pub fn named(iri: &str) -> NamedNode {
    NamedNode::new(iri).expect("valid IRI")
}

/// A term-focused container over a fresh shared copy of `quads`.
pub fn container(id: impl Into<Term>, quads: &[Quad]) -> Container {
    Container::from_quads(id, quads)
}

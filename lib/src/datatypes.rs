//! Coercion of RDF terms into native scalar values, driven by an XSD
//! datatype IRI.

use crate::lens::Lens;
use crate::types::{Container, LensError, LensErrorKind};
use crate::value::{term_value, Value};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{NamedNode, NamedNodeRef, Term};
use oxsdatatypes::DateTime;

// Not part of XSD proper, but used by shape authors to mark IRI-valued
// fields alongside xsd:anyURI.
const XSD_IRI: &str = "http://www.w3.org/2001/XMLSchema#iri";

/// Coerces `term` according to `datatype`. Unknown datatypes pass the term
/// through unchanged.
pub fn coerce(datatype: NamedNodeRef<'_>, term: &Term) -> Result<Value, LensError> {
    let lexical = term_value(term);
    if datatype == xsd::INTEGER {
        let parsed: i64 = lexical.parse().map_err(|_| {
            LensError::new(
                LensErrorKind::Other,
                format!("invalid xsd:integer literal '{}'", lexical),
            )
        })?;
        return Ok(Value::Integer(parsed));
    }
    if datatype == xsd::FLOAT || datatype == xsd::DOUBLE || datatype == xsd::DECIMAL {
        let parsed: f64 = lexical.parse().map_err(|_| {
            LensError::new(
                LensErrorKind::Other,
                format!("invalid {} literal '{}'", datatype, lexical),
            )
        })?;
        return Ok(Value::Float(parsed));
    }
    if datatype == xsd::STRING {
        return Ok(Value::String(lexical));
    }
    if datatype == xsd::DATE_TIME {
        let parsed: DateTime = lexical.parse().map_err(|_| {
            LensError::new(
                LensErrorKind::Other,
                format!("invalid xsd:dateTime literal '{}'", lexical),
            )
        })?;
        return Ok(Value::DateTime(parsed));
    }
    if datatype == xsd::BOOLEAN {
        return Ok(Value::Bool(lexical == "true"));
    }
    if datatype == xsd::ANY_URI || datatype.as_str() == XSD_IRI {
        let node = NamedNode::new(lexical.clone()).map_err(|_| {
            LensError::new(
                LensErrorKind::Other,
                format!("'{}' is not a valid IRI", lexical),
            )
        })?;
        return Ok(Value::Term(Term::from(node)));
    }
    Ok(Value::Term(term.clone()))
}

/// A lens coercing the focus term with a fixed datatype.
pub fn coerce_lens(datatype: NamedNode) -> Lens<Container, Value> {
    Lens::new(move |c: &Container, ctx| {
        coerce(datatype.as_ref(), &c.id).map_err(|e| ctx.stamp(e))
    })
}

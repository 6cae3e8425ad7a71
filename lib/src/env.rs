//! Resolution of `rdfl:EnvVariable` nodes, either in-lens (`env_lens`, used
//! as the first alternative of every datatype field extractor) or as a
//! whole-graph preprocessing pass (`env_replace`).

use crate::datatypes::coerce;
use crate::extract::cbd_quads;
use crate::lens::Lens;
use crate::named_nodes::{RDF, RDFL};
use crate::types::{subject_eq_term, Container, LensError, LensErrorKind};
use crate::value::Value;
use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, NamedNode, Quad, Term};
use std::collections::HashSet;

struct EnvNode {
    key: String,
    default: Option<Term>,
    datatype: Option<NamedNode>,
}

fn read_env_node(c: &Container) -> Result<EnvNode, LensError> {
    let rdf = RDF::new();
    let rdfl = RDFL::new();

    let objects = |p: NamedNode| -> Vec<Term> {
        c.quads
            .iter()
            .filter(|q| subject_eq_term(&q.subject, &c.id) && q.predicate == p)
            .map(|q| q.object.clone())
            .collect()
    };

    let is_env = objects(rdf.type_.into_owned())
        .iter()
        .any(|t| *t == Term::from(rdfl.env_variable.into_owned()));
    if !is_env {
        return Err(LensError::new(
            LensErrorKind::Other,
            format!("{} is not an EnvVariable node", c.id),
        ));
    }

    let key = match objects(rdfl.env_key.into_owned()).into_iter().next() {
        Some(Term::Literal(l)) => l.value().to_string(),
        Some(other) => {
            return Err(LensError::new(
                LensErrorKind::Other,
                format!("envKey of {} is not a literal: {}", c.id, other),
            ))
        }
        None => {
            return Err(LensError::new(
                LensErrorKind::Other,
                format!("EnvVariable {} has no envKey", c.id),
            ))
        }
    };
    let default = objects(rdfl.env_default.into_owned()).into_iter().next();
    let datatype = match objects(rdfl.datatype.into_owned()).into_iter().next() {
        Some(Term::NamedNode(n)) => Some(n),
        _ => None,
    };
    Ok(EnvNode {
        key,
        default,
        datatype,
    })
}

/// The resolved term: the environment value as a plain literal, or the
/// declared default.
fn resolve(node: &EnvNode) -> Result<Term, LensError> {
    match std::env::var(&node.key) {
        Ok(value) => Ok(Term::from(Literal::new_simple_literal(value))),
        Err(_) => match &node.default {
            Some(term) => Ok(term.clone()),
            None => Err(LensError::new(
                LensErrorKind::EnvUnresolved,
                "ENV and default are not set",
            )),
        },
    }
}

/// A lens resolving an `rdfl:EnvVariable` focus to a coerced scalar. The
/// coercion datatype is picked in precedence order: the `datatype` argument,
/// the node's own `rdfl:datatype`, then the resolved literal's datatype.
pub fn env_lens(datatype: Option<NamedNode>) -> Lens<Container, Value> {
    Lens::new(move |c: &Container, ctx| {
        let node = read_env_node(c).map_err(|e| ctx.stamp(e))?;
        let resolved = resolve(&node).map_err(|e| ctx.stamp(e))?;
        let dt = datatype
            .clone()
            .or(node.datatype)
            .or(match &resolved {
                Term::Literal(l) => Some(l.datatype().into_owned()),
                _ => None,
            })
            .unwrap_or_else(|| xsd::STRING.into_owned());
        coerce(dt.as_ref(), &resolved).map_err(|e| ctx.stamp(e))
    })
}

/// Rewrites a quad set so no `rdfl:EnvVariable` node remains: every
/// reference to such a node is replaced by its resolved literal, and the
/// node's concise bounded description is dropped.
pub fn env_replace(quads: &[Quad]) -> Result<Vec<Quad>, LensError> {
    let rdf = RDF::new();
    let rdfl = RDFL::new();
    let env_type = Term::from(rdfl.env_variable.into_owned());
    let type_pred = rdf.type_.into_owned();

    let mut replacements: Vec<(Term, Term)> = Vec::new();
    let mut dropped: HashSet<Quad> = HashSet::new();

    let env_subjects: Vec<Term> = quads
        .iter()
        .filter(|q| q.predicate == type_pred && q.object == env_type)
        .map(|q| Term::from(q.subject.clone()))
        .collect();

    for subject in env_subjects {
        let container = Container::from_quads(subject.clone(), quads);
        let node = read_env_node(&container)?;
        let resolved = resolve(&node)?;
        // Environment values arrive as plain strings; re-type them with the
        // node's declared datatype.
        let resolved = match (&resolved, &node.datatype) {
            (Term::Literal(l), Some(dt)) if l.datatype() == xsd::STRING => {
                Term::from(Literal::new_typed_literal(l.value(), dt.clone()))
            }
            _ => resolved,
        };
        replacements.push((subject.clone(), resolved));
        dropped.extend(cbd_quads(&subject, quads));
    }

    Ok(quads
        .iter()
        .filter(|q| !dropped.contains(q))
        .map(|q| {
            let replacement = replacements
                .iter()
                .find(|(from, _)| q.object == *from)
                .map(|(_, to)| to.clone());
            match replacement {
                Some(to) => Quad::new(
                    q.subject.clone(),
                    q.predicate.clone(),
                    to,
                    q.graph_name.clone(),
                ),
                None => q.clone(),
            }
        })
        .collect())
}

//! SHACL property path support: parsing a path node out of the shapes graph
//! into a [`Path`], and compiling a [`Path`] into a multi lens over the data
//! graph.

use crate::lens::{empty, inv_pred, pred, rdf_list, MultiLens};
use crate::types::{subject_eq_term, Container, LensError, LensErrorKind, Path};
use oxigraph::model::{NamedNode, Term};
use std::collections::HashSet;

use crate::named_nodes::{RDF, SHACL};

/// Parses the SHACL path rooted at the focus of `c`. Each path node must
/// carry exactly one path kind; the kind is detected structurally (which
/// SHACL predicate is present, or an `rdf:first` for sequence lists) rather
/// than by trying interpretations in order.
pub fn parse_path(c: &Container) -> Result<Path, LensError> {
    let sh = SHACL::new();
    let rdf = RDF::new();

    let alternative = object_of(c, sh.alternative_path.into_owned());
    let inverse = object_of(c, sh.inverse_path.into_owned());
    let zero_or_more = object_of(c, sh.zero_or_more_path.into_owned());
    let one_or_more = object_of(c, sh.one_or_more_path.into_owned());
    let zero_or_one = object_of(c, sh.zero_or_one_path.into_owned());
    let list_head = object_of(c, rdf.first.into_owned()).is_some()
        || c.id == Term::from(rdf.nil.into_owned());

    let kinds = [
        alternative.is_some(),
        inverse.is_some(),
        zero_or_more.is_some(),
        one_or_more.is_some(),
        zero_or_one.is_some(),
        list_head,
    ]
    .iter()
    .filter(|present| **present)
    .count();
    if kinds > 1 {
        return Err(LensError::new(
            LensErrorKind::UncompilablePath,
            format!("ambiguous path node {}: multiple path kinds present", c.id),
        ));
    }

    if let Some(list) = alternative {
        let options = parse_path_list(&c.refocus(list))?;
        return Ok(Path::Alternative(options));
    }
    if let Some(target) = inverse {
        let inner = parse_path(&c.refocus(target))?;
        return match &inner {
            Path::Predicate(_) => Ok(Path::Inverse(Box::new(inner))),
            Path::Sequence(parts) if parts.iter().all(|p| matches!(p, Path::Predicate(_))) => {
                Ok(Path::Inverse(Box::new(inner)))
            }
            _ => Err(LensError::new(
                LensErrorKind::UncompilablePath,
                format!("inverse path over {} is not supported", inner),
            )),
        };
    }
    if let Some(target) = zero_or_more {
        let inner = parse_path(&c.refocus(target))?;
        return Ok(Path::ZeroOrMore(Box::new(inner)));
    }
    if let Some(target) = one_or_more {
        let inner = parse_path(&c.refocus(target))?;
        return Ok(Path::OneOrMore(Box::new(inner)));
    }
    if let Some(target) = zero_or_one {
        let inner = parse_path(&c.refocus(target))?;
        return Ok(Path::ZeroOrOne(Box::new(inner)));
    }
    if list_head {
        let parts = parse_path_list(c)?;
        return Ok(Path::Sequence(parts));
    }
    match &c.id {
        Term::NamedNode(p) => Ok(Path::Predicate(p.clone())),
        other => Err(LensError::new(
            LensErrorKind::UncompilablePath,
            format!("no path kind matched node {}", other),
        )),
    }
}

fn parse_path_list(c: &Container) -> Result<Vec<Path>, LensError> {
    let elements = rdf_list().execute(c)?;
    elements.iter().map(parse_path).collect()
}

fn object_of(c: &Container, predicate: NamedNode) -> Option<Term> {
    c.quads
        .iter()
        .find(|q| subject_eq_term(&q.subject, &c.id) && q.predicate == predicate)
        .map(|q| q.object.clone())
}

impl Path {
    /// Compiles the path to a lens over the data graph.
    pub fn to_lens(&self) -> MultiLens<Container, Container> {
        match self {
            Path::Predicate(p) => pred(Some(p.clone())),
            Path::Sequence(parts) => parts
                .iter()
                .fold(identity(), |acc, part| acc.then_flat(&part.to_lens())),
            Path::Alternative(options) => {
                let mut compiled = options.iter().map(Path::to_lens);
                match compiled.next() {
                    None => identity(),
                    Some(first) => compiled.fold(first, |acc, next| acc.or_all(&next)),
                }
            }
            Path::Inverse(inner) => match &**inner {
                Path::Predicate(p) => inv_pred(Some(p.clone())),
                Path::Sequence(parts) => {
                    // ^(a / b) walks b backwards, then a backwards.
                    parts.iter().rev().fold(identity(), |acc, part| match part {
                        Path::Predicate(p) => acc.then_flat(&inv_pred(Some(p.clone()))),
                        other => acc.then_flat(&unsupported_inverse(other)),
                    })
                }
                other => unsupported_inverse(other),
            },
            Path::ZeroOrMore(inner) => repeat(inner, 0, None),
            Path::OneOrMore(inner) => repeat(inner, 1, None),
            Path::ZeroOrOne(inner) => repeat(inner, 0, Some(1)),
        }
    }
}

fn identity() -> MultiLens<Container, Container> {
    empty().map(|c: Container| vec![c]).as_multi()
}

// Unreachable from parsed paths; guards `Path` values built by hand.
fn unsupported_inverse(inner: &Path) -> MultiLens<Container, Container> {
    let rendered = inner.to_string();
    MultiLens::new(move |_, ctx| {
        Err(ctx.fail(
            LensErrorKind::UncompilablePath,
            format!("inverse path over {} is not supported", rendered),
        ))
    })
}

/// Repeated application of `inner` with `[min, max]` repetition bounds.
/// Terms reached once are not expanded again, so cyclic data terminates.
fn repeat(inner: &Path, min: usize, max: Option<usize>) -> MultiLens<Container, Container> {
    let step = inner.to_lens();
    MultiLens::new(move |c: &Container, ctx| {
        let mut out = Vec::new();
        let mut seen: HashSet<Term> = HashSet::new();
        if min == 0 {
            // The focus is emitted at depth zero; it must not re-enter the
            // frontier through a cycle. With min >= 1 the focus is only
            // emitted if a cycle reaches it again, so it stays expandable.
            seen.insert(c.id.clone());
        }
        let mut frontier = vec![c.clone()];
        let mut depth = 0usize;
        loop {
            if depth >= min {
                out.extend(frontier.iter().cloned());
            }
            if max.is_some_and(|m| depth >= m) {
                break;
            }
            let mut next = Vec::new();
            for node in &frontier {
                for reached in step.apply(node, ctx)? {
                    if seen.insert(reached.id.clone()) {
                        next.push(reached);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
            depth += 1;
        }
        Ok(out)
    })
}

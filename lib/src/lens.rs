//! The lens combinator algebra: single- and multi-valued extractors over a
//! `Container`, plus the primitive graph-traversal lenses they are built
//! from. Lenses are cheap-to-clone values; composing them never executes
//! anything until `execute` is called with a focus.

use crate::context::RunContext;
use crate::named_nodes::RDF;
use crate::types::{subject_eq_term, Container, LensError, LensErrorKind, Step};
use oxigraph::model::{NamedNode, Quad, Term};
use std::collections::HashSet;
use std::sync::Arc;

type LensFn<C, T> = dyn Fn(&C, &mut RunContext) -> Result<T, LensError> + Send + Sync;

/// A single-valued extractor: produces one `T` from a focus, or fails.
pub struct Lens<C, T> {
    run: Arc<LensFn<C, T>>,
}

impl<C, T> Clone for Lens<C, T> {
    fn clone(&self) -> Self {
        Lens {
            run: Arc::clone(&self.run),
        }
    }
}

/// A multi-valued extractor: produces a finite ordered sequence of `T`.
/// Tolerant combinators represent failure as the empty sequence; strict ones
/// raise.
pub struct MultiLens<C, T> {
    run: Arc<LensFn<C, Vec<T>>>,
}

impl<C, T> Clone for MultiLens<C, T> {
    fn clone(&self) -> Self {
        MultiLens {
            run: Arc::clone(&self.run),
        }
    }
}

impl<C: 'static, T: 'static> Lens<C, T> {
    pub fn new(
        f: impl Fn(&C, &mut RunContext) -> Result<T, LensError> + Send + Sync + 'static,
    ) -> Self {
        Lens { run: Arc::new(f) }
    }

    /// Runs the lens against a fresh `RunContext`. Every top-level execute
    /// gets its own context; nothing is shared between runs.
    pub fn execute(&self, focus: &C) -> Result<T, LensError> {
        let mut ctx = RunContext::new();
        (self.run)(focus, &mut ctx)
    }

    pub(crate) fn apply(&self, focus: &C, ctx: &mut RunContext) -> Result<T, LensError> {
        (self.run)(focus, ctx)
    }

    /// Stable identity of this lens node for per-run memo tables.
    pub(crate) fn identity_key(&self) -> usize {
        Arc::as_ptr(&self.run) as *const () as usize
    }

    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + Send + Sync + 'static) -> Lens<C, U> {
        let inner = self.clone();
        Lens::new(move |c, ctx| inner.apply(c, ctx).map(&f))
    }

    /// Like `map`, but the mapping itself may fail. Errors raised by `f`
    /// get the current lineage stamped on.
    pub fn try_map<U: 'static>(
        &self,
        f: impl Fn(T) -> Result<U, LensError> + Send + Sync + 'static,
    ) -> Lens<C, U> {
        let inner = self.clone();
        Lens::new(move |c, ctx| {
            let value = inner.apply(c, ctx)?;
            f(value).map_err(|e| ctx.stamp(e))
        })
    }

    /// Sequential composition: the output of `self` becomes the focus of
    /// `next`.
    pub fn then<U: 'static>(&self, next: &Lens<T, U>) -> Lens<C, U> {
        let first = self.clone();
        let second = next.clone();
        Lens::new(move |c, ctx| {
            let mid = first.apply(c, ctx)?;
            second.apply(&mid, ctx)
        })
    }

    /// Runs both lenses on the same focus; either failure fails the pair.
    pub fn and<U: 'static>(&self, other: &Lens<C, U>) -> Lens<C, (T, U)> {
        let a = self.clone();
        let b = other.clone();
        Lens::new(move |c, ctx| Ok((a.apply(c, ctx)?, b.apply(c, ctx)?)))
    }

    /// The homogeneous `and`: all lenses on the same focus, in order, strict.
    pub fn all(lenses: Vec<Lens<C, T>>) -> Lens<C, Vec<T>> {
        Lens::new(move |c, ctx| lenses.iter().map(|l| l.apply(c, ctx)).collect())
    }

    /// Tries `self`; on failure tries `alt` with an untainted lineage. The
    /// memo table is shared between branches, the lineage is not.
    pub fn or(&self, alt: &Lens<C, T>) -> Lens<C, T> {
        let a = self.clone();
        let b = alt.clone();
        Lens::new(move |c, ctx| {
            let mut branch = ctx.branch();
            match a.apply(c, &mut branch) {
                Ok(v) => {
                    ctx.adopt(branch);
                    Ok(v)
                }
                Err(first_err) => {
                    let mut branch = ctx.branch();
                    match b.apply(c, &mut branch) {
                        Ok(v) => {
                            ctx.adopt(branch);
                            Ok(v)
                        }
                        Err(second_err) => Err(second_err.with_alternative(&first_err)),
                    }
                }
            }
        })
    }

    /// Runs every lens on the same focus and collects the successes,
    /// ignoring failures.
    pub fn any_of(lenses: Vec<Lens<C, T>>) -> MultiLens<C, T> {
        MultiLens::new(move |c, ctx| {
            let mut out = Vec::new();
            for lens in &lenses {
                let mut branch = ctx.branch();
                if let Ok(v) = lens.apply(c, &mut branch) {
                    out.push(v);
                }
            }
            Ok(out)
        })
    }

    /// Debug-tags the lens: pushes a lineage frame seen by descendants and
    /// by errors raised below this point.
    pub fn named(&self, name: &str, opts: Option<String>) -> Lens<C, T> {
        let inner = self.clone();
        let step = Step::new(name, opts);
        Lens::new(move |c, ctx| {
            ctx.push(step.clone());
            inner.apply(c, ctx)
        })
    }
}

impl<C: 'static, T: 'static> Lens<C, Vec<T>> {
    /// Views a vec-producing single lens as a multi lens.
    pub fn as_multi(&self) -> MultiLens<C, T> {
        let inner = self.clone();
        MultiLens::new(move |c, ctx| inner.apply(c, ctx))
    }
}

impl<C: 'static, T: 'static> MultiLens<C, T> {
    pub fn new(
        f: impl Fn(&C, &mut RunContext) -> Result<Vec<T>, LensError> + Send + Sync + 'static,
    ) -> Self {
        MultiLens { run: Arc::new(f) }
    }

    pub fn execute(&self, focus: &C) -> Result<Vec<T>, LensError> {
        let mut ctx = RunContext::new();
        (self.run)(focus, &mut ctx)
    }

    pub(crate) fn apply(&self, focus: &C, ctx: &mut RunContext) -> Result<Vec<T>, LensError> {
        (self.run)(focus, ctx)
    }

    pub(crate) fn same_lens(&self, other: &MultiLens<C, T>) -> bool {
        Arc::ptr_eq(&self.run, &other.run)
    }

    /// The whole sequence as a single value.
    pub fn as_single(&self) -> Lens<C, Vec<T>> {
        let inner = self.clone();
        Lens::new(move |c, ctx| inner.apply(c, ctx))
    }

    /// First element, or `None` when the sequence is empty.
    pub fn one(&self) -> Lens<C, Option<T>> {
        let inner = self.clone();
        Lens::new(move |c, ctx| Ok(inner.apply(c, ctx)?.into_iter().next()))
    }

    /// Exactly one element; zero or several fail.
    pub fn expect_one(&self) -> Lens<C, T> {
        let inner = self.clone();
        Lens::new(move |c, ctx| {
            let mut values = inner.apply(c, ctx)?;
            match values.len() {
                1 => Ok(values.pop().unwrap()),
                0 => Err(ctx.fail(LensErrorKind::Cardinality, "expected one value, found none")),
                n => Err(ctx.fail(
                    LensErrorKind::Cardinality,
                    format!("expected one value, found {}", n),
                )),
            }
        })
    }

    /// Applies `next` to every element; any per-element failure propagates.
    pub fn then_all<U: 'static>(&self, next: &Lens<T, U>) -> MultiLens<C, U> {
        let first = self.clone();
        let second = next.clone();
        MultiLens::new(move |c, ctx| {
            first
                .apply(c, ctx)?
                .iter()
                .map(|item| second.apply(item, ctx))
                .collect()
        })
    }

    /// Applies `next` to every element; per-element failures are dropped.
    pub fn then_some<U: 'static>(&self, next: &Lens<T, U>) -> MultiLens<C, U> {
        let first = self.clone();
        let second = next.clone();
        MultiLens::new(move |c, ctx| {
            let mut out = Vec::new();
            for item in first.apply(c, ctx)? {
                let mut branch = ctx.branch();
                if let Ok(v) = second.apply(&item, &mut branch) {
                    out.push(v);
                }
            }
            Ok(out)
        })
    }

    /// flatMap: applies a multi lens to every element and concatenates.
    pub fn then_flat<U: 'static>(&self, next: &MultiLens<T, U>) -> MultiLens<C, U> {
        let first = self.clone();
        let second = next.clone();
        MultiLens::new(move |c, ctx| {
            let mut out = Vec::new();
            for item in first.apply(c, ctx)? {
                out.extend(second.apply(&item, ctx)?);
            }
            Ok(out)
        })
    }

    pub fn map_all<U: 'static>(&self, f: impl Fn(T) -> U + Send + Sync + 'static) -> MultiLens<C, U> {
        let inner = self.clone();
        MultiLens::new(move |c, ctx| Ok(inner.apply(c, ctx)?.into_iter().map(&f).collect()))
    }

    /// Concatenates the successes of both lenses; a failing side contributes
    /// nothing.
    pub fn or_all(&self, other: &MultiLens<C, T>) -> MultiLens<C, T> {
        let a = self.clone();
        let b = other.clone();
        MultiLens::new(move |c, ctx| {
            let mut out = Vec::new();
            for lens in [&a, &b] {
                let mut branch = ctx.branch();
                if let Ok(values) = lens.apply(c, &mut branch) {
                    ctx.adopt(branch);
                    out.extend(values);
                }
            }
            Ok(out)
        })
    }

    pub fn filter(&self, p: impl Fn(&T) -> bool + Send + Sync + 'static) -> MultiLens<C, T> {
        let inner = self.clone();
        MultiLens::new(move |c, ctx| {
            Ok(inner.apply(c, ctx)?.into_iter().filter(|t| p(t)).collect())
        })
    }

    /// Left-fold over the sequence. `init` computes the seed from the focus;
    /// `step` folds each `(element, accumulator)` pair.
    pub fn fold<A: 'static>(&self, init: &Lens<C, A>, step: &Lens<(T, A), A>) -> Lens<C, A> {
        let items = self.clone();
        let init = init.clone();
        let step = step.clone();
        Lens::new(move |c, ctx| {
            let mut acc = init.apply(c, ctx)?;
            for item in items.apply(c, ctx)? {
                acc = step.apply(&(item, acc), ctx)?;
            }
            Ok(acc)
        })
    }

    pub fn named(&self, name: &str, opts: Option<String>) -> MultiLens<C, T> {
        let inner = self.clone();
        let step = Step::new(name, opts);
        MultiLens::new(move |c, ctx| {
            ctx.push(step.clone());
            inner.apply(c, ctx)
        })
    }
}

impl<C: 'static> MultiLens<C, Container> {
    /// Deduplicates containers by focus term. Emission order: literals
    /// first, then named nodes, then blank nodes, insertion-ordered within
    /// each group.
    pub fn unique(&self) -> MultiLens<C, Container> {
        let inner = self.clone();
        MultiLens::new(move |c, ctx| {
            let mut seen: HashSet<Term> = HashSet::new();
            let mut literals = Vec::new();
            let mut named = Vec::new();
            let mut blanks = Vec::new();
            for item in inner.apply(c, ctx)? {
                if !seen.insert(item.id.clone()) {
                    continue;
                }
                match &item.id {
                    Term::Literal(_) => literals.push(item),
                    Term::NamedNode(_) => named.push(item),
                    _ => blanks.push(item),
                }
            }
            literals.extend(named);
            literals.extend(blanks);
            Ok(literals)
        })
    }
}

/// Identity: the focus unchanged.
pub fn empty<C: Clone + 'static>() -> Lens<C, C> {
    Lens::new(|c: &C, _| Ok(c.clone()))
}

/// Objects of quads whose subject is the focus, optionally restricted to one
/// predicate. Result order follows the quad array.
pub fn pred(predicate: Option<NamedNode>) -> MultiLens<Container, Container> {
    MultiLens::new(move |c: &Container, _| {
        let mut out = Vec::new();
        for q in c.quads.iter() {
            if !subject_eq_term(&q.subject, &c.id) {
                continue;
            }
            if let Some(p) = &predicate {
                if q.predicate != *p {
                    continue;
                }
            }
            out.push(c.refocus(q.object.clone()));
        }
        Ok(out)
    })
}

/// The dual of `pred`: subjects of quads whose object is the focus.
pub fn inv_pred(predicate: Option<NamedNode>) -> MultiLens<Container, Container> {
    MultiLens::new(move |c: &Container, _| {
        let mut out = Vec::new();
        for q in c.quads.iter() {
            if q.object != c.id {
                continue;
            }
            if let Some(p) = &predicate {
                if q.predicate != *p {
                    continue;
                }
            }
            out.push(c.refocus(Term::from(q.subject.clone())));
        }
        Ok(out)
    })
}

/// Like `pred`, but the matching quad itself becomes the focus.
pub fn pred_triple(predicate: Option<NamedNode>) -> MultiLens<Container, Container<Quad>> {
    MultiLens::new(move |c: &Container, _| {
        let mut out = Vec::new();
        for q in c.quads.iter() {
            if !subject_eq_term(&q.subject, &c.id) {
                continue;
            }
            if let Some(p) = &predicate {
                if q.predicate != *p {
                    continue;
                }
            }
            out.push(Container {
                id: q.clone(),
                quads: Arc::clone(&c.quads),
            });
        }
        Ok(out)
    })
}

/// Quads of the focus's quad set matching the given components; the focus id
/// plays no part. `None` components match anything.
pub fn match_pattern(
    subject: Option<Term>,
    predicate: Option<NamedNode>,
    object: Option<Term>,
) -> MultiLens<Container, Container<Quad>> {
    MultiLens::new(move |c: &Container, _| {
        let mut out = Vec::new();
        for q in c.quads.iter() {
            if let Some(s) = &subject {
                if !subject_eq_term(&q.subject, s) {
                    continue;
                }
            }
            if let Some(p) = &predicate {
                if q.predicate != *p {
                    continue;
                }
            }
            if let Some(o) = &object {
                if q.object != *o {
                    continue;
                }
            }
            out.push(Container {
                id: q.clone(),
                quads: Arc::clone(&c.quads),
            });
        }
        Ok(out)
    })
}

/// One container per quad subject, in quad order, duplicates included.
/// Compose with `unique` for the distinct subject set.
pub fn subjects() -> MultiLens<Container, Container> {
    MultiLens::new(|c: &Container, _| {
        Ok(c.quads
            .iter()
            .map(|q| c.refocus(Term::from(q.subject.clone())))
            .collect())
    })
}

/// Pivots a quad-focused container to its subject term.
pub fn subject() -> Lens<Container<Quad>, Container> {
    Lens::new(|c: &Container<Quad>, _| Ok(c.refocus_term(Term::from(c.id.subject.clone()))))
}

/// Pivots a quad-focused container to its predicate term.
pub fn predicate() -> Lens<Container<Quad>, Container> {
    Lens::new(|c: &Container<Quad>, _| Ok(c.refocus_term(Term::from(c.id.predicate.clone()))))
}

/// Pivots a quad-focused container to its object term.
pub fn object() -> Lens<Container<Quad>, Container> {
    Lens::new(|c: &Container<Quad>, _| Ok(c.refocus_term(c.id.object.clone())))
}

fn objects_of(c: &Container, predicate: &NamedNode) -> Vec<Term> {
    c.quads
        .iter()
        .filter(|q| subject_eq_term(&q.subject, &c.id) && q.predicate == *predicate)
        .map(|q| q.object.clone())
        .collect()
}

fn exactly_one(
    mut values: Vec<Term>,
    at: &Term,
    what: &str,
    ctx: &RunContext,
) -> Result<Term, LensError> {
    match values.len() {
        1 => Ok(values.pop().unwrap()),
        0 => Err(ctx.fail(
            LensErrorKind::MalformedList,
            format!("list node {} has no {}", at, what),
        )),
        n => Err(ctx.fail(
            LensErrorKind::MalformedList,
            format!("list node {} has {} {} triples", at, n, what),
        )),
    }
}

/// Decodes an `rdf:first`/`rdf:rest` chain starting at the focus into its
/// ordered elements. `rdf:nil` decodes to the empty list; missing or
/// duplicated `first`/`rest` triples and cyclic chains fail.
pub fn rdf_list() -> Lens<Container, Vec<Container>> {
    Lens::new(|c: &Container, ctx| {
        let rdf = RDF::new();
        let nil: Term = Term::from(rdf.nil.into_owned());
        let first = rdf.first.into_owned();
        let rest = rdf.rest.into_owned();

        let mut items = Vec::new();
        let mut visited: HashSet<Term> = HashSet::new();
        let mut cur = c.clone();
        while cur.id != nil {
            if !visited.insert(cur.id.clone()) {
                return Err(ctx.fail(
                    LensErrorKind::MalformedList,
                    format!("rdf list cycles back to {}", cur.id),
                ));
            }
            let head = exactly_one(objects_of(&cur, &first), &cur.id, "rdf:first", ctx)?;
            let tail = exactly_one(objects_of(&cur, &rest), &cur.id, "rdf:rest", ctx)?;
            items.push(cur.refocus(head));
            cur = cur.refocus(tail);
        }
        Ok(items)
    })
}

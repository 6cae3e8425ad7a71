//! The shape-graph compiler: walks a quad set, parses every node shape, and
//! builds a cache of one record lens per target class. The cache also hosts
//! the built-in pseudo-classes and, registered last, the `rdfl:TypedExtract`
//! dispatcher that picks lenses by the focus node's `rdf:type`.

use crate::context::run_cached;
use crate::lens::{subjects, Lens};
use crate::named_nodes::{RDF, RDFL, RDFS};
use crate::path::parse_path;
use crate::shape::{extract_shape, Shape};
use crate::types::{subject_eq_term, Container, LensError, LensErrorKind};
use crate::value::{PathLens, Value};
use log::{debug, info, trace};
use oxigraph::model::{Quad, Term};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

/// A post-processor applied to dispatcher results for one concrete type.
pub type ApplyFn = Arc<dyn Fn(Value) -> Result<Value, LensError> + Send + Sync>;

/// The class-to-lens table. Shape lenses resolve `sh:class` references
/// through it at execute time, which is what lets mutually recursive shapes
/// compile.
pub(crate) type LensCache = Arc<RwLock<HashMap<Term, Lens<Container, Value>>>>;

/// The result of compiling a shapes graph.
pub struct Shapes {
    pub shapes: Vec<Shape>,
    /// `rdfs:subClassOf` child-to-parent edges, last-wins per child.
    pub sub_classes: HashMap<Term, Term>,
    cache: LensCache,
}

impl Shapes {
    /// The lens registered for a class, if any.
    pub fn lens(&self, class: &Term) -> Option<Lens<Container, Value>> {
        self.cache
            .read()
            .expect("lens cache lock poisoned")
            .get(class)
            .cloned()
    }

    /// Every class with a registered lens, builtins included, in lexical
    /// order.
    pub fn classes(&self) -> Vec<Term> {
        let table = self.cache.read().expect("lens cache lock poisoned");
        let mut classes: Vec<Term> = table.keys().cloned().collect();
        classes.sort_by_key(|t| t.to_string());
        classes
    }
}

/// Compiles every `sh:NodeShape` in `quads` into the class lens cache.
pub fn extract_shapes(quads: &[Quad]) -> Result<Shapes, LensError> {
    extract_shapes_with(quads, HashMap::new(), HashMap::new())
}

/// Like [`extract_shapes`], with per-type post-processors and additional
/// caller-provided class lenses.
pub fn extract_shapes_with(
    quads: &[Quad],
    apply: HashMap<Term, ApplyFn>,
    custom_classes: HashMap<Term, Lens<Container, Value>>,
) -> Result<Shapes, LensError> {
    let rdf = RDF::new();
    let rdfs = RDFS::new();
    let rdfl = RDFL::new();

    let sub_class_of = rdfs.sub_class_of.into_owned();
    let mut sub_classes: HashMap<Term, Term> = HashMap::new();
    for q in quads.iter().filter(|q| q.predicate == sub_class_of) {
        sub_classes.insert(Term::from(q.subject.clone()), q.object.clone());
    }

    let cache: LensCache = Arc::new(RwLock::new(HashMap::new()));
    {
        let mut table = cache.write().expect("lens cache lock poisoned");
        for (class, lens) in builtin_lenses() {
            table.insert(class, lens);
        }
        for (class, lens) in custom_classes {
            table.insert(class, lens);
        }
    }

    let root = Container::from_quads(rdf.nil.into_owned(), quads);
    let mut shapes = Vec::new();
    for subject in subjects().unique().execute(&root)? {
        match extract_shape(&subject, &cache) {
            Ok(extracted) => {
                for shape in extracted {
                    debug!(
                        "shape {} targets {} with {} field(s)",
                        shape.id,
                        shape.ty,
                        shape.fields.len()
                    );
                    register(&cache, shape.ty.clone(), shape.to_lens());
                    shapes.push(shape);
                }
            }
            // Subjects that are not node shapes at all are simply skipped;
            // a real node shape with malformed properties is a hard error.
            Err(e) if e.kind == LensErrorKind::WrongType => continue,
            Err(e) => return Err(e),
        }
    }

    // Registered after the user shapes so dispatch sees all of them.
    let dispatcher = typed_extract_lens(Arc::clone(&cache), sub_classes.clone(), apply);
    cache
        .write()
        .expect("lens cache lock poisoned")
        .insert(Term::from(rdfl.typed_extract.into_owned()), dispatcher);

    info!(
        "extracted {} shape(s) from {} quad(s)",
        shapes.len(),
        quads.len()
    );
    Ok(Shapes {
        shapes,
        sub_classes,
        cache,
    })
}

fn register(cache: &LensCache, class: Term, lens: Lens<Container, Value>) {
    let mut table = cache.write().expect("lens cache lock poisoned");
    match table.remove(&class) {
        // Two shapes targeting one class: first one that extracts wins.
        Some(existing) => {
            table.insert(class, existing.or(&lens));
        }
        None => {
            table.insert(class, lens);
        }
    }
}

/// A deferred `sh:class` reference: resolved against the cache at execute
/// time and memoised per focus, so recursive and mutually recursive shapes
/// terminate.
pub(crate) fn class_lens(class: Term, cache: LensCache) -> Lens<Container, Value> {
    Lens::new(move |c: &Container, ctx| {
        let lens = cache
            .read()
            .expect("lens cache lock poisoned")
            .get(&class)
            .cloned()
            .ok_or_else(|| {
                ctx.fail(
                    LensErrorKind::UnknownClass,
                    format!("no lens registered for class {}", class),
                )
            })?;
        run_cached(&lens, c, ctx)
    })
}

fn builtin_lenses() -> Vec<(Term, Lens<Container, Value>)> {
    let rdfl = RDFL::new();
    let path_lens: Lens<Container, Value> = Lens::new(|c: &Container, ctx| {
        let path = parse_path(c).map_err(|e| ctx.stamp(e))?;
        Ok(Value::Lens(PathLens(path.to_lens())))
    });
    let cbd: Lens<Container, Value> =
        Lens::new(|c: &Container, _| Ok(Value::Quads(cbd_quads(&c.id, &c.quads))));
    let context: Lens<Container, Value> =
        Lens::new(|c: &Container, _| Ok(Value::Quads(c.quads.to_vec())));
    vec![
        (Term::from(rdfl.path_lens.into_owned()), path_lens),
        (Term::from(rdfl.cbd.into_owned()), cbd),
        (Term::from(rdfl.context.into_owned()), context),
    ]
}

/// Concise bounded description: every quad reachable from `focus` by
/// breadth-first traversal through blank-node objects.
pub(crate) fn cbd_quads(focus: &Term, quads: &[Quad]) -> Vec<Quad> {
    let mut out = Vec::new();
    let mut visited: HashSet<Term> = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(focus.clone());
    while let Some(term) = queue.pop_front() {
        if !visited.insert(term.clone()) {
            continue;
        }
        for q in quads.iter().filter(|q| subject_eq_term(&q.subject, &term)) {
            out.push(q.clone());
            if matches!(q.object, Term::BlankNode(_)) {
                queue.push_back(q.object.clone());
            }
        }
    }
    out
}

fn typed_extract_lens(
    cache: LensCache,
    sub_classes: HashMap<Term, Term>,
    apply: HashMap<Term, ApplyFn>,
) -> Lens<Container, Value> {
    let type_pred = RDF::new().type_.into_owned();
    Lens::new(move |c: &Container, ctx| {
        let ty = c
            .quads
            .iter()
            .find(|q| subject_eq_term(&q.subject, &c.id) && q.predicate == type_pred)
            .map(|q| q.object.clone())
            .ok_or_else(|| ctx.fail(LensErrorKind::NoType, "Expected a type, found none"))?;
        trace!("typed extract of {} via {}", c.id, ty);

        let mut chain = Vec::new();
        let mut visited: HashSet<Term> = HashSet::new();
        let mut cursor = Some(ty.clone());
        while let Some(class) = cursor {
            if !visited.insert(class.clone()) {
                break;
            }
            if let Some(lens) = cache
                .read()
                .expect("lens cache lock poisoned")
                .get(&class)
                .cloned()
            {
                chain.push(lens);
            }
            cursor = sub_classes.get(&class).cloned();
        }
        if chain.is_empty() {
            return Err(ctx.fail(
                LensErrorKind::UnknownClass,
                format!("no shape lens for type {} or its ancestors", ty),
            ));
        }

        let result = if chain.len() == 1 {
            run_cached(&chain[0], c, ctx)?
        } else {
            // Ancestors merge first so the subclass's fields win.
            let mut merged = Value::empty_record();
            for lens in chain.iter().rev() {
                let value = run_cached(lens, c, ctx)?;
                merged.merge_from(&value);
            }
            merged
        };
        match apply.get(&ty) {
            Some(post) => post(result).map_err(|e| ctx.stamp(e)),
            None => Ok(result),
        }
    })
}

use oxigraph::model::{NamedNode, Quad, Subject, Term};
use std::fmt;
use std::sync::Arc;

/// The focus value threaded through lens composition: a term (or quad) under
/// inspection together with the quad set it lives in. The quad set is shared
/// by reference; cloning a container never copies quads.
#[derive(Debug, Clone)]
pub struct Container<Q = Term> {
    pub id: Q,
    pub quads: Arc<[Quad]>,
}

impl Container<Term> {
    pub fn new(id: impl Into<Term>, quads: Arc<[Quad]>) -> Self {
        Container {
            id: id.into(),
            quads,
        }
    }

    /// Builds a container over a fresh shared copy of `quads`.
    pub fn from_quads(id: impl Into<Term>, quads: &[Quad]) -> Self {
        Container {
            id: id.into(),
            quads: Arc::from(quads),
        }
    }

    /// Same quad set, different focus term.
    pub fn refocus(&self, id: impl Into<Term>) -> Self {
        Container {
            id: id.into(),
            quads: Arc::clone(&self.quads),
        }
    }
}

impl Container<Quad> {
    /// Re-expose a quad-focused container as a term-focused one.
    pub fn refocus_term(&self, id: impl Into<Term>) -> Container<Term> {
        Container {
            id: id.into(),
            quads: Arc::clone(&self.quads),
        }
    }
}

pub(crate) fn subject_eq_term(subject: &Subject, term: &Term) -> bool {
    match (subject, term) {
        (Subject::NamedNode(a), Term::NamedNode(b)) => a == b,
        (Subject::BlankNode(a), Term::BlankNode(b)) => a == b,
        (Subject::Triple(a), Term::Triple(b)) => **a == **b,
        _ => false,
    }
}

/// One frame of debugging lineage, pushed by `named` lenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub opts: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, opts: Option<String>) -> Self {
        Step {
            name: name.into(),
            opts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LensErrorKind {
    /// Field value count outside `[minCount, maxCount]`.
    Cardinality,
    /// `minCount >= 1` and the path yielded nothing.
    MissingRequired,
    /// A shape subject without `rdf:type sh:NodeShape`.
    WrongType,
    /// `sh:class X` with no lens registered under `X` at execute time.
    UnknownClass,
    /// `TypedExtract` on a focus with no `rdf:type`.
    NoType,
    /// An `rdf:first`/`rdf:rest` traversal that is not a well-formed list.
    MalformedList,
    /// No SHACL path kind matched the path node.
    UncompilablePath,
    /// `EnvVariable` with neither an environment value nor a default.
    EnvUnresolved,
    Other,
}

/// The failure value raised by strict lenses. Carries the lineage snapshot
/// taken where the failure happened.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", render_error(.message, .lineage))]
pub struct LensError {
    pub kind: LensErrorKind,
    pub message: String,
    pub lineage: Vec<Step>,
}

fn render_error(message: &str, lineage: &[Step]) -> String {
    if lineage.is_empty() {
        return message.to_string();
    }
    let trail: Vec<&str> = lineage.iter().map(|s| s.name.as_str()).collect();
    format!("{} (at {})", message, trail.join(" > "))
}

impl LensError {
    /// An error with no lineage; combinators stamp the run's lineage onto it
    /// before propagating.
    pub fn new(kind: LensErrorKind, message: impl Into<String>) -> Self {
        LensError {
            kind,
            message: message.into(),
            lineage: Vec::new(),
        }
    }

    /// Folds the message of a previously failed alternative into this error.
    pub(crate) fn with_alternative(mut self, other: &LensError) -> Self {
        self.message = format!("{}; also failed: {}", self.message, other.message);
        self
    }
}

/// A parsed SHACL property path. Parsing from the shapes graph lives in
/// `path::parse_path`; compilation to a lens in `Path::to_lens`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Path {
    /// A plain predicate IRI.
    Predicate(NamedNode),
    Inverse(Box<Path>),
    Sequence(Vec<Path>),
    Alternative(Vec<Path>),
    ZeroOrMore(Box<Path>),
    OneOrMore(Box<Path>),
    ZeroOrOne(Box<Path>),
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Predicate(p) => write!(f, "<{}>", p.as_str()),
            Path::Inverse(inner) => write!(f, "^{}", inner),
            Path::Sequence(paths) => {
                let parts: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", parts.join(" / "))
            }
            Path::Alternative(paths) => {
                let parts: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", parts.join(" | "))
            }
            Path::ZeroOrMore(inner) => write!(f, "{}*", inner),
            Path::OneOrMore(inner) => write!(f, "{}+", inner),
            Path::ZeroOrOne(inner) => write!(f, "{}?", inner),
        }
    }
}

//! Shape-driven extraction of record trees from RDF graphs. Shapes written
//! in the SHACL vocabulary compile to [`lens`] values; a lens executes
//! against a [`Container`] (focus term plus quad set) and produces a
//! dynamic [`Value`] record.

pub mod context;
pub mod datatypes;
pub mod env;
pub mod extract;
pub mod lens;
pub mod path;
pub mod shape;
pub mod test_utils;
pub mod types;
pub mod value;

// Vocabulary constants stay crate-private; callers address classes and
// datatypes by their own IRIs.
mod named_nodes;

pub use crate::context::{cached, RunContext};
pub use crate::extract::{extract_shapes, extract_shapes_with, ApplyFn, Shapes};
pub use crate::types::{Container, LensError, LensErrorKind, Path, Step};
pub use crate::value::{PathLens, SharedRecord, Value};

use crate::lens::Lens;
use oxigraph::model::{Quad, Term};

/// Compiles a shapes graph once and hands out its lenses by target class.
///
/// Most callers only need [`Extractor::extract`]: name a class, point at a
/// focus term in a data graph, get a record back. Post-processors, custom
/// class lenses, and hand-built combinator chains go through
/// [`extract_shapes_with`] and the [`lens`] module instead.
pub struct Extractor {
    shapes: Shapes,
}

impl Extractor {
    /// Compiles every node shape found in `shape_quads`.
    pub fn from_quads(shape_quads: &[Quad]) -> Result<Self, LensError> {
        Ok(Extractor {
            shapes: extract_shapes(shape_quads)?,
        })
    }

    pub fn shapes(&self) -> &Shapes {
        &self.shapes
    }

    /// The compiled lens for a target class, if one was registered.
    pub fn lens_for(&self, class: &Term) -> Option<Lens<Container, Value>> {
        self.shapes.lens(class)
    }

    /// Runs the lens for `class` against `focus` in `data`.
    pub fn extract(
        &self,
        class: &Term,
        focus: impl Into<Term>,
        data: &[Quad],
    ) -> Result<Value, LensError> {
        let lens = self.lens_for(class).ok_or_else(|| {
            LensError::new(
                LensErrorKind::UnknownClass,
                format!("no lens registered for class {}", class),
            )
        })?;
        lens.execute(&Container::from_quads(focus, data))
    }
}

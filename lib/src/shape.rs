//! Shapes: the parsed form of a `sh:NodeShape` and its compilation into a
//! record-producing lens.

use crate::datatypes::coerce_lens;
use crate::env::env_lens;
use crate::extract::{class_lens, LensCache};
use crate::lens::{pred, rdf_list, Lens, MultiLens};
use crate::named_nodes::{RDF, RDFS, SHACL};
use crate::path::parse_path;
use crate::types::{Container, LensError, LensErrorKind};
use crate::value::Value;
use oxigraph::model::Term;

/// One extraction field of a shape: where to navigate (`path`), what to call
/// the result (`name`), how many values are admissible, and how each value
/// container is turned into a record value (`extract`).
#[derive(Clone)]
pub struct ShapeField {
    pub name: String,
    pub path: MultiLens<Container, Container>,
    pub min_count: Option<u32>,
    pub max_count: Option<u32>,
    pub extract: Lens<Container, Value>,
}

/// A shape bound to one target class. A `sh:NodeShape` with several
/// `sh:targetClass` triples produces several `Shape`s sharing their fields.
#[derive(Clone)]
pub struct Shape {
    /// The shape subject, for diagnostics.
    pub id: String,
    /// The target class this shape extracts.
    pub ty: Term,
    pub description: Option<String>,
    pub fields: Vec<ShapeField>,
}

impl Shape {
    /// Compiles the shape into a lens producing one record with an entry per
    /// field. Field lenses run left to right on the same focus; their
    /// single-entry records are merged last-wins.
    pub fn to_lens(&self) -> Lens<Container, Value> {
        let fields: Vec<Lens<Container, Value>> = self.fields.iter().map(field_lens).collect();
        Lens::all(fields)
            .map(|records| {
                let mut merged = Value::empty_record();
                for record in &records {
                    merged.merge_from(record);
                }
                merged
            })
            .named("shape", Some(self.ty.to_string()))
    }
}

fn field_lens(field: &ShapeField) -> Lens<Container, Value> {
    let scalar = field.max_count.is_some_and(|m| m <= 1);
    let inner = if scalar {
        scalar_field(field)
    } else {
        sequence_field(field)
    };
    let lens = inner.named(&field.name, None);
    if field.min_count.unwrap_or(0) == 0 {
        // Optional fields absorb their failures at the field boundary and
        // contribute nothing to the record.
        lens.or(&Lens::new(|_, _| Ok(Value::empty_record())))
    } else {
        lens
    }
}

fn scalar_field(field: &ShapeField) -> Lens<Container, Value> {
    let path = field.path.clone();
    let extract = field.extract.clone();
    let name = field.name.clone();
    let min = field.min_count.unwrap_or(0);
    let max = field.max_count.unwrap_or(1);
    Lens::new(move |c: &Container, ctx| {
        let matches = path.apply(c, ctx)?;
        if matches.len() as u32 > max {
            return Err(ctx.fail(
                LensErrorKind::Cardinality,
                format!(
                    "field '{}' admits at most {} value(s), found {}",
                    name,
                    max,
                    matches.len()
                ),
            ));
        }
        match matches.into_iter().next() {
            None if min > 0 => Err(ctx.fail(
                LensErrorKind::MissingRequired,
                format!("required field '{}' has no value", name),
            )),
            None => Ok(Value::empty_record()),
            Some(value) => Ok(Value::record_of(name.clone(), extract.apply(&value, ctx)?)),
        }
    })
}

fn sequence_field(field: &ShapeField) -> Lens<Container, Value> {
    let collect = field
        .path
        .then_flat(&list_or_singleton())
        .then_all(&field.extract);
    let name = field.name.clone();
    let min = field.min_count.unwrap_or(0);
    let max = field.max_count;
    Lens::new(move |c: &Container, ctx| {
        let values = collect.apply(c, ctx)?;
        let count = values.len() as u32;
        if count == 0 && min > 0 {
            return Err(ctx.fail(
                LensErrorKind::MissingRequired,
                format!("required field '{}' has no value", name),
            ));
        }
        if count < min {
            return Err(ctx.fail(
                LensErrorKind::Cardinality,
                format!("field '{}' needs at least {} value(s), found {}", name, min, count),
            ));
        }
        if max.is_some_and(|m| count > m) {
            return Err(ctx.fail(
                LensErrorKind::Cardinality,
                format!(
                    "field '{}' admits at most {} value(s), found {}",
                    name,
                    max.unwrap(),
                    count
                ),
            ));
        }
        Ok(Value::record_of(name.clone(), Value::List(values)))
    })
}

/// A path target is either an RDF list of value nodes or a single value;
/// shapes accept `( a b c )` and repeated predicates interchangeably.
fn list_or_singleton() -> MultiLens<Container, Container> {
    MultiLens::new(|c: &Container, ctx| {
        let mut branch = ctx.branch();
        match rdf_list().apply(c, &mut branch) {
            Ok(items) => {
                ctx.adopt(branch);
                Ok(items)
            }
            Err(_) => Ok(vec![c.clone()]),
        }
    })
}

/// Parses the shape rooted at `c`. Fails with `WrongType` when the subject
/// is not a `sh:NodeShape`; a NodeShape with malformed properties is a hard
/// error. A subject typed both `sh:NodeShape` and `rdfs:Class` targets
/// itself in addition to its `sh:targetClass` objects.
pub(crate) fn extract_shape(c: &Container, cache: &LensCache) -> Result<Vec<Shape>, LensError> {
    let sh = SHACL::new();
    let rdf = RDF::new();
    let rdfs = RDFS::new();

    let types: Vec<Term> = pred(Some(rdf.type_.into_owned()))
        .execute(c)?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if !types.contains(&Term::from(sh.node_shape.into_owned())) {
        return Err(LensError::new(
            LensErrorKind::WrongType,
            format!("{} is not a sh:NodeShape", c.id),
        ));
    }

    let mut targets: Vec<Term> = pred(Some(sh.target_class.into_owned()))
        .execute(c)?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if types.contains(&Term::from(rdfs.class.into_owned())) && !targets.contains(&c.id) {
        targets.push(c.id.clone());
    }

    let description = pred(Some(sh.description.into_owned()))
        .execute(c)?
        .into_iter()
        .find_map(|t| match t.id {
            Term::Literal(l) => Some(l.value().to_string()),
            _ => None,
        });

    let mut fields = Vec::new();
    for property in pred(Some(sh.property.into_owned())).execute(c)? {
        fields.push(extract_field(&property, cache)?);
    }

    Ok(targets
        .into_iter()
        .map(|ty| Shape {
            id: c.id.to_string(),
            ty,
            description: description.clone(),
            fields: fields.clone(),
        })
        .collect())
}

fn extract_field(c: &Container, cache: &LensCache) -> Result<ShapeField, LensError> {
    let sh = SHACL::new();

    let name = pred(Some(sh.name.into_owned()))
        .execute(c)?
        .into_iter()
        .find_map(|t| match t.id {
            Term::Literal(l) => Some(l.value().to_string()),
            _ => None,
        })
        .ok_or_else(|| {
            LensError::new(
                LensErrorKind::Other,
                format!("property shape {} has no sh:name", c.id),
            )
        })?;

    let path_node = pred(Some(sh.path.into_owned()))
        .execute(c)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            LensError::new(
                LensErrorKind::Other,
                format!("property shape {} has no sh:path", c.id),
            )
        })?;
    let path = parse_path(&path_node)?.to_lens();

    let min_count = parse_count(c, sh.min_count.into_owned(), "sh:minCount")?;
    let max_count = parse_count(c, sh.max_count.into_owned(), "sh:maxCount")?;

    let class = pred(Some(sh.class.into_owned()))
        .execute(c)?
        .into_iter()
        .next();
    let datatype = pred(Some(sh.datatype.into_owned()))
        .execute(c)?
        .into_iter()
        .next();

    let extract = match (class, datatype) {
        (Some(_), Some(_)) => {
            return Err(LensError::new(
                LensErrorKind::Other,
                format!("field '{}' declares both sh:class and sh:datatype", name),
            ))
        }
        (None, None) => {
            return Err(LensError::new(
                LensErrorKind::Other,
                format!("field '{}' declares neither sh:class nor sh:datatype", name),
            ))
        }
        (Some(class), None) => class_lens(class.id, cache.clone()),
        (None, Some(datatype)) => match datatype.id {
            Term::NamedNode(dt) => env_lens(Some(dt.clone())).or(&coerce_lens(dt)),
            other => {
                return Err(LensError::new(
                    LensErrorKind::Other,
                    format!("sh:datatype of field '{}' is not an IRI: {}", name, other),
                ))
            }
        },
    };

    Ok(ShapeField {
        name,
        path,
        min_count,
        max_count,
        extract,
    })
}

fn parse_count(
    c: &Container,
    predicate: oxigraph::model::NamedNode,
    what: &str,
) -> Result<Option<u32>, LensError> {
    match pred(Some(predicate)).execute(c)?.into_iter().next() {
        None => Ok(None),
        Some(t) => match t.id {
            Term::Literal(l) => l.value().parse::<u32>().map(Some).map_err(|_| {
                LensError::new(
                    LensErrorKind::Other,
                    format!("invalid {} '{}' on {}", what, l.value(), c.id),
                )
            }),
            other => Err(LensError::new(
                LensErrorKind::Other,
                format!("{} on {} is not a literal: {}", what, c.id, other),
            )),
        },
    }
}

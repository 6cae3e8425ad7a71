use crate::lens::MultiLens;
use crate::types::{Container, LensError};
use oxigraph::model::{Quad, Term};
use oxsdatatypes::DateTime;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// A mutable, identity-preserving record. `Cached` hands out clones of the
/// `Rc` while the underlying map is still being populated; this is what lets
/// cyclic shape references resolve to a single shared object.
pub type SharedRecord = Rc<RefCell<BTreeMap<String, Value>>>;

/// A compiled property path, carried as a first-class value
/// (the `rdfl:PathLens` pseudo-class).
#[derive(Clone)]
pub struct PathLens(pub MultiLens<Container, Container>);

impl PathLens {
    pub fn execute(&self, focus: &Container) -> Result<Vec<Container>, LensError> {
        self.0.execute(focus)
    }
}

impl fmt::Debug for PathLens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PathLens")
    }
}

/// The dynamic result of a lens run. Field names come from the shape graph,
/// so records are string-keyed maps rather than static structs.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    DateTime(DateTime),
    Term(Term),
    Record(SharedRecord),
    List(Vec<Value>),
    Quads(Vec<Quad>),
    Lens(PathLens),
}

impl Value {
    pub fn empty_record() -> Value {
        Value::Record(Rc::new(RefCell::new(BTreeMap::new())))
    }

    pub fn record_of(name: impl Into<String>, value: Value) -> Value {
        let mut map = BTreeMap::new();
        map.insert(name.into(), value);
        Value::Record(Rc::new(RefCell::new(map)))
    }

    pub fn as_record(&self) -> Option<&SharedRecord> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Clones the named field out of a record value.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Record(r) => r.borrow().get(key).cloned(),
            _ => None,
        }
    }

    /// Copies every field of `other` into this record, last-wins. Non-record
    /// pairs are left untouched.
    pub fn merge_from(&mut self, other: &Value) {
        if let (Value::Record(target), Value::Record(source)) = (&*self, other) {
            if Rc::ptr_eq(target, source) {
                return;
            }
            let source = source.borrow();
            let mut target = target.borrow_mut();
            for (k, v) in source.iter() {
                target.insert(k.clone(), v.clone());
            }
        }
    }

    /// A `serde_json` snapshot of the value. Record identity is lost; a
    /// cyclic back-edge renders as the string `"<cycle>"`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut in_flight = HashSet::new();
        self.to_json_guarded(&mut in_flight)
    }

    fn to_json_guarded(&self, in_flight: &mut HashSet<usize>) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_string()),
            Value::Term(t) => serde_json::Value::String(term_value(t)),
            Value::Record(r) => {
                let key = Rc::as_ptr(r) as usize;
                if !in_flight.insert(key) {
                    return serde_json::Value::String("<cycle>".to_string());
                }
                let map = r
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json_guarded(in_flight)))
                    .collect();
                in_flight.remove(&key);
                serde_json::Value::Object(map)
            }
            Value::List(items) => serde_json::Value::Array(
                items.iter().map(|v| v.to_json_guarded(in_flight)).collect(),
            ),
            Value::Quads(quads) => serde_json::Value::Array(
                quads
                    .iter()
                    .map(|q| serde_json::Value::String(q.to_string()))
                    .collect(),
            ),
            Value::Lens(_) => serde_json::Value::String("<lens>".to_string()),
        }
    }
}

/// The lexical face of a term: literal lexical form, IRI string, or blank
/// node label.
pub fn term_value(term: &Term) -> String {
    match term {
        Term::NamedNode(n) => n.as_str().to_string(),
        Term::BlankNode(b) => b.as_str().to_string(),
        Term::Literal(l) => l.value().to_string(),
        Term::Triple(t) => t.to_string(),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Term(a), Value::Term(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Quads(a), Value::Quads(b)) => a == b,
            (Value::Lens(a), Value::Lens(b)) => a.0.same_lens(&b.0),
            _ => false,
        }
    }
}

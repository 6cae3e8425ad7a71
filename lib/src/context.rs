use crate::lens::Lens;
use crate::types::{Container, LensError, LensErrorKind, Step};
use crate::value::Value;
use oxigraph::model::Term;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type MemoKey = (usize, Term);

/// Per-execute state. The lineage stack is cloned at branch points so a
/// failed alternative cannot leak frames into the taken one; the memo table
/// is shared across branches because it is scoped to the whole run.
pub struct RunContext {
    lineage: Vec<Step>,
    memo: Rc<RefCell<HashMap<MemoKey, Value>>>,
}

impl RunContext {
    pub fn new() -> Self {
        RunContext {
            lineage: Vec::new(),
            memo: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// A branch-local view: own lineage, shared memo table.
    pub fn branch(&self) -> Self {
        RunContext {
            lineage: self.lineage.clone(),
            memo: Rc::clone(&self.memo),
        }
    }

    /// Takes over the lineage of a branch that succeeded, so descendant
    /// steps see the frames the winning alternative pushed.
    pub fn adopt(&mut self, branch: RunContext) {
        self.lineage = branch.lineage;
    }

    pub fn push(&mut self, step: Step) {
        self.lineage.push(step);
    }

    pub fn lineage(&self) -> &[Step] {
        &self.lineage
    }

    /// An error carrying a snapshot of the current lineage.
    pub fn fail(&self, kind: LensErrorKind, message: impl Into<String>) -> LensError {
        LensError {
            kind,
            message: message.into(),
            lineage: self.lineage.clone(),
        }
    }

    /// Stamps the current lineage onto an error raised without context
    /// access (user closures, compile-time helpers).
    pub fn stamp(&self, mut error: LensError) -> LensError {
        if error.lineage.is_empty() {
            error.lineage = self.lineage.clone();
        }
        error
    }

    fn memo_get(&self, key: &MemoKey) -> Option<Value> {
        self.memo.borrow().get(key).cloned()
    }

    fn memo_insert(&self, key: MemoKey, value: Value) {
        self.memo.borrow_mut().insert(key, value);
    }

    fn memo_remove(&self, key: &MemoKey) {
        self.memo.borrow_mut().remove(key);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        RunContext::new()
    }
}

/// Runs `lens` through the per-run memo table. A repeat visit for the same
/// `(lens, focus)` pair returns the identical record object, even while it is
/// still being populated further up the stack; that re-entry is what closes
/// cycles in both shape graphs and data.
///
/// Only named and blank node foci are memoised; literal foci cannot recurse.
pub(crate) fn run_cached(
    lens: &Lens<Container, Value>,
    focus: &Container,
    ctx: &mut RunContext,
) -> Result<Value, LensError> {
    match focus.id {
        Term::NamedNode(_) | Term::BlankNode(_) => {}
        _ => return lens.apply(focus, ctx),
    }
    let key = (lens.identity_key(), focus.id.clone());
    if let Some(existing) = ctx.memo_get(&key) {
        return Ok(existing);
    }

    let reserved = Value::empty_record();
    ctx.memo_insert(key.clone(), reserved.clone());
    let produced = match lens.apply(focus, ctx) {
        Ok(v) => v,
        Err(e) => {
            // A failed reservation must not satisfy later lookups.
            ctx.memo_remove(&key);
            return Err(e);
        }
    };

    match produced {
        Value::Record(_) => {
            let mut shared = reserved;
            shared.merge_from(&produced);
            Ok(shared)
        }
        other => {
            ctx.memo_insert(key, other.clone());
            Ok(other)
        }
    }
}

/// Wraps a lens so repeated invocations on the same focus within one run
/// share a single result object.
pub fn cached(lens: &Lens<Container, Value>) -> Lens<Container, Value> {
    let inner = lens.clone();
    Lens::new(move |focus, ctx| run_cached(&inner, focus, ctx))
}

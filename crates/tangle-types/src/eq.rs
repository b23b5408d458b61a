//! Structural comparison of two object graphs.
//!
//! Two graphs are equal when their scalars match and their composites can be
//! paired one-to-one such that paired objects have the same tag, kind and
//! contents. The pairing must be a bijection, so a shared object on one side
//! must be shared in the same places on the other, and a cycle must close at
//! the corresponding object.

use std::collections::{HashMap, VecDeque};

use crate::heap::{Handle, Heap, Items, ObjectKind, Value};

struct Matcher<'a> {
    left: &'a Heap,
    right: &'a Heap,
    forward: HashMap<Handle, Handle>,
    backward: HashMap<Handle, Handle>,
    pending: VecDeque<(Handle, Handle)>,
}

impl Matcher<'_> {
    fn pair(&mut self, a: Handle, b: Handle) -> bool {
        match (self.forward.get(&a), self.backward.get(&b)) {
            (Some(&fa), Some(&fb)) => fa == b && fb == a,
            (None, None) => {
                self.forward.insert(a, b);
                self.backward.insert(b, a);
                self.pending.push_back((a, b));
                true
            }
            _ => false,
        }
    }

    fn value(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Value::Text(x), Value::Text(y)) => x == y,
            (Value::Ref(x), Value::Ref(y)) => self.pair(*x, *y),
            _ => false,
        }
    }

    fn values(&mut self, a: &[Value], b: &[Value]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.value(x, y))
    }

    fn object(&mut self, a: Handle, b: Handle) -> bool {
        let (left_heap, right_heap) = (self.left, self.right);
        let (Ok(left), Ok(right)) = (left_heap.get(a), right_heap.get(b)) else {
            return false;
        };
        if left.tag != right.tag || left.frozen != right.frozen {
            return false;
        }
        match (&left.kind, &right.kind) {
            (
                ObjectKind::Instance { items: ia, fields: fa },
                ObjectKind::Instance { items: ib, fields: fb },
            ) => {
                let items_match = match (ia, ib) {
                    (Items::None, Items::None) => true,
                    (Items::Sequence(x), Items::Sequence(y)) => self.values(x, y),
                    (Items::Mapping(x), Items::Mapping(y)) => {
                        x.len() == y.len()
                            && x.iter()
                                .zip(y)
                                .all(|((ka, va), (kb, vb))| self.value(ka, kb) && self.value(va, vb))
                    }
                    _ => false,
                };
                // Field order is not significant.
                items_match
                    && fa.len() == fb.len()
                    && fa.iter().all(|(name, va)| match fb.get(name) {
                        Some(vb) => self.value(va, vb),
                        None => false,
                    })
            }
            (ObjectKind::Class, ObjectKind::Class) | (ObjectKind::Function, ObjectKind::Function) => {
                true
            }
            (
                ObjectKind::Bound { receiver: ra, selector: sa },
                ObjectKind::Bound { receiver: rb, selector: sb },
            ) => sa == sb && self.pair(*ra, *rb),
            (
                ObjectKind::Closure { name: na, captures: ca },
                ObjectKind::Closure { name: nb, captures: cb },
            ) => na == nb && self.values(ca, cb),
            (
                ObjectKind::Iterator { source: sa, position: pa },
                ObjectKind::Iterator { source: sb, position: pb },
            ) => pa == pb && self.pair(*sa, *sb),
            (ObjectKind::Foreign { layout: la }, ObjectKind::Foreign { layout: lb }) => la == lb,
            _ => false,
        }
    }
}

/// Compare `a` in `left` with `b` in `right` structurally, honoring cycles
/// and sharing.
pub fn graph_eq(left: &Heap, a: &Value, right: &Heap, b: &Value) -> bool {
    let mut matcher = Matcher {
        left,
        right,
        forward: HashMap::new(),
        backward: HashMap::new(),
        pending: VecDeque::new(),
    };
    if !matcher.value(a, b) {
        return false;
    }
    while let Some((x, y)) = matcher.pending.pop_front() {
        if !matcher.object(x, y) {
            return false;
        }
    }
    true
}

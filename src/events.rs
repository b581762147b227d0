//! Pointer event routing.
//!
//! Dispatch order mirrors paint order, inverted: the element drawn on top
//! hears the event first. Nodes are bucketed by effective z-index in
//! document pre-order; within a bucket later-painted (deeper, later)
//! elements run before their ancestors, and higher buckets run before
//! lower ones. A handler returning `EventFlow::Stop` ends the dispatch
//! outright.

use std::collections::BTreeMap;

use crate::style::{StyleProperty, StyleSetting, StyleValue};
use crate::tree::Tree;
use crate::types::{EventFlow, PointerEvent, PointerHandler};

/// Route one pointer event through the tree. Returns the number of
/// handlers invoked.
pub fn dispatch(tree: &Tree, event: &PointerEvent) -> usize {
    let root = match tree.root() {
        Some(r) => r,
        None => return 0,
    };

    // Bucket interested nodes by z in paint order.
    let mut layers: BTreeMap<i32, Vec<u32>> = BTreeMap::new();
    collect(tree, root, 0, event, &mut layers);

    // Snapshot the handlers before running any of them, so a handler that
    // mutates the tree cannot invalidate the iteration.
    let mut queue: Vec<PointerHandler> = Vec::new();
    for handles in layers.values().rev() {
        for &handle in handles.iter().rev() {
            if let Some(node) = tree.nodes.get(&handle) {
                if let Some(handlers) = node.handlers.get(&event.kind) {
                    queue.extend(handlers.iter().cloned());
                }
            }
        }
    }

    let mut invoked = 0;
    for handler in queue {
        invoked += 1;
        let flow = (&mut *handler.borrow_mut())(event);
        if flow == EventFlow::Stop {
            break;
        }
    }
    invoked
}

fn collect(
    tree: &Tree,
    handle: u32,
    parent_z: i32,
    event: &PointerEvent,
    layers: &mut BTreeMap<i32, Vec<u32>>,
) {
    let node = match tree.nodes.get(&handle) {
        Some(n) => n,
        None => return,
    };

    let z = match node.style(StyleProperty::ZIndex) {
        StyleSetting::Explicit(StyleValue::Cells(z)) => *z,
        _ => parent_z,
    };

    if node.screen_rect.contains(event.x as i32, event.y as i32)
        && node.handlers.contains_key(&event.kind)
    {
        layers.entry(z).or_default().push(handle);
    }

    for &child in &node.children {
        collect(tree, child, z, event, layers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::apply_style;
    use crate::types::{NodeKind, PointerKind, Rect};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(
        log: &Rc<RefCell<Vec<&'static str>>>,
        tag: &'static str,
        flow: EventFlow,
    ) -> PointerHandler {
        let log = Rc::clone(log);
        Rc::new(RefCell::new(move |_: &PointerEvent| {
            log.borrow_mut().push(tag);
            flow
        }))
    }

    fn click_at(x: u16, y: u16) -> PointerEvent {
        PointerEvent {
            kind: PointerKind::Click,
            x,
            y,
        }
    }

    /// A(z0) contains B(z0) contains C(z2), all covering the same cell.
    fn overlapping_tree(log: &Rc<RefCell<Vec<&'static str>>>) -> Tree {
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        let b = t.create_node(NodeKind::Box).unwrap();
        let c = t.create_node(NodeKind::Box).unwrap();
        t.append_child(a, b).unwrap();
        t.append_child(b, c).unwrap();
        t.set_root(a).unwrap();
        apply_style(t.get_mut(c).unwrap(), "z_index", "2");
        for h in [a, b, c] {
            t.get_mut(h).unwrap().screen_rect = Rect::new(0, 0, 10, 10);
        }
        t.on(a, PointerKind::Click, recorder(log, "A", EventFlow::Continue))
            .unwrap();
        t.on(b, PointerKind::Click, recorder(log, "B", EventFlow::Continue))
            .unwrap();
        t.on(c, PointerKind::Click, recorder(log, "C", EventFlow::Continue))
            .unwrap();
        t
    }

    #[test]
    fn test_topmost_first_then_depth_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let t = overlapping_tree(&log);
        let n = dispatch(&t, &click_at(5, 5));
        assert_eq!(n, 3);
        // C sits on a higher layer; within z0 the deeper B precedes A.
        assert_eq!(*log.borrow(), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_stop_halts_dispatch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        let b = t.create_node(NodeKind::Box).unwrap();
        t.append_child(a, b).unwrap();
        t.set_root(a).unwrap();
        for h in [a, b] {
            t.get_mut(h).unwrap().screen_rect = Rect::new(0, 0, 4, 4);
        }
        t.on(a, PointerKind::Click, recorder(&log, "A", EventFlow::Continue))
            .unwrap();
        t.on(b, PointerKind::Click, recorder(&log, "B", EventFlow::Stop))
            .unwrap();

        let n = dispatch(&t, &click_at(0, 0));
        assert_eq!(n, 1);
        assert_eq!(*log.borrow(), vec!["B"]);
    }

    #[test]
    fn test_miss_invokes_nothing() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let t = overlapping_tree(&log);
        assert_eq!(dispatch(&t, &click_at(50, 50)), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_kind_filtering() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let t = overlapping_tree(&log);
        let ev = PointerEvent {
            kind: PointerKind::ScrollUp,
            x: 5,
            y: 5,
        };
        assert_eq!(dispatch(&t, &ev), 0);
    }

    #[test]
    fn test_handlers_on_same_node_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut t = Tree::new();
        let a = t.create_node(NodeKind::Box).unwrap();
        t.set_root(a).unwrap();
        t.get_mut(a).unwrap().screen_rect = Rect::new(0, 0, 2, 2);
        t.on(a, PointerKind::Click, recorder(&log, "first", EventFlow::Continue))
            .unwrap();
        t.on(a, PointerKind::Click, recorder(&log, "second", EventFlow::Continue))
            .unwrap();

        dispatch(&t, &click_at(1, 1));
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_inherited_z_keeps_document_order() {
        // Raising a parent raises its handler-less descendants' layer too.
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut t = Tree::new();
        let root = t.create_node(NodeKind::Box).unwrap();
        let low = t.create_node(NodeKind::Box).unwrap();
        let raised = t.create_node(NodeKind::Box).unwrap();
        let inner = t.create_node(NodeKind::Box).unwrap();
        t.append_child(root, low).unwrap();
        t.append_child(root, raised).unwrap();
        t.append_child(raised, inner).unwrap();
        t.set_root(root).unwrap();
        apply_style(t.get_mut(raised).unwrap(), "z_index", "1");
        for h in [root, low, raised, inner] {
            t.get_mut(h).unwrap().screen_rect = Rect::new(0, 0, 8, 8);
        }
        t.on(low, PointerKind::Click, recorder(&log, "low", EventFlow::Continue))
            .unwrap();
        t.on(inner, PointerKind::Click, recorder(&log, "inner", EventFlow::Continue))
            .unwrap();

        dispatch(&t, &click_at(2, 2));
        // inner inherits z=1 from its raised parent.
        assert_eq!(*log.borrow(), vec!["inner", "low"]);
    }
}

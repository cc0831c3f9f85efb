extern crate std;

use std::{cell::Cell, ops::Range, prelude::v1::*, rc::Rc};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

// Returns the key and balance of every node in order, along with the key of the root.
fn shape(tree: &AvlTree<TestNode>) -> (Option<u32>, Vec<(u32, i8)>) {
    let root = tree.root.map(|root| unsafe { root.as_ref().key });
    let nodes = tree
        .iter()
        .map(|node| (node.key, node.links.balance()))
        .collect();

    (root, nodes)
}

fn tree_of(keys: &[u32]) -> AvlTree<TestNode> {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key, key));
        tree.assert_invariants();
    }

    tree
}

fn insert_find_all(keys: &[u32]) {
    let tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn four_elems_find() {
    insert_find_all(&[0, 1, 2, 3]);
    insert_find_all(&[0, 1, 3, 2]);
    insert_find_all(&[0, 2, 1, 3]);
    insert_find_all(&[0, 2, 3, 1]);
    insert_find_all(&[0, 3, 1, 2]);
    insert_find_all(&[0, 3, 2, 1]);

    insert_find_all(&[1, 0, 2, 3]);
    insert_find_all(&[1, 0, 3, 2]);
    insert_find_all(&[1, 2, 0, 3]);
    insert_find_all(&[1, 2, 3, 0]);
    insert_find_all(&[1, 3, 0, 2]);
    insert_find_all(&[1, 3, 2, 0]);

    insert_find_all(&[2, 0, 1, 3]);
    insert_find_all(&[2, 0, 3, 1]);
    insert_find_all(&[2, 1, 0, 3]);
    insert_find_all(&[2, 1, 3, 0]);
    insert_find_all(&[2, 3, 0, 1]);
    insert_find_all(&[2, 3, 1, 0]);

    insert_find_all(&[3, 0, 1, 2]);
    insert_find_all(&[3, 0, 2, 1]);
    insert_find_all(&[3, 1, 0, 2]);
    insert_find_all(&[3, 1, 2, 0]);
    insert_find_all(&[3, 2, 0, 1]);
    insert_find_all(&[3, 2, 1, 0]);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }

    for &key in keys {
        tree.insert(TestNode::new(key, key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_four() {
    insert_remove_all(&[0, 1, 2, 3]);
    insert_remove_all(&[0, 1, 3, 2]);
    insert_remove_all(&[0, 2, 1, 3]);
    insert_remove_all(&[0, 2, 3, 1]);
    insert_remove_all(&[0, 3, 1, 2]);
    insert_remove_all(&[0, 3, 2, 1]);

    insert_remove_all(&[1, 0, 2, 3]);
    insert_remove_all(&[1, 0, 3, 2]);
    insert_remove_all(&[1, 2, 0, 3]);
    insert_remove_all(&[1, 2, 3, 0]);
    insert_remove_all(&[1, 3, 0, 2]);
    insert_remove_all(&[1, 3, 2, 0]);

    insert_remove_all(&[2, 0, 1, 3]);
    insert_remove_all(&[2, 0, 3, 1]);
    insert_remove_all(&[2, 1, 0, 3]);
    insert_remove_all(&[2, 1, 3, 0]);
    insert_remove_all(&[2, 3, 0, 1]);
    insert_remove_all(&[2, 3, 1, 0]);

    insert_remove_all(&[3, 0, 1, 2]);
    insert_remove_all(&[3, 0, 2, 1]);
    insert_remove_all(&[3, 1, 0, 2]);
    insert_remove_all(&[3, 1, 2, 0]);
    insert_remove_all(&[3, 2, 0, 1]);
    insert_remove_all(&[3, 2, 1, 0]);
}

#[test]
fn remove_every_key_of_seven() {
    let keys = [4, 2, 6, 1, 3, 5, 7];

    for removed in 1..=7 {
        let mut tree = tree_of(&keys);
        let node = tree.remove(&removed).expect("item not found");
        assert_eq!(node.key, removed);
        tree.assert_invariants();

        let remaining: Vec<u32> = tree.iter().map(|node| node.key).collect();
        let expected: Vec<u32> = (1..=7).filter(|&k| k != removed).collect();
        assert_eq!(remaining, expected);
    }
}

#[test]
fn ascending_single_rotation() {
    let tree = tree_of(&[1, 2, 3]);
    assert_eq!(shape(&tree), (Some(2), vec![(1, 0), (2, 0), (3, 0)]));
}

#[test]
fn descending_single_rotation() {
    let tree = tree_of(&[3, 2, 1]);
    assert_eq!(shape(&tree), (Some(2), vec![(1, 0), (2, 0), (3, 0)]));
}

#[test]
fn zig_zag_double_rotation() {
    let tree = tree_of(&[3, 1, 2]);
    assert_eq!(shape(&tree), (Some(2), vec![(1, 0), (2, 0), (3, 0)]));

    let tree = tree_of(&[1, 3, 2]);
    assert_eq!(shape(&tree), (Some(2), vec![(1, 0), (2, 0), (3, 0)]));
}

#[test]
fn double_rotation_middle_leans_left() {
    // 30 leans left when 50 goes out of balance; 50 keeps the lone right subtree.
    let tree = tree_of(&[50, 20, 70, 10, 30, 25]);
    assert_eq!(
        shape(&tree),
        (
            Some(30),
            vec![(10, 0), (20, 0), (25, 0), (30, 0), (50, 1), (70, 0)]
        )
    );
}

#[test]
fn double_rotation_middle_leans_right() {
    // 30 leans right when 50 goes out of balance; 20 keeps the lone left subtree.
    let tree = tree_of(&[50, 20, 70, 10, 30, 35]);
    assert_eq!(
        shape(&tree),
        (
            Some(30),
            vec![(10, 0), (20, -1), (30, 0), (35, 0), (50, 0), (70, 0)]
        )
    );
}

#[test]
fn double_rotation_mirrored() {
    let tree = tree_of(&[20, 10, 50, 30, 70, 35]);
    assert_eq!(
        shape(&tree),
        (
            Some(30),
            vec![(10, 0), (20, -1), (30, 0), (35, 0), (50, 0), (70, 0)]
        )
    );

    let tree = tree_of(&[20, 10, 50, 30, 70, 25]);
    assert_eq!(
        shape(&tree),
        (
            Some(30),
            vec![(10, 0), (20, 0), (25, 0), (30, 0), (50, 1), (70, 0)]
        )
    );
}

#[test]
fn remove_single_rotation_continues() {
    let mut tree = tree_of(&[2, 1, 3, 4]);
    assert_eq!(shape(&tree), (Some(2), vec![(1, 0), (2, 1), (3, 1), (4, 0)]));

    tree.remove(&1);
    tree.assert_invariants();
    assert_eq!(shape(&tree), (Some(3), vec![(2, 0), (3, 0), (4, 0)]));
}

#[test]
fn remove_single_rotation_stops() {
    // The tall child is balanced, so the rotation leaves the subtree height unchanged.
    let mut tree = tree_of(&[2, 1, 4, 3, 5]);
    assert_eq!(
        shape(&tree),
        (Some(2), vec![(1, 0), (2, 1), (3, 0), (4, 0), (5, 0)])
    );

    tree.remove(&1);
    tree.assert_invariants();
    assert_eq!(
        shape(&tree),
        (Some(4), vec![(2, 1), (3, 0), (4, -1), (5, 0)])
    );
}

#[test]
fn remove_double_rotation() {
    let mut tree = tree_of(&[2, 1, 4, 3]);
    assert_eq!(shape(&tree), (Some(2), vec![(1, 0), (2, 1), (3, 0), (4, -1)]));

    tree.remove(&1);
    tree.assert_invariants();
    assert_eq!(shape(&tree), (Some(3), vec![(2, 0), (3, 0), (4, 0)]));
}

#[test]
fn remove_rebalances_more_than_once() {
    // Removing 12 unbalances 11, and the shortened subtree then unbalances the root.
    let mut tree = tree_of(&[8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1]);
    assert_eq!(tree.root.map(|r| unsafe { r.as_ref().key }), Some(8));

    tree.remove(&12);
    tree.assert_invariants();
    assert_eq!(tree.root.map(|r| unsafe { r.as_ref().key }), Some(5));
    assert_eq!(
        tree.iter().map(|node| node.key).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]
    );
}

#[test]
fn ordered_build_then_remove_min() {
    let mut tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(tree.height(), 3);

    tree.remove(&1);
    tree.assert_invariants();
    assert!(tree.is_balanced());
    assert_eq!(
        tree.iter().map(|node| node.key).collect::<Vec<_>>(),
        vec![2, 3, 4, 5, 6, 7]
    );
}

#[test]
fn remove_only_element() {
    let mut tree = tree_of(&[1]);

    let node = tree.remove(&1).expect("item not found");
    assert_eq!(node.key, 1);
    assert!(tree.is_empty());
    tree.assert_invariants();

    assert!(tree.find(&1).get().is_none());
    assert!(tree.first().is_none());
}

#[test]
fn remove_with_two_children_swaps_predecessor() {
    let mut tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(tree.root.map(|r| unsafe { r.as_ref().key }), Some(4));

    let predecessor = tree.get_raw(&3).expect("item not found");

    let removed = tree.remove(&4).expect("item not found");
    assert_eq!(removed.key, 4);
    tree.assert_invariants();

    // The predecessor node itself, not a copy of its contents, now sits at the root.
    assert_eq!(tree.root, Some(predecessor));
    assert_eq!(
        shape(&tree),
        (
            Some(3),
            vec![(1, 0), (2, -1), (3, 0), (5, 0), (6, 0), (7, 0)]
        )
    );
}

#[test]
fn remove_with_adjacent_predecessor() {
    let mut tree = tree_of(&[2, 1, 3]);

    tree.remove(&2);
    tree.assert_invariants();
    assert_eq!(shape(&tree), (Some(1), vec![(1, 1), (3, 0)]));
}

#[test]
fn insert_existing_key_replaces_in_place() {
    let mut tree = tree_of(&[1, 2, 3, 4, 5]);
    let before = shape(&tree);

    let old = tree.insert(TestNode::new(4, 40)).expect("key was present");
    assert_eq!((old.key, old.value), (4, 4));
    tree.assert_invariants();

    assert_eq!(shape(&tree), before);
    assert_eq!(tree.len(), 5);
    assert_eq!(tree.get(&4).map(|node| node.value), Some(40));
}

#[test]
fn remove_absent_key_is_noop() {
    let mut tree = tree_of(&[5, 3, 8, 1, 4]);
    let before = shape(&tree);

    assert!(tree.remove(&7).is_none());
    assert_eq!(shape(&tree), before);
    assert_eq!(tree.len(), 5);
}

#[test]
fn entry_inserts_and_replaces() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for key in [3, 1, 2] {
        match tree.entry(&key) {
            Entry::Vacant(entry) => unsafe {
                entry.insert(TestNode::new(key, 0));
            },
            Entry::Occupied(_) => panic!("{key} should be vacant"),
        }
    }
    tree.assert_invariants();

    match tree.entry(&2) {
        Entry::Occupied(mut entry) => {
            let old = unsafe { entry.insert(TestNode::new(2, 20)) };
            assert_eq!(old.value, 0);
            assert_eq!(entry.get().value, 20);
        }
        Entry::Vacant(_) => panic!("2 should be occupied"),
    }
    tree.assert_invariants();

    match tree.entry(&1) {
        Entry::Occupied(entry) => assert_eq!(entry.remove().key, 1),
        Entry::Vacant(_) => panic!("1 should be occupied"),
    }
    tree.assert_invariants();
    assert_eq!(tree.len(), 2);
}

#[test]
fn pop_first_and_last() {
    let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);

    assert_eq!(tree.pop_first().map(|node| node.key), Some(1));
    assert_eq!(tree.pop_last().map(|node| node.key), Some(7));
    tree.assert_invariants();

    assert_eq!(tree.first().map(|node| node.key), Some(2));
    assert_eq!(tree.last().map(|node| node.key), Some(6));
}

#[test]
fn iter_both_ends() {
    let tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 7);
    assert_eq!(iter.next().map(|node| node.key), Some(1));
    assert_eq!(iter.next_back().map(|node| node.key), Some(7));
    assert_eq!(iter.len(), 5);

    let rest: Vec<u32> = iter.map(|node| node.key).collect();
    assert_eq!(rest, vec![2, 3, 4, 5, 6]);

    // Iteration restarts from scratch each time.
    assert_eq!(tree.iter().count(), 7);
    assert_eq!(
        tree.iter().rev().map(|node| node.key).collect::<Vec<_>>(),
        vec![7, 6, 5, 4, 3, 2, 1]
    );
}

#[test]
fn cursor_walks_to_ghost_and_wraps() {
    let tree = tree_of(&[10, 20, 30]);

    let mut cursor = tree.find(&20);
    assert_eq!(cursor.get().map(|node| node.key), Some(20));
    assert_eq!(cursor.peek_prev().map(|node| node.key), Some(10));
    assert_eq!(cursor.peek_next().map(|node| node.key), Some(30));

    cursor.move_next();
    assert_eq!(cursor.get().map(|node| node.key), Some(30));

    cursor.move_next();
    assert!(cursor.get().is_none());

    cursor.move_next();
    assert_eq!(cursor.get().map(|node| node.key), Some(10));

    let cursor = tree.find(&25);
    assert!(cursor.get().is_none());
    assert_eq!(cursor.peek_next().map(|node| node.key), Some(10));
    assert_eq!(cursor.peek_prev().map(|node| node.key), Some(30));
}

#[test]
fn cursor_remove_keeps_position_across_swap() {
    let mut tree = tree_of(&[1, 2, 3, 4, 5, 6, 7]);

    // 4 has two children, so removing it trades places with 3 first.
    let mut cursor = tree.find_mut(&4);
    assert_eq!(cursor.remove_current().map(|node| node.key), Some(4));
    assert_eq!(cursor.get().map(|node| node.key), Some(5));

    assert_eq!(
        cursor.remove_current_and_move_prev().map(|node| node.key),
        Some(5)
    );
    assert_eq!(cursor.get().map(|node| node.key), Some(3));

    tree.assert_invariants();
    assert_eq!(
        tree.iter().map(|node| node.key).collect::<Vec<_>>(),
        vec![1, 2, 3, 6, 7]
    );
}

#[test]
fn ascending_thousand_stays_balanced() {
    let keys: Vec<u32> = (0..1000).collect();
    let mut tree = tree_of(&keys);

    assert!(tree.height() <= height_bound(1000));

    for key in (0..1000).step_by(2) {
        tree.remove(&key);
        tree.assert_invariants();
    }

    assert_eq!(tree.len(), 500);
    assert!(tree.iter().all(|node| node.key % 2 == 1));
}

#[derive(Debug)]
#[repr(C)]
struct DropNode {
    links: Links<DropNode>,
    key: u32,
    drops: Rc<Cell<usize>>,
}

impl Drop for DropNode {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

unsafe impl Linked<Links<DropNode>> for DropNode {
    type Handle = Box<DropNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::new(Box::into_raw(r)).unwrap()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<DropNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<DropNode>> for DropNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

#[test]
fn clear_and_drop_release_every_element() {
    let drops = Rc::new(Cell::new(0));
    let node = |key| {
        Box::new(DropNode {
            links: Links::new(),
            key,
            drops: drops.clone(),
        })
    };

    let mut tree: AvlTree<DropNode> = AvlTree::new();
    for key in 0..100 {
        tree.insert(node(key));
    }

    // Replacing an element hands the old one back to the caller.
    drop(tree.insert(node(50)));
    assert_eq!(drops.get(), 1);

    tree.clear();
    assert_eq!(drops.get(), 101);
    assert!(tree.is_empty());
    tree.assert_invariants();

    for key in 0..10 {
        tree.insert(node(key));
    }
    drop(tree);
    assert_eq!(drops.get(), 111);
}

#[test]
fn map_lookup_reports_missing_key() {
    let mut map: AvlMap<u32, &str> = [(1, "one"), (2, "two")].into_iter().collect();

    assert_eq!(map.lookup(&1), Ok(&"one"));
    assert_eq!(map.lookup(&3), Err(KeyNotFound));
    assert_eq!(KeyNotFound.to_string(), "key not found");

    *map.lookup_mut(&2).expect("key was inserted") = "deux";
    assert_eq!(map[&2], "deux");
    assert_eq!(map.lookup_mut(&3), Err(KeyNotFound));

    // A failed checked lookup never inserts.
    assert_eq!(map.len(), 2);
}

#[test]
#[should_panic(expected = "key not found")]
fn map_index_panics_on_missing_key() {
    let map: AvlMap<u32, u32> = AvlMap::new();
    let _ = map[&1];
}

#[test]
fn map_insert_overwrites() {
    let mut map = AvlMap::new();

    assert_eq!(map.insert("b", 1), None);
    assert_eq!(map.insert("a", 2), None);
    assert_eq!(map.insert("b", 3), Some(1));
    assert_eq!(map.len(), 2);

    if let Some(value) = map.get_mut("a") {
        *value += 10;
    }

    assert_eq!(map.iter().collect::<Vec<_>>(), vec![(&"a", &12), (&"b", &3)]);
    assert_eq!(format!("{map:?}"), r#"{"a": 12, "b": 3}"#);
    map.assert_invariants();
}

#[test]
fn map_cursor_and_ends() {
    let mut map: AvlMap<u32, u32> = (0..10).map(|k| (k, k * k)).collect();

    let mut cursor = map.find(&9);
    assert_eq!(cursor.key_value(), Some((&9, &81)));
    cursor.move_next();
    assert!(cursor.is_ghost());

    let cursor = map.find(&42);
    assert!(cursor.is_ghost());
    assert_eq!(map.cursor_first().key(), Some(&0));
    assert_eq!(map.cursor_last().value(), Some(&81));

    assert_eq!(map.first_key_value(), Some((&0, &0)));
    assert_eq!(map.pop_last(), Some((9, 81)));
    assert_eq!(map.pop_first(), Some((0, 0)));
    assert_eq!(map.remove(&5), Some(25));
    assert!(!map.contains_key(&5));
    map.assert_invariants();

    map.clear();
    assert!(map.is_empty());
    assert!(map.is_balanced());
    assert_eq!(map.height(), 0);
}

#[test]
fn map_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<AvlMap<u32, String>>();
}

// Upper bound on the height of an AVL tree holding `len` keys.
fn height_bound(len: usize) -> usize {
    (1.4405 * ((len + 2) as f64).log2()).ceil() as usize
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(0u32..1000, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(values, ops);
    }

    #[test]
    fn height_within_avl_bound(
        keys in proptest::collection::vec(any::<u32>(), FUZZ_RANGE),
        removals in proptest::collection::vec(any::<prop::sample::Index>(), 0..100),
    ) {
        let mut map = AvlMap::new();
        for &key in &keys {
            map.insert(key, ());
            prop_assert!(map.height() <= height_bound(map.len()));
        }

        for index in removals {
            if keys.is_empty() {
                break;
            }
            map.remove(index.get(&keys));
            prop_assert!(map.height() <= height_bound(map.len()));
        }

        map.assert_invariants();
    }

    #[test]
    fn repeated_insert_is_idempotent(keys in proptest::collection::vec(0u32..500, 0..200)) {
        let once = tree_of(&keys);

        let mut twice = tree_of(&keys);
        for &key in &keys {
            twice.insert(TestNode::new(key, key));
        }
        twice.assert_invariants();

        prop_assert_eq!(shape(&once), shape(&twice));
    }

    #[test]
    fn removing_absent_key_leaves_tree_unchanged(
        keys in proptest::collection::vec(0u32..500, 0..200),
        absent in 500u32..1000,
    ) {
        let mut tree = tree_of(&keys);
        let before = shape(&tree);
        let len = tree.len();

        prop_assert!(tree.remove(&absent).is_none());
        prop_assert_eq!(shape(&tree), before);
        prop_assert_eq!(tree.len(), len);
    }
}

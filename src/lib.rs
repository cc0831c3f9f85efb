//! An intrusive AVL tree, and an ordered map built on top of it.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`. A missing child has height 0 and a leaf has
//   height 1.
// - The balance of a node `x` is denoted `b(x)` and is given by `h(right(x)) - h(left(x))`.
// - A node "leans" toward `dir` if its balance has the sign of `dir` (left is negative).
//
// The fundamental invariants of an AVL tree are:
// 1. `b(x) ∈ {-1, 0, 1}` for every node `x`.
// 2. The stored balance of every node equals the difference of its subtree heights.
//
// Along with the usual search tree invariants:
// 3. Keys strictly increase in in-order traversal.
// 4. `p(left(x)) == x` and `p(right(x)) == x` whenever those children exist, and the root has no
//    parent.
//
// A balance of ±2 is only ever observed inside the fix-up routines in `rebalance`, and is
// corrected before they return.

#[cfg(feature = "alloc")]
extern crate alloc;

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not,
    pin::Pin, ptr::NonNull,
};

use cordyceps::Linked;

mod cursor;
#[cfg(feature = "alloc")]
mod debug;
mod entry;
mod error;
mod iter;
#[cfg(feature = "alloc")]
pub mod map;
#[cfg(any(feature = "model", all(test, feature = "std")))]
pub mod model;
mod rebalance;

#[cfg(all(test, feature = "std"))]
mod tests;

pub use cursor::{Cursor, CursorMut};
pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use error::KeyNotFound;
pub use iter::Iter;
#[cfg(feature = "alloc")]
pub use map::AvlMap;

use entry::InsertAs;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// The tree takes ownership of each element's [`Linked::Handle`] on insertion and gives it back on
/// removal. Elements still linked when the tree is cleared or dropped are released through their
/// handles.
///
/// Lookup, insertion and removal complete in _O(log(n))_ time.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

/// Links to other nodes in an [`AvlTree`], plus the node's balance factor.
pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Dir {
    /// The change in a node's balance when its `self` subtree grows by one level.
    #[inline]
    fn sign(self) -> i8 {
        match self {
            Dir::Left => -1,
            Dir::Right => 1,
        }
    }
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    balance: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

// SAFETY: the tree has exclusive ownership of its elements, so sending it sends them.
unsafe impl<T> Send for AvlTree<T> where T: TreeNode<Links<T>> + Send + ?Sized {}
unsafe impl<T> Sync for AvlTree<T> where T: TreeNode<Links<T>> + Sync + ?Sized {}

// SAFETY: links are only ever dereferenced by the tree that owns the node.
unsafe impl<T: Send + ?Sized> Send for Links<T> {}
unsafe impl<T: Sync + ?Sized> Sync for Links<T> {}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree has nonzero length");
            return;
        };

        unsafe {
            assert!(
                T::links(root).as_ref().parent().is_none(),
                "root has a parent pointer"
            );
            self.assert_invariants_at(root);
        }

        let mut count = 0;
        let mut prev: Option<&T::Key> = None;
        for item in self.iter() {
            if let Some(prev) = prev {
                assert!(
                    prev < item.key(),
                    "keys out of order: {prev:?} is not less than {:?}",
                    item.key()
                );
            }
            prev = Some(item.key());
            count += 1;
        }

        assert_eq!(count, self.len, "length does not match element count");
    }

    // Checks the invariants of the subtree rooted at `node` and returns its height.
    unsafe fn assert_invariants_at(&self, node: NonNull<T>) -> usize {
        unsafe {
            let mut heights = [0_usize; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = T::links(node).as_ref().child(dir) {
                    // Ensure the child's parent link points to this node.
                    let parent = T::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent, "child parent pointer points elsewhere");

                    heights[dir as usize] = self.assert_invariants_at(child);
                }
            }

            // Ensure the stored balance is legal and agrees with the actual heights.
            let balance = T::links(node).as_ref().balance();
            let actual = heights[Dir::Right as usize] as isize - heights[Dir::Left as usize] as isize;
            assert_eq!(
                balance as isize,
                actual,
                "stored balance of {:?} disagrees with its subtree heights",
                node.as_ref().key()
            );
            assert!(
                (-1..=1).contains(&balance),
                "{:?} has illegal balance {balance}",
                node.as_ref().key()
            );

            1 + heights[0].max(heights[1])
        }
    }

    /// Returns `true` if every subtree satisfies the AVL height condition.
    ///
    /// Heights are recomputed from scratch; the stored balance factors are not consulted.
    pub fn is_balanced(&self) -> bool {
        match self.root {
            Some(root) => unsafe { self.balanced_height(root).is_some() },
            None => true,
        }
    }

    // Returns the height of the subtree at `node`, or `None` if any node in it is unbalanced.
    unsafe fn balanced_height(&self, node: NonNull<T>) -> Option<usize> {
        unsafe {
            let links = T::links(node).as_ref();
            let left = match links.left() {
                Some(left) => self.balanced_height(left)?,
                None => 0,
            };
            let right = match links.right() {
                Some(right) => self.balanced_height(right)?,
                None => 0,
            };

            (left.abs_diff(right) <= 1).then(|| 1 + left.max(right))
        }
    }

    /// Returns the number of nodes on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        self.subtree_height(self.root)
    }

    fn subtree_height(&self, node: Link<T>) -> usize {
        let Some(node) = node else {
            return 0;
        };

        unsafe {
            let links = T::links(node).as_ref();
            1 + self
                .subtree_height(links.left())
                .max(self.subtree_height(links.right()))
        }
    }

    /// Returns a reference to the element corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the element corresponding to `key`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that neither the links nor the key of the returned element are
    /// modified.
    pub unsafe fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    /// Returns `true` if the tree contains an element corresponding to `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.search(key).ok()
    }

    // Descends from the root looking for `key`.
    //
    // Returns the matching node, or the position a node with that key would be linked at.
    fn search<Q>(&self, key: &Q) -> Result<NonNull<T>, InsertAs<T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return Err(InsertAs::Root);
        };

        loop {
            unsafe {
                let dir = match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => Dir::Left,
                    Ordering::Equal => return Ok(cur),
                    Ordering::Greater => Dir::Right,
                };

                match T::links(cur).as_ref().child(dir) {
                    Some(child) => cur = child,
                    None => return Err(InsertAs::Child { parent: cur, dir }),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.first_raw()
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.last_raw()
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    pub(crate) fn first_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Left) })
    }

    pub(crate) fn last_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Right) })
    }

    /// Gets the entry for `key` for in-place manipulation.
    pub fn entry<Q>(&mut self, key: &Q) -> Entry<'_, T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            Ok(node) => unsafe { Entry::occupied(self, node) },
            Err(insert_as) => unsafe { Entry::vacant(self, insert_as) },
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already holds an element with an equal key, `item` takes over that element's
    /// position and the old element is returned. The shape of the tree does not change in that
    /// case.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        // SAFETY: `ptr` was just produced from a live handle, and is not linked into the tree
        // until after the search completes.
        let found = self.search(unsafe { ptr.as_ref() }.key());

        unsafe {
            match found {
                Ok(existing) => Some(self.replace_at(existing, ptr)),
                Err(InsertAs::Root) => {
                    self.insert_as_root(ptr);
                    None
                }
                Err(InsertAs::Child { parent, dir }) => {
                    self.insert_as_child(parent, dir, ptr);
                    None
                }
            }
        }
    }

    // Links `ptr` as the sole node of an empty tree.
    pub(crate) unsafe fn insert_as_root(&mut self, ptr: NonNull<T>) {
        debug_assert!(self.root.is_none(), "tree must be empty");

        unsafe { T::links(ptr).as_mut().reset() };

        self.root = Some(ptr);
        self.len += 1;
    }

    // Links `ptr` as the `dir` child of `parent` and restores balance.
    //
    // # Safety
    //
    // The caller must ensure that `parent` is in this tree, that its `dir` child is empty, and
    // that `ptr`'s key belongs at that position.
    pub(crate) unsafe fn insert_as_child(&mut self, parent: NonNull<T>, dir: Dir, ptr: NonNull<T>) {
        unsafe {
            debug_assert!(
                T::links(parent).as_ref().child(dir).is_none(),
                "insertion slot must be empty"
            );

            let links = T::links(ptr).as_mut();
            links.reset();
            links.set_parent(Some(parent));

            T::links(parent).as_mut().set_child(dir, Some(ptr));
        }

        self.len += 1;
        self.rebalance_inserted(ptr);
    }

    // Puts `new` in the position of `old`, which is unlinked and returned.
    //
    // # Safety
    //
    // The caller must ensure that `old` is in this tree, that `new` is not, and that their keys
    // are equal.
    pub(crate) unsafe fn replace_at(&mut self, old: NonNull<T>, new: NonNull<T>) -> T::Handle {
        unsafe {
            let old_links = T::links(old).as_ref();
            let parent = old_links.parent();
            let left = old_links.left();
            let right = old_links.right();
            let balance = old_links.balance();

            self.replace_child_or_set_root(parent, old, Some(new));
            self.maybe_set_parent(left, Some(new));
            self.maybe_set_parent(right, Some(new));

            let new_links = T::links(new).as_mut();
            new_links.set_parent(parent);
            new_links.set_left(left);
            new_links.set_right(right);
            new_links.set_balance(balance);

            T::links(old).as_mut().reset();

            T::from_ptr(old)
        }
    }

    /// Removes the element corresponding to `key` from the tree, if any.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.first_raw()?;
        Some(unsafe { self.remove_at(first) })
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.last_raw()?;
        Some(unsafe { self.remove_at(last) })
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            let left = T::links(node).as_ref().left();
            let right = T::links(node).as_ref().right();

            if let (Some(left), Some(_)) = (left, right) {
                // Trade places with the in-order predecessor. The predecessor has no right child,
                // so afterwards `node` has at most one child. Links are exchanged rather than
                // contents so that pointers to either element stay valid.
                let predecessor = self.extreme_in_subtree(left, Dir::Right);
                self.swap_nodes(node, predecessor);
            }

            if let Some((parent, shrunk)) = self.splice_out(node) {
                self.rebalance_removed(parent, shrunk);
            }

            T::links(node).as_mut().reset();
            self.len -= 1;

            T::from_ptr(node)
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = self.extreme_in_subtree(cur, Dir::Left);
                let parent = T::links(cur).as_ref().parent();
                let right = T::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                T::links(cur).as_mut().reset();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    /// Returns an iterator over the elements of the tree in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Returns a cursor pointing at the element corresponding to `key`.
    ///
    /// If there is no such element, the cursor points at the "ghost" non-element.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key);
        Cursor::at(self, ptr)
    }

    /// Returns a mutable cursor pointing at the element corresponding to `key`.
    ///
    /// If there is no such element, the cursor points at the "ghost" non-element.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key);
        CursorMut::at(self, ptr)
    }

    /// Returns a cursor pointing at the minimum element of the tree.
    pub fn cursor_first(&self) -> Cursor<'_, T> {
        Cursor::first(self)
    }

    /// Returns a cursor pointing at the maximum element of the tree.
    pub fn cursor_last(&self) -> Cursor<'_, T> {
        Cursor::last(self)
    }

    /// Returns a mutable cursor pointing at the minimum element of the tree.
    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::first(self)
    }

    /// Returns a mutable cursor pointing at the maximum element of the tree.
    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::last(self)
    }

    // Support methods ========================================================

    // Returns the in-order successor of `node`.
    #[inline]
    pub(crate) unsafe fn successor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe { self.neighbor_raw(node, Dir::Right) }
    }

    // Returns the in-order predecessor of `node`.
    #[inline]
    pub(crate) unsafe fn predecessor_raw(&self, node: NonNull<T>) -> Link<T> {
        unsafe { self.neighbor_raw(node, Dir::Left) }
    }

    // Returns the in-order neighbor of `node` in direction `dir`.
    unsafe fn neighbor_raw(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            if let Some(child) = T::links(node).as_ref().child(dir) {
                return Some(self.extreme_in_subtree(child, !dir));
            }

            // Ascend until `cur` is reached from the opposite side.
            let mut cur = node;
            while let Some(parent) = T::links(cur).as_ref().parent() {
                if T::links(parent).as_ref().child(!dir) == Some(cur) {
                    return Some(parent);
                }

                cur = parent;
            }

            None
        }
    }

    // Returns the node furthest in direction `dir` within the subtree rooted at `root`.
    #[inline]
    unsafe fn extreme_in_subtree(&self, root: NonNull<T>, dir: Dir) -> NonNull<T> {
        let mut cur = root;

        while let Some(next) = unsafe { T::links(cur).as_ref().child(dir) } {
            cur = next;
        }

        cur
    }

    // Exchanges the tree positions of `a` and `b`, including their balances.
    //
    // All other nodes keep their positions. `a` and `b` may be adjacent.
    unsafe fn swap_nodes(&mut self, a: NonNull<T>, b: NonNull<T>) {
        unsafe {
            let a_position = self.position(a);
            let b_position = self.position(b);

            let (a_parent, a_left, a_right, a_balance) = T::links(a).as_ref().snapshot();
            let (b_parent, b_left, b_right, b_balance) = T::links(b).as_ref().snapshot();

            // Links between `a` and `b` are exchanged as well.
            let other = |link: Link<T>| match link {
                Some(n) if n == a => Some(b),
                Some(n) if n == b => Some(a),
                link => link,
            };

            let links = T::links(a).as_mut();
            links.set_parent(other(b_parent));
            links.set_left(other(b_left));
            links.set_right(other(b_right));
            links.set_balance(b_balance);

            let links = T::links(b).as_mut();
            links.set_parent(other(a_parent));
            links.set_left(other(a_left));
            links.set_right(other(a_right));
            links.set_balance(a_balance);

            // Point each vacated slot's parent at its new occupant.
            for (node, position) in [(b, a_position), (a, b_position)] {
                match position {
                    None => self.root = Some(node),
                    Some((parent, _)) if parent == a || parent == b => {}
                    Some((parent, dir)) => {
                        T::links(parent).as_mut().set_child(dir, Some(node));
                    }
                }
            }

            for node in [a, b] {
                let left = T::links(node).as_ref().left();
                let right = T::links(node).as_ref().right();
                self.maybe_set_parent(left, Some(node));
                self.maybe_set_parent(right, Some(node));
            }
        }
    }

    // Unlinks `node`, which must have at most one child, elevating that child into its place.
    //
    // Returns the former parent of `node` and the side of it which shrank.
    unsafe fn splice_out(&mut self, node: NonNull<T>) -> Option<(NonNull<T>, Dir)> {
        unsafe {
            let links = T::links(node).as_ref();
            let parent = links.parent();
            let left = links.left();
            let right = links.right();

            debug_assert!(
                left.is_none() || right.is_none(),
                "spliced node must have at most one child"
            );

            let child = left.or(right);
            let position = self.position(node);

            self.replace_child_or_set_root(parent, node, child);
            self.maybe_set_parent(child, parent);

            position
        }
    }

    // Returns the parent of `node` and which of its children `node` is.
    #[inline]
    unsafe fn position(&self, node: NonNull<T>) -> Option<(NonNull<T>, Dir)> {
        unsafe {
            let parent = T::links(node).as_ref().parent()?;
            Some((parent, self.which_child(parent, node)))
        }
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that `old_child` is a child node of `parent`.
    #[inline]
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Option<NonNull<T>>,
    ) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert_eq!(
                T::links(parent).as_ref().child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );

            T::links(parent).as_mut().set_child(dir, new_child);
        }
    }

    #[inline]
    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if unsafe { T::links(parent).as_ref().left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }

    #[inline]
    unsafe fn balance(&self, node: NonNull<T>) -> i8 {
        unsafe { T::links(node).as_ref().balance() }
    }

    #[inline]
    unsafe fn set_balance(&mut self, node: NonNull<T>, balance: i8) {
        unsafe { T::links(node).as_mut().set_balance(balance) }
    }

    // Adds `diff` to the balance of `node` and returns the result.
    #[inline]
    unsafe fn adjust_balance(&mut self, node: NonNull<T>, diff: i8) -> i8 {
        unsafe {
            let inner = T::links(node).as_mut().inner.get_mut();
            inner.balance = inner
                .balance
                .checked_add(diff)
                .expect("balance factor overflowed");
            inner.balance
        }
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> fmt::Debug for AvlTree<T>
where
    T: TreeNode<Links<T>> + fmt::Debug + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'tree, T> IntoIterator for &'tree AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                balance: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    // Unlinks and zeroes the balance.
    #[inline]
    fn reset(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.balance = 0;
    }

    #[inline]
    fn snapshot(&self) -> (Link<T>, Link<T>, Link<T>, i8) {
        (self.parent(), self.left(), self.right(), self.balance())
    }

    #[inline]
    fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_balance(&mut self, balance: i8) {
        self.inner.get_mut().balance = balance;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("balance", &self.balance())
            .finish()
    }
}

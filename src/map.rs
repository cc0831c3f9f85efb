//! An ordered map built on [`AvlTree`].

use alloc::boxed::Box;
use core::{
    borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, mem, ops::Index, ptr::NonNull,
};

use cordyceps::Linked;

use crate::{AvlTree, Entry, KeyNotFound, Links, TreeNode};

/// An ordered map based on an [AVL tree].
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlMap<K: Ord + fmt::Debug, V> {
    tree: AvlTree<MapNode<K, V>>,
}

struct MapNode<K, V> {
    links: Links<MapNode<K, V>>,
    key: K,
    value: V,
    _unpin: PhantomPinned,
}

impl<K, V> MapNode<K, V> {
    fn boxed(key: K, value: V) -> Box<Self> {
        Box::new(MapNode {
            links: Links::new(),
            key,
            value,
            _unpin: PhantomPinned,
        })
    }
}

unsafe impl<K, V> Linked<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<MapNode<K, V>>> {
        let ptr = ptr.as_ptr();
        // SAFETY: `ptr` is non-null, so a pointer to one of its fields is as well.
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord + fmt::Debug, V> TreeNode<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl<K: Ord + fmt::Debug, V> AvlMap<K, V> {
    /// Creates a new, empty `AvlMap`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Returns `true` if the map contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value associated with `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().value)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // SAFETY: only the value is handed out, never the key or the links. Pinning is not
        // structural for `node.value`.
        unsafe {
            self.tree
                .get_mut(key)
                .map(|node| &mut node.get_unchecked_mut().value)
        }
    }

    /// Returns a reference to the value associated with `key`, or [`KeyNotFound`] if there is
    /// none.
    pub fn lookup<Q>(&self, key: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(KeyNotFound)
    }

    /// Returns a mutable reference to the value associated with `key`, or [`KeyNotFound`] if there
    /// is none.
    ///
    /// Unlike [`AvlMap::insert`], this never adds an entry.
    pub fn lookup_mut<Q>(&mut self, key: &Q) -> Result<&mut V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_mut(key).ok_or(KeyNotFound)
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already held a value for `key`, it is overwritten in place and returned; the key
    /// itself is not updated.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.tree.entry(&key) {
            Entry::Occupied(mut entry) => {
                // SAFETY: only the value is modified.
                let node = unsafe { entry.get_mut().get_unchecked_mut() };
                Some(mem::replace(&mut node.value, value))
            }

            Entry::Vacant(entry) => {
                // SAFETY: the entry was looked up with this very key.
                unsafe { entry.insert(MapNode::boxed(key, value)) };
                None
            }
        }
    }

    /// Removes the value associated with `key` from the map.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|node| node.value)
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first().map(|node| {
            let MapNode { key, value, .. } = *node;
            (key, value)
        })
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last().map(|node| {
            let MapNode { key, value, .. } = *node;
            (key, value)
        })
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Returns a cursor pointing at the entry for `key`.
    ///
    /// If the map has no such entry, the cursor points at the "ghost" non-element.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor {
            inner: self.tree.find(key),
        }
    }

    /// Returns a cursor pointing at the entry with the minimum key.
    pub fn cursor_first(&self) -> Cursor<'_, K, V> {
        Cursor {
            inner: self.tree.cursor_first(),
        }
    }

    /// Returns a cursor pointing at the entry with the maximum key.
    pub fn cursor_last(&self) -> Cursor<'_, K, V> {
        Cursor {
            inner: self.tree.cursor_last(),
        }
    }

    /// Returns `true` if every subtree of the underlying tree satisfies the AVL height condition.
    pub fn is_balanced(&self) -> bool {
        self.tree.is_balanced()
    }

    /// Returns the height of the underlying tree.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Writes a Graphviz rendering of the underlying tree to `w`.
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, w: W) -> fmt::Result {
        self.tree.dotgraph(name, w)
    }

    /// Renders the underlying tree with [`AvlMap::dotgraph`] into a new string.
    pub fn to_dotgraph(&self, name: &str) -> alloc::string::String {
        self.tree.to_dotgraph(name)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}

impl<K: Ord + fmt::Debug, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord + fmt::Debug, V, Q> Index<&Q> for AvlMap<K, V>
where
    K: Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// Returns a reference to the value associated with `key`.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        match self.lookup(key) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<K: Ord + fmt::Debug, V> Extend<(K, V)> for AvlMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord + fmt::Debug, V> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AvlMap::new();
        map.extend(iter);
        map
    }
}

impl<'map, K: Ord + fmt::Debug, V> IntoIterator for &'map AvlMap<K, V> {
    type Item = (&'map K, &'map V);
    type IntoIter = Iter<'map, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of an [`AvlMap`], sorted by key.
pub struct Iter<'map, K: Ord + fmt::Debug, V> {
    inner: crate::Iter<'map, MapNode<K, V>>,
}

impl<'map, K: Ord + fmt::Debug, V> Clone for Iter<'map, K, V> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<'map, K: Ord + fmt::Debug, V> Iterator for Iter<'map, K, V> {
    type Item = (&'map K, &'map V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'map, K: Ord + fmt::Debug, V> DoubleEndedIterator for Iter<'map, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|node| (&node.key, &node.value))
    }
}

impl<'map, K: Ord + fmt::Debug, V> ExactSizeIterator for Iter<'map, K, V> {}

impl<'map, K: Ord + fmt::Debug, V> FusedIterator for Iter<'map, K, V> {}

/// A cursor over an [`AvlMap`].
///
/// See [`crate::Cursor`] for the movement semantics; the "ghost" non-element marks the end of the
/// map.
pub struct Cursor<'map, K: Ord + fmt::Debug, V> {
    inner: crate::Cursor<'map, MapNode<K, V>>,
}

impl<'map, K: Ord + fmt::Debug, V> Cursor<'map, K, V> {
    /// Returns the entry the cursor points at, or `None` at the "ghost" non-element.
    pub fn key_value(&self) -> Option<(&K, &V)> {
        self.inner.get().map(|node| (&node.key, &node.value))
    }

    /// Returns the key the cursor points at, or `None` at the "ghost" non-element.
    pub fn key(&self) -> Option<&K> {
        self.inner.get().map(|node| &node.key)
    }

    /// Returns the value the cursor points at, or `None` at the "ghost" non-element.
    pub fn value(&self) -> Option<&V> {
        self.inner.get().map(|node| &node.value)
    }

    /// Returns `true` if the cursor points at the "ghost" non-element.
    pub fn is_ghost(&self) -> bool {
        self.inner.get().is_none()
    }

    /// Moves the cursor to the entry with the next larger key.
    pub fn move_next(&mut self) {
        self.inner.move_next();
    }

    /// Moves the cursor to the entry with the next smaller key.
    pub fn move_prev(&mut self) {
        self.inner.move_prev();
    }

    /// Returns the entry after the current one without moving the cursor.
    pub fn peek_next(&self) -> Option<(&K, &V)> {
        self.inner.peek_next().map(|node| (&node.key, &node.value))
    }

    /// Returns the entry before the current one without moving the cursor.
    pub fn peek_prev(&self) -> Option<(&K, &V)> {
        self.inner.peek_prev().map(|node| (&node.key, &node.value))
    }
}

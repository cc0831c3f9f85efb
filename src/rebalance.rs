//! Rotations and the bottom-up fix-up passes run after insertion and removal.

use core::ptr::NonNull;

use tracing::trace;

use crate::{AvlTree, Dir, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    // Rotates `node` down toward `dir`, promoting its `!dir` child into its position.
    //
    // The balances of affected nodes are not updated.
    //
    // A left rotation is `rotate(n, Dir::Left)`, and a right rotation is `rotate(n, Dir::Right)`.
    pub(crate) unsafe fn rotate(&mut self, node: NonNull<T>, dir: Dir) {
        unsafe {
            trace!(key = ?node.as_ref().key(), ?dir, "rotate");

            let up = T::links(node)
                .as_ref()
                .child(!dir)
                .expect("rotation requires a child on the rising side");

            // - `node` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `node`.
            let across = T::links(up).as_ref().child(dir);
            T::links(node).as_mut().set_child(!dir, across);
            self.maybe_set_parent(across, Some(node));

            T::links(up).as_mut().set_child(dir, Some(node));
            let parent = T::links(node).as_mut().set_parent(Some(up));
            T::links(up).as_mut().set_parent(parent);

            self.replace_child_or_set_root(parent, node, Some(up));
        }
    }

    // Performs a double rotation at `node`, whose `dir` child `child` leans away from `dir`,
    // lifting `middle` (the `!dir` child of `child`) into the position of `node`.
    //
    // Balances of all three nodes are resolved; `middle` ends up balanced.
    unsafe fn rotate_twice(
        &mut self,
        node: NonNull<T>,
        child: NonNull<T>,
        middle: NonNull<T>,
        dir: Dir,
    ) {
        unsafe {
            let lean = dir.sign();
            let middle_balance = self.balance(middle);

            self.rotate(child, dir);
            self.rotate(node, !dir);

            // `node` inherits the `!dir` subtree of `middle`, and `child` inherits the `dir`
            // subtree. Whichever of them received the shorter subtree leans away from it.
            let (node_balance, child_balance) = if middle_balance == lean {
                (-lean, 0)
            } else if middle_balance == -lean {
                (0, lean)
            } else {
                (0, 0)
            };

            self.set_balance(node, node_balance);
            self.set_balance(child, child_balance);
            self.set_balance(middle, 0);
        }
    }

    // Performs a bottom-up rebalance of the tree after the insertion of `node`.
    //
    // Invariants:
    // - `node` is a leaf with balance 0.
    // - The balances of all other nodes predate the insertion.
    pub(crate) fn rebalance_inserted(&mut self, node: NonNull<T>) {
        unsafe {
            debug_assert_eq!(self.balance(node), 0);

            let mut child = node;
            let Some(mut parent) = T::links(node).as_ref().parent() else {
                return;
            };

            // `child`'s subtree has just grown by one level. Each ancestor absorbs the growth
            // exactly once, so a balance of ±2 is only ever seen in the step that resolves it.
            loop {
                let dir = self.which_child(parent, child);

                debug_assert!(
                    (-1..=1).contains(&self.balance(parent)),
                    "ancestor already out of balance before insertion fix-up"
                );

                match self.adjust_balance(parent, dir.sign()) {
                    // The shorter side caught up; the height of `parent` is unchanged.
                    0 => return,

                    // `parent` grew as well; ascend.
                    -1 | 1 => {
                        child = parent;
                        parent = match T::links(parent).as_ref().parent() {
                            Some(p) => p,
                            None => return,
                        };
                    }

                    // A rotation restores the height `parent` had before insertion.
                    _ => {
                        self.rebalance_inserted_at(parent, child, dir);
                        return;
                    }
                }
            }
        }
    }

    // Restores balance at `node`, which leans twice toward its `dir` child `child`.
    unsafe fn rebalance_inserted_at(&mut self, node: NonNull<T>, child: NonNull<T>, dir: Dir) {
        unsafe {
            let lean = dir.sign();

            if self.balance(child) == lean {
                trace!(key = ?node.as_ref().key(), ?dir, "insert: single rotation");

                self.rotate(node, !dir);
                self.set_balance(node, 0);
                self.set_balance(child, 0);
            } else {
                trace!(key = ?node.as_ref().key(), ?dir, "insert: double rotation");

                debug_assert_eq!(self.balance(child), -lean);
                let middle = T::links(child)
                    .as_ref()
                    .child(!dir)
                    .expect("child leaning inward must have an inner child");

                self.rotate_twice(node, child, middle, dir);
            }
        }
    }

    // Performs a bottom-up rebalance of the tree after a node was spliced out of the `shrunk` side
    // of `parent`.
    //
    // Unlike insertion, a rotation may be needed at every level of the ascent.
    pub(crate) unsafe fn rebalance_removed(&mut self, parent: NonNull<T>, shrunk: Dir) {
        let mut next = Some((parent, shrunk));

        while let Some((node, shrunk)) = next {
            unsafe {
                next = match self.adjust_balance(node, -shrunk.sign()) {
                    // `node` lost a level; its parent must account for it.
                    0 => self.position(node),

                    // The taller side still holds the height of `node`.
                    -1 | 1 => None,

                    _ => self.rebalance_removed_at(node, !shrunk),
                };
            }
        }
    }

    // Restores balance at `node`, which leans twice toward `tall`.
    //
    // Returns the next node to adjust and the side of it which shrank, or `None` if the height of
    // the rotated subtree is unchanged.
    unsafe fn rebalance_removed_at(
        &mut self,
        node: NonNull<T>,
        tall: Dir,
    ) -> Option<(NonNull<T>, Dir)> {
        unsafe {
            let lean = tall.sign();
            let child = T::links(node)
                .as_ref()
                .child(tall)
                .expect("node leaning twice must have a child on its tall side");
            let child_balance = self.balance(child);

            if child_balance == -lean {
                trace!(key = ?node.as_ref().key(), dir = ?tall, "remove: double rotation");

                let middle = T::links(child)
                    .as_ref()
                    .child(!tall)
                    .expect("child leaning inward must have an inner child");

                self.rotate_twice(node, child, middle, tall);

                // A double rotation always shortens the subtree.
                self.position(middle)
            } else if child_balance == 0 {
                trace!(key = ?node.as_ref().key(), dir = ?tall, "remove: single rotation, stop");

                self.rotate(node, !tall);
                self.set_balance(node, lean);
                self.set_balance(child, -lean);

                None
            } else {
                trace!(key = ?node.as_ref().key(), dir = ?tall, "remove: single rotation");

                self.rotate(node, !tall);
                self.set_balance(node, 0);
                self.set_balance(child, 0);

                self.position(child)
            }
        }
    }
}

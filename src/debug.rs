use alloc::{collections::VecDeque, format, string::String};
use core::{
    fmt::{self, Write},
    ptr::NonNull,
};

use crate::{AvlTree, Dir, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Writes a Graphviz rendering of the tree to `w`.
    ///
    /// Nodes are laid out one rank per level and labelled `key:balance`. Missing children are drawn
    /// as points so that left and right children remain distinguishable.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>, usize),
            Missing(usize),
        }

        let mut next_id = 0;
        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root, next_id));
        next_id += 1;

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut links = String::new();

        loop {
            let remaining = queue.len();
            if remaining == 0 {
                break;
            }

            write!(w, "{{rank=same; ")?;

            for _ in 0..remaining {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let (node, id) = match item {
                    Item::Node(node, id) => (node, id),
                    Item::Missing(id) => {
                        write!(w, "\"graph{name}-{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let (key, balance) = unsafe {
                    (
                        format!("{:?}", node.as_ref().key()),
                        T::links(node).as_ref().balance(),
                    )
                };
                let label = key.replace('\\', "\\\\").replace('"', "\\\"");
                write!(w, "\"graph{name}-{id}\" [label=\"{label}:{balance}\"]; ")?;

                for dir in [Dir::Left, Dir::Right] {
                    let child_id = next_id;
                    next_id += 1;

                    match unsafe { T::links(node).as_ref().child(dir) } {
                        Some(child) => queue.push_back(Item::Node(child, child_id)),
                        None => queue.push_back(Item::Missing(child_id)),
                    }

                    writeln!(
                        links,
                        "\"graph{name}-{id}\" -> \"graph{name}-{child_id}\";"
                    )?;
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }

    /// Renders the tree with [`AvlTree::dotgraph`] into a new string.
    pub fn to_dotgraph(&self, name: &str) -> String {
        let mut out = String::new();
        // Writing to a `String` cannot fail.
        let _ = self.dotgraph(name, &mut out);
        out
    }
}

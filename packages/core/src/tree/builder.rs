//! Forest Assembly
//!
//! Turns a flat list of visible pages into a forest using an arena keyed by
//! page id: one map of pages plus explicit ordered child-id lists. Nodes never
//! own each other, so a malformed input cannot produce cyclic ownership.
//!
//! # Ordering Policy
//!
//! After linking, every child list and the root list are sorted by
//! `(position, created_at, id)`. The result therefore depends only on the set
//! of pages, not on the order rows arrived in.
//!
//! # Examples
//!
//! ```rust,ignore
//! let pages = service.get_all().await?;
//! let forest = PageForest::build(pages);
//! let nested = forest.into_nested();
//! ```

use crate::models::{Page, PageTreeNode};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Id-indexed forest of pages
#[derive(Debug, Clone, Default)]
pub struct PageForest {
    pages: HashMap<Uuid, Page>,
    children: HashMap<Uuid, Vec<Uuid>>,
    roots: Vec<Uuid>,
}

impl PageForest {
    /// Assemble a forest from visible pages
    ///
    /// A page whose parent is not part of the input is emitted as a root.
    /// If an id appears more than once the last occurrence wins and the page
    /// is linked once.
    pub fn build(pages: impl IntoIterator<Item = Page>) -> Self {
        let mut forest = PageForest::default();
        let mut arrival: Vec<Uuid> = Vec::new();

        // Pass 1: index every page, each with an empty child list
        for page in pages {
            let id = page.id;
            if forest.pages.insert(id, page).is_none() {
                arrival.push(id);
            }
            forest.children.entry(id).or_default();
        }

        // Pass 2: link to the parent when present, otherwise emit as root
        for id in &arrival {
            let parent = forest.pages[id]
                .parent_id
                .filter(|parent_id| parent_id != id && forest.pages.contains_key(parent_id));

            match parent {
                Some(parent_id) => forest
                    .children
                    .entry(parent_id)
                    .or_default()
                    .push(*id),
                None => forest.roots.push(*id),
            }
        }

        forest.sort_siblings();
        forest
    }

    fn sort_siblings(&mut self) {
        let pages = &self.pages;
        let by_sibling_order = |a: &Uuid, b: &Uuid| -> Ordering {
            let (pa, pb) = (&pages[a], &pages[b]);
            pa.position
                .cmp(&pb.position)
                .then_with(|| pa.created_at.cmp(&pb.created_at))
                .then_with(|| a.cmp(b))
        };

        self.roots.sort_by(by_sibling_order);
        for list in self.children.values_mut() {
            list.sort_by(by_sibling_order);
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Page> {
        self.pages.get(id)
    }

    /// Root ids in sibling order
    pub fn roots(&self) -> &[Uuid] {
        &self.roots
    }

    /// Direct child ids in sibling order (empty for unknown ids)
    pub fn children_of(&self, id: &Uuid) -> &[Uuid] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pages in depth-first pre-order, roots first
    pub fn iter_depth_first(&self) -> impl Iterator<Item = &Page> + '_ {
        let mut stack: Vec<Uuid> = self.roots.iter().rev().copied().collect();
        let mut seen = HashSet::new();
        std::iter::from_fn(move || {
            while let Some(id) = stack.pop() {
                if !seen.insert(id) {
                    continue;
                }
                stack.extend(self.children_of(&id).iter().rev().copied());
                return self.pages.get(&id);
            }
            None
        })
    }

    /// Render the nested, serializable form
    ///
    /// Pages only reachable through a parent cycle are not reachable from any
    /// root and are dropped.
    pub fn into_nested(mut self) -> Vec<PageTreeNode> {
        let roots = std::mem::take(&mut self.roots);
        roots
            .into_iter()
            .filter_map(|id| Self::render(id, &mut self.pages, &self.children))
            .collect()
    }

    fn render(
        id: Uuid,
        pages: &mut HashMap<Uuid, Page>,
        children: &HashMap<Uuid, Vec<Uuid>>,
    ) -> Option<PageTreeNode> {
        let page = pages.remove(&id)?;
        let nested = children
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|child_id| Self::render(*child_id, pages, children))
            .collect();

        Some(PageTreeNode {
            page,
            children: nested,
        })
    }
}

/// Convenience wrapper: assemble and render in one step
pub fn build_tree(pages: impl IntoIterator<Item = Page>) -> Vec<PageTreeNode> {
    PageForest::build(pages).into_nested()
}

//! Category tree rendering.
//!
//! [`render_rows`] flattens a category forest into display rows in pre-order:
//! every node is followed by its visible children, one indentation level
//! deeper. The renderer is purely presentational. Which slug is selected and
//! which nodes are expanded belong to the caller ([`Selection`],
//! [`ExpansionState`]), and are never persisted.

use std::collections::HashSet;

use serde::Serialize;

use super::{CategoryNode, TreeError};
use crate::types::CategoryId;

/// Upper bound on rows produced by a single render.
pub const MAX_TREE_ROWS: usize = 10_000;

/// One rendered line of the category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    /// Nesting level; roots are 0.
    pub depth: usize,
    pub product_count: u32,
    /// Whether a count badge is shown (`product_count > 0`).
    pub show_badge: bool,
    pub has_children: bool,
    /// Whether the children of this row are rendered below it.
    pub expanded: bool,
    /// Whether this row's slug is the active filter.
    pub selected: bool,
}

/// Which nodes have their children rendered.
#[derive(Debug, Clone, Copy)]
pub enum Expansion<'a> {
    /// Every level is rendered.
    All,
    /// Children are rendered only below the listed nodes.
    Only(&'a ExpansionState),
}

/// Set of expanded category ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    open: HashSet<CategoryId>,
}

impl ExpansionState {
    /// Create an empty state (everything collapsed).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is expanded.
    #[must_use]
    pub fn is_expanded(&self, id: CategoryId) -> bool {
        self.open.contains(&id)
    }

    /// Expand `id`.
    pub fn expand(&mut self, id: CategoryId) {
        self.open.insert(id);
    }

    /// Flip `id` between expanded and collapsed. Returns the new state.
    pub fn toggle(&mut self, id: CategoryId) -> bool {
        if self.open.remove(&id) {
            false
        } else {
            self.open.insert(id);
            true
        }
    }

    /// Expanded ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<CategoryId> {
        let mut ids: Vec<CategoryId> = self.open.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<CategoryId> for ExpansionState {
    fn from_iter<I: IntoIterator<Item = CategoryId>>(iter: I) -> Self {
        Self {
            open: iter.into_iter().collect(),
        }
    }
}

/// The single active category filter. Empty means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection(String);

impl Selection {
    /// Select `slug` (an empty slug clears the selection).
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into().trim().to_string())
    }

    /// The selected slug, or `""` when nothing is selected.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a category is selected.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.0.is_empty()
    }

    /// Whether `slug` is the selected one.
    #[must_use]
    pub fn is_selected(&self, slug: &str) -> bool {
        self.is_active() && self.0 == slug
    }

    /// Apply a click on `slug`: selecting the current slug again clears the filter.
    pub fn toggle(&mut self, slug: &str) {
        if self.is_selected(slug) {
            self.0.clear();
        } else {
            self.0 = slug.to_string();
        }
    }

    /// The selection a click on `slug` would produce, without mutating `self`.
    #[must_use]
    pub fn toggled(&self, slug: &str) -> Self {
        let mut next = self.clone();
        next.toggle(slug);
        next
    }
}

/// Flatten `roots` into display rows.
///
/// Rows come out in pre-order with `depth` increasing by one per level.
/// Leaves end the descent. Traversal uses an explicit stack, so depth does not
/// grow the call stack.
///
/// # Errors
///
/// Returns [`TreeError::TooManyNodes`] if more than [`MAX_TREE_ROWS`] rows
/// would be produced.
pub fn render_rows(
    roots: &[CategoryNode],
    selection: &Selection,
    expansion: Expansion<'_>,
) -> Result<Vec<TreeRow>, TreeError> {
    let mut rows = Vec::new();
    let mut stack: Vec<(&CategoryNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        if rows.len() >= MAX_TREE_ROWS {
            return Err(TreeError::TooManyNodes {
                limit: MAX_TREE_ROWS,
            });
        }

        let has_children = !node.children.is_empty();
        let expanded = has_children
            && match expansion {
                Expansion::All => true,
                Expansion::Only(state) => state.is_expanded(node.id),
            };

        rows.push(TreeRow {
            id: node.id,
            name: node.name.clone(),
            slug: node.slug.clone(),
            depth,
            product_count: node.product_count,
            show_badge: node.product_count > 0,
            has_children,
            expanded,
            selected: selection.is_selected(&node.slug),
        });

        if expanded {
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
    }

    Ok(rows)
}

//! Category hierarchy.
//!
//! The catalog API delivers categories already nested ([`CategoryNode`]);
//! the admin API delivers a flat list with parent pointers
//! ([`FlatCategory`]) that [`build_forest`] assembles into the same shape.
//! Either way the client treats the tree as read-only data and keeps only
//! selection and expansion as its own state (see [`tree`]).

pub mod tree;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CategoryId;

pub use tree::{Expansion, ExpansionState, MAX_TREE_ROWS, Selection, TreeRow, render_rows};

/// Errors produced while assembling or walking a category tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Parent pointers form a loop; the listed categories are unreachable from any root.
    #[error("category parent chain forms a cycle through ids {0:?}")]
    Cycle(Vec<CategoryId>),

    /// Traversal visited more nodes than the renderer allows.
    #[error("category tree exceeds {limit} nodes")]
    TooManyNodes { limit: usize },
}

/// A category with its subcategories, as served by the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    /// URL-safe unique key, used as the product filter value.
    pub slug: String,
    #[serde(default)]
    pub children: Vec<Self>,
    /// Informational only; not authoritative inventory.
    #[serde(default, alias = "productCount")]
    pub product_count: u32,
}

impl CategoryNode {
    /// Create a leaf node.
    #[must_use]
    pub fn leaf(id: i64, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(id),
            name: name.into(),
            slug: slug.into(),
            children: Vec::new(),
            product_count: 0,
        }
    }

    /// Builder-style helper to attach children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    /// Builder-style helper to set the product count.
    #[must_use]
    pub const fn with_product_count(mut self, product_count: u32) -> Self {
        self.product_count = product_count;
        self
    }

    /// Whether this node has no subcategories.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A category row from the admin API (parent pointer instead of nesting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatCategory {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub product_count: u32,
}

/// Result of assembling a flat category list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    /// Top-level categories, ordered by `sort_order` then name.
    pub roots: Vec<CategoryNode>,
    /// Categories whose parent id was not in the list; promoted to roots.
    pub orphans: Vec<CategoryId>,
}

/// Assemble a flat parent-pointer list into a forest.
///
/// Siblings are ordered by `sort_order`, then by name. A category whose parent
/// is missing from `categories` becomes a root and is reported in
/// [`Forest::orphans`].
///
/// # Errors
///
/// Returns [`TreeError::Cycle`] if some categories cannot be reached from any
/// root, which only happens when their parent pointers loop.
pub fn build_forest(categories: Vec<FlatCategory>) -> Result<Forest, TreeError> {
    let known: HashSet<CategoryId> = categories.iter().map(|c| c.id).collect();

    let mut orphans = Vec::new();
    let mut by_parent: HashMap<Option<CategoryId>, Vec<FlatCategory>> = HashMap::new();
    for category in categories {
        let parent = match category.parent {
            Some(parent) if known.contains(&parent) => Some(parent),
            Some(_) => {
                orphans.push(category.id);
                None
            }
            None => None,
        };
        by_parent.entry(parent).or_default().push(category);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
    }

    let roots = attach_children(by_parent.remove(&None).unwrap_or_default(), &mut by_parent);

    // Whatever is left was never reached from a root.
    let mut unreachable: Vec<CategoryId> = by_parent
        .into_values()
        .flatten()
        .map(|c| c.id)
        .collect();
    if !unreachable.is_empty() {
        unreachable.sort_unstable();
        return Err(TreeError::Cycle(unreachable));
    }

    orphans.sort_unstable();
    Ok(Forest { roots, orphans })
}

fn attach_children(
    level: Vec<FlatCategory>,
    by_parent: &mut HashMap<Option<CategoryId>, Vec<FlatCategory>>,
) -> Vec<CategoryNode> {
    level
        .into_iter()
        .map(|flat| {
            let children = by_parent
                .remove(&Some(flat.id))
                .map(|kids| attach_children(kids, by_parent))
                .unwrap_or_default();
            CategoryNode {
                id: flat.id,
                name: flat.name,
                slug: flat.slug,
                children,
                product_count: flat.product_count,
            }
        })
        .collect()
}

/// Depth-first lookup of a category by slug.
#[must_use]
pub fn find_by_slug<'a>(roots: &'a [CategoryNode], slug: &str) -> Option<&'a CategoryNode> {
    let mut stack: Vec<&CategoryNode> = roots.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.slug == slug {
            return Some(node);
        }
        stack.extend(node.children.iter().rev());
    }
    None
}

/// Ids of the categories above `slug`, from the root down to its parent.
///
/// Returns an empty list for a root category or an unknown slug.
#[must_use]
pub fn ancestors_of(roots: &[CategoryNode], slug: &str) -> Vec<CategoryId> {
    let mut parents: BTreeMap<CategoryId, CategoryId> = BTreeMap::new();
    let mut stack: Vec<&CategoryNode> = roots.iter().collect();
    let mut target = None;
    while let Some(node) = stack.pop() {
        if node.slug == slug {
            target = Some(node.id);
            break;
        }
        for child in &node.children {
            parents.insert(child.id, node.id);
            stack.push(child);
        }
    }

    // Duplicate ids can make the parent links loop; stop at the first repeat.
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = target;
    while let Some(id) = current.and_then(|id| parents.get(&id).copied()) {
        if !seen.insert(id) || Some(id) == target {
            break;
        }
        chain.push(id);
        current = Some(id);
    }
    chain.reverse();
    chain
}

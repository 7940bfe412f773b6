use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransactionKind;

pub type CategoryId = Uuid;

/// Separator used when rendering a category with its ancestors.
pub const PATH_SEPARATOR: &str = " > ";

/// Groups transactions for reporting. Categories may nest under a parent of
/// the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub kind: TransactionKind,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, kind: TransactionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            parent_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_parent(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Parent/child structure over a set of categories.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: HashMap<CategoryId, Category>,
    children: HashMap<CategoryId, Vec<CategoryId>>,
    roots: Vec<CategoryId>,
}

impl CategoryTree {
    /// Build the tree. Categories whose parent is missing from the set are
    /// treated as roots. Sibling order follows category name.
    pub fn build(categories: Vec<Category>) -> Self {
        let mut sorted = categories;
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let ids: HashSet<CategoryId> = sorted.iter().map(|c| c.id).collect();
        let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
        let mut roots = Vec::new();

        for category in &sorted {
            match category.parent_id {
                Some(parent) if ids.contains(&parent) && parent != category.id => {
                    children.entry(parent).or_default().push(category.id)
                }
                _ => roots.push(category.id),
            }
        }

        Self {
            nodes: sorted.into_iter().map(|c| (c.id, c)).collect(),
            children,
            roots,
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: CategoryId) -> &[CategoryId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: CategoryId) -> bool {
        !self.children(id).is_empty()
    }

    /// Ancestors of `id`, nearest first. Stops if a cycle is found.
    pub fn ancestors(&self, id: CategoryId) -> Vec<&Category> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.nodes.get(&id).and_then(|c| c.parent_id);

        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            match self.nodes.get(&parent_id) {
                Some(parent) => {
                    out.push(parent);
                    current = parent.parent_id;
                }
                None => break,
            }
        }
        out
    }

    /// Full display path, e.g. `Housing > Rent`.
    pub fn path(&self, id: CategoryId) -> Option<String> {
        let category = self.nodes.get(&id)?;
        let mut names: Vec<&str> = self
            .ancestors(id)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        names.reverse();
        names.push(&category.name);
        Some(names.join(PATH_SEPARATOR))
    }

    /// Whether making `parent` the parent of `child` would create a cycle.
    pub fn would_cycle(&self, child: CategoryId, parent: CategoryId) -> bool {
        child == parent || self.ancestors(parent).iter().any(|c| c.id == child)
    }

    /// Depth-first walk: every category with its depth, roots at depth 0.
    pub fn walk(&self) -> Vec<(usize, &Category)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, CategoryId)> =
            self.roots.iter().rev().map(|id| (0, *id)).collect();

        while let Some((depth, id)) = stack.pop() {
            if let Some(category) = self.nodes.get(&id) {
                out.push((depth, category));
                for child in self.children(id).iter().rev() {
                    stack.push((depth + 1, *child));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (CategoryTree, Category, Category, Category) {
        let housing = Category::new("Housing", TransactionKind::Expense);
        let rent = Category::new("Rent", TransactionKind::Expense).with_parent(housing.id);
        let salary = Category::new("Salary", TransactionKind::Income);
        let tree = CategoryTree::build(vec![rent.clone(), salary.clone(), housing.clone()]);
        (tree, housing, rent, salary)
    }

    #[test]
    fn test_path_resolves_parents() {
        let (tree, housing, rent, salary) = sample_tree();
        assert_eq!(tree.path(rent.id).as_deref(), Some("Housing > Rent"));
        assert_eq!(tree.path(housing.id).as_deref(), Some("Housing"));
        assert_eq!(tree.path(salary.id).as_deref(), Some("Salary"));
        assert_eq!(tree.path(Uuid::new_v4()), None);
    }

    #[test]
    fn test_children_and_roots() {
        let (tree, housing, rent, salary) = sample_tree();
        assert_eq!(tree.children(housing.id), &[rent.id]);
        assert!(tree.has_children(housing.id));
        assert!(!tree.has_children(salary.id));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_walk_is_depth_first_by_name() {
        let (tree, _, _, _) = sample_tree();
        let walked: Vec<(usize, &str)> = tree
            .walk()
            .into_iter()
            .map(|(depth, c)| (depth, c.name.as_str()))
            .collect();
        assert_eq!(walked, vec![(0, "Housing"), (1, "Rent"), (0, "Salary")]);
    }

    #[test]
    fn test_would_cycle() {
        let (tree, housing, rent, salary) = sample_tree();
        assert!(tree.would_cycle(housing.id, rent.id));
        assert!(tree.would_cycle(housing.id, housing.id));
        assert!(!tree.would_cycle(salary.id, housing.id));
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let orphan = Category::new("Orphan", TransactionKind::Expense).with_parent(Uuid::new_v4());
        let tree = CategoryTree::build(vec![orphan.clone()]);
        assert_eq!(tree.walk().len(), 1);
        assert_eq!(tree.path(orphan.id).as_deref(), Some("Orphan"));
    }
}

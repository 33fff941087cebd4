//! Categories and the tree helpers built on top of the flat API listing.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::lenient;

/// Id of the root category.
pub const ROOT_CATEGORY_ID: i64 = 0;

/// Parent reference of a category.
///
/// The API marks "no parent" with either `0` or `"-"`; both map to `Root`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParentId {
    #[default]
    Root,
    Category(i64),
}

impl ParentId {
    pub fn from_id(id: i64) -> Self {
        if id == ROOT_CATEGORY_ID {
            ParentId::Root
        } else {
            ParentId::Category(id)
        }
    }

    /// Numeric form, with the root as `0`.
    pub fn as_id(&self) -> i64 {
        match self {
            ParentId::Root => ROOT_CATEGORY_ID,
            ParentId::Category(id) => *id,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, ParentId::Root)
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_id())
    }
}

impl Serialize for ParentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_id())
    }
}

impl<'de> Deserialize<'de> for ParentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
            Null(()),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Ok(ParentId::from_id(id)),
            Raw::Null(()) => Ok(ParentId::Root),
            Raw::Str(value) => match value.trim() {
                "" | "-" => Ok(ParentId::Root),
                other => other
                    .parse()
                    .map(ParentId::from_id)
                    .map_err(|_| de::Error::custom(format!("invalid parent id: {:?}", other))),
            },
        }
    }
}

/// A knowledge-base category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(deserialize_with = "lenient::id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: ParentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_friendly_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.id == ROOT_CATEGORY_ID
    }
}

/// Find a category by id in an API listing.
pub fn find_category(categories: &[Category], id: i64) -> Option<&Category> {
    categories.iter().find(|category| category.id == id)
}

/// Direct children of `id`, split into rows of `per_line` for a grid layout.
///
/// Children that fit in a single row come back as exactly one row, which may
/// be empty. A `per_line` of zero is treated as one.
pub fn subcategory_rows(categories: &[Category], id: i64, per_line: usize) -> Vec<Vec<Category>> {
    let children: Vec<Category> = categories
        .iter()
        .filter(|category| category.id != id && category.parent.as_id() == id)
        .cloned()
        .collect();

    let per_line = per_line.max(1);
    if children.len() <= per_line {
        return vec![children];
    }
    children.chunks(per_line).map(<[Category]>::to_vec).collect()
}

/// Categories grouped under their parent.
pub fn group_by_parent(categories: &[Category]) -> BTreeMap<ParentId, Vec<&Category>> {
    let mut groups: BTreeMap<ParentId, Vec<&Category>> = BTreeMap::new();
    for category in categories {
        if category.is_root() {
            continue;
        }
        groups.entry(category.parent).or_default().push(category);
    }
    groups
}

/// A category with its descendants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Number of categories in this subtree, including the node itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::count).sum::<usize>()
    }
}

/// Build the subtree rooted at `root_id` from a flat listing.
///
/// Ids already placed in the tree are skipped, so a malformed listing with a
/// parent cycle still terminates.
pub fn build_tree(categories: &[Category], root_id: i64) -> Option<CategoryNode> {
    let root = find_category(categories, root_id)?;
    let groups = group_by_parent(categories);
    let mut visited = HashSet::new();
    Some(attach_children(root, &groups, &mut visited))
}

fn attach_children(
    category: &Category,
    groups: &BTreeMap<ParentId, Vec<&Category>>,
    visited: &mut HashSet<i64>,
) -> CategoryNode {
    visited.insert(category.id);
    let key = ParentId::from_id(category.id);
    let mut children = Vec::new();
    for child in groups.get(&key).into_iter().flatten() {
        if visited.contains(&child.id) {
            continue;
        }
        children.push(attach_children(child, groups, visited));
    }
    CategoryNode {
        category: category.clone(),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn category(id: i64, parent: ParentId) -> Category {
        Category {
            id,
            name: format!("Category {}", id),
            slug: format!("category-{}", id),
            parent,
            ..Default::default()
        }
    }

    #[test]
    fn test_parent_sentinels_map_to_root() {
        for raw in [json!(0), json!("0"), json!("-"), json!(null)] {
            let parent: ParentId = serde_json::from_value(raw).expect("parent should parse");
            assert_eq!(parent, ParentId::Root);
        }
        let parent: ParentId = serde_json::from_value(json!("12")).expect("parent should parse");
        assert_eq!(parent, ParentId::Category(12));
    }

    #[test]
    fn test_category_parses_upstream_shape() {
        let parsed: Category = serde_json::from_value(json!({
            "id": "5",
            "name": "Billing",
            "slug": "billing",
            "parent": "-",
            "depth": 1
        }))
        .expect("category should parse");

        assert_eq!(parsed.id, 5);
        assert!(parsed.parent.is_root());
        assert_eq!(parsed.extra.get("depth"), Some(&json!(1)));
    }

    #[test]
    fn test_twelve_subcategories_group_into_five_five_two() {
        let mut categories = vec![category(1, ParentId::Root)];
        categories.extend((100..112).map(|id| category(id, ParentId::Category(1))));

        let rows = subcategory_rows(&categories, 1, 5);
        let sizes: Vec<usize> = rows.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
    }

    #[test]
    fn test_few_subcategories_form_single_row() {
        let categories = vec![
            category(1, ParentId::Root),
            category(2, ParentId::Category(1)),
            category(3, ParentId::Category(1)),
        ];
        assert_eq!(subcategory_rows(&categories, 1, 5).len(), 1);
        assert_eq!(subcategory_rows(&categories, 3, 5), vec![Vec::<Category>::new()]);
    }

    #[test]
    fn test_root_subcategories_exclude_root_itself() {
        let categories = vec![
            category(0, ParentId::Root),
            category(1, ParentId::Root),
            category(2, ParentId::Root),
            category(3, ParentId::Category(1)),
        ];
        let rows = subcategory_rows(&categories, 0, 5);
        let ids: Vec<i64> = rows[0].iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_build_tree_groups_children_under_parents() {
        let categories = vec![
            category(0, ParentId::Root),
            category(1, ParentId::Root),
            category(2, ParentId::Category(1)),
            category(3, ParentId::Category(2)),
            category(4, ParentId::Root),
        ];

        let tree = build_tree(&categories, 0).expect("root should exist");
        assert_eq!(tree.count(), 5);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].children[0].children[0].category.id, 3);
        assert!(build_tree(&categories, 99).is_none());
    }

    #[test]
    fn test_build_tree_survives_parent_cycle() {
        let categories = vec![
            category(1, ParentId::Category(2)),
            category(2, ParentId::Category(1)),
        ];
        let tree = build_tree(&categories, 1).expect("category should exist");
        assert_eq!(tree.count(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Rows preserve every child, in order, and only the last row may be partial.
        #[test]
        fn prop_rows_partition_children(count in 0usize..40, per_line in 1usize..8) {
            let mut categories = vec![category(1, ParentId::Root)];
            categories.extend((0..count as i64).map(|i| category(100 + i, ParentId::Category(1))));

            let rows = subcategory_rows(&categories, 1, per_line);
            let flattened: Vec<i64> = rows.iter().flatten().map(|c| c.id).collect();
            let expected: Vec<i64> = (0..count as i64).map(|i| 100 + i).collect();
            prop_assert_eq!(flattened, expected);

            if let Some((last, full)) = rows.split_last() {
                prop_assert!(full.iter().all(|row| row.len() == per_line));
                prop_assert!(last.len() <= per_line);
            }
        }
    }
}

//! Query filters.
//!
//! A [`Filter`] binds an optional predicate tree to an entity kind. It is
//! compiled once, at construction, into a narrowing [`Condition`] that the
//! backend evaluates on stored text and an exact matcher that the store
//! runs on every candidate it fetches.

mod compile;
mod item;

pub use item::{FilterItem, GroupOp, IntegerOp, TextOp};

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use compile::{compile, Matcher};
use eavdb_storage::Condition;
use std::fmt;

/// A kind plus an optional predicate.
///
/// # Example
///
/// ```rust
/// use eavdb_core::{Entity, Filter, FilterItem, IntegerOp};
///
/// let filter = Filter::new("person", FilterItem::integer("age", IntegerOp::Gt, 10)).unwrap();
///
/// let teen = Entity::new("person").unwrap().with("age", 15);
/// let child = Entity::new("person").unwrap().with("age", 5);
/// let robot = Entity::new("robot").unwrap().with("age", 15);
///
/// assert!(filter.matches(&teen));
/// assert!(!filter.matches(&child));
/// assert!(!filter.matches(&robot));
/// ```
#[derive(Clone)]
pub struct Filter {
    kind: String,
    root: Option<FilterItem>,
    condition: Condition,
    matcher: Option<Matcher>,
}

impl Filter {
    /// Creates a filter over `kind`.
    ///
    /// A `None` root matches every entity of the kind; see [`Filter::all`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if the kind is empty, a leaf names an
    /// empty attribute or a group has fewer than two children.
    pub fn new(kind: impl Into<String>, root: impl Into<Option<FilterItem>>) -> CoreResult<Self> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(CoreError::validation("filter kind must not be empty"));
        }
        let root = root.into();
        if let Some(item) = &root {
            item.validate()?;
        }

        let compiled = root.as_ref().map(compile);
        let (root_condition, matcher) = match compiled {
            Some(c) => (c.condition, Some(c.matcher)),
            None => (None, None),
        };
        let condition = Condition::and(
            std::iter::once(Condition::kind(kind.clone())).chain(root_condition),
        );

        Ok(Self {
            kind,
            root,
            condition,
            matcher,
        })
    }

    /// Creates a filter matching every entity of `kind`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the kind is empty.
    pub fn all(kind: impl Into<String>) -> CoreResult<Self> {
        Self::new(kind, None::<FilterItem>)
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the predicate root.
    #[must_use]
    pub fn root(&self) -> Option<&FilterItem> {
        self.root.as_ref()
    }

    /// Returns the narrowing condition handed to the backend.
    ///
    /// Every entity that [`Filter::matches`] accepts satisfies this
    /// condition; the converse need not hold.
    #[must_use]
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Exact test of an entity against this filter.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        entity.kind() == self.kind && self.matcher.as_ref().map_or(true, |m| m(entity))
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("kind", &self.kind)
            .field("root", &self.root)
            .field("condition", &self.condition)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eavdb_storage::{TypeTag, ValueTest};

    #[test]
    fn empty_kind_rejected() {
        assert!(matches!(
            Filter::all(""),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn invalid_tree_rejected() {
        let bad = FilterItem::Group {
            op: GroupOp::Or,
            items: vec![FilterItem::not_null("a")],
        };
        assert!(Filter::new("k", bad).is_err());
        assert!(Filter::new("k", FilterItem::not_null("")).is_err());
    }

    #[test]
    fn kind_only_condition() {
        let filter = Filter::all("person").unwrap();
        assert_eq!(filter.condition(), &Condition::kind("person"));
        assert!(filter.root().is_none());
        assert!(filter.matches(&Entity::new("person").unwrap()));
    }

    #[test]
    fn condition_prefixes_kind() {
        let filter = Filter::new("person", FilterItem::boolean("admin", true)).unwrap();
        assert_eq!(
            filter.condition(),
            &Condition::And(vec![
                Condition::kind("person"),
                Condition::attribute("admin", Some(TypeTag::Boolean), ValueTest::Eq("true".into())),
            ])
        );
    }

    #[test]
    fn or_of_order_comparisons_narrows_to_presence() {
        let lt = FilterItem::integer("n", IntegerOp::Lt, 3);
        let gt = FilterItem::integer("n", IntegerOp::Gt, 7);
        let filter = Filter::new("k", FilterItem::or(lt, gt)).unwrap();
        assert!(matches!(filter.condition(), Condition::And(v) if v.len() == 2));
    }

    #[test]
    fn kind_checked_before_predicate() {
        let filter = Filter::new("a", FilterItem::not_null("x")).unwrap();
        let other = Entity::new("b").unwrap().with("x", 1);
        assert!(!filter.matches(&other));
    }

    #[test]
    fn debug_omits_matcher() {
        let filter = Filter::all("k").unwrap();
        let text = format!("{filter:?}");
        assert!(text.starts_with("Filter {"));
        assert!(text.contains("kind: \"k\""));
    }
}

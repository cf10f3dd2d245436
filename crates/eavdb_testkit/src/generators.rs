//! Property-based test generators using proptest.
//!
//! Names, kinds and values are drawn from deliberately small pools so that
//! generated filters hit generated entities often, and so that the same
//! attribute name shows up with different types.

use eavdb_core::{AttributeValue, Entity, Filter, FilterItem, GroupOp, IntegerOp, TextOp};
use proptest::prelude::*;

/// Strategy for entity kinds.
pub fn kind_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alpha", "beta"]).prop_map(String::from)
}

/// Strategy for attribute names.
pub fn attribute_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(String::from)
}

/// Strategy for short mixed-case text.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[abcAB]{0,4}").expect("Invalid regex")
}

/// Strategy for attribute values of every type.
pub fn attribute_value_strategy() -> impl Strategy<Value = AttributeValue> {
    prop_oneof![
        (-20i64..20).prop_map(AttributeValue::Integer),
        any::<bool>().prop_map(AttributeValue::Boolean),
        text_strategy().prop_map(AttributeValue::Text),
    ]
}

/// Strategy for unsaved entities.
pub fn entity_strategy() -> impl Strategy<Value = Entity> {
    (
        kind_strategy(),
        prop::collection::hash_map(attribute_name_strategy(), attribute_value_strategy(), 0..4),
        prop::option::of(prop::collection::vec(any::<u8>(), 0..16)),
    )
        .prop_map(|(kind, attributes, payload)| {
            let mut entity = Entity::new(kind).expect("generated kind is not empty");
            entity.set_payload(payload);
            for (name, value) in attributes {
                entity.set(name, value);
            }
            entity
        })
}

fn integer_op_strategy() -> impl Strategy<Value = IntegerOp> {
    prop::sample::select(vec![IntegerOp::Eq, IntegerOp::Ne, IntegerOp::Lt, IntegerOp::Gt])
}

fn text_op_strategy() -> impl Strategy<Value = TextOp> {
    prop::sample::select(vec![
        TextOp::Eq,
        TextOp::Ne,
        TextOp::Lt,
        TextOp::Gt,
        TextOp::Contains,
    ])
}

/// Strategy for single comparisons.
pub fn leaf_strategy() -> impl Strategy<Value = FilterItem> {
    prop_oneof![
        (attribute_name_strategy(), any::<bool>())
            .prop_map(|(name, value)| FilterItem::boolean(name, value)),
        (attribute_name_strategy(), integer_op_strategy(), -20i64..20)
            .prop_map(|(name, op, value)| FilterItem::integer(name, op, value)),
        (attribute_name_strategy(), text_op_strategy(), text_strategy())
            .prop_map(|(name, op, value)| FilterItem::text(name, op, value)),
        attribute_name_strategy().prop_map(FilterItem::not_null),
    ]
}

/// Strategy for predicate trees up to three groups deep.
pub fn filter_item_strategy() -> impl Strategy<Value = FilterItem> {
    leaf_strategy().prop_recursive(3, 16, 3, |inner| {
        (
            prop::sample::select(vec![GroupOp::And, GroupOp::Or]),
            prop::collection::vec(inner, 2..=3),
        )
            .prop_map(|(op, items)| FilterItem::Group { op, items })
    })
}

/// Strategy for filters, with or without a predicate.
pub fn filter_strategy() -> impl Strategy<Value = Filter> {
    (kind_strategy(), prop::option::of(filter_item_strategy()))
        .prop_map(|(kind, root)| Filter::new(kind, root).expect("generated filter is valid"))
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

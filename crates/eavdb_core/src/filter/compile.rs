//! Compilation of predicate trees.
//!
//! Every [`FilterItem`] compiles into two parts:
//!
//! - a narrowing [`Condition`] for the backend, evaluated on stored text.
//!   It may admit false candidates but never rejects a true match. `None`
//!   means the item cannot narrow at all.
//! - an exact [`Matcher`] run in process on the reconstituted, typed
//!   attributes. The matcher is authoritative.
//!
//! Integer `Lt`/`Gt` cannot be narrowed by text comparison since decimal
//! text does not sort numerically ("15" < "5"), so they only require the
//! attribute to be present as an integer.

use crate::entity::Entity;
use crate::filter::item::{FilterItem, GroupOp, IntegerOp, TextOp};
use crate::value::AttributeValue;
use eavdb_storage::{contains_ignore_case, Condition, TypeTag, ValueTest};
use std::sync::Arc;

/// Exact in-process predicate.
pub(crate) type Matcher = Arc<dyn Fn(&Entity) -> bool + Send + Sync>;

/// Output of [`compile`].
pub(crate) struct Compiled {
    pub(crate) condition: Option<Condition>,
    pub(crate) matcher: Matcher,
}

/// Compiles a predicate tree.
pub(crate) fn compile(item: &FilterItem) -> Compiled {
    match item {
        FilterItem::Boolean { attribute, value } => {
            let condition = Condition::attribute(
                attribute.clone(),
                Some(TypeTag::Boolean),
                ValueTest::Eq(value.to_string()),
            );
            let (attribute, value) = (attribute.clone(), *value);
            Compiled {
                condition: Some(condition),
                matcher: Arc::new(move |entity: &Entity| {
                    entity.get(&attribute).and_then(AttributeValue::as_boolean) == Some(value)
                }),
            }
        }
        FilterItem::Integer {
            attribute,
            op,
            value,
        } => {
            let test = match op {
                IntegerOp::Eq => ValueTest::Eq(value.to_string()),
                IntegerOp::Ne => ValueTest::Ne(value.to_string()),
                IntegerOp::Lt | IntegerOp::Gt => ValueTest::Present,
            };
            let condition = Condition::attribute(attribute.clone(), Some(TypeTag::Integer), test);
            let (attribute, op, reference) = (attribute.clone(), *op, *value);
            Compiled {
                condition: Some(condition),
                matcher: Arc::new(move |entity: &Entity| {
                    match entity.get(&attribute).and_then(AttributeValue::as_integer) {
                        Some(v) => match op {
                            IntegerOp::Eq => v == reference,
                            IntegerOp::Ne => v != reference,
                            IntegerOp::Lt => v < reference,
                            IntegerOp::Gt => v > reference,
                        },
                        None => false,
                    }
                }),
            }
        }
        FilterItem::Text {
            attribute,
            op,
            value,
        } => {
            let test = match op {
                TextOp::Eq => ValueTest::Eq(value.clone()),
                TextOp::Ne => ValueTest::Ne(value.clone()),
                TextOp::Lt => ValueTest::Lt(value.clone()),
                TextOp::Gt => ValueTest::Gt(value.clone()),
                TextOp::Contains => ValueTest::ContainsIgnoreCase(value.clone()),
            };
            let condition = Condition::attribute(attribute.clone(), Some(TypeTag::Text), test);
            let (attribute, op, reference) = (attribute.clone(), *op, value.clone());
            Compiled {
                condition: Some(condition),
                matcher: Arc::new(move |entity: &Entity| {
                    match entity.get(&attribute).and_then(AttributeValue::as_text) {
                        Some(s) => match op {
                            TextOp::Eq => s == reference,
                            TextOp::Ne => s != reference,
                            TextOp::Lt => s < reference.as_str(),
                            TextOp::Gt => s > reference.as_str(),
                            TextOp::Contains => contains_ignore_case(s, &reference),
                        },
                        None => false,
                    }
                }),
            }
        }
        FilterItem::NotNull { attribute } => {
            let condition = Condition::attribute(attribute.clone(), None, ValueTest::Present);
            let attribute = attribute.clone();
            Compiled {
                condition: Some(condition),
                matcher: Arc::new(move |entity: &Entity| entity.has(&attribute)),
            }
        }
        FilterItem::Group { op, items } => compile_group(*op, items),
    }
}

fn compile_group(op: GroupOp, items: &[FilterItem]) -> Compiled {
    let (conditions, matchers): (Vec<_>, Vec<_>) = items
        .iter()
        .map(compile)
        .map(|c| (c.condition, c.matcher))
        .unzip();

    let condition = match op {
        // children that cannot narrow are simply left to the matcher
        GroupOp::And => {
            let narrowing: Vec<_> = conditions.into_iter().flatten().collect();
            if narrowing.is_empty() {
                None
            } else {
                Some(Condition::and(narrowing))
            }
        }
        // one unnarrowable child makes the whole disjunction unnarrowable
        GroupOp::Or => conditions
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(Condition::or),
    };

    let matcher: Matcher = match op {
        GroupOp::And => Arc::new(move |entity: &Entity| matchers.iter().all(|m| m(entity))),
        GroupOp::Or => Arc::new(move |entity: &Entity| matchers.iter().any(|m| m(entity))),
    };

    Compiled {
        condition: condition.filter(|c| !c.is_true()),
        matcher,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> Entity {
        Entity::new("person")
            .unwrap()
            .with("name", "Alice")
            .with("age", 30)
            .with("admin", true)
    }

    #[test]
    fn boolean_compiles_to_text_equality() {
        let c = compile(&FilterItem::boolean("admin", true));
        assert_eq!(
            c.condition,
            Some(Condition::attribute(
                "admin",
                Some(TypeTag::Boolean),
                ValueTest::Eq("true".into())
            ))
        );
        assert!((c.matcher)(&entity()));
        assert!(!(compile(&FilterItem::boolean("admin", false)).matcher)(&entity()));
    }

    #[test]
    fn integer_order_only_requires_presence() {
        for op in [IntegerOp::Lt, IntegerOp::Gt] {
            let c = compile(&FilterItem::integer("age", op, 10));
            assert_eq!(
                c.condition,
                Some(Condition::attribute(
                    "age",
                    Some(TypeTag::Integer),
                    ValueTest::Present
                ))
            );
        }
    }

    #[test]
    fn integer_matcher_is_numeric() {
        let five = Entity::new("n").unwrap().with("n", 5);
        let fifteen = Entity::new("n").unwrap().with("n", 15);
        let gt = compile(&FilterItem::integer("n", IntegerOp::Gt, 10)).matcher;
        assert!(!gt(&five));
        assert!(gt(&fifteen));

        let lt = compile(&FilterItem::integer("n", IntegerOp::Lt, 10)).matcher;
        assert!(lt(&five));
        assert!(!lt(&fifteen));
    }

    #[test]
    fn integer_matcher_rejects_other_types() {
        let text = Entity::new("n").unwrap().with("n", "5");
        let eq = compile(&FilterItem::integer("n", IntegerOp::Eq, 5)).matcher;
        let ne = compile(&FilterItem::integer("n", IntegerOp::Ne, 5)).matcher;
        assert!(!eq(&text));
        assert!(!ne(&text));
        assert!(!ne(&Entity::new("n").unwrap()));
    }

    #[test]
    fn text_contains_is_case_insensitive() {
        let c = compile(&FilterItem::text("name", TextOp::Contains, "ali"));
        assert!((c.matcher)(&entity()));
        assert!(matches!(
            c.condition,
            Some(Condition::Attribute {
                test: ValueTest::ContainsIgnoreCase(_),
                ..
            })
        ));
    }

    #[test]
    fn text_ordering_is_lexical() {
        let gt = compile(&FilterItem::text("name", TextOp::Gt, "Aaron")).matcher;
        let lt = compile(&FilterItem::text("name", TextOp::Lt, "Aaron")).matcher;
        assert!(gt(&entity()));
        assert!(!lt(&entity()));
    }

    #[test]
    fn not_null_matches_any_type() {
        let c = compile(&FilterItem::not_null("age"));
        assert_eq!(
            c.condition,
            Some(Condition::attribute("age", None, ValueTest::Present))
        );
        assert!((c.matcher)(&entity()));
        assert!(!(compile(&FilterItem::not_null("email")).matcher)(&entity()));
    }

    #[test]
    fn and_group_conjoins_conditions() {
        let c = compile(&FilterItem::and(
            FilterItem::not_null("a"),
            FilterItem::not_null("b"),
        ));
        assert_eq!(
            c.condition,
            Some(Condition::And(vec![
                Condition::attribute("a", None, ValueTest::Present),
                Condition::attribute("b", None, ValueTest::Present),
            ]))
        );
    }

    #[test]
    fn or_group_narrows_when_all_children_narrow() {
        let c = compile(&FilterItem::or(
            FilterItem::not_null("a"),
            FilterItem::not_null("b"),
        ));
        assert!(matches!(c.condition, Some(Condition::Or(ref v)) if v.len() == 2));
    }

    #[test]
    fn group_semantics() {
        let e = entity();
        let yes = FilterItem::text("name", TextOp::Eq, "Alice");
        let no = FilterItem::integer("age", IntegerOp::Lt, 18);

        let and = compile(&FilterItem::and(yes.clone(), no.clone())).matcher;
        let or = compile(&FilterItem::or(yes.clone(), no.clone())).matcher;
        let nested = compile(&FilterItem::and(
            FilterItem::or(no.clone(), yes.clone()),
            FilterItem::boolean("admin", true),
        ))
        .matcher;

        assert!(!and(&e));
        assert!(or(&e));
        assert!(nested(&e));
    }
}

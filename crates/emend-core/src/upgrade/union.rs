//! Union accumulation: the normalizer's strategy of flattening every
//! nullable / `oneOf` / `anyOf` / type-array construct into one ordered
//! branch list plus a nullable flag, finalized after traversal.

use crate::common::Discriminator;
use crate::emended::schema::{Attributes, NullSchema, OneOfSchema, Schema, UnknownSchema};

/// Nesting depth past which a subtree is truncated to `Unknown` instead of
/// recursing further.
pub(crate) const MAX_DEPTH: usize = 1024;

#[derive(Debug, Default)]
pub(crate) struct UnionAccumulator {
    branches: Vec<Schema>,
    nullable: bool,
    discriminator: Option<Discriminator>,
}

impl UnionAccumulator {
    pub(crate) fn mark_nullable(&mut self) {
        self.nullable = true;
    }

    pub(crate) fn set_discriminator(&mut self, discriminator: Discriminator) {
        if self.discriminator.is_none() {
            self.discriminator = Some(discriminator);
        }
    }

    /// Add a branch. `Null` collapses into the nullable flag and nested
    /// `OneOf` branches are flattened, so the final list never nests unions.
    pub(crate) fn push(&mut self, schema: Schema) {
        match schema {
            Schema::Null(_) => self.nullable = true,
            Schema::OneOf(one_of) => {
                if let Some(d) = one_of.discriminator {
                    self.set_discriminator(d);
                }
                for branch in one_of.branches {
                    self.push(branch);
                }
            }
            other => self.branches.push(other),
        }
    }

    /// Close the union: append a `Null` branch when a nullability signal was
    /// seen, unwrap singleton unions, and merge the hoisted attribute bag
    /// into the result.
    pub(crate) fn finish(self, bag: Attributes) -> Schema {
        let Self {
            mut branches,
            nullable,
            discriminator,
        } = self;
        if nullable && !branches.iter().any(Schema::is_null) {
            branches.push(Schema::Null(NullSchema::default()));
        }
        let mut result = match branches.len() {
            0 => Schema::Unknown(UnknownSchema::default()),
            1 => branches.remove(0),
            _ => Schema::OneOf(OneOfSchema {
                branches,
                discriminator,
                attributes: Attributes::default(),
            }),
        };
        result.attributes_mut().merge(&bag);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emended::schema::{StringSchema, IntegerSchema};

    #[test]
    fn empty_union_is_unknown() {
        let acc = UnionAccumulator::default();
        assert!(matches!(acc.finish(Attributes::default()), Schema::Unknown(_)));
    }

    #[test]
    fn nullable_alone_is_null() {
        let mut acc = UnionAccumulator::default();
        acc.mark_nullable();
        assert!(matches!(acc.finish(Attributes::default()), Schema::Null(_)));
    }

    #[test]
    fn singleton_union_unwraps() {
        let mut acc = UnionAccumulator::default();
        acc.push(Schema::String(StringSchema::default()));
        let bag = Attributes {
            title: Some("name".to_string()),
            ..Attributes::default()
        };
        match acc.finish(bag) {
            Schema::String(s) => assert_eq!(s.attributes.title.as_deref(), Some("name")),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn nullable_branch_appends_null_once() {
        let mut acc = UnionAccumulator::default();
        acc.push(Schema::String(StringSchema::default()));
        acc.push(Schema::Null(NullSchema::default()));
        acc.mark_nullable();
        match acc.finish(Attributes::default()) {
            Schema::OneOf(one_of) => {
                assert_eq!(one_of.branches.len(), 2);
                assert_eq!(one_of.branches.iter().filter(|b| b.is_null()).count(), 1);
            }
            other => panic!("expected oneOf, got {other:?}"),
        }
    }

    #[test]
    fn nested_one_of_flattens() {
        let mut acc = UnionAccumulator::default();
        acc.push(Schema::OneOf(OneOfSchema {
            branches: vec![
                Schema::String(StringSchema::default()),
                Schema::Integer(IntegerSchema::default()),
            ],
            discriminator: None,
            attributes: Attributes::default(),
        }));
        match acc.finish(Attributes::default()) {
            Schema::OneOf(one_of) => {
                assert_eq!(one_of.branches.len(), 2);
                assert!(one_of.branches.iter().all(|b| !matches!(b, Schema::OneOf(_))));
            }
            other => panic!("expected oneOf, got {other:?}"),
        }
    }
}

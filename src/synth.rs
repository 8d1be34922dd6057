//! Mock value synthesis - turns a schema fragment into a concrete example value.

use serde_json::{Map, Value};

use crate::schema::{CombinatorKind, SchemaFragment, SchemaType};
use crate::types::CombinatorPolicy;

/// Synthesize a mock value using the default combinator policy.
///
/// Arrays get a single synthesized element, objects one entry per declared
/// property and scalars their `example` or, failing that, their type tag
/// (`"string"` for a bare string fragment). The input must be acyclic.
pub fn synthesize(fragment: &SchemaFragment) -> Value {
    synthesize_with(fragment, CombinatorPolicy::default())
}

/// Synthesize a mock value with an explicit combinator policy.
pub fn synthesize_with(fragment: &SchemaFragment, policy: CombinatorPolicy) -> Value {
    if let Some(alternatives) = &fragment.alternatives {
        match (alternatives.kind, policy) {
            (CombinatorKind::OneOf | CombinatorKind::AnyOf, _) => {
                return alternatives
                    .options
                    .first()
                    .map(|first| synthesize_with(first, policy))
                    .unwrap_or(Value::Null);
            }
            (CombinatorKind::AllOf, CombinatorPolicy::MergeAllOf) => {
                let merged = merge_all_of(fragment, &alternatives.options);
                return synthesize_with(&merged, policy);
            }
            (CombinatorKind::AllOf, CombinatorPolicy::FirstAlternative) => {}
        }
    }

    match fragment.kind {
        Some(SchemaType::Array) => match &fragment.items {
            Some(items) => Value::Array(vec![synthesize_with(items, policy)]),
            None => Value::Array(Vec::new()),
        },
        Some(SchemaType::Object) => match &fragment.properties {
            Some(properties) => {
                let object: Map<String, Value> = properties
                    .iter()
                    .map(|(name, property)| (name.clone(), synthesize_with(property, policy)))
                    .collect();
                Value::Object(object)
            }
            None => Value::Null,
        },
        Some(scalar) => fragment
            .example
            .clone()
            .unwrap_or_else(|| Value::String(scalar.as_str().to_string())),
        None => fragment.example.clone().unwrap_or(Value::Null),
    }
}

/// Fold `allOf` branches into a single fragment.
///
/// Keywords already set on the base fragment win; otherwise the first branch
/// that sets one does. Properties are unioned in declaration order.
fn merge_all_of(base: &SchemaFragment, branches: &[SchemaFragment]) -> SchemaFragment {
    let mut merged = SchemaFragment {
        alternatives: None,
        ..base.clone()
    };

    for branch in branches {
        // Nested allOf inside a branch is flattened first.
        let branch = match &branch.alternatives {
            Some(nested) if nested.kind == CombinatorKind::AllOf => {
                merge_all_of(branch, &nested.options)
            }
            _ => branch.clone(),
        };

        if merged.kind.is_none() {
            merged.kind = branch.kind;
        }
        if merged.items.is_none() {
            merged.items = branch.items;
        }
        if merged.example.is_none() {
            merged.example = branch.example;
        }
        if let Some(properties) = branch.properties {
            let target = merged.properties.get_or_insert_with(Default::default);
            for (name, property) in properties {
                target.entry(name).or_insert(property);
            }
        }
    }

    merged
}

//! Conversions from metadata values to template values, so a resolved
//! [`Context`] can be handed to the template engine as its dot.

use std::collections::HashMap;

use gtmpl_value::Value;

use crate::stack::Context;

/// Converts one metadata value into a template value. Mapping keys that are
/// not strings have no template representation and are dropped.
pub fn to_template_value(value: &serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Nil,
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                Value::from(n.as_f64().unwrap_or_default())
            }
        }
        serde_yaml::Value::String(s) => Value::String(s.clone()),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.iter().map(to_template_value).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object: HashMap<String, Value> = HashMap::new();
            for (key, item) in mapping.iter() {
                if let Some(key) = key.as_str() {
                    object.insert(key.to_owned(), to_template_value(item));
                }
            }
            Value::Object(object)
        }
    }
}

/// Converts a whole resolved context into the object the template executes
/// against.
pub fn context_value(context: &Context) -> Value {
    let mut object: HashMap<String, Value> = HashMap::new();
    for (key, value) in context.iter() {
        object.insert(key.clone(), to_template_value(value));
    }
    Value::Object(object)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(to_template_value(&serde_yaml::Value::Null), Value::Nil);
        assert_eq!(
            to_template_value(&serde_yaml::Value::Bool(true)),
            Value::Bool(true),
        );
        assert_eq!(
            to_template_value(&serde_yaml::Value::from("hi")),
            Value::String("hi".to_owned()),
        );
        assert_eq!(
            to_template_value(&serde_yaml::Value::from(7)),
            Value::from(7i64),
        );
    }

    #[test]
    fn test_nested_structures() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("items:\n  - one\n  - 2\n").unwrap();
        match to_template_value(&yaml) {
            Value::Object(object) => match &object["items"] {
                Value::Array(items) => {
                    assert_eq!(items[0], Value::String("one".to_owned()));
                    assert_eq!(items[1], Value::from(2i64));
                }
                other => panic!("items was {:?}", other),
            },
            other => panic!("mapping was {:?}", other),
        }
    }

    #[test]
    fn test_non_string_keys_dropped() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: a\nok: b\n").unwrap();
        match to_template_value(&yaml) {
            Value::Object(object) => {
                assert_eq!(object.len(), 1);
                assert_eq!(object["ok"], Value::String("b".to_owned()));
            }
            other => panic!("mapping was {:?}", other),
        }
    }

    #[test]
    fn test_context_value() {
        let context = Context::from_yaml("title: T\ncount: 3").unwrap();
        match context_value(&context) {
            Value::Object(object) => {
                assert_eq!(object["title"], Value::String("T".to_owned()));
                assert_eq!(object["count"], Value::from(3i64));
            }
            other => panic!("context was {:?}", other),
        }
    }
}

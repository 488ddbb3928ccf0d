//! JSON rendering of objects, frames and stacks.
//!
//! Native values map to their JSON counterparts: ints to numbers, strings to
//! strings, lists to arrays, dicts to objects (non-string keys are rendered in
//! source form). Everything else becomes an object tagged with `"type"`.

use serde_json::{Map, Value, json};

use crate::frame::{Frame, Stack};
use crate::object::Object;

/// Convert an object to a JSON value
pub fn object_to_json(object: &Object) -> Value {
    match object {
        Object::Int(n) => Value::Number((*n).into()),
        Object::String(s) => Value::String(s.clone()),
        Object::List(items) => Value::Array(items.iter().map(object_to_json).collect()),
        Object::Dict(dict) => {
            let map: Map<String, Value> = dict
                .iter()
                .map(|(key, value)| {
                    let key = match key {
                        Object::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key, object_to_json(value))
                })
                .collect();
            Value::Object(map)
        }
        Object::Lambda(lambda) => json!({
            "type": "lambda",
            "params": lambda.params.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            "impl": lambda.body.to_string(),
            "frame": frame_to_json(&lambda.frame),
        }),
        Object::Module(module) => json!({
            "type": "module",
            "name": module.name(),
            "man": module.man(),
        }),
        Object::Wildcard | Object::Unwrap => json!({ "type": object.type_name() }),
    }
}

/// Bindings of one frame, keyed by name
pub fn frame_to_json(frame: &Frame) -> Value {
    Value::Object(
        frame
            .sorted()
            .into_iter()
            .map(|(name, value)| (name.to_string(), object_to_json(value)))
            .collect(),
    )
}

/// Every frame, global first
pub fn stack_to_json(stack: &Stack) -> Value {
    Value::Array(stack.frames().iter().map(frame_to_json).collect())
}

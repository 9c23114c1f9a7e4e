use std::collections::BTreeMap;

use rhai::{Array, Blob, Dynamic, ImmutableString, Map, FLOAT, INT};
use si_core::{ScriptFailure, ScriptValue};

use crate::host::HostHandle;

pub(crate) fn script_value_to_dynamic(value: &ScriptValue) -> Dynamic {
    match value {
        ScriptValue::Undefined => Dynamic::UNIT,
        ScriptValue::Bool(value) => Dynamic::from_bool(*value),
        ScriptValue::Int(value) => Dynamic::from_int(*value as INT),
        ScriptValue::Float(value) => Dynamic::from_float(*value as FLOAT),
        ScriptValue::String(value) => Dynamic::from(value.clone()),
        ScriptValue::Array(values) => {
            Dynamic::from_array(values.iter().map(script_value_to_dynamic).collect())
        }
        ScriptValue::Map(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.as_str().into(), script_value_to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
        ScriptValue::Bytes(bytes) => Dynamic::from_blob(bytes.clone()),
    }
}

/// Converts a scope or result value back into the host model.
///
/// Host handles nested inside arrays or maps are unwrapped in place; the
/// top-level handle is the caller's job (see `unwrap_raw`).
pub(crate) fn dynamic_to_script_value(value: Dynamic) -> Result<ScriptValue, ScriptFailure> {
    if value.is_unit() {
        return Ok(ScriptValue::Undefined);
    }
    if value.is::<bool>() {
        return Ok(ScriptValue::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(ScriptValue::Int(value.cast::<INT>() as i64));
    }
    if value.is::<FLOAT>() {
        return Ok(ScriptValue::Float(value.cast::<FLOAT>() as f64));
    }
    if value.is::<ImmutableString>() {
        return Ok(ScriptValue::String(
            value.cast::<ImmutableString>().to_string(),
        ));
    }
    if value.is::<char>() {
        return Ok(ScriptValue::String(value.cast::<char>().to_string()));
    }
    if value.is::<Blob>() {
        return Ok(ScriptValue::Bytes(value.cast::<Blob>()));
    }
    if value.is::<HostHandle>() {
        return Ok(value.cast::<HostHandle>().into_value());
    }
    if value.is::<Array>() {
        let array = value.cast::<Array>();
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            out.push(dynamic_to_script_value(item)?);
        }
        return Ok(ScriptValue::Array(out));
    }
    if value.is::<Map>() {
        let map = value.cast::<Map>();
        let mut out = BTreeMap::new();
        for (key, value) in map {
            out.insert(key.to_string(), dynamic_to_script_value(value)?);
        }
        return Ok(ScriptValue::Map(out));
    }

    Err(ScriptFailure::Conversion {
        name: None,
        type_name: value.type_name().to_string(),
    })
}

/// Renders a script value the way `format` substitutes it.
pub(crate) fn dynamic_to_text(value: &Dynamic) -> String {
    if let Some(handle) = value.read_lock::<HostHandle>() {
        return handle.value().to_string();
    }
    if value.is_unit() {
        return ScriptValue::Undefined.to_string();
    }
    value.to_string()
}

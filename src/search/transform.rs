//! Result transform hooks applied to every fetched hit

use crate::backend::Hit;
use serde_json::{Map, Value};

/// Key under which the default transform stores the document identifier
pub const ID_KEY: &str = "_id";

/// Maps a raw hit to a domain value
///
/// A failing transform aborts the whole fetch it runs in. Closures of the
/// form `Fn(&Hit) -> anyhow::Result<T>` implement this trait.
pub trait Transform<T>: Send + Sync {
    fn transform(&self, hit: &Hit) -> anyhow::Result<T>;
}

impl<T, F> Transform<T> for F
where
    F: Fn(&Hit) -> anyhow::Result<T> + Send + Sync,
{
    fn transform(&self, hit: &Hit) -> anyhow::Result<T> {
        self(hit)
    }
}

/// Default transform: the source object with `_id` injected
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceWithId;

impl Transform<Value> for SourceWithId {
    fn transform(&self, hit: &Hit) -> anyhow::Result<Value> {
        let mut doc = match hit.source {
            Value::Object(ref map) => map.clone(),
            Value::Null => Map::new(),
            ref other => anyhow::bail!("source of {} is not an object: {}", hit.id, other),
        };
        doc.insert(ID_KEY.to_string(), Value::String(hit.id.clone()));
        Ok(Value::Object(doc))
    }
}

/// Decode the source into any deserializable type
pub fn decode<T: serde::de::DeserializeOwned>(hit: &Hit) -> anyhow::Result<T> {
    Ok(serde_json::from_value(hit.source.clone())?)
}

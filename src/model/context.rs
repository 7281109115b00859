use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::model::value::Value;

/// One name→value mapping of a rendering context.
pub type Layer = BTreeMap<String, Value>;

/// The layered set of named values visible during template evaluation.
///
/// Layers are stored outermost first; lookups search from the last
/// (innermost) layer backwards.
#[derive(Debug, Clone)]
pub struct RenderingContext {
    dicts: Vec<Layer>,
}

impl RenderingContext {
    pub fn new() -> Self {
        Self {
            dicts: vec![Layer::new()],
        }
    }

    pub fn from_layers(dicts: Vec<Layer>) -> Self {
        Self { dicts }
    }

    /// Builds a context from a JSON array of objects, one object per layer.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Array(layers) = json else {
            bail!("context must be a JSON array of objects");
        };

        let mut dicts = Vec::with_capacity(layers.len());
        for (i, layer) in layers.into_iter().enumerate() {
            let serde_json::Value::Object(map) = layer else {
                bail!("context layer {} is not a JSON object", i);
            };
            dicts.push(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect());
        }
        Ok(Self { dicts })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.dicts
    }

    pub fn push(&mut self, layer: Layer) {
        self.dicts.push(layer);
    }

    pub fn pop(&mut self) -> Option<Layer> {
        self.dicts.pop()
    }

    /// Sets `name` in the innermost layer.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if self.dicts.is_empty() {
            self.dicts.push(Layer::new());
        }
        if let Some(top) = self.dicts.last_mut() {
            top.insert(name.into(), value.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.dicts.iter().rev().find_map(|layer| layer.get(name))
    }
}

impl Default for RenderingContext {
    fn default() -> Self {
        Self::new()
    }
}

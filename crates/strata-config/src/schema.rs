//! The registry of declared parameters.

use crate::error::ConfigError;
use crate::types::ParameterSpec;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Every parameter an application declares, indexed by name and alias.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    parameters: IndexMap<String, ParameterSpec>,
    /// name or alias -> canonical name
    lookup: HashMap<String, String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter, failing if any of its names is already taken.
    pub fn add(&mut self, spec: ParameterSpec) -> Result<(), ConfigError> {
        let mut seen = Vec::new();
        for name in spec.names() {
            if let Some(existing) = self.lookup.get(name) {
                return Err(ConfigError::DuplicateParameter {
                    name: name.to_string(),
                    existing: existing.clone(),
                });
            }
            if seen.contains(&name) {
                return Err(ConfigError::DuplicateParameter {
                    name: name.to_string(),
                    existing: spec.name.clone(),
                });
            }
            seen.push(name);
        }

        for name in spec.names() {
            self.lookup.insert(name.to_string(), spec.name.clone());
        }
        self.parameters.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Builder form of [`Schema::add`].
    pub fn with(mut self, spec: ParameterSpec) -> Result<Self, ConfigError> {
        self.add(spec)?;
        Ok(self)
    }

    /// Build a schema from a list of parameters.
    pub fn from_specs(specs: impl IntoIterator<Item = ParameterSpec>) -> Result<Self, ConfigError> {
        let mut schema = Self::new();
        for spec in specs {
            schema.add(spec)?;
        }
        Ok(schema)
    }

    /// Look a parameter up by its canonical name or any alias.
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.lookup
            .get(name)
            .and_then(|canonical| self.parameters.get(canonical))
    }

    /// The canonical name for a name or alias.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.lookup.get(name).map(String::as_str)
    }

    /// Parameters in registration order.
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.values()
    }

    /// Canonical names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

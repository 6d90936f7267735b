use crate::config::schema::ExportConfig;
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads, resolves `extends` and validates an export configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ExportConfig> {
        let config = Self::load_unchecked(path)?;
        config.check()?;
        Ok(config)
    }

    /// Like [`ConfigLoader::load`] but skips validation, so callers can apply
    /// overrides before checking.
    pub fn load_unchecked<P: AsRef<Path>>(path: P) -> Result<ExportConfig> {
        let mut visited = HashSet::new();
        let merged = Self::load_with_inheritance(path.as_ref(), &mut visited)?;
        let mut config: ExportConfig = serde_json::from_value(merged)?;
        config.extends = None;
        Ok(config)
    }

    fn load_with_inheritance(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<Value> {
        let path = fs::canonicalize(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        if !visited.insert(path.clone()) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }

        let mut value = Self::load_file(&path)?;
        let parent_ref = value
            .get("extends")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(parent_path_str) = parent_ref {
            let parent_path = path
                .parent()
                .ok_or_else(|| {
                    Error::Config(format!(
                        "Cannot determine parent directory for {}",
                        path.display()
                    ))
                })?
                .join(parent_path_str);

            let mut parent = Self::load_with_inheritance(&parent_path, visited)?;
            if let Some(map) = value.as_object_mut() {
                map.remove("extends");
            }
            merge_values(&mut parent, value);
            value = parent;
        }

        Ok(value)
    }

    fn load_file(path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let value: Value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(Error::Config(format!(
                    "Unsupported file extension: {}",
                    path.display()
                )));
            }
        };

        if !value.is_object() {
            return Err(Error::Config(format!(
                "{}: top level must be a table",
                path.display()
            )));
        }
        Ok(value)
    }
}

/// Child keys win; nested tables merge key by key.
fn merge_values(parent: &mut Value, child: Value) {
    match (parent, child) {
        (Value::Object(parent), Value::Object(child)) => {
            for (key, value) in child {
                let nested = value.is_object() && parent.get(&key).is_some_and(Value::is_object);
                if nested {
                    if let Some(existing) = parent.get_mut(&key) {
                        merge_values(existing, value);
                    }
                } else {
                    parent.insert(key, value);
                }
            }
        }
        (parent, child) => *parent = child,
    }
}

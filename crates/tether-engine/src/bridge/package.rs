//! Named groups of script values, such as the `host` builtins package or a
//! host API handed to a script

use std::collections::BTreeMap;

use crate::bridge::copy_policy::AccessMode;
use crate::bridge::error::{BridgeError, BridgeResult};
use crate::value::{ScriptObject, Value};

/// A package: an import path, a short name and its members
#[derive(Debug, Clone)]
pub struct Package {
    path: String,
    name: String,
    members: BTreeMap<String, Value>,
}

impl Package {
    /// Empty package. The name is the last element of `path`.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            path,
            name,
            members: BTreeMap::new(),
        }
    }

    /// Builder form of [`Package::insert`]
    pub fn with_member(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a member
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.members.insert(name.into(), value);
    }

    /// Member named `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    /// Import path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Short name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ScriptObject for Package {
    fn type_name(&self) -> String {
        format!("host.package<{}>", self.path)
    }

    fn to_text(&self) -> String {
        format!("<package {}>", self.path)
    }

    fn hash(&self) -> BridgeResult<u64> {
        Err(BridgeError::Unhashable(self.type_name()))
    }

    fn attr(&self, name: &str, _mode: AccessMode) -> BridgeResult<Option<Value>> {
        Ok(self.members.get(name).cloned())
    }

    fn attr_names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }
}

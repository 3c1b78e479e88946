use crate::core::base::*;
use std::collections::HashMap;

/// Name/value construction parameters, already parsed by the embedding
/// system. Lookups fall back to the caller's default.
#[derive(Debug, Default, Clone)]
pub struct ParamSet {
    bools: HashMap<String, bool>,
    ints: HashMap<String, i32>,
    floats: HashMap<String, Float>,
    strings: HashMap<String, String>,
}

impl ParamSet {
    pub fn new() -> Self {
        ParamSet::default()
    }

    pub fn add_bool(&mut self, name: &str, value: bool) {
        self.bools.insert(String::from(name), value);
    }

    pub fn add_int(&mut self, name: &str, value: i32) {
        self.ints.insert(String::from(name), value);
    }

    pub fn add_float(&mut self, name: &str, value: Float) {
        self.floats.insert(String::from(name), value);
    }

    pub fn add_string(&mut self, name: &str, value: &str) {
        self.strings.insert(String::from(name), String::from(value));
    }

    pub fn find_one_bool(&self, name: &str, default: bool) -> bool {
        return self.bools.get(name).copied().unwrap_or(default);
    }

    pub fn find_one_int(&self, name: &str, default: i32) -> i32 {
        return self.ints.get(name).copied().unwrap_or(default);
    }

    pub fn find_one_float(&self, name: &str, default: Float) -> Float {
        return self.floats.get(name).copied().unwrap_or(default);
    }

    pub fn find_one_string(&self, name: &str, default: &str) -> String {
        return self
            .strings
            .get(name)
            .cloned()
            .unwrap_or_else(|| String::from(default));
    }
}

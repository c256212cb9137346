//! Route parameters extracted during resolution

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Parameter name → value, in discovery order.
///
/// Re-binding a name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    entries: Vec<(String, String)>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl Serialize for RouteParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_discovery_order() {
        let mut params = RouteParams::new();
        params.insert("category", "shoes");
        params.insert("id", "42");
        params.insert("category", "boots");
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(pairs, vec![("category", "boots"), ("id", "42")]);
    }

    #[test]
    fn test_serializes_as_map() {
        let params: RouteParams = [("slug", "a/b/c")].into_iter().collect();
        assert_eq!(serde_json::to_value(&params).unwrap(), serde_json::json!({"slug": "a/b/c"}));
    }
}

use indexmap::IndexMap;

/// Model-wide registry of property keys, mapping each distinct key to a
/// stable `propid-N` definition identifier.
///
/// The registry is append-only: a definition outlives the last entity using
/// its key, so identifiers stay valid across deletes. Two different keys
/// never share an identifier and one key never has two identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyDefinitions {
    by_id: IndexMap<String, String>,
}

impl PropertyDefinitions {
    /// Returns the identifier for `key`, minting a fresh one on first use.
    pub fn define(&mut self, key: &str) -> String {
        if let Some(id) = self.id_of(key) {
            return id.to_owned();
        }
        let id = self.fresh_id();
        self.by_id.insert(id.clone(), key.to_owned());
        id
    }

    /// Binds an imported definition to an explicit identifier.
    ///
    /// Returns `false` when the identifier is already bound to a different
    /// key; the caller then resolves the conflict with [`Self::define`].
    pub fn try_register(&mut self, id: &str, key: &str) -> bool {
        match self.by_id.get(id) {
            Some(existing) => existing == key,
            None => {
                self.by_id.insert(id.to_owned(), key.to_owned());
                true
            }
        }
    }

    pub fn id_of(&self, key: &str) -> Option<&str> {
        self.by_id
            .iter()
            .find(|(_, k)| k.as_str() == key)
            .map(|(id, _)| id.as_str())
    }

    pub fn key_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// Iterates `(id, key)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_id.iter().map(|(id, key)| (id.as_str(), key.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    // Lowest free identifier; imports can occupy arbitrary slots, so the
    // scan always starts at 1.
    fn fresh_id(&self) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("propid-{n}");
            if !self.by_id.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_is_idempotent() {
        let mut defs = PropertyDefinitions::default();
        let a = defs.define("Owner");
        let b = defs.define("Owner");
        assert_eq!(a, b);
        assert_eq!(defs.len(), 1);
    }

    #[test]
    fn keys_get_sequential_ids() {
        let mut defs = PropertyDefinitions::default();
        assert_eq!(defs.define("Owner"), "propid-1");
        assert_eq!(defs.define("Status"), "propid-2");
        assert_eq!(defs.key_of("propid-2"), Some("Status"));
        assert_eq!(defs.id_of("Owner"), Some("propid-1"));
    }

    #[test]
    fn minting_skips_imported_ids() {
        let mut defs = PropertyDefinitions::default();
        assert!(defs.try_register("propid-2", "Imported"));
        // The import left slot 1 free; slot 2 is occupied.
        assert_eq!(defs.define("Owner"), "propid-1");
        assert_eq!(defs.define("Status"), "propid-3");
    }

    #[test]
    fn register_rejects_conflicting_binding() {
        let mut defs = PropertyDefinitions::default();
        assert!(defs.try_register("propid-1", "Owner"));
        assert!(!defs.try_register("propid-1", "Status"));
        assert!(defs.try_register("propid-1", "Owner"));
        assert_eq!(defs.len(), 1);
    }
}

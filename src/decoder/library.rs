//! Reference fingerprint library.

use std::sync::Arc;

/// Named reference magnitude vectors, in registration order.
///
/// Built once and then frozen: cloning shares the same backing storage, so
/// several decoders (on several threads) can read one library.
#[derive(Debug, Clone, Default)]
pub struct FingerprintLibrary {
    entries: Arc<Vec<(String, Vec<f64>)>>,
}

impl FingerprintLibrary {
    /// An empty library; every decode against it reports "no match".
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reference vector registered under `name`.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

/// Registering a name twice keeps its first position and the last vector.
impl<S: Into<String>> FromIterator<(S, Vec<f64>)> for FingerprintLibrary {
    fn from_iter<I: IntoIterator<Item = (S, Vec<f64>)>>(iter: I) -> Self {
        let mut entries: Vec<(String, Vec<f64>)> = Vec::new();
        for (name, reference) in iter {
            let name = name.into();
            match entries.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = reference,
                None => entries.push((name, reference)),
            }
        }
        Self {
            entries: Arc::new(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order_preserved() {
        let lib: FingerprintLibrary = [("zeta", vec![1.0]), ("alpha", vec![2.0])]
            .into_iter()
            .collect();
        assert_eq!(lib.names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_duplicate_name_replaces_in_place() {
        let lib: FingerprintLibrary = [
            ("a", vec![1.0]),
            ("b", vec![2.0]),
            ("a", vec![3.0, 4.0]),
        ]
        .into_iter()
        .collect();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.names().next(), Some("a"));
        assert_eq!(lib.get("a"), Some(&[3.0, 4.0][..]));
    }

    #[test]
    fn test_clone_shares_storage() {
        let lib: FingerprintLibrary = [("a", vec![1.0])].into_iter().collect();
        let copy = lib.clone();
        assert!(Arc::ptr_eq(&lib.entries, &copy.entries));
    }

    #[test]
    fn test_library_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FingerprintLibrary>();
    }
}

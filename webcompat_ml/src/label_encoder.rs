use bincode::{Decode, Encode};

use crate::errors::{Result, WebcompatError};

/// Maps categorical target values to contiguous class ids.
///
/// Classes are the distinct fitted values in lexicographic order, so `"no"`
/// is class 0 and `"yes"` is class 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fits the classes, discarding any previous ones.
    pub fn fit<S>(&mut self, values: &[S])
    where
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = values.iter().map(|v| v.as_ref().to_string()).collect();
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;
    }

    /// Converts a value into its class id.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::SchemaMismatch`] is returned for values not seen
    /// during fitting.
    pub fn transform(&self, value: &str) -> Result<u32> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map(|id| id as u32)
            .map_err(|_| {
                WebcompatError::schema_mismatch(format!(
                    "unknown target value {value:?} (known: {:?})",
                    self.classes
                ))
            })
    }

    /// Converts a class id back into its value.
    pub fn inverse_transform(&self, id: u32) -> Option<&str> {
        self.classes.get(id as usize).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

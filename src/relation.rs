// Related-record shape returned by the backend's embedded selects.
//
// Depending on the foreign-key cardinality the query layer inlines a joined
// record either as a single object or as an array. Both shapes deserialize
// into `Related` and are collapsed to "the first record" here, so the rest
// of the crate never inspects the raw shape.
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Related<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Related<T> {
    /// The joined record, if any. An empty array counts as no record.
    pub fn first(&self) -> Option<&T> {
        match self {
            Related::One(item) => Some(item),
            Related::Many(items) => items.first(),
        }
    }

    pub fn into_first(self) -> Option<T> {
        match self {
            Related::One(item) => Some(item),
            Related::Many(items) => items.into_iter().next(),
        }
    }
}

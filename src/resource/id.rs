//! Resource identifiers used by the Jaqpot API.

use serde::{self, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use super::Resource;
use crate::errors::*;

/// A strongly-typed "resource ID" used to identify many different kinds of
/// Jaqpot resources.
///
/// Jaqpot often hands us full references instead of bare IDs, such as a
/// `Location` header or a task's `result` field. We accept any of these and
/// keep only the final path segment.
pub struct Id<R: Resource> {
    /// The ID of the resource.
    id: String,
    /// A special 0-byte field which exists just to mention the type `R`
    /// inside the struct, and thus avoid compiler errors about unused type
    /// parameters.
    _phantom: PhantomData<fn() -> R>,
}

impl<R: Resource> Id<R> {
    /// Get this resource as a string.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Extract an ID from a resource reference like `dataset/abc`,
    /// `https://api.jaqpot.org/jaqpot/services/dataset/abc` or plain `abc`.
    pub fn from_reference(reference: &str) -> Result<Self> {
        let path = reference
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default();
        match path.rsplit('/').find(|segment| !segment.is_empty()) {
            Some(id) => Ok(Id {
                id: id.to_owned(),
                _phantom: PhantomData,
            }),
            None => Err(Error::malformed_reference(reference)),
        }
    }
}

impl<R: Resource> FromStr for Id<R> {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        Self::from_reference(id)
    }
}

impl<R: Resource> Clone for Id<R> {
    fn clone(&self) -> Self {
        Id {
            id: self.id.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<R: Resource> PartialEq for Id<R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R: Resource> Eq for Id<R> {}

impl<R: Resource> Hash for Id<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl<R: Resource> fmt::Debug for Id<R> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}/{}", R::api_name(), &self.id)
    }
}

impl<R: Resource> fmt::Display for Id<R> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", &self.id)
    }
}

impl<'de, R: Resource> Deserialize<'de> for Id<R> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id: String = String::deserialize(deserializer)?;
        Ok(Id {
            id,
            _phantom: PhantomData,
        })
    }
}

impl<R: Resource> Serialize for Id<R> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.id.serialize(serializer)
    }
}

#[test]
fn extracts_id_from_references() {
    use super::Dataset;

    let examples = &[
        ("abc", "abc"),
        ("dataset/abc", "abc"),
        ("https://api.jaqpot.org/jaqpot/services/dataset/abc", "abc"),
        ("https://api.jaqpot.org/jaqpot/services/dataset/abc/", "abc"),
        ("dataset/abc?dataEntries=true", "abc"),
    ];
    for &(reference, expected) in examples {
        let id = Id::<Dataset>::from_reference(reference).unwrap();
        assert_eq!(id.as_str(), expected);
    }
}

#[test]
fn rejects_empty_references() {
    use super::Dataset;

    for reference in &["", "/", "///", "?x=1"] {
        assert!(Id::<Dataset>::from_reference(reference).is_err());
    }
}

use std::fmt;
use std::str::FromStr;

use strand_types::{Map, Value};

use crate::error::{MutationError, MutationResult};

/// A dot-separated path of map keys, e.g. `"map.a.b"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cursor {
    /// Intermediate map keys.
    path: Vec<String>,
    /// Key addressed inside the last intermediate map.
    key: String,
}

impl Cursor {
    /// Parse a dot-path. Empty paths and empty segments are rejected.
    pub fn parse(path: &str) -> MutationResult<Self> {
        Self::from_segments(path.split('.').map(str::to_string).collect())
    }

    pub fn from_segments(mut segments: Vec<String>) -> MutationResult<Self> {
        if segments.iter().any(String::is_empty) {
            return Err(MutationError::ParsingCursor(segments.join(".")));
        }
        let key = segments
            .pop()
            .ok_or_else(|| MutationError::ParsingCursor(String::new()))?;
        Ok(Self {
            path: segments,
            key,
        })
    }

    /// All segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path
            .iter()
            .chain(std::iter::once(&self.key))
            .map(String::as_str)
    }

    /// The final key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Walk to the map holding the final key.
    ///
    /// With `create`, missing intermediate maps are inserted; otherwise a
    /// missing intermediate fails like one that is not a map.
    pub(crate) fn parent_map<'a>(
        &self,
        data: &'a mut Map,
        create: bool,
    ) -> MutationResult<&'a mut Map> {
        let mut current = data;
        for segment in &self.path {
            if !current.contains_key(segment) {
                if !create {
                    return Err(MutationError::ParsingCursor(self.to_string()));
                }
                current.insert(segment.clone(), Map::new());
            }
            current = current
                .get_mut(segment)
                .and_then(Value::as_map_mut)
                .ok_or_else(|| MutationError::ParsingCursor(self.to_string()))?;
        }
        Ok(current)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for Cursor {
    type Err = MutationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

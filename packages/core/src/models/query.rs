//! Query projections
//!
//! Read operations accept a `Projection` that selects what is returned for
//! each node: its id, the whole node, its kind, type, data, the zombie-field
//! value, or any single data field. A multi-field projection yields a JSON
//! object keyed by the requested names.

use std::fmt;

/// A single projected field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    Id,
    Node,
    Kind,
    Type,
    Data,
    /// Value of the configured zombie field
    Zombie,
    /// Any key of the node's data
    Field(String),
}

impl Query {
    pub fn field(key: impl Into<String>) -> Self {
        Query::Field(key.into())
    }

    /// Name used as the key of multi-field projections
    pub fn name(&self) -> &str {
        match self {
            Query::Id => "id",
            Query::Node => "node",
            Query::Kind => "nodekind",
            Query::Type => "nodetype",
            Query::Data => "data",
            Query::Zombie => "zombie",
            Query::Field(key) => key,
        }
    }
}

impl From<&str> for Query {
    fn from(name: &str) -> Self {
        match name {
            "id" => Query::Id,
            "node" => Query::Node,
            "nodekind" => Query::Kind,
            "nodetype" => Query::Type,
            "data" => Query::Data,
            "zombie" => Query::Zombie,
            other => Query::Field(other.to_string()),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One or several fields to project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    One(Query),
    Many(Vec<Query>),
}

impl Projection {
    pub fn is_id(&self) -> bool {
        matches!(self, Projection::One(Query::Id))
    }
}

impl Default for Projection {
    fn default() -> Self {
        Projection::One(Query::Id)
    }
}

impl From<Query> for Projection {
    fn from(query: Query) -> Self {
        Projection::One(query)
    }
}

impl From<&str> for Projection {
    fn from(name: &str) -> Self {
        Projection::One(Query::from(name))
    }
}

impl<const N: usize> From<[&str; N]> for Projection {
    fn from(names: [&str; N]) -> Self {
        Projection::Many(names.into_iter().map(Query::from).collect())
    }
}

impl From<Vec<Query>> for Projection {
    fn from(queries: Vec<Query>) -> Self {
        Projection::Many(queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_names_round_trip() {
        for name in ["id", "node", "nodekind", "nodetype", "data", "zombie", "title"] {
            assert_eq!(Query::from(name).name(), name);
        }
        assert_eq!(Query::from("title"), Query::field("title"));
    }

    #[test]
    fn test_projection_conversions() {
        assert!(Projection::default().is_id());
        assert_eq!(Projection::from("node"), Projection::One(Query::Node));
        assert_eq!(
            Projection::from(["id", "title"]),
            Projection::Many(vec![Query::Id, Query::field("title")])
        );
    }
}

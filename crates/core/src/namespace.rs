//! Classification of source namespaces into users and organizations.
//!
//! GitLab keeps personal projects under the username and group projects
//! under the (possibly nested) group path. Gogs only knows users and flat
//! organizations, so group paths are mapped to a sanitized organization
//! identifier.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::archive::RepositoryRecord;

/// Lower-cased set of GitLab usernames supplied by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownUsernames(HashSet<String>);

impl KnownUsernames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.0.contains(&namespace.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Destination owner of one record on the Gogs side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// A personal namespace, imported under the user of the same name.
    User { name: String },
    /// A GitLab group, imported under the derived organization.
    Organization { group: String, id: String },
}

impl Owner {
    /// Owner segment used in API paths and the push URL.
    pub fn segment(&self) -> &str {
        match self {
            Self::User { name } => name,
            Self::Organization { id, .. } => id,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { name } => write!(f, "user {}", name),
            Self::Organization { id, .. } => write!(f, "organization {}", id),
        }
    }
}

/// Read-only classification data shared by report and import modes.
#[derive(Debug, Clone, Default)]
pub struct ClassificationContext {
    usernames: KnownUsernames,
}

impl ClassificationContext {
    pub fn new(usernames: KnownUsernames) -> Self {
        Self { usernames }
    }

    /// `true` if `namespace` is a known username (case-insensitive).
    pub fn is_user_namespace(&self, namespace: &str) -> bool {
        self.usernames.contains(namespace)
    }

    /// Decide where a namespace lands on the Gogs side.
    pub fn owner_for(&self, namespace: &str) -> Owner {
        if self.is_user_namespace(namespace) {
            Owner::User {
                name: namespace.to_string(),
            }
        } else {
            Owner::Organization {
                group: namespace.to_string(),
                id: organization_id_from_group_name(namespace),
            }
        }
    }

    pub fn classify(&self, record: &RepositoryRecord) -> Owner {
        self.owner_for(&record.namespace)
    }
}

/// Map a GitLab group path to a Gogs organization identifier.
///
/// Pure ASCII-alphanumeric names are returned unchanged. Otherwise every
/// character outside `[0-9a-zA-Z-_./]` becomes `_` and every `/` becomes
/// `.`, so `eng/sub` maps to `eng.sub` and `Team One` to `Team_One`.
/// Distinct names may map to the same identifier.
pub fn organization_id_from_group_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return name.to_string();
    }

    name.chars()
        .map(|c| match c {
            '/' => '.',
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        })
        .collect()
}

/// Distinct group names that share one organization identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationCollision {
    pub id: String,
    pub groups: Vec<String>,
}

/// Find organization identifiers claimed by more than one source group.
///
/// User namespaces never collide with each other here; they are skipped.
pub fn organization_collisions<'a, I>(
    context: &ClassificationContext,
    namespaces: I,
) -> Vec<OrganizationCollision>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_id: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for namespace in namespaces {
        if let Owner::Organization { group, id } = context.owner_for(namespace) {
            let groups = by_id.entry(id).or_default();
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
    }

    by_id
        .into_iter()
        .filter(|(_, groups)| groups.len() > 1)
        .map(|(id, groups)| OrganizationCollision { id, groups })
        .collect()
}

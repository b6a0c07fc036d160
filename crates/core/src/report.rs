//! Dry-run analysis of a backup archive. Makes no remote calls.

use std::fmt;

use crate::archive::RepositoryRecord;
use crate::namespace::{organization_collisions, ClassificationContext, OrganizationCollision, Owner};

/// A user namespace and how many repositories it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub name: String,
    pub repositories: usize,
}

/// A group and the organization it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationEntry {
    pub group: String,
    pub id: String,
    pub repositories: usize,
}

/// Classification of every distinct namespace of an archive, in first-seen
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub users: Vec<UserEntry>,
    pub organizations: Vec<OrganizationEntry>,
    pub collisions: Vec<OrganizationCollision>,
}

impl AnalysisReport {
    pub fn analyze<'a, I>(context: &ClassificationContext, records: I) -> Self
    where
        I: IntoIterator<Item = &'a RepositoryRecord>,
    {
        let mut report = Self::default();
        for record in records {
            match context.classify(record) {
                Owner::User { name } => {
                    match report.users.iter_mut().find(|u| u.name == name) {
                        Some(entry) => entry.repositories += 1,
                        None => report.users.push(UserEntry {
                            name,
                            repositories: 1,
                        }),
                    }
                }
                Owner::Organization { group, id } => {
                    match report.organizations.iter_mut().find(|o| o.group == group) {
                        Some(entry) => entry.repositories += 1,
                        None => report.organizations.push(OrganizationEntry {
                            group,
                            id,
                            repositories: 1,
                        }),
                    }
                }
            }
        }

        report.collisions = organization_collisions(
            context,
            report.organizations.iter().map(|o| o.group.as_str()),
        );
        report
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.organizations.is_empty()
    }

    pub fn repository_count(&self) -> usize {
        self.users.iter().map(|u| u.repositories).sum::<usize>()
            + self
                .organizations
                .iter()
                .map(|o| o.repositories)
                .sum::<usize>()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.users.is_empty() {
            writeln!(f, "Users:")?;
            for user in &self.users {
                writeln!(f, "- {} ({})", user.name, plural(user.repositories))?;
            }
        }

        if !self.organizations.is_empty() {
            writeln!(f, "Organizations (GitLab -> Gogs):")?;
            for org in &self.organizations {
                writeln!(f, "- {} -> {} ({})", org.group, org.id, plural(org.repositories))?;
            }
        }

        if !self.collisions.is_empty() {
            writeln!(f, "Warning: groups sharing one organization:")?;
            for collision in &self.collisions {
                writeln!(f, "- {} <- {}", collision.id, collision.groups.join(", "))?;
            }
        }
        Ok(())
    }
}

fn plural(n: usize) -> String {
    if n == 1 {
        "1 repository".into()
    } else {
        format!("{} repositories", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::KnownUsernames;

    fn records(paths: &[&str]) -> Vec<RepositoryRecord> {
        paths
            .iter()
            .map(|p| RepositoryRecord::from_member_path(p).unwrap())
            .collect()
    }

    fn context(users: &[&str]) -> ClassificationContext {
        ClassificationContext::new(KnownUsernames::new(users.iter().copied()))
    }

    #[test]
    fn test_namespaces_are_deduplicated_in_first_seen_order() {
        let recs = records(&[
            "repositories/eng/sub/api.bundle",
            "repositories/alice/proj1.bundle",
            "repositories/Team One/svc.bundle",
            "repositories/alice/proj2.bundle",
            "repositories/eng/sub/web.bundle",
        ]);
        let report = AnalysisReport::analyze(&context(&["Alice"]), &recs);

        assert_eq!(
            report.users,
            [UserEntry {
                name: "alice".into(),
                repositories: 2
            }]
        );
        let orgs: Vec<_> = report
            .organizations
            .iter()
            .map(|o| (o.group.as_str(), o.id.as_str(), o.repositories))
            .collect();
        assert_eq!(orgs, [("eng/sub", "eng.sub", 2), ("Team One", "Team_One", 1)]);
        assert!(report.collisions.is_empty());
        assert_eq!(report.repository_count(), 5);
    }

    #[test]
    fn test_rendering() {
        let recs = records(&[
            "repositories/alice/proj1.bundle",
            "repositories/eng/sub/api.bundle",
        ]);
        let report = AnalysisReport::analyze(&context(&["alice"]), &recs);
        assert_eq!(
            report.to_string(),
            "Users:\n- alice (1 repository)\nOrganizations (GitLab -> Gogs):\n- eng/sub -> eng.sub (1 repository)\n"
        );
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let recs = records(&["repositories/Team One/svc.bundle"]);
        let text = AnalysisReport::analyze(&context(&[]), &recs).to_string();
        assert!(!text.contains("Users:"));
        assert!(text.starts_with("Organizations (GitLab -> Gogs):\n- Team One -> Team_One"));

        let empty = AnalysisReport::analyze(&context(&[]), &Vec::<RepositoryRecord>::new());
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), "");
    }

    #[test]
    fn test_collisions_are_reported() {
        let recs = records(&[
            "repositories/Team One/a.bundle",
            "repositories/Team+One/b.bundle",
        ]);
        let report = AnalysisReport::analyze(&context(&[]), &recs);
        assert_eq!(report.collisions.len(), 1);
        assert!(report
            .to_string()
            .contains("- Team_One <- Team One, Team+One"));
    }
}

// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static subject-to-handler routing, built once at startup.

use courier_core::CourierError;
use strum::Display;

/// The two subjects the scheduler consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SubjectKind {
    /// Fresh campaign announcements.
    Group,
    /// Retry envelopes.
    Pool,
}

/// Maps broker subjects to [`SubjectKind`].
#[derive(Debug, Clone)]
pub struct SubjectRouter {
    group: String,
    pool: String,
}

impl SubjectRouter {
    pub fn new(group: impl Into<String>, pool: impl Into<String>) -> Result<Self, CourierError> {
        let group = group.into();
        let pool = pool.into();
        if group.is_empty() || pool.is_empty() {
            return Err(CourierError::Config("subjects must not be empty".into()));
        }
        if group == pool {
            return Err(CourierError::Config(format!(
                "group and pool subjects must differ, both are `{group}`"
            )));
        }
        Ok(Self { group, pool })
    }

    /// Returns the kind of `subject`, or `None` for a subject nobody routes.
    pub fn resolve(&self, subject: &str) -> Option<SubjectKind> {
        if subject == self.group {
            Some(SubjectKind::Group)
        } else if subject == self.pool {
            Some(SubjectKind::Pool)
        } else {
            None
        }
    }

    pub fn subject(&self, kind: SubjectKind) -> &str {
        match kind {
            SubjectKind::Group => &self.group,
            SubjectKind::Pool => &self.pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_both_subjects() {
        let router = SubjectRouter::new("mailing.group", "mailing.pool").unwrap();
        assert_eq!(router.resolve("mailing.group"), Some(SubjectKind::Group));
        assert_eq!(router.resolve("mailing.pool"), Some(SubjectKind::Pool));
        assert_eq!(router.resolve("mailing.other"), None);
        assert_eq!(router.subject(SubjectKind::Pool), "mailing.pool");
        assert_eq!(SubjectKind::Group.to_string(), "group");
    }

    #[test]
    fn identical_subjects_are_rejected() {
        assert!(SubjectRouter::new("a", "a").is_err());
        assert!(SubjectRouter::new("", "b").is_err());
    }
}

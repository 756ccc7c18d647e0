//! Sequential project numbering.
//!
//! Wraps the store's transactional counter with the degraded-mode
//! fallback: when the store is unreachable, a wall-clock token
//! (`YY-HHMMSS`, six digits instead of three) is issued instead so
//! project creation can still proceed. The caller sees the `degraded`
//! flag and warns the user that the number is not sequence-based.

use baubot_store::ProjectStore;
use chrono::{Datelike, Local, Timelike};
use tracing::{info, warn};

/// An issued project number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedNumber {
    /// `YY-NNN` normally, `YY-HHMMSS` in degraded mode.
    pub number: String,
    /// True when the counter could not be reached and a wall-clock
    /// token was issued instead.
    pub degraded: bool,
}

/// Issues `YY-NNN` project numbers with year rollover.
#[derive(Clone)]
pub struct NumberingService {
    projects: ProjectStore,
}

impl NumberingService {
    pub fn new(projects: ProjectStore) -> Self {
        Self { projects }
    }

    /// Issue the next project number.
    ///
    /// Never fails: if the counter transaction fails, a best-effort
    /// unique fallback token is returned with `degraded` set. The
    /// six-digit time suffix keeps fallback tokens syntactically
    /// distinguishable from real `NNN` sequence numbers.
    pub async fn issue(&self) -> IssuedNumber {
        let now = Local::now();
        match self.projects.issue_next_number(now.date_naive()).await {
            Ok(number) => {
                info!(%number, "project number issued");
                IssuedNumber {
                    number,
                    degraded: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "counter unavailable, issuing wall-clock fallback number");
                let number = format!(
                    "{:02}-{:02}{:02}{:02}",
                    now.year().rem_euclid(100),
                    now.hour(),
                    now.minute(),
                    now.second()
                );
                IssuedNumber {
                    number,
                    degraded: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baubot_store::Database;

    #[tokio::test]
    async fn issues_sequential_numbers() {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let service = NumberingService::new(ProjectStore::new(db));

        let first = service.issue().await;
        let second = service.issue().await;
        assert!(!first.degraded);
        assert!(!second.degraded);
        assert!(first.number.ends_with("-001"));
        assert!(second.number.ends_with("-002"));
    }

    #[tokio::test]
    async fn falls_back_when_counter_is_unavailable() {
        let db = Database::open_in_memory().unwrap();
        // Migrations deliberately not run: the counter table is absent,
        // so the counter transaction fails.
        let service = NumberingService::new(ProjectStore::new(db));

        let issued = service.issue().await;
        assert!(issued.degraded);
        // YY-HHMMSS: six-digit suffix, never three.
        let suffix = issued.number.split('-').nth(1).unwrap();
        assert_eq!(suffix.len(), 6);
    }
}

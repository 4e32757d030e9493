//! crates/school_ops_core/src/aee.rs
//!
//! Registry of special-education (AEE) enrollments.

use std::sync::Arc;

use tracing::{info, warn};

use crate::classifier::RosterFilter;
use crate::context::ConsoleContext;
use crate::domain::{AeeEnrollment, EnrollmentDraft};
use crate::error::{require, CoreResult};
use crate::mirror::Mirror;
use crate::ports::{AeeStore, PortError};
use crate::scheduling::DeleteOutcome;

pub struct AeeRegistry {
    store: Arc<dyn AeeStore>,
    context: ConsoleContext,
    enrollments: Mirror<AeeEnrollment>,
}

impl AeeRegistry {
    pub fn new(store: Arc<dyn AeeStore>, context: ConsoleContext) -> Self {
        let enrollments = Mirror::attach("aee_enrollments", |cb| store.subscribe_all(cb));
        Self {
            store,
            context,
            enrollments,
        }
    }

    /// Enrollments whose class code passes `filter`, ordered by student name.
    pub fn list(&self, filter: &RosterFilter) -> Vec<AeeEnrollment> {
        let mut listed: Vec<AeeEnrollment> = self
            .enrollments
            .read()
            .iter()
            .filter(|e| filter.matches_code(&e.class_code))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.student_name.cmp(&b.student_name));
        listed
    }

    pub async fn enroll(&self, draft: EnrollmentDraft) -> CoreResult<AeeEnrollment> {
        require("student_id", &draft.student_id)?;
        require("support_need", &draft.support_need)?;

        let unsaved = draft.into_unsaved(self.context.clock.now_millis());
        let saved = self.store.enroll(unsaved).await?;
        info!(
            operator = %self.context.operator,
            id = %saved.id,
            student = %saved.student_id,
            "student enrolled in AEE"
        );
        Ok(saved)
    }

    pub async fn withdraw(&self, id: &str) -> CoreResult<DeleteOutcome> {
        require("id", id)?;
        match self.store.withdraw(id).await {
            Ok(()) => {
                info!(operator = %self.context.operator, id, "AEE enrollment withdrawn");
                Ok(DeleteOutcome::Removed)
            }
            Err(PortError::NotFound(msg)) => {
                warn!(operator = %self.context.operator, id, %msg, "AEE enrollment already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn close(&self) {
        self.enrollments.close();
    }
}

impl Drop for AeeRegistry {
    fn drop(&mut self) {
        self.enrollments.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Bucket;
    use crate::error::{CoreError, ValidationError};
    use crate::ports::{PortResult, SnapshotCallback, Subscription};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeAee {
        rows: Mutex<Vec<AeeEnrollment>>,
        listeners: Mutex<Vec<Arc<SnapshotCallback<AeeEnrollment>>>>,
    }

    impl FakeAee {
        fn push(&self) {
            let rows = self.rows.lock().clone();
            let listeners = self.listeners.lock().clone();
            for listener in listeners {
                listener(rows.clone());
            }
        }
    }

    #[async_trait]
    impl AeeStore for FakeAee {
        async fn enroll(&self, mut enrollment: AeeEnrollment) -> PortResult<AeeEnrollment> {
            enrollment.id = format!("aee-{}", self.rows.lock().len() + 1);
            self.rows.lock().push(enrollment.clone());
            self.push();
            Ok(enrollment)
        }

        async fn withdraw(&self, id: &str) -> PortResult<()> {
            let before = self.rows.lock().len();
            self.rows.lock().retain(|e| e.id != id);
            if self.rows.lock().len() == before {
                return Err(PortError::NotFound(id.to_string()));
            }
            self.push();
            Ok(())
        }

        fn subscribe_all(&self, on_update: SnapshotCallback<AeeEnrollment>) -> Subscription {
            let on_update = Arc::new(on_update);
            on_update(self.rows.lock().clone());
            self.listeners.lock().push(on_update);
            Subscription::noop()
        }
    }

    fn draft(student: &str, name: &str, class: &str) -> EnrollmentDraft {
        EnrollmentDraft {
            student_id: student.to_string(),
            student_name: name.to_string(),
            class_code: class.to_string(),
            support_need: "Low vision".to_string(),
            specialist: Some("  ".to_string()),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn enroll_requires_student_and_need() {
        let registry = AeeRegistry::new(Arc::new(FakeAee::default()), ConsoleContext::new("t"));
        let mut bad = draft("s1", "Ana", "1A");
        bad.support_need.clear();
        let err = registry.enroll(bad).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MissingField("support_need"))
        ));
    }

    #[tokio::test]
    async fn list_filters_by_level_and_sorts_by_name() {
        let registry = AeeRegistry::new(Arc::new(FakeAee::default()), ConsoleContext::new("t"));
        registry.enroll(draft("s1", "Carla", "1A")).await.unwrap();
        registry.enroll(draft("s2", "Bruno", "Maternal I")).await.unwrap();
        let saved = registry.enroll(draft("s3", "Ana", "2B")).await.unwrap();
        assert_eq!(saved.specialist, None);

        let secondary = registry.list(&RosterFilter::Level(Bucket::Secondary));
        let names: Vec<&str> = secondary.iter().map(|e| e.student_name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Carla"]);
        assert_eq!(registry.list(&RosterFilter::All).len(), 3);
    }

    #[tokio::test]
    async fn withdraw_is_idempotent() {
        let registry = AeeRegistry::new(Arc::new(FakeAee::default()), ConsoleContext::new("t"));
        let saved = registry.enroll(draft("s1", "Ana", "1A")).await.unwrap();
        assert_eq!(registry.withdraw(&saved.id).await.unwrap(), DeleteOutcome::Removed);
        assert_eq!(
            registry.withdraw(&saved.id).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
        assert!(registry.list(&RosterFilter::All).is_empty());
    }
}

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::models::{Exam, ExamResult, ExamSession, Question};
use crate::engine::error::StoreError;
use crate::repositories;

/// Read access to exam definitions and their question sets. Both are
/// immutable for the lifetime of an attempt.
#[async_trait]
pub(crate) trait ExamSource: Send + Sync {
    async fn exam_by_id(&self, exam_id: &str) -> Result<Option<Exam>, StoreError>;
    async fn questions_for_exam(&self, exam_id: &str) -> Result<Vec<Question>, StoreError>;
}

/// Durable persistence for sessions and results. The store owns the
/// durable copies; after a restart it is the source of truth.
#[async_trait]
pub(crate) trait SessionStore: Send + Sync {
    async fn find_active_session(
        &self,
        exam_id: &str,
        user_id: &str,
    ) -> Result<Option<ExamSession>, StoreError>;

    async fn create_session(&self, session: &ExamSession) -> Result<(), StoreError>;

    /// Overwrite-by-identifier semantics.
    async fn update_session(&self, session: &ExamSession) -> Result<(), StoreError>;

    /// The submit/expire persistence step: the final session state and
    /// its result commit together or not at all.
    async fn finalize_session(
        &self,
        session: &ExamSession,
        result: &ExamResult,
    ) -> Result<(), StoreError>;
}

pub(crate) struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamSource for SqliteStore {
    async fn exam_by_id(&self, exam_id: &str) -> Result<Option<Exam>, StoreError> {
        Ok(repositories::exams::find_by_id(&self.pool, exam_id).await?)
    }

    async fn questions_for_exam(&self, exam_id: &str) -> Result<Vec<Question>, StoreError> {
        Ok(repositories::questions::list_by_exam(&self.pool, exam_id).await?)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn find_active_session(
        &self,
        exam_id: &str,
        user_id: &str,
    ) -> Result<Option<ExamSession>, StoreError> {
        Ok(repositories::sessions::find_active(&self.pool, exam_id, user_id).await?)
    }

    async fn create_session(&self, session: &ExamSession) -> Result<(), StoreError> {
        Ok(repositories::sessions::create(&self.pool, session).await?)
    }

    async fn update_session(&self, session: &ExamSession) -> Result<(), StoreError> {
        Ok(repositories::sessions::update(&self.pool, session).await?)
    }

    async fn finalize_session(
        &self,
        session: &ExamSession,
        result: &ExamResult,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;
        repositories::sessions::update(&mut *tx, session).await?;
        repositories::results::create(&mut *tx, result).await?;
        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }
}

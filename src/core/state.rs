use std::sync::Arc;

use sqlx::SqlitePool;

use crate::core::config::Settings;
use crate::engine::SessionEngine;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: SqlitePool,
    engine: SessionEngine,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: SqlitePool, engine: SessionEngine) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, engine }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub(crate) fn engine(&self) -> &SessionEngine {
        &self.inner.engine
    }
}

use sqlx::Row;

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    let migrations_dir =
        std::env::var("EXAMDESK_MIGRATIONS_DIR").unwrap_or_else(|_| "migrations".to_string());
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(&migrations_dir)).await?;
    migrator.run(&pool).await?;

    let tables = ["users", "exams", "questions", "exam_sessions", "exam_results"];

    for table in tables {
        let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(&pool)
            .await?;
        assert!(row.is_some(), "expected table {table} to exist after migrations");
    }

    // The partial unique index backs the one-active-attempt invariant.
    let index = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?")
        .bind("idx_sessions_one_active")
        .fetch_optional(&pool)
        .await?;
    assert!(index.is_some(), "expected idx_sessions_one_active to exist");

    let row = sqlx::query("PRAGMA foreign_keys").fetch_one(&pool).await?;
    let _: i64 = row.try_get(0)?;

    Ok(())
}

//! Bootstrap DDL executed at startup.
//!
//! `ON DELETE RESTRICT` on the task->user references enforces that a user
//! referenced by any task cannot be deleted.

pub(crate) const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL,
        telephone TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        due_date TIMESTAMPTZ NOT NULL,
        priority TEXT NOT NULL,
        status TEXT NOT NULL,
        owner_id UUID NOT NULL REFERENCES users (id) ON DELETE RESTRICT,
        assignee_id UUID REFERENCES users (id) ON DELETE RESTRICT,
        reminder_sent BOOLEAN NOT NULL DEFAULT FALSE,
        due_notified_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        version BYTEA NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_tasks_due_scan ON tasks (due_notified_at, due_date)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks (owner_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks (assignee_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks (due_date)
    "#,
];

use crate::error::{Error, Result};
use crate::models::{DueProblem, Problem, ProblemSet, ReviewEvent};
use crate::policy::{self, Schedule, Strategy};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{ConnectOptions, Pool, Sqlite, SqlitePool};
use std::str::FromStr;

#[derive(Clone)]
pub struct Db {
    pool: Pool<Sqlite>,
}

impl Db {
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(Error::Storage)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .log_statements(log::LevelFilter::Trace);

        let pool = SqlitePool::connect_with(options).await?;

        let db = Db { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Single-connection in-memory store for tests. One connection is
    /// required because every pooled sqlite :memory: connection would
    /// otherwise see its own empty database.
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Db { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS problem_sets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS problems (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                set_id INTEGER NOT NULL,
                label TEXT NOT NULL,
                next_review_date TEXT NOT NULL,
                review_interval INTEGER NOT NULL DEFAULT 1,
                correct_streak INTEGER NOT NULL DEFAULT 0,
                correct_count INTEGER NOT NULL DEFAULT 0,
                total_count INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (set_id) REFERENCES problem_sets(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                problem_id INTEGER NOT NULL,
                correct INTEGER NOT NULL,
                date TEXT NOT NULL,
                FOREIGN KEY (problem_id) REFERENCES problems(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_set(&self, title: &str) -> Result<ProblemSet> {
        let id = sqlx::query("INSERT INTO problem_sets (title) VALUES (?)")
            .bind(title)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(ProblemSet {
            id,
            title: title.to_string(),
        })
    }

    pub async fn list_sets(&self) -> Result<Vec<ProblemSet>> {
        let sets = sqlx::query_as::<_, ProblemSet>("SELECT id, title FROM problem_sets ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(sets)
    }

    pub async fn set_by_id(&self, id: i64) -> Result<Option<ProblemSet>> {
        let set = sqlx::query_as::<_, ProblemSet>("SELECT id, title FROM problem_sets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(set)
    }

    pub async fn insert_problem(
        &self,
        set_id: i64,
        label: &str,
        next_review_date: NaiveDate,
    ) -> Result<Problem> {
        let id = sqlx::query(
            "INSERT INTO problems (set_id, label, next_review_date) VALUES (?, ?, ?)",
        )
        .bind(set_id)
        .bind(label)
        .bind(next_review_date)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Problem {
            id,
            set_id,
            label: label.to_string(),
            next_review_date,
            review_interval: 1,
            correct_streak: 0,
            correct_count: 0,
            total_count: 0,
        })
    }

    pub async fn problem_by_id(&self, id: i64) -> Result<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>("SELECT * FROM problems WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(problem)
    }

    /// Records one attempt and reschedules the problem in a single
    /// transaction: either the event and the schedule update both land or
    /// neither does.
    pub async fn record_outcome(
        &self,
        problem_id: i64,
        correct: bool,
        on: NaiveDate,
        strategy: Strategy,
    ) -> Result<(ReviewEvent, Schedule)> {
        let mut tx = self.pool.begin().await?;

        let problem = sqlx::query_as::<_, Problem>("SELECT * FROM problems WHERE id = ?")
            .bind(problem_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::ProblemNotFound(problem_id))?;

        // Outcome of the immediately preceding attempt, ties broken by
        // insertion order.
        let prev_correct: Option<bool> = sqlx::query_scalar(
            "SELECT correct FROM reviews WHERE problem_id = ? ORDER BY date DESC, id DESC LIMIT 1",
        )
        .bind(problem_id)
        .fetch_optional(&mut *tx)
        .await?;

        let event_id = sqlx::query("INSERT INTO reviews (problem_id, correct, date) VALUES (?, ?, ?)")
            .bind(problem_id)
            .bind(correct)
            .bind(on)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let schedule = policy::apply_outcome(strategy, &problem, prev_correct, correct, on);

        sqlx::query(
            r#"
            UPDATE problems
            SET next_review_date = ?, review_interval = ?, correct_streak = ?,
                correct_count = ?, total_count = ?
            WHERE id = ?
            "#,
        )
        .bind(schedule.next_review_date)
        .bind(schedule.review_interval)
        .bind(schedule.correct_streak)
        .bind(schedule.correct_count)
        .bind(schedule.total_count)
        .bind(problem_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let event = ReviewEvent {
            id: event_id,
            problem_id,
            correct,
            date: on,
        };

        Ok((event, schedule))
    }

    /// Problems due exactly on `date`, joined with their set title.
    ///
    /// Exact-date match: a problem not reviewed on its due date drops out
    /// of this list on later days instead of accumulating as overdue.
    pub async fn due_on(&self, date: NaiveDate) -> Result<Vec<DueProblem>> {
        let due = sqlx::query_as::<_, DueProblem>(
            r#"
            SELECT problems.id, problem_sets.title AS set_title, problems.label,
                   problems.correct_count, problems.total_count, problems.next_review_date
            FROM problems
            JOIN problem_sets ON problems.set_id = problem_sets.id
            WHERE problems.next_review_date = ?
            ORDER BY problems.id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(due)
    }

    /// Upcoming schedule across all problems, earliest first. Feeds the
    /// schedule chart on the front end.
    pub async fn schedule_overview(&self) -> Result<Vec<DueProblem>> {
        let rows = sqlx::query_as::<_, DueProblem>(
            r#"
            SELECT problems.id, problem_sets.title AS set_title, problems.label,
                   problems.correct_count, problems.total_count, problems.next_review_date
            FROM problems
            JOIN problem_sets ON problems.set_id = problem_sets.id
            ORDER BY problems.next_review_date, problems.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Full attempt history for one problem, oldest first. Unknown ids
    /// yield an empty list, not an error.
    pub async fn events_for(&self, problem_id: i64) -> Result<Vec<ReviewEvent>> {
        let events = sqlx::query_as::<_, ReviewEvent>(
            "SELECT * FROM reviews WHERE problem_id = ? ORDER BY date, id",
        )
        .bind(problem_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    /// Deletes every record of every kind. Irreversible.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM reviews").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM problems").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM problem_sets").execute(&mut *tx).await?;
        tx.commit().await?;

        // VACUUM cannot run inside the transaction.
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}

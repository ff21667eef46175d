use crate::db::Db;
use crate::error::{Error, Result};
use crate::models::{DueProblem, Problem, ProblemSet, ReviewEvent};
use crate::policy::{self, Strategy};
use chrono::NaiveDate;

/// Orchestrates the store and the interval policy. All mutation of a
/// problem's schedule goes through here.
///
/// Submissions for one problem are serialized by the per-call transaction
/// in the store; submissions for different problems are independent.
#[derive(Clone)]
pub struct Scheduler {
    db: Db,
    strategy: Strategy,
}

impl Scheduler {
    pub fn new(db: Db, strategy: Strategy) -> Self {
        Scheduler { db, strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub async fn register_set(&self, title: &str) -> Result<ProblemSet> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("set title must not be empty".into()));
        }
        let set = self.db.insert_set(title).await?;
        log::info!("registered problem set '{}' (id {})", set.title, set.id);
        Ok(set)
    }

    pub async fn sets(&self) -> Result<Vec<ProblemSet>> {
        self.db.list_sets().await
    }

    /// Registers a problem, optionally recording an initiating attempt.
    ///
    /// Without an attempt the problem gets the strategy's no-history
    /// default date. With one, the schedule is recomputed from the
    /// recorded event through the normal submission path, superseding the
    /// initial date.
    pub async fn register_problem(
        &self,
        set_id: i64,
        label: &str,
        first_outcome: Option<bool>,
        on: NaiveDate,
    ) -> Result<Problem> {
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidInput("problem label must not be empty".into()));
        }
        self.db
            .set_by_id(set_id)
            .await?
            .ok_or(Error::SetNotFound(set_id))?;

        let initial = policy::initial_review_date(self.strategy, on);
        let mut problem = self.db.insert_problem(set_id, label, initial).await?;
        log::info!("registered problem '{}' (id {}) in set {}", label, problem.id, set_id);

        if let Some(correct) = first_outcome {
            self.submit_outcome(problem.id, correct, on).await?;
            problem = self
                .db
                .problem_by_id(problem.id)
                .await?
                .ok_or(Error::ProblemNotFound(problem.id))?;
        }

        Ok(problem)
    }

    /// Records one attempt and returns the next review date.
    ///
    /// Not idempotent: every call appends an event and reschedules, so each
    /// physical attempt must map to exactly one call.
    pub async fn submit_outcome(
        &self,
        problem_id: i64,
        correct: bool,
        on: NaiveDate,
    ) -> Result<NaiveDate> {
        let (event, schedule) = self
            .db
            .record_outcome(problem_id, correct, on, self.strategy)
            .await?;
        log::debug!(
            "problem {}: {} on {} -> next review {} (event {})",
            problem_id,
            if correct { "correct" } else { "incorrect" },
            on,
            schedule.next_review_date,
            event.id,
        );
        Ok(schedule.next_review_date)
    }

    /// Problems due exactly on `on`. See `Db::due_on` for the exact-match
    /// semantics.
    pub async fn due_problems(&self, on: NaiveDate) -> Result<Vec<DueProblem>> {
        self.db.due_on(on).await
    }

    pub async fn history(&self, problem_id: i64) -> Result<Vec<ReviewEvent>> {
        self.db.events_for(problem_id).await
    }

    pub async fn overview(&self) -> Result<Vec<DueProblem>> {
        self.db.schedule_overview().await
    }

    /// Wipes all sets, problems, and events.
    pub async fn reset(&self) -> Result<()> {
        log::warn!("resetting store: deleting all sets, problems, and events");
        self.db.reset().await
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::Row;

/// A named collection of problems, e.g. one workbook or past-exam paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemSet {
    pub id: i64,
    pub title: String,
}

/// One tracked problem with its current schedule state.
///
/// `review_interval` drives the backoff strategy, `correct_streak` drives
/// the streak-table strategy; the unused column simply keeps its last value.
/// `correct_count`/`total_count` are display statistics and never feed back
/// into scheduling decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub set_id: i64,
    pub label: String,
    pub next_review_date: NaiveDate,
    pub review_interval: i64,
    pub correct_streak: i64,
    pub correct_count: i64,
    pub total_count: i64,
}

/// One recorded attempt. Append-only; ordered by (date, id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: i64,
    pub problem_id: i64,
    pub correct: bool,
    pub date: NaiveDate,
}

/// Projection returned by the due query: problem joined with its set title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueProblem {
    pub id: i64,
    pub set_title: String,
    pub label: String,
    pub correct_count: i64,
    pub total_count: i64,
    pub next_review_date: NaiveDate,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for ProblemSet {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(ProblemSet {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for Problem {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Problem {
            id: row.try_get("id")?,
            set_id: row.try_get("set_id")?,
            label: row.try_get("label")?,
            next_review_date: row.try_get("next_review_date")?,
            review_interval: row.try_get("review_interval").unwrap_or(1),
            correct_streak: row.try_get("correct_streak").unwrap_or(0),
            correct_count: row.try_get("correct_count").unwrap_or(0),
            total_count: row.try_get("total_count").unwrap_or(0),
        })
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for ReviewEvent {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(ReviewEvent {
            id: row.try_get("id")?,
            problem_id: row.try_get("problem_id")?,
            correct: row.try_get("correct")?,
            date: row.try_get("date")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for DueProblem {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(DueProblem {
            id: row.try_get("id")?,
            set_title: row.try_get("set_title")?,
            label: row.try_get("label")?,
            correct_count: row.try_get("correct_count").unwrap_or(0),
            total_count: row.try_get("total_count").unwrap_or(0),
            next_review_date: row.try_get("next_review_date")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_serialize_as_iso_days() {
        let event = ReviewEvent {
            id: 7,
            problem_id: 3,
            correct: true,
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["date"], "2024-01-02");
        assert_eq!(json["correct"], true);

        let back: ReviewEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.date, event.date);
    }
}

//! Database repository for collection queries and updates.
//!
//! Every write is a single statement; counters and reply lists are changed in
//! place by SQLite so concurrent requests cannot lose each other's updates.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    now_timestamp, Course, CourseFields, DeleteOutcome, Discussion, Enrollment, PopularCourse,
    Reply, UpdateOutcome,
};

/// Maximum number of courses returned by a course listing.
pub const COURSE_LIST_LIMIT: i64 = 6;

/// Maximum number of entries in the popular-course ranking.
pub const POPULAR_COURSES_LIMIT: i64 = 6;

const COURSE_COLUMNS: &str = "id, doc, created_at";

const ENROLLMENT_COLUMNS: &str = "id, user_email, course_id, snapshot, enrolled_at";

const DISCUSSION_COLUMNS: &str = "id, content, author, author_id, votes, posted_at, replies";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection. Called once on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ==================== COURSE OPERATIONS ====================

    /// List courses newest first, optionally only those owned by `email`.
    pub async fn list_courses(&self, email: Option<&str>) -> Result<Vec<Course>, AppError> {
        let rows = match email {
            Some(email) => {
                sqlx::query(&format!(
                    "SELECT {COURSE_COLUMNS} FROM courses \
                     WHERE json_extract(doc, '$.userEmail') = ? \
                     ORDER BY created_at DESC, rowid DESC LIMIT ?"
                ))
                .bind(email)
                .bind(COURSE_LIST_LIMIT)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {COURSE_COLUMNS} FROM courses \
                     ORDER BY created_at DESC, rowid DESC LIMIT ?"
                ))
                .bind(COURSE_LIST_LIMIT)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(course_from_row).collect()
    }

    /// Get a course by ID.
    pub async fn get_course(&self, id: Uuid) -> Result<Option<Course>, AppError> {
        let row = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(course_from_row).transpose()
    }

    /// Create a new course stamped with the current time.
    pub async fn create_course(&self, fields: &CourseFields) -> Result<Course, AppError> {
        let id = Uuid::new_v4();
        let now = now_timestamp();
        let document = fields.to_document();

        sqlx::query("INSERT INTO courses (id, doc, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(serde_json::to_string(&document)?)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Created course {}", id);

        Ok(Course {
            id,
            fields: document,
            created_at: now,
        })
    }

    /// Merge the supplied fields into a course. Unknown IDs match nothing.
    ///
    /// Every supplied key is written in one `json_set`, so a `null` value
    /// stores null and keys not in the body keep their values.
    pub async fn update_course(
        &self,
        id: Uuid,
        fields: &CourseFields,
    ) -> Result<UpdateOutcome, AppError> {
        if fields.is_empty() {
            let row = sqlx::query("SELECT 1 FROM courses WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            return Ok(UpdateOutcome::new(u64::from(row.is_some()), 0));
        }

        let mut sql = String::from("UPDATE courses SET doc = json_set(doc");
        let mut assignments = Vec::new();
        for (key, value) in fields.writable() {
            sql.push_str(", ?, json(?)");
            assignments.push((field_path(key)?, serde_json::to_string(value)?));
        }
        sql.push_str(") WHERE id = ?");

        let mut query = sqlx::query(&sql);
        for (path, value) in assignments {
            query = query.bind(path).bind(value);
        }
        let result = query.bind(id).execute(&self.pool).await?;

        let matched = result.rows_affected();
        Ok(UpdateOutcome::new(matched, matched))
    }

    /// Delete a course. Missing IDs report a zero count.
    pub async fn delete_course(&self, id: Uuid) -> Result<DeleteOutcome, AppError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(DeleteOutcome::new(result.rows_affected()))
    }

    // ==================== ENROLLMENT OPERATIONS ====================

    /// Whether `email` is enrolled in the course.
    pub async fn is_enrolled(&self, email: &str, course_id: Uuid) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM enrollments WHERE user_email = ? AND course_id = ?")
            .bind(email)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Enroll `email` in a course, copying the course fields into the enrollment.
    ///
    /// Fails with `Conflict` if the pair is already enrolled and `NotFound` if
    /// the course does not exist.
    pub async fn enroll(&self, email: &str, course_id: Uuid) -> Result<Enrollment, AppError> {
        if self.is_enrolled(email, course_id).await? {
            return Err(already_enrolled());
        }

        let course = self
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_email: email.to_string(),
            course_id: course.id,
            snapshot: course.snapshot(),
            enrolled_at: now_timestamp(),
        };

        self.insert_enrollment(&enrollment).await?;
        tracing::info!("{} enrolled in course {}", email, course_id);

        Ok(enrollment)
    }

    /// Store an enrollment row.
    ///
    /// The UNIQUE constraint on `(user_email, course_id)` turns a duplicate
    /// that slipped past the existence check into the same conflict.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT INTO enrollments (id, user_email, course_id, snapshot, enrolled_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(enrollment.id)
        .bind(&enrollment.user_email)
        .bind(enrollment.course_id)
        .bind(serde_json::to_string(&enrollment.snapshot)?)
        .bind(&enrollment.enrolled_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(already_enrolled())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List every enrollment of a user in storage order.
    pub async fn list_enrollments(&self, email: &str) -> Result<Vec<Enrollment>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_email = ? ORDER BY rowid"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(enrollment_from_row).collect()
    }

    /// Delete an enrollment. Missing IDs report a zero count.
    pub async fn delete_enrollment(&self, id: Uuid) -> Result<DeleteOutcome, AppError> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(DeleteOutcome::new(result.rows_affected()))
    }

    /// Rank courses by enrollment count.
    ///
    /// Each entry carries the snapshot from the earliest enrollment of that
    /// course; ties keep the course whose first enrollment came first.
    pub async fn popular_courses(&self, limit: i64) -> Result<Vec<PopularCourse>, AppError> {
        let rows = sqlx::query(
            r#"WITH ranked AS (
                SELECT e.*,
                       ROW_NUMBER() OVER (
                           PARTITION BY course_id ORDER BY enrolled_at, rowid
                       ) AS position,
                       COUNT(*) OVER (PARTITION BY course_id) AS enrollment_count
                FROM enrollments e
            )
            SELECT course_id, enrollment_count, snapshot
            FROM ranked
            WHERE position = 1
            ORDER BY enrollment_count DESC, enrolled_at ASC
            LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let snapshot: String = row.get("snapshot");
                Ok(PopularCourse {
                    course_id: row.get("course_id"),
                    enrollments: row.get("enrollment_count"),
                    snapshot: serde_json::from_str(&snapshot)?,
                })
            })
            .collect()
    }

    // ==================== DISCUSSION OPERATIONS ====================

    /// List all posts, newest first.
    pub async fn list_discussions(&self) -> Result<Vec<Discussion>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {DISCUSSION_COLUMNS} FROM discussions ORDER BY posted_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(discussion_from_row).collect()
    }

    /// Get a post by ID.
    pub async fn get_discussion(&self, id: Uuid) -> Result<Option<Discussion>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {DISCUSSION_COLUMNS} FROM discussions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(discussion_from_row).transpose()
    }

    /// Create a post with no votes and no replies.
    pub async fn create_discussion(
        &self,
        content: &str,
        author: &str,
        author_id: &str,
    ) -> Result<Discussion, AppError> {
        let id = Uuid::new_v4();
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO discussions (id, content, author, author_id, votes, posted_at, replies) \
             VALUES (?, ?, ?, ?, 0, ?, '[]')",
        )
        .bind(id)
        .bind(content)
        .bind(author)
        .bind(author_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Discussion {
            id,
            content: content.to_string(),
            author: author.to_string(),
            author_id: author_id.to_string(),
            votes: 0,
            timestamp: now,
            replies: Vec::new(),
        })
    }

    /// Add one vote to a post and return it.
    pub async fn vote_discussion(&self, id: Uuid) -> Result<Discussion, AppError> {
        let result = sqlx::query("UPDATE discussions SET votes = votes + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(discussion_not_found());
        }

        self.get_discussion(id)
            .await?
            .ok_or_else(discussion_not_found)
    }

    /// Replace a post's content and return it.
    pub async fn edit_discussion(&self, id: Uuid, content: &str) -> Result<Discussion, AppError> {
        let result = sqlx::query("UPDATE discussions SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(discussion_not_found());
        }

        self.get_discussion(id)
            .await?
            .ok_or_else(discussion_not_found)
    }

    /// Delete a post.
    pub async fn delete_discussion(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM discussions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(discussion_not_found());
        }

        Ok(())
    }

    /// Append a reply to a post and return the post.
    pub async fn add_reply(&self, id: Uuid, reply: &Reply) -> Result<Discussion, AppError> {
        let reply_json = serde_json::to_string(reply)?;

        let result = sqlx::query(
            "UPDATE discussions SET replies = json_insert(replies, '$[#]', json(?)) WHERE id = ?",
        )
        .bind(&reply_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(discussion_not_found());
        }

        self.get_discussion(id)
            .await?
            .ok_or_else(discussion_not_found)
    }

    /// Remove the reply at `index` and return the post.
    ///
    /// The bounds check and the removal happen in one UPDATE, so the list is
    /// left untouched when the index is out of range.
    pub async fn delete_reply(&self, id: Uuid, index: i64) -> Result<Discussion, AppError> {
        if index >= 0 {
            let result = sqlx::query(
                "UPDATE discussions SET replies = json_remove(replies, ?) \
                 WHERE id = ? AND json_array_length(replies) > ?",
            )
            .bind(format!("$[{}]", index))
            .bind(id)
            .bind(index)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return self
                    .get_discussion(id)
                    .await?
                    .ok_or_else(discussion_not_found);
            }
        }

        match self.get_discussion(id).await? {
            Some(_) => Err(AppError::NotFound(format!("Reply {} not found", index))),
            None => Err(discussion_not_found()),
        }
    }
}

fn discussion_not_found() -> AppError {
    AppError::NotFound("Discussion not found".to_string())
}

fn already_enrolled() -> AppError {
    AppError::Conflict("Already enrolled".to_string())
}

/// JSON path addressing one top-level course field.
fn field_path(key: &str) -> Result<String, AppError> {
    if key.contains('"') {
        return Err(AppError::Validation(format!(
            "Unsupported field name: {}",
            key
        )));
    }
    Ok(format!("$.\"{}\"", key))
}

// Helper functions for row conversion

fn course_from_row(row: &SqliteRow) -> Result<Course, AppError> {
    let doc: String = row.get("doc");
    Ok(Course {
        id: row.get("id"),
        fields: serde_json::from_str(&doc)?,
        created_at: row.get("created_at"),
    })
}

fn enrollment_from_row(row: &SqliteRow) -> Result<Enrollment, AppError> {
    let snapshot: String = row.get("snapshot");
    Ok(Enrollment {
        id: row.get("id"),
        user_email: row.get("user_email"),
        course_id: row.get("course_id"),
        snapshot: serde_json::from_str(&snapshot)?,
        enrolled_at: row.get("enrolled_at"),
    })
}

fn discussion_from_row(row: &SqliteRow) -> Result<Discussion, AppError> {
    let replies: String = row.get("replies");
    Ok(Discussion {
        id: row.get("id"),
        content: row.get("content"),
        author: row.get("author"),
        author_id: row.get("author_id"),
        votes: row.get("votes"),
        timestamp: row.get("posted_at"),
        replies: parse_replies(&replies)?,
    })
}

fn parse_replies(s: &str) -> Result<Vec<Reply>, AppError> {
    serde_json::from_str(s)
        .map_err(|e| AppError::Internal(format!("Unreadable reply list: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::CourseSnapshot;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    async fn repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("repo.sqlite"))
            .await
            .unwrap();
        (Repository::new(pool), temp_dir)
    }

    fn reply(content: &str) -> Reply {
        Reply {
            content: content.to_string(),
            author: "Ada".to_string(),
            author_id: "u-1".to_string(),
            timestamp: now_timestamp(),
        }
    }

    async fn enrollment_rows(repo: &Repository) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
            .fetch_one(&repo.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_course_partial_update_keeps_other_fields() {
        let (repo, _dir) = repo().await;
        let course = repo
            .create_course(&CourseFields::from(json!({
                "courseTitle": "Rust 101",
                "category": "Programming",
                "duration": 6
            })))
            .await
            .unwrap();

        let outcome = repo
            .update_course(course.id, &CourseFields::from(json!({ "category": "Systems" })))
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.modified_count, 1);

        let stored = repo.get_course(course.id).await.unwrap().unwrap();
        assert_eq!(stored.fields["courseTitle"], json!("Rust 101"));
        assert_eq!(stored.fields["category"], json!("Systems"));
        assert_eq!(stored.fields["duration"], json!(6));
        assert_eq!(stored.created_at, course.created_at);

        let unchanged = repo
            .update_course(course.id, &CourseFields::default())
            .await
            .unwrap();
        assert_eq!(unchanged.matched_count, 1);
        assert_eq!(unchanged.modified_count, 0);

        let missing = repo
            .update_course(Uuid::new_v4(), &CourseFields::default())
            .await
            .unwrap();
        assert_eq!(missing.matched_count, 0);
    }

    #[tokio::test]
    async fn test_course_update_writes_explicit_null() {
        let (repo, _dir) = repo().await;
        let course = repo
            .create_course(&CourseFields::from(json!({
                "courseTitle": "Rust 101",
                "imageUrl": "https://img.example/rust.png"
            })))
            .await
            .unwrap();

        repo.update_course(
            course.id,
            &CourseFields::from(json!({ "imageUrl": null, "tags": ["a", "b"] })),
        )
        .await
        .unwrap();

        let stored = repo.get_course(course.id).await.unwrap().unwrap();
        assert_eq!(stored.fields.get("imageUrl"), Some(&Value::Null));
        assert_eq!(stored.fields["tags"], json!(["a", "b"]));
        assert_eq!(stored.fields["courseTitle"], json!("Rust 101"));
    }

    #[tokio::test]
    async fn test_course_update_rejects_quoted_field_names() {
        let (repo, _dir) = repo().await;
        let course = repo.create_course(&CourseFields::default()).await.unwrap();

        let result = repo
            .update_course(course.id, &CourseFields::from(json!({ "a\"b": 1 })))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_enroll_stores_course_id_as_uuid() {
        let (repo, _dir) = repo().await;
        let course = repo
            .create_course(&CourseFields::from(json!({
                "courseTitle": "Databases",
                "duration": 12
            })))
            .await
            .unwrap();

        let enrollment = repo.enroll("a@example.com", course.id).await.unwrap();
        assert_eq!(enrollment.course_id, course.id);
        assert_eq!(enrollment.snapshot.course_title, json!("Databases"));
        assert_eq!(enrollment.snapshot.duration, json!(12));
        assert!(repo.is_enrolled("a@example.com", course.id).await.unwrap());
        assert!(!repo.is_enrolled("b@example.com", course.id).await.unwrap());

        let again = repo.enroll("a@example.com", course.id).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));

        let listed = repo.list_enrollments("a@example.com").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].snapshot, enrollment.snapshot);
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_row_is_a_conflict() {
        let (repo, _dir) = repo().await;
        let course_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO enrollments (id, user_email, course_id, enrolled_at) \
             VALUES (?, 'a@example.com', ?, '2026-01-01T00:00:00.000000Z')",
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .execute(&repo.pool)
        .await
        .unwrap();

        let duplicate = Enrollment {
            id: Uuid::new_v4(),
            user_email: "a@example.com".to_string(),
            course_id,
            snapshot: CourseSnapshot::default(),
            enrolled_at: now_timestamp(),
        };
        match repo.insert_enrollment(&duplicate).await {
            Err(AppError::Conflict(message)) => assert_eq!(message, "Already enrolled"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(enrollment_rows(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_enrolls_keep_one_row() {
        let (repo, _dir) = repo().await;
        let course = repo
            .create_course(&CourseFields::from(json!({ "courseTitle": "Race" })))
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            repo.enroll("a@example.com", course.id),
            repo.enroll("a@example.com", course.id)
        );

        let conflicts = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(AppError::Conflict(_))))
            .count();
        assert_eq!(conflicts, 1, "{first:?} / {second:?}");
        assert!(first.is_ok() || second.is_ok());
        assert_eq!(enrollment_rows(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_reply_removal_by_position() {
        let (repo, _dir) = repo().await;
        let post = repo.create_discussion("Hello", "Ada", "u-1").await.unwrap();
        for content in ["first", "second", "third"] {
            repo.add_reply(post.id, &reply(content)).await.unwrap();
        }

        let updated = repo.delete_reply(post.id, 1).await.unwrap();
        let contents: Vec<_> = updated.replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "third"]);

        assert!(matches!(
            repo.delete_reply(post.id, 2).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_reply(post.id, -1).await,
            Err(AppError::NotFound(_))
        ));
        let unchanged = repo.get_discussion(post.id).await.unwrap().unwrap();
        assert_eq!(unchanged.replies.len(), 2);

        assert!(matches!(
            repo.delete_reply(Uuid::new_v4(), 0).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_reply_list_is_an_internal_error() {
        let (repo, _dir) = repo().await;
        let post = repo.create_discussion("Hello", "Ada", "u-1").await.unwrap();

        sqlx::query("UPDATE discussions SET replies = 'not json' WHERE id = ?")
            .bind(post.id)
            .execute(&repo.pool)
            .await
            .unwrap();

        assert!(matches!(
            repo.get_discussion(post.id).await,
            Err(AppError::Internal(_))
        ));
        assert!(matches!(
            repo.list_discussions().await,
            Err(AppError::Internal(_))
        ));
        assert!(matches!(
            repo.delete_reply(post.id, 0).await,
            Err(AppError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_popular_courses_ranking() {
        let (repo, _dir) = repo().await;
        let quiet = repo.create_course(&CourseFields::default()).await.unwrap();
        let busy = repo
            .create_course(&CourseFields::from(json!({ "courseTitle": "Busy" })))
            .await
            .unwrap();

        repo.enroll("a@example.com", quiet.id).await.unwrap();
        for email in ["a@example.com", "b@example.com", "c@example.com"] {
            repo.enroll(email, busy.id).await.unwrap();
        }

        let ranking = repo.popular_courses(POPULAR_COURSES_LIMIT).await.unwrap();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].course_id, busy.id);
        assert_eq!(ranking[0].enrollments, 3);
        assert_eq!(ranking[0].snapshot.course_title, json!("Busy"));
        assert_eq!(ranking[1].course_id, quiet.id);
        assert_eq!(ranking[1].enrollments, 1);
        assert_eq!(ranking[1].snapshot.course_title, Value::Null);
    }
}

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

pub struct DatabaseOperations;

impl DatabaseOperations {
    // User operations

    pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get_or_create_user(
        pool: &PgPool,
        email: &str,
        name: &str,
        role: UserRole,
    ) -> Result<User> {
        if let Some(existing) = Self::get_user_by_email(pool, email).await? {
            if existing.name != name {
                let updated = sqlx::query_as::<_, User>(
                    "UPDATE users SET name = $1 WHERE id = $2 RETURNING *",
                )
                .bind(name)
                .bind(existing.id)
                .fetch_one(pool)
                .await?;
                return Ok(updated);
            }
            return Ok(existing);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    // School operations

    pub async fn list_schools(pool: &PgPool) -> Result<Vec<School>> {
        let schools = sqlx::query_as::<_, School>("SELECT * FROM schools ORDER BY name")
            .fetch_all(pool)
            .await?;

        Ok(schools)
    }

    pub async fn get_school(pool: &PgPool, school_id: i32) -> Result<Option<School>> {
        let school = sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = $1")
            .bind(school_id)
            .fetch_optional(pool)
            .await?;

        Ok(school)
    }

    /// Idempotent on name: an existing school of the same name is returned as-is.
    pub async fn get_or_create_school(pool: &PgPool, name: &str) -> Result<School> {
        let existing = sqlx::query_as::<_, School>("SELECT * FROM schools WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        if let Some(school) = existing {
            return Ok(school);
        }

        let school =
            sqlx::query_as::<_, School>("INSERT INTO schools (name) VALUES ($1) RETURNING *")
                .bind(name)
                .fetch_one(pool)
                .await?;

        Ok(school)
    }

    // Course operations

    pub async fn create_course(
        pool: &PgPool,
        code: &str,
        course: &CourseCreate,
        created_by: Uuid,
    ) -> Result<Course> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, code, title, created_by, school_id, crn, semester)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(&course.title)
        .bind(created_by)
        .bind(course.school_id)
        .bind(&course.crn)
        .bind(&course.semester)
        .fetch_one(pool)
        .await?;

        Ok(course)
    }

    pub async fn get_course(pool: &PgPool, course_id: Uuid) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(pool)
            .await?;

        Ok(course)
    }

    pub async fn get_course_by_code(pool: &PgPool, code: &str) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE code = $1")
            .bind(code)
            .fetch_optional(pool)
            .await?;

        Ok(course)
    }

    pub async fn find_course(
        pool: &PgPool,
        school_id: i32,
        crn: &str,
        semester: &str,
    ) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE school_id = $1 AND crn = $2 AND semester = $3",
        )
        .bind(school_id)
        .bind(crn)
        .bind(semester)
        .fetch_optional(pool)
        .await?;

        Ok(course)
    }

    pub async fn course_code_exists(pool: &PgPool, code: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE code = $1")
            .bind(code)
            .fetch_one(pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn list_courses_for_professor(pool: &PgPool, user_id: Uuid) -> Result<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE created_by = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(courses)
    }

    pub async fn list_courses_for_student(pool: &PgPool, user_id: Uuid) -> Result<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT c.* FROM courses c
            JOIN enrollments e ON e.course_id = c.id
            WHERE e.student_id = $1
            ORDER BY c.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(courses)
    }

    pub async fn list_all_courses(pool: &PgPool) -> Result<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY created_at")
            .fetch_all(pool)
            .await?;

        Ok(courses)
    }

    // Enrollment operations

    pub async fn is_enrolled(pool: &PgPool, student_id: Uuid, course_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn create_enrollment(
        pool: &PgPool,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (student_id, course_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(pool)
        .await?;

        Ok(enrollment)
    }

    pub async fn student_count(pool: &PgPool, course_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
                .bind(course_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    // Course event operations

    pub async fn list_events_for_course(
        pool: &PgPool,
        course_id: Uuid,
    ) -> Result<Vec<CourseEvent>> {
        let events = sqlx::query_as::<_, CourseEvent>(
            "SELECT * FROM course_events WHERE course_id = $1 ORDER BY start_ts",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;

        Ok(events)
    }

    pub async fn get_event(pool: &PgPool, event_id: Uuid) -> Result<Option<CourseEvent>> {
        let event = sqlx::query_as::<_, CourseEvent>("SELECT * FROM course_events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(pool)
            .await?;

        Ok(event)
    }

    pub async fn create_event(
        pool: &PgPool,
        course_id: Uuid,
        event: &CourseEventCreate,
    ) -> Result<CourseEvent> {
        let event = sqlx::query_as::<_, CourseEvent>(
            r#"
            INSERT INTO course_events (id, course_id, title, start_ts, end_ts, category, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(&event.title)
        .bind(event.start_ts)
        .bind(event.end_ts)
        .bind(event.category)
        .bind(&event.location)
        .fetch_one(pool)
        .await?;

        Ok(event)
    }

    pub async fn update_event(
        pool: &PgPool,
        event_id: Uuid,
        update: &CourseEventUpdate,
    ) -> Result<CourseEvent> {
        let event = sqlx::query_as::<_, CourseEvent>(
            r#"
            UPDATE course_events
            SET title = COALESCE($1, title),
                start_ts = COALESCE($2, start_ts),
                end_ts = COALESCE($3, end_ts),
                category = COALESCE($4, category),
                location = COALESCE($5, location),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&update.title)
        .bind(update.start_ts)
        .bind(update.end_ts)
        .bind(update.category)
        .bind(&update.location)
        .bind(event_id)
        .fetch_one(pool)
        .await?;

        Ok(event)
    }

    pub async fn delete_event(pool: &PgPool, event_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM course_events WHERE id = $1")
            .bind(event_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Replace every event of a course with the supplied list, atomically.
    pub async fn replace_events(
        pool: &PgPool,
        course_id: Uuid,
        events: &[CourseEventCreate],
    ) -> Result<usize> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM course_events WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        for event in events {
            sqlx::query(
                r#"
                INSERT INTO course_events (id, course_id, title, start_ts, end_ts, category, location)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(course_id)
            .bind(&event.title)
            .bind(event.start_ts)
            .bind(event.end_ts)
            .bind(event.category)
            .bind(&event.location)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(events.len())
    }
}

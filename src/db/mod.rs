use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use std::path::Path;

use crate::models::{
    Content, ContentDetail, Course, CourseOutline, Item, ItemBody, ItemKind, Module, ModuleForm,
    ModuleOutline, Subject, clean_title, slugify, validate_slug,
};

/// Scoped order allocation for modules and contents.
pub mod ordering;

use ordering::{CONTENT_ORDER, MODULE_ORDER};

const COURSE_COLUMNS: &str = "id, owner, subject_id, title, slug, overview, created_at";
const MODULE_COLUMNS: &str = "id, course_id, title, description, \"order\"";
const CONTENT_COLUMNS: &str = "id, module_id, content_type, object_id, \"order\"";

/// Field changes for [`Database::update_course`]; `None` leaves a field as is.
#[derive(Debug, Default, Clone)]
pub struct CourseChanges<'a> {
    pub subject_id: Option<i64>,
    pub title: Option<&'a str>,
    pub slug: Option<&'a str>,
    pub overview: Option<&'a str>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, String> {
        let conn = Connection::open(path).map_err(|e| format!("failed to open database: {e}"))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| format!("failed to set pragmas: {e}"))?;

        Ok(Database { conn })
    }

    /// Open a private in-memory database with the schema already applied.
    pub fn open_in_memory() -> Result<Self, String> {
        let conn =
            Connection::open_in_memory().map_err(|e| format!("failed to open database: {e}"))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| format!("failed to set pragmas: {e}"))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Create the schema tables if they don't exist, then run any pending version-gated migrations.
    pub fn migrate(&self) -> Result<(), String> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS order_marks (
                scope      TEXT PRIMARY KEY,
                last_value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subjects (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug  TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS courses (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                owner      TEXT NOT NULL,
                subject_id INTEGER NOT NULL REFERENCES subjects(id) ON DELETE CASCADE,
                title      TEXT NOT NULL,
                slug       TEXT NOT NULL UNIQUE,
                overview   TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS modules (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id   INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                \"order\"     INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contents (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                module_id    INTEGER NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                content_type TEXT NOT NULL CHECK (content_type IN ('text', 'file', 'image', 'video')),
                object_id    INTEGER NOT NULL,
                \"order\"      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS texts (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                owner      TEXT NOT NULL,
                title      TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                content    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS files (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                owner      TEXT NOT NULL,
                title      TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                file       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS images (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                owner      TEXT NOT NULL,
                title      TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                image      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS videos (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                owner      TEXT NOT NULL,
                title      TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                url        TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_courses_owner ON courses(owner);
            CREATE INDEX IF NOT EXISTS idx_courses_subject ON courses(subject_id);
            CREATE INDEX IF NOT EXISTS idx_modules_course ON modules(course_id);
            CREATE INDEX IF NOT EXISTS idx_contents_module ON contents(module_id);
            ",
            )
            .map_err(|e| format!("migration failed: {e}"))?;

        // Ensure schema_version exists in config (fresh databases get version 0).
        self.conn
            .execute(
                "INSERT OR IGNORE INTO config (key, value) VALUES ('schema_version', '0')",
                [],
            )
            .map_err(|e| format!("failed to seed schema_version: {e}"))?;

        run_migrations(&self.conn)
    }

    // -- Config --

    pub fn set_config(&self, key: &str, value: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| format!("failed to set config: {e}"))?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>, String> {
        self.conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| format!("query error: {e}"))
    }

    // -- Subjects --

    /// Create a subject. The slug is derived from the title when not given.
    pub fn create_subject(&self, title: &str, slug: Option<&str>) -> Result<Subject, String> {
        let title = clean_title(title)?;
        let slug = slug.map(str::to_string).unwrap_or_else(|| slugify(&title));
        validate_slug(&slug)?;
        if slug_taken(&self.conn, "subjects", &slug, None)? {
            return Err(format!("slug already exists: {slug}"));
        }

        self.conn
            .execute(
                "INSERT INTO subjects (title, slug) VALUES (?1, ?2)",
                params![title, slug],
            )
            .map_err(|e| format!("failed to insert subject: {e}"))?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!(subject = id, %slug, "created subject");
        Ok(Subject {
            id,
            title,
            slug,
            total_courses: 0,
        })
    }

    pub fn get_subject(&self, id: i64) -> Result<Option<Subject>, String> {
        self.conn
            .query_row(
                "SELECT s.id, s.title, s.slug,
                        (SELECT COUNT(*) FROM courses c WHERE c.subject_id = s.id)
                 FROM subjects s WHERE s.id = ?1",
                params![id],
                row_to_subject,
            )
            .optional()
            .map_err(|e| format!("query error: {e}"))
    }

    pub fn get_subject_by_slug(&self, slug: &str) -> Result<Option<Subject>, String> {
        self.conn
            .query_row(
                "SELECT s.id, s.title, s.slug,
                        (SELECT COUNT(*) FROM courses c WHERE c.subject_id = s.id)
                 FROM subjects s WHERE s.slug = ?1",
                params![slug],
                row_to_subject,
            )
            .optional()
            .map_err(|e| format!("query error: {e}"))
    }

    /// All subjects ordered by title, each with its course count.
    pub fn list_subjects(&self) -> Result<Vec<Subject>, String> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT s.id, s.title, s.slug,
                        (SELECT COUNT(*) FROM courses c WHERE c.subject_id = s.id)
                 FROM subjects s ORDER BY s.title ASC, s.id ASC",
            )
            .map_err(|e| format!("query error: {e}"))?;

        let rows = stmt
            .query_map([], row_to_subject)
            .map_err(|e| format!("query error: {e}"))?;

        collect_rows(rows)
    }

    // -- Courses --

    /// Create a course owned by `owner`. The subject must exist and the slug
    /// (derived from the title when not given) must be unused.
    pub fn insert_course(
        &self,
        owner: &str,
        subject_id: i64,
        title: &str,
        slug: Option<&str>,
        overview: &str,
    ) -> Result<Course, String> {
        if owner.trim().is_empty() {
            return Err("invalid owner: must not be empty".to_string());
        }
        let title = clean_title(title)?;
        let slug = slug.map(str::to_string).unwrap_or_else(|| slugify(&title));
        validate_slug(&slug)?;

        self.get_subject(subject_id)?
            .ok_or_else(|| format!("subject not found: {subject_id}"))?;
        if slug_taken(&self.conn, "courses", &slug, None)? {
            return Err(format!("slug already exists: {slug}"));
        }

        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO courses (owner, subject_id, title, slug, overview, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![owner, subject_id, title, slug, overview, now.to_rfc3339()],
            )
            .map_err(|e| format!("failed to insert course: {e}"))?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(course = id, %owner, %slug, "created course");
        Ok(Course {
            id,
            owner: owner.to_string(),
            subject_id,
            title,
            slug,
            overview: overview.to_string(),
            created_at: now,
        })
    }

    pub fn get_course(&self, id: i64) -> Result<Option<Course>, String> {
        self.conn
            .query_row(
                &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
                params![id],
                row_to_course,
            )
            .optional()
            .map_err(|e| format!("query error: {e}"))
    }

    /// Look up a course only if `owner` owns it.
    pub fn get_course_owned(&self, id: i64, owner: &str) -> Result<Option<Course>, String> {
        self.conn
            .query_row(
                &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1 AND owner = ?2"),
                params![id, owner],
                row_to_course,
            )
            .optional()
            .map_err(|e| format!("query error: {e}"))
    }

    /// Courses, newest first, optionally filtered by owner and subject.
    pub fn list_courses(
        &self,
        owner: Option<&str>,
        subject_id: Option<i64>,
    ) -> Result<Vec<Course>, String> {
        let mut sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE 1=1");
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(o) = owner {
            param_values.push(Box::new(o.to_string()));
            sql.push_str(&format!(" AND owner = ?{}", param_values.len()));
        }
        if let Some(s) = subject_id {
            param_values.push(Box::new(s));
            sql.push_str(&format!(" AND subject_id = ?{}", param_values.len()));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| format!("query error: {e}"))?;

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(params_ref.as_slice(), row_to_course)
            .map_err(|e| format!("query error: {e}"))?;

        collect_rows(rows)
    }

    pub fn update_course(&self, id: i64, changes: &CourseChanges) -> Result<Course, String> {
        let mut sets = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(s) = changes.subject_id {
            self.get_subject(s)?
                .ok_or_else(|| format!("subject not found: {s}"))?;
            param_values.push(Box::new(s));
            sets.push(format!("subject_id = ?{}", param_values.len()));
        }
        if let Some(t) = changes.title {
            param_values.push(Box::new(clean_title(t)?));
            sets.push(format!("title = ?{}", param_values.len()));
        }
        if let Some(slug) = changes.slug {
            validate_slug(slug)?;
            if slug_taken(&self.conn, "courses", slug, Some(id))? {
                return Err(format!("slug already exists: {slug}"));
            }
            param_values.push(Box::new(slug.to_string()));
            sets.push(format!("slug = ?{}", param_values.len()));
        }
        if let Some(o) = changes.overview {
            param_values.push(Box::new(o.to_string()));
            sets.push(format!("overview = ?{}", param_values.len()));
        }

        if !sets.is_empty() {
            param_values.push(Box::new(id));
            let sql = format!(
                "UPDATE courses SET {} WHERE id = ?{}",
                sets.join(", "),
                param_values.len()
            );
            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let rows_changed = self
                .conn
                .execute(&sql, params_ref.as_slice())
                .map_err(|e| format!("update failed: {e}"))?;
            if rows_changed == 0 {
                return Err(format!("course not found: {id}"));
            }
        }

        self.get_course(id)?
            .ok_or_else(|| format!("course not found: {id}"))
    }

    /// Delete a course together with its modules, contents, and their items.
    pub fn delete_course(&self, id: i64) -> Result<(), String> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to start transaction: {e}"))?;

        let items = delete_items_where(
            &tx,
            "module_id IN (SELECT id FROM modules WHERE course_id = ?1)",
            id,
        )?;
        let module_ids: Vec<i64> = self
            .list_modules(id)?
            .into_iter()
            .map(|m| m.id)
            .collect();
        let changed = tx
            .execute("DELETE FROM courses WHERE id = ?1", params![id])
            .map_err(|e| format!("failed to delete course: {e}"))?;
        if changed == 0 {
            return Err(format!("course not found: {id}"));
        }
        for module_id in &module_ids {
            CONTENT_ORDER.forget(&tx, &[module_id])?;
        }
        MODULE_ORDER.forget(&tx, &[&id])?;

        tx.commit()
            .map_err(|e| format!("failed to commit: {e}"))?;
        tracing::info!(course = id, items, "deleted course");
        Ok(())
    }

    /// A course with its subject, modules, and resolved contents.
    pub fn course_outline(&self, id: i64) -> Result<Option<CourseOutline>, String> {
        let Some(course) = self.get_course(id)? else {
            return Ok(None);
        };
        let subject = self.get_subject(course.subject_id)?;
        let mut modules = Vec::new();
        for module in self.list_modules(id)? {
            let contents = self.list_content_details(module.id)?;
            modules.push(ModuleOutline { module, contents });
        }
        Ok(Some(CourseOutline {
            course,
            subject,
            modules,
        }))
    }

    // -- Modules --

    /// Append a module to a course. The order is assigned when not given.
    pub fn add_module(
        &self,
        course_id: i64,
        title: &str,
        description: &str,
        order: Option<i64>,
    ) -> Result<Module, String> {
        self.get_course(course_id)?
            .ok_or_else(|| format!("course not found: {course_id}"))?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to start transaction: {e}"))?;
        let module = insert_module(&tx, course_id, title, description, order)?;
        tx.commit()
            .map_err(|e| format!("failed to commit: {e}"))?;
        Ok(module)
    }

    pub fn get_module(&self, id: i64) -> Result<Option<Module>, String> {
        fetch_module(&self.conn, id)
    }

    /// Look up a module only if its course is owned by `owner`.
    pub fn get_module_owned(&self, id: i64, owner: &str) -> Result<Option<Module>, String> {
        self.conn
            .query_row(
                "SELECT m.id, m.course_id, m.title, m.description, m.\"order\"
                 FROM modules m JOIN courses c ON c.id = m.course_id
                 WHERE m.id = ?1 AND c.owner = ?2",
                params![id, owner],
                row_to_module,
            )
            .optional()
            .map_err(|e| format!("query error: {e}"))
    }

    /// Modules of a course in display order.
    pub fn list_modules(&self, course_id: i64) -> Result<Vec<Module>, String> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {MODULE_COLUMNS} FROM modules WHERE course_id = ?1 ORDER BY \"order\" ASC, id ASC"
            ))
            .map_err(|e| format!("query error: {e}"))?;

        let rows = stmt
            .query_map(params![course_id], row_to_module)
            .map_err(|e| format!("query error: {e}"))?;

        collect_rows(rows)
    }

    pub fn update_module(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Module, String> {
        update_module_fields(&self.conn, id, title, description)?;
        self.get_module(id)?
            .ok_or_else(|| format!("module not found: {id}"))
    }

    /// Delete a module, its contents, and their items.
    pub fn delete_module(&self, id: i64) -> Result<(), String> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to start transaction: {e}"))?;
        remove_module(&tx, id)?;
        tx.commit()
            .map_err(|e| format!("failed to commit: {e}"))?;
        Ok(())
    }

    /// Assign explicit orders to modules of one course, all or nothing.
    pub fn set_module_order(&self, course_id: i64, moves: &[(i64, i64)]) -> Result<(), String> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to start transaction: {e}"))?;
        MODULE_ORDER.reorder(&tx, &[&course_id], moves)?;
        tx.commit()
            .map_err(|e| format!("failed to commit: {e}"))?;
        Ok(())
    }

    /// Apply a batch of module forms for one course in a single transaction.
    ///
    /// Blank extra forms are skipped, forms without an id create modules,
    /// forms with an id update or (with `delete`) remove that module. Any
    /// invalid form rejects the whole batch. Returns the course's modules
    /// after the change.
    pub fn save_module_set(
        &self,
        course_id: i64,
        forms: &[ModuleForm],
    ) -> Result<Vec<Module>, String> {
        self.get_course(course_id)?
            .ok_or_else(|| format!("course not found: {course_id}"))?;

        for (i, form) in forms.iter().enumerate() {
            if form.is_blank() || form.delete {
                continue;
            }
            clean_title(&form.title).map_err(|e| format!("form {i}: {e}"))?;
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to start transaction: {e}"))?;

        for (i, form) in forms.iter().enumerate() {
            if form.is_blank() {
                continue;
            }
            match (form.id, form.delete) {
                (Some(id), delete) => {
                    let belongs = fetch_module(&tx, id)?
                        .map(|m| m.course_id == course_id)
                        .unwrap_or(false);
                    if !belongs {
                        return Err(format!("form {i}: module not found: {id}"));
                    }
                    if delete {
                        remove_module(&tx, id)?;
                    } else {
                        update_module_fields(
                            &tx,
                            id,
                            Some(form.title.as_str()),
                            Some(form.description.as_str()),
                        )?;
                    }
                }
                (None, true) => {}
                (None, false) => {
                    insert_module(&tx, course_id, &form.title, &form.description, None)?;
                }
            }
        }

        tx.commit()
            .map_err(|e| format!("failed to commit: {e}"))?;
        self.list_modules(course_id)
    }

    // -- Contents --

    /// Create an item and attach it to the end of a module (or at `order`).
    pub fn add_content(
        &self,
        module_id: i64,
        owner: &str,
        title: &str,
        body: &ItemBody,
        order: Option<i64>,
    ) -> Result<ContentDetail, String> {
        let title = clean_title(title)?;
        body.validate()?;
        self.get_module(module_id)?
            .ok_or_else(|| format!("module not found: {module_id}"))?;

        let kind = body.kind();
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to start transaction: {e}"))?;

        let now = Utc::now();
        tx.execute(
            &format!(
                "INSERT INTO {} (owner, title, created_at, updated_at, {}) VALUES (?1, ?2, ?3, ?4, ?5)",
                kind.table(),
                kind.body_column()
            ),
            params![owner, title, now.to_rfc3339(), now.to_rfc3339(), body.value()],
        )
        .map_err(|e| format!("failed to insert {kind}: {e}"))?;
        let object_id = tx.last_insert_rowid();

        let order = CONTENT_ORDER.assign(&tx, order, &[&module_id])?;
        tx.execute(
            "INSERT INTO contents (module_id, content_type, object_id, \"order\") VALUES (?1, ?2, ?3, ?4)",
            params![module_id, kind.as_str(), object_id, order],
        )
        .map_err(|e| format!("failed to insert content: {e}"))?;
        let id = tx.last_insert_rowid();

        tx.commit()
            .map_err(|e| format!("failed to commit: {e}"))?;
        tracing::debug!(content = id, module = module_id, %kind, object_id, order, "added content");

        Ok(ContentDetail {
            content: Content {
                id,
                module_id,
                content_type: kind,
                object_id,
                order,
            },
            item: Some(Item {
                id: object_id,
                owner: owner.to_string(),
                title,
                created_at: now,
                updated_at: now,
                body: body.clone(),
            }),
        })
    }

    pub fn get_content(&self, id: i64) -> Result<Option<Content>, String> {
        self.conn
            .query_row(
                &format!("SELECT {CONTENT_COLUMNS} FROM contents WHERE id = ?1"),
                params![id],
                row_to_content,
            )
            .optional()
            .map_err(|e| format!("query error: {e}"))
    }

    /// Look up a content row only if its module's course is owned by `owner`.
    pub fn get_content_owned(&self, id: i64, owner: &str) -> Result<Option<Content>, String> {
        self.conn
            .query_row(
                "SELECT ct.id, ct.module_id, ct.content_type, ct.object_id, ct.\"order\"
                 FROM contents ct
                 JOIN modules m ON m.id = ct.module_id
                 JOIN courses c ON c.id = m.course_id
                 WHERE ct.id = ?1 AND c.owner = ?2",
                params![id, owner],
                row_to_content,
            )
            .optional()
            .map_err(|e| format!("query error: {e}"))
    }

    /// Content rows of a module in display order.
    pub fn list_contents(&self, module_id: i64) -> Result<Vec<Content>, String> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {CONTENT_COLUMNS} FROM contents WHERE module_id = ?1 ORDER BY \"order\" ASC, id ASC"
            ))
            .map_err(|e| format!("query error: {e}"))?;

        let rows = stmt
            .query_map(params![module_id], row_to_content)
            .map_err(|e| format!("query error: {e}"))?;

        collect_rows(rows)
    }

    /// Content rows of a module with their items resolved.
    pub fn list_content_details(&self, module_id: i64) -> Result<Vec<ContentDetail>, String> {
        self.list_contents(module_id)?
            .into_iter()
            .map(|content| self.detail(content))
            .collect()
    }

    pub fn detail(&self, content: Content) -> Result<ContentDetail, String> {
        let item = self.resolve_item(&content)?;
        Ok(ContentDetail { content, item })
    }

    /// Follow a content row's `(content_type, object_id)` to its item.
    pub fn resolve_item(&self, content: &Content) -> Result<Option<Item>, String> {
        let item = self.get_item(content.content_type, content.object_id)?;
        if item.is_none() {
            tracing::warn!(
                content = content.id,
                kind = %content.content_type,
                object_id = content.object_id,
                "content points at a missing item"
            );
        }
        Ok(item)
    }

    pub fn get_item(&self, kind: ItemKind, id: i64) -> Result<Option<Item>, String> {
        fetch_item(&self.conn, kind, id)
    }

    /// Change an item's title and/or payload. The payload must be of the
    /// item's own kind.
    pub fn update_item(
        &self,
        kind: ItemKind,
        id: i64,
        title: Option<&str>,
        body: Option<&ItemBody>,
    ) -> Result<Item, String> {
        let mut sets = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(t) = title {
            param_values.push(Box::new(clean_title(t)?));
            sets.push(format!("title = ?{}", param_values.len()));
        }
        if let Some(b) = body {
            if b.kind() != kind {
                return Err(format!(
                    "invalid content type: cannot store {} data in a {kind} item",
                    b.kind()
                ));
            }
            b.validate()?;
            param_values.push(Box::new(b.value().to_string()));
            sets.push(format!("{} = ?{}", kind.body_column(), param_values.len()));
        }

        if !sets.is_empty() {
            param_values.push(Box::new(Utc::now().to_rfc3339()));
            sets.push(format!("updated_at = ?{}", param_values.len()));
            param_values.push(Box::new(id));
            let sql = format!(
                "UPDATE {} SET {} WHERE id = ?{}",
                kind.table(),
                sets.join(", "),
                param_values.len()
            );
            let params_ref: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();

            let rows_changed = self
                .conn
                .execute(&sql, params_ref.as_slice())
                .map_err(|e| format!("update failed: {e}"))?;
            if rows_changed == 0 {
                return Err(format!("{kind} not found: {id}"));
            }
        }

        self.get_item(kind, id)?
            .ok_or_else(|| format!("{kind} not found: {id}"))
    }

    /// Delete a content row and the item it points at.
    pub fn delete_content(&self, id: i64) -> Result<(), String> {
        let content = self
            .get_content(id)?
            .ok_or_else(|| format!("content not found: {id}"))?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to start transaction: {e}"))?;
        delete_item(&tx, content.content_type, content.object_id)?;
        tx.execute("DELETE FROM contents WHERE id = ?1", params![id])
            .map_err(|e| format!("failed to delete content: {e}"))?;
        tx.commit()
            .map_err(|e| format!("failed to commit: {e}"))?;

        tracing::debug!(
            content = id,
            kind = %content.content_type,
            object_id = content.object_id,
            "deleted content"
        );
        Ok(())
    }

    /// Assign explicit orders to contents of one module, all or nothing.
    pub fn set_content_order(&self, module_id: i64, moves: &[(i64, i64)]) -> Result<(), String> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| format!("failed to start transaction: {e}"))?;
        CONTENT_ORDER.reorder(&tx, &[&module_id], moves)?;
        tx.commit()
            .map_err(|e| format!("failed to commit: {e}"))?;
        Ok(())
    }
}

/// Read the current schema version from the config table.
fn get_schema_version(conn: &Connection) -> Result<i32, String> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM config WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| format!("failed to read schema_version: {e}"))?;
    match value {
        Some(v) => v
            .parse::<i32>()
            .map_err(|e| format!("invalid schema_version value: {e}")),
        None => Ok(0),
    }
}

/// Persist the schema version to the config table.
fn set_schema_version(conn: &Connection, version: i32) -> Result<(), String> {
    conn.execute(
        "INSERT OR REPLACE INTO config (key, value) VALUES ('schema_version', ?1)",
        params![version.to_string()],
    )
    .map_err(|e| format!("failed to set schema_version: {e}"))?;
    Ok(())
}

/// Run all pending schema migrations in order.
///
/// Version 0 is the bare `CREATE TABLE IF NOT EXISTS` baseline. Version 1
/// seeds the order high-water marks from existing rows, so databases that
/// predate `order_marks` keep never reusing order values.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    let version = get_schema_version(conn)?;

    if version < 1 {
        conn.execute_batch(
            "BEGIN;
             INSERT OR IGNORE INTO order_marks (scope, last_value)
                 SELECT 'modules:course_id=' || course_id, MAX(\"order\") FROM modules GROUP BY course_id;
             INSERT OR IGNORE INTO order_marks (scope, last_value)
                 SELECT 'contents:module_id=' || module_id, MAX(\"order\") FROM contents GROUP BY module_id;
             COMMIT;",
        )
        .map_err(|e| format!("migration v1 failed: {e}"))?;
        set_schema_version(conn, 1)?;
    }

    Ok(())
}

fn slug_taken(
    conn: &Connection,
    table: &str,
    slug: &str,
    except_id: Option<i64>,
) -> Result<bool, String> {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE slug = ?1 AND id != ?2"),
        params![slug, except_id.unwrap_or(-1)],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
    .map_err(|e| format!("query error: {e}"))
}

fn insert_module(
    conn: &Connection,
    course_id: i64,
    title: &str,
    description: &str,
    order: Option<i64>,
) -> Result<Module, String> {
    let title = clean_title(title)?;
    let order = MODULE_ORDER.assign(conn, order, &[&course_id])?;
    conn.execute(
        "INSERT INTO modules (course_id, title, description, \"order\") VALUES (?1, ?2, ?3, ?4)",
        params![course_id, title, description, order],
    )
    .map_err(|e| format!("failed to insert module: {e}"))?;

    let id = conn.last_insert_rowid();
    tracing::debug!(module = id, course = course_id, order, "created module");
    Ok(Module {
        id,
        course_id,
        title,
        description: description.to_string(),
        order,
    })
}

fn fetch_module(conn: &Connection, id: i64) -> Result<Option<Module>, String> {
    conn.query_row(
        &format!("SELECT {MODULE_COLUMNS} FROM modules WHERE id = ?1"),
        params![id],
        row_to_module,
    )
    .optional()
    .map_err(|e| format!("query error: {e}"))
}

fn update_module_fields(
    conn: &Connection,
    id: i64,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<(), String> {
    if title.is_none() && description.is_none() {
        return fetch_module(conn, id)?
            .map(|_| ())
            .ok_or_else(|| format!("module not found: {id}"));
    }
    let title = title.map(clean_title).transpose()?;
    let rows_changed = conn
        .execute(
            "UPDATE modules SET title = COALESCE(?1, title), description = COALESCE(?2, description)
             WHERE id = ?3",
            params![title, description, id],
        )
        .map_err(|e| format!("update failed: {e}"))?;
    if rows_changed == 0 {
        return Err(format!("module not found: {id}"));
    }
    Ok(())
}

fn remove_module(conn: &Connection, id: i64) -> Result<(), String> {
    let items = delete_items_where(conn, "module_id = ?1", id)?;
    let changed = conn
        .execute("DELETE FROM modules WHERE id = ?1", params![id])
        .map_err(|e| format!("failed to delete module: {e}"))?;
    if changed == 0 {
        return Err(format!("module not found: {id}"));
    }
    CONTENT_ORDER.forget(conn, &[&id])?;
    tracing::debug!(module = id, items, "deleted module");
    Ok(())
}

/// Delete the items referenced by every content row matching `filter`
/// (a `WHERE` fragment over `contents` with one `?1` parameter). The content
/// rows themselves are left for the caller. Returns the number of items removed.
fn delete_items_where(conn: &Connection, filter: &str, param: i64) -> Result<usize, String> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE {filter}"
        ))
        .map_err(|e| format!("query error: {e}"))?;
    let rows = stmt
        .query_map(params![param], row_to_content)
        .map_err(|e| format!("query error: {e}"))?;
    let contents: Vec<Content> = collect_rows(rows)?;

    let mut removed = 0;
    for c in &contents {
        removed += delete_item(conn, c.content_type, c.object_id)?;
    }
    Ok(removed)
}

fn delete_item(conn: &Connection, kind: ItemKind, id: i64) -> Result<usize, String> {
    conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
        params![id],
    )
    .map_err(|e| format!("failed to delete {kind}: {e}"))
}

fn fetch_item(conn: &Connection, kind: ItemKind, id: i64) -> Result<Option<Item>, String> {
    conn.query_row(
        &format!(
            "SELECT id, owner, title, created_at, updated_at, {} FROM {} WHERE id = ?1",
            kind.body_column(),
            kind.table()
        ),
        params![id],
        |row| {
            let created_str: String = row.get(3)?;
            let updated_str: String = row.get(4)?;
            let value: String = row.get(5)?;
            Ok(Item {
                id: row.get(0)?,
                owner: row.get(1)?,
                title: row.get(2)?,
                created_at: parse_timestamp(&created_str),
                updated_at: parse_timestamp(&updated_str),
                body: ItemBody::new(kind, value),
            })
        },
    )
    .optional()
    .map_err(|e| format!("query error: {e}"))
}

fn collect_rows<T, F>(rows: rusqlite::MappedRows<'_, F>) -> Result<Vec<T>, String>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| format!("row error: {e}"))?);
    }
    Ok(out)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_subject(row: &Row) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        total_courses: row.get(3)?,
    })
}

fn row_to_course(row: &Row) -> rusqlite::Result<Course> {
    let created_str: String = row.get(6)?;
    Ok(Course {
        id: row.get(0)?,
        owner: row.get(1)?,
        subject_id: row.get(2)?,
        title: row.get(3)?,
        slug: row.get(4)?,
        overview: row.get(5)?,
        created_at: parse_timestamp(&created_str),
    })
}

fn row_to_module(row: &Row) -> rusqlite::Result<Module> {
    Ok(Module {
        id: row.get(0)?,
        course_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        order: row.get(4)?,
    })
}

fn row_to_content(row: &Row) -> rusqlite::Result<Content> {
    let tag: String = row.get(2)?;
    let content_type = ItemKind::from_str(&tag)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;
    Ok(Content {
        id: row.get(0)?,
        module_id: row.get(1)?,
        content_type,
        object_id: row.get(3)?,
        order: row.get(4)?,
    })
}

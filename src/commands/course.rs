use std::path::Path;

use colored::Colorize;
use syllabus::db::{CourseChanges, Database};
use syllabus::models::Course;

use super::{open_db, print_contents, print_json};

fn subject_id(db: &Database, slug: &str) -> Result<i64, String> {
    db.get_subject_by_slug(slug)?
        .map(|s| s.id)
        .ok_or_else(|| format!("subject not found: {slug}"))
}

/// Fetch a course the user owns; other owners' courses read as missing.
pub fn owned(db: &Database, id: i64, user: &str) -> Result<Course, String> {
    db.get_course_owned(id, user)?
        .ok_or_else(|| format!("course not found: {id}"))
}

pub fn create(
    db_path: &Path,
    user: &str,
    title: &str,
    subject: &str,
    slug: Option<&str>,
    overview: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let db = open_db(db_path)?;
    let subject_id = subject_id(&db, subject)?;
    let course = db.insert_course(user, subject_id, title, slug, overview.unwrap_or(""))?;

    if json {
        print_json(&course)
    } else {
        println!("Created course {}: {} ({})", course.id, course.title, course.slug);
        Ok(())
    }
}

pub fn list(
    db_path: &Path,
    user: &str,
    all: bool,
    subject: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let db = open_db(db_path)?;
    let subject_id = subject.map(|s| subject_id(&db, s)).transpose()?;
    let owner = if all { None } else { Some(user) };
    let courses = db.list_courses(owner, subject_id)?;

    if json {
        return print_json(&courses);
    }
    if courses.is_empty() {
        println!("No courses found.");
        return Ok(());
    }

    println!(
        "{:<5} {:<24} {:<36} {:<12} CREATED",
        "ID", "SLUG", "TITLE", "OWNER"
    );
    println!("{}", "-".repeat(92));
    for c in &courses {
        println!(
            "{:<5} {:<24} {:<36} {:<12} {}",
            c.id,
            c.slug,
            c.title,
            c.owner,
            c.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

pub fn show(db_path: &Path, id: i64, json: bool) -> Result<(), String> {
    let db = open_db(db_path)?;
    let outline = db
        .course_outline(id)?
        .ok_or_else(|| format!("course not found: {id}"))?;

    if json {
        return print_json(&outline);
    }

    let course = &outline.course;
    println!("ID:       {}", course.id);
    println!("Title:    {}", course.title.bold());
    println!("Slug:     {}", course.slug);
    if let Some(ref subject) = outline.subject {
        println!("Subject:  {} ({})", subject.title, subject.slug);
    }
    println!("Owner:    {}", course.owner);
    println!("Created:  {}", course.created_at.format("%Y-%m-%d %H:%M"));
    if !course.overview.is_empty() {
        println!("Overview: {}", course.overview);
    }

    if outline.modules.is_empty() {
        println!("\nNo modules yet.");
        return Ok(());
    }
    for m in &outline.modules {
        println!(
            "\n{} {} {}",
            format!("[{}]", m.module.order).bright_black(),
            m.module.title.bold(),
            format!("(module {})", m.module.id).bright_black()
        );
        if !m.module.description.is_empty() {
            println!("    {}", m.module.description);
        }
        print_contents(&m.contents, "    ");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn update(
    db_path: &Path,
    user: &str,
    id: i64,
    subject: Option<&str>,
    title: Option<&str>,
    slug: Option<&str>,
    overview: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let db = open_db(db_path)?;
    owned(&db, id, user)?;
    let subject_id = subject.map(|s| subject_id(&db, s)).transpose()?;
    let course = db.update_course(
        id,
        &CourseChanges {
            subject_id,
            title,
            slug,
            overview,
        },
    )?;

    if json {
        print_json(&course)
    } else {
        println!("Updated course {id}");
        Ok(())
    }
}

pub fn delete(db_path: &Path, user: &str, id: i64) -> Result<(), String> {
    let db = open_db(db_path)?;
    let course = owned(&db, id, user)?;
    db.delete_course(id)?;
    println!("Deleted course {id}: {}", course.title);
    Ok(())
}

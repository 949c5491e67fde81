use std::path::Path;

use super::{open_db, print_json};

pub fn add(db_path: &Path, title: &str, slug: Option<&str>, json: bool) -> Result<(), String> {
    let db = open_db(db_path)?;
    let subject = db.create_subject(title, slug)?;

    if json {
        print_json(&subject)
    } else {
        println!("Created subject {} ({})", subject.title, subject.slug);
        Ok(())
    }
}

pub fn list(db_path: &Path, json: bool) -> Result<(), String> {
    let db = open_db(db_path)?;
    let subjects = db.list_subjects()?;

    if json {
        return print_json(&subjects);
    }
    if subjects.is_empty() {
        println!("No subjects found.");
        return Ok(());
    }

    println!("{:<5} {:<24} {:<32} COURSES", "ID", "SLUG", "TITLE");
    println!("{}", "-".repeat(72));
    for s in &subjects {
        println!(
            "{:<5} {:<24} {:<32} {}",
            s.id, s.slug, s.title, s.total_courses
        );
    }
    Ok(())
}

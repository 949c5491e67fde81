use std::path::Path;

use syllabus::db::Database;
use syllabus::models::Module;

use super::course::owned;
use super::{open_db, parse_moves, print_json};

/// Fetch a module whose course the user owns.
pub fn owned_module(db: &Database, id: i64, user: &str) -> Result<Module, String> {
    db.get_module_owned(id, user)?
        .ok_or_else(|| format!("module not found: {id}"))
}

fn print_modules(modules: &[Module], json: bool) -> Result<(), String> {
    if json {
        return print_json(modules);
    }
    if modules.is_empty() {
        println!("No modules found.");
        return Ok(());
    }
    println!("{:<6} {:<6} {:<40} DESCRIPTION", "ORDER", "ID", "TITLE");
    println!("{}", "-".repeat(80));
    for m in modules {
        println!(
            "{:<6} {:<6} {:<40} {}",
            m.order, m.id, m.title, m.description
        );
    }
    Ok(())
}

pub fn add(
    db_path: &Path,
    user: &str,
    course_id: i64,
    title: &str,
    description: Option<&str>,
    order: Option<i64>,
    json: bool,
) -> Result<(), String> {
    let db = open_db(db_path)?;
    owned(&db, course_id, user)?;
    let module = db.add_module(course_id, title, description.unwrap_or(""), order)?;

    if json {
        print_json(&module)
    } else {
        println!(
            "Added module {} to course {course_id} at position {}",
            module.id, module.order
        );
        Ok(())
    }
}

pub fn list(db_path: &Path, course_id: i64, json: bool) -> Result<(), String> {
    let db = open_db(db_path)?;
    db.get_course(course_id)?
        .ok_or_else(|| format!("course not found: {course_id}"))?;
    print_modules(&db.list_modules(course_id)?, json)
}

pub fn update(
    db_path: &Path,
    user: &str,
    id: i64,
    title: Option<&str>,
    description: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let db = open_db(db_path)?;
    owned_module(&db, id, user)?;
    let module = db.update_module(id, title, description)?;

    if json {
        print_json(&module)
    } else {
        println!("Updated module {id}");
        Ok(())
    }
}

pub fn delete(db_path: &Path, user: &str, id: i64) -> Result<(), String> {
    let db = open_db(db_path)?;
    owned_module(&db, id, user)?;
    db.delete_module(id)?;
    println!("Deleted module {id}");
    Ok(())
}

pub fn order(
    db_path: &Path,
    user: &str,
    course_id: i64,
    pairs: &[String],
    json: bool,
) -> Result<(), String> {
    let moves = parse_moves(pairs)?;
    let db = open_db(db_path)?;
    owned(&db, course_id, user)?;
    db.set_module_order(course_id, &moves)?;
    print_modules(&db.list_modules(course_id)?, json)
}

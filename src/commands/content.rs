use std::path::Path;

use syllabus::db::Database;
use syllabus::models::{Content, ItemBody, ItemKind};

use super::module::owned_module;
use super::{format_kind, open_db, parse_moves, print_contents, print_json};

fn owned_content(db: &Database, id: i64, user: &str) -> Result<Content, String> {
    db.get_content_owned(id, user)?
        .ok_or_else(|| format!("content not found: {id}"))
}

#[allow(clippy::too_many_arguments)]
pub fn add(
    db_path: &Path,
    user: &str,
    module_id: i64,
    kind: &str,
    title: &str,
    value: &str,
    order: Option<i64>,
    json: bool,
) -> Result<(), String> {
    let kind = ItemKind::from_str(kind)?;
    let db = open_db(db_path)?;
    owned_module(&db, module_id, user)?;
    let detail = db.add_content(module_id, user, title, &ItemBody::new(kind, value), order)?;

    if json {
        print_json(&detail)
    } else {
        println!(
            "Added {} content {} to module {module_id} at position {}",
            format_kind(kind),
            detail.content.id,
            detail.content.order
        );
        Ok(())
    }
}

pub fn list(db_path: &Path, user: &str, module_id: i64, json: bool) -> Result<(), String> {
    let db = open_db(db_path)?;
    owned_module(&db, module_id, user)?;
    let details = db.list_content_details(module_id)?;

    if json {
        return print_json(&details);
    }
    print_contents(&details, "");
    Ok(())
}

pub fn show(db_path: &Path, user: &str, id: i64, json: bool) -> Result<(), String> {
    let db = open_db(db_path)?;
    let detail = db.detail(owned_content(&db, id, user)?)?;

    if json {
        return print_json(&detail);
    }

    println!("ID:       {}", detail.content.id);
    println!("Module:   {}", detail.content.module_id);
    println!("Type:     {}", format_kind(detail.content.content_type));
    println!("Order:    {}", detail.content.order);
    match detail.item {
        Some(item) => {
            println!("Title:    {}", item.title);
            println!("Owner:    {}", item.owner);
            println!("Created:  {}", item.created_at.format("%Y-%m-%d %H:%M"));
            println!("Updated:  {}", item.updated_at.format("%Y-%m-%d %H:%M"));
            match &item.body {
                ItemBody::Text { content } => println!("\n{content}"),
                ItemBody::File { file } => println!("File:     {file}"),
                ItemBody::Image { image } => println!("Image:    {image}"),
                ItemBody::Video { url } => println!("URL:      {url}"),
            }
        }
        None => println!(
            "Item:     missing ({} {})",
            detail.content.content_type, detail.content.object_id
        ),
    }
    Ok(())
}

pub fn update(
    db_path: &Path,
    user: &str,
    id: i64,
    title: Option<&str>,
    value: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let db = open_db(db_path)?;
    let content = owned_content(&db, id, user)?;
    let kind = content.content_type;
    let body = value.map(|v| ItemBody::new(kind, v));
    let item = db.update_item(kind, content.object_id, title, body.as_ref())?;

    if json {
        print_json(&item)
    } else {
        println!("Updated {kind} content {id}");
        Ok(())
    }
}

pub fn delete(db_path: &Path, user: &str, id: i64) -> Result<(), String> {
    let db = open_db(db_path)?;
    owned_content(&db, id, user)?;
    db.delete_content(id)?;
    println!("Deleted content {id}");
    Ok(())
}

pub fn order(
    db_path: &Path,
    user: &str,
    module_id: i64,
    pairs: &[String],
    json: bool,
) -> Result<(), String> {
    let moves = parse_moves(pairs)?;
    let db = open_db(db_path)?;
    owned_module(&db, module_id, user)?;
    db.set_content_order(module_id, &moves)?;
    let details = db.list_content_details(module_id)?;

    if json {
        return print_json(&details);
    }
    print_contents(&details, "");
    Ok(())
}

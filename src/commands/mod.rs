pub mod content;
pub mod course;
pub mod init;
pub mod module;
pub mod serve;
pub mod subject;

use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use syllabus::db::Database;
use syllabus::models::{ContentDetail, ItemKind};

/// Open an initialized database, refusing to create one implicitly.
pub fn open_db(db_path: &Path) -> Result<Database, String> {
    if !db_path.exists() {
        return Err(format!(
            "no database at {}. run `syl init` first",
            db_path.display()
        ));
    }
    Database::open(db_path)
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let j = serde_json::to_string_pretty(value).map_err(|e| format!("json error: {e}"))?;
    println!("{j}");
    Ok(())
}

/// Parse `id=order` pairs as given on the command line.
pub fn parse_moves(pairs: &[String]) -> Result<Vec<(i64, i64)>, String> {
    pairs
        .iter()
        .map(|pair| {
            let (id, order) = pair
                .split_once('=')
                .ok_or_else(|| format!("invalid order pair: {pair}. expected id=order"))?;
            let id = id
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid order pair: {pair}. id must be a number"))?;
            let order = order
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid order pair: {pair}. order must be a number"))?;
            Ok((id, order))
        })
        .collect()
}

/// Format a content kind as a colored tag.
pub fn format_kind(kind: ItemKind) -> String {
    match kind {
        ItemKind::Text => "text".green().to_string(),
        ItemKind::File => "file".yellow().to_string(),
        ItemKind::Image => "image".magenta().to_string(),
        ItemKind::Video => "video".cyan().to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

/// Print a module's contents as an aligned table.
pub fn print_contents(details: &[ContentDetail], indent: &str) {
    if details.is_empty() {
        println!("{indent}(no content)");
        return;
    }
    for d in details {
        let (title, value) = match &d.item {
            Some(item) => (item.title.clone(), item.body.value().replace('\n', " ")),
            None => ("<missing item>".bright_black().to_string(), String::new()),
        };
        // pad before colouring so escape codes don't skew alignment
        let kind = format!("{:<6}", d.content.content_type.as_str());
        let kind = kind.replace(
            d.content.content_type.as_str(),
            &format_kind(d.content.content_type),
        );
        println!(
            "{indent}{:>3}  #{:<5} {} {:<32} {}",
            d.content.order,
            d.content.id,
            kind,
            truncate(&title, 32),
            truncate(&value, 40).bright_black(),
        );
    }
}

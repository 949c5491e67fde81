use std::path::Path;

use syllabus::db::Database;

pub fn run(db_path: &Path) -> Result<(), String> {
    // Create the .syllabus directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create directory: {e}"))?;
        }
    }

    let db = Database::open(db_path)?;
    db.migrate()?;
    db.set_config("version", env!("CARGO_PKG_VERSION"))?;
    tracing::info!(path = %db_path.display(), "initialized database");

    println!("Initialized syllabus database at {}", db_path.display());
    Ok(())
}

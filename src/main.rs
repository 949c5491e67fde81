mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "syl",
    version,
    about = "Author courses made of ordered modules and mixed content"
)]
struct Cli {
    /// Path to the database file (default: .syllabus/syllabus.db in current dir)
    #[arg(long, env = "SYLLABUS_DB", global = true)]
    db: Option<PathBuf>,

    /// Instructor acting on owned courses
    #[arg(long, env = "SYLLABUS_USER", default_value = "instructor", global = true)]
    user: String,

    /// Output as JSON instead of table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize syllabus in the current directory
    Init,
    /// Manage subjects (course categories)
    Subject {
        #[command(subcommand)]
        action: SubjectAction,
    },
    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseAction,
    },
    /// Manage the modules of a course
    Module {
        #[command(subcommand)]
        action: ModuleAction,
    },
    /// Manage the content items of a module
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },
    /// Serve the JSON API
    Serve {
        /// Address to bind
        #[arg(long, env = "SYLLABUS_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(short, long, env = "SYLLABUS_PORT", default_value_t = 8000)]
        port: u16,
    },
}

#[derive(Subcommand)]
enum SubjectAction {
    /// Add a subject
    Add {
        /// Subject title
        title: String,
        /// URL slug (default: derived from the title)
        #[arg(long)]
        slug: Option<String>,
    },
    /// List subjects with their course counts
    List,
}

#[derive(Subcommand)]
enum CourseAction {
    /// Create a course owned by the current user
    Create {
        /// Course title
        title: String,
        /// Subject slug
        #[arg(short, long)]
        subject: String,
        /// URL slug (default: derived from the title)
        #[arg(long)]
        slug: Option<String>,
        /// Course overview
        #[arg(short, long)]
        overview: Option<String>,
    },
    /// List your courses, newest first
    List {
        /// Show courses of every instructor
        #[arg(short, long)]
        all: bool,
        /// Filter by subject slug
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// Show a course with its modules and contents
    Show {
        /// Course ID
        id: i64,
    },
    /// Update one of your courses
    Update {
        /// Course ID
        id: i64,
        /// New subject slug
        #[arg(short, long)]
        subject: Option<String>,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New slug
        #[arg(long)]
        slug: Option<String>,
        /// New overview
        #[arg(short, long)]
        overview: Option<String>,
    },
    /// Delete one of your courses with everything in it
    Delete {
        /// Course ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum ModuleAction {
    /// Append a module to a course
    Add {
        /// Course ID
        course: i64,
        /// Module title
        title: String,
        /// Module description
        #[arg(short, long)]
        description: Option<String>,
        /// Explicit position (default: after the last module)
        #[arg(long)]
        order: Option<i64>,
    },
    /// List the modules of a course in order
    List {
        /// Course ID
        course: i64,
    },
    /// Update a module
    Update {
        /// Module ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a module and its contents
    Delete {
        /// Module ID
        id: i64,
    },
    /// Set module positions, e.g. `syl module order 1 4=0 3=1`
    Order {
        /// Course ID
        course: i64,
        /// `module_id=position` pairs
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ContentAction {
    /// Add a content item to a module
    Add {
        /// Module ID
        module: i64,
        /// Content type (text, file, image, video)
        kind: String,
        /// Item title
        title: String,
        /// Text body, file path, image path, or video URL
        value: String,
        /// Explicit position (default: after the last item)
        #[arg(long)]
        order: Option<i64>,
    },
    /// List a module's contents in order
    List {
        /// Module ID
        module: i64,
    },
    /// Show one content item
    Show {
        /// Content ID
        id: i64,
    },
    /// Update a content item's title or value
    Update {
        /// Content ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New text body, file path, image path, or video URL
        #[arg(long)]
        value: Option<String>,
    },
    /// Delete a content item and its underlying object
    Delete {
        /// Content ID
        id: i64,
    },
    /// Set content positions, e.g. `syl content order 2 7=0 5=1`
    Order {
        /// Module ID
        module: i64,
        /// `content_id=position` pairs
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("SYLLABUS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let db_path = match cli.db {
        Some(p) => p,
        None => match std::env::current_dir() {
            Ok(mut p) => {
                p.push(".syllabus");
                p.push("syllabus.db");
                p
            }
            Err(e) => {
                eprintln!("error: cannot determine current directory: {e}");
                std::process::exit(1);
            }
        },
    };
    let user = cli.user.as_str();
    let json = cli.json;

    let result = match cli.command {
        Commands::Init => commands::init::run(&db_path),
        Commands::Subject { action } => match action {
            SubjectAction::Add { title, slug } => {
                commands::subject::add(&db_path, &title, slug.as_deref(), json)
            }
            SubjectAction::List => commands::subject::list(&db_path, json),
        },
        Commands::Course { action } => match action {
            CourseAction::Create {
                title,
                subject,
                slug,
                overview,
            } => commands::course::create(
                &db_path,
                user,
                &title,
                &subject,
                slug.as_deref(),
                overview.as_deref(),
                json,
            ),
            CourseAction::List { all, subject } => {
                commands::course::list(&db_path, user, all, subject.as_deref(), json)
            }
            CourseAction::Show { id } => commands::course::show(&db_path, id, json),
            CourseAction::Update {
                id,
                subject,
                title,
                slug,
                overview,
            } => commands::course::update(
                &db_path,
                user,
                id,
                subject.as_deref(),
                title.as_deref(),
                slug.as_deref(),
                overview.as_deref(),
                json,
            ),
            CourseAction::Delete { id } => commands::course::delete(&db_path, user, id),
        },
        Commands::Module { action } => match action {
            ModuleAction::Add {
                course,
                title,
                description,
                order,
            } => commands::module::add(
                &db_path,
                user,
                course,
                &title,
                description.as_deref(),
                order,
                json,
            ),
            ModuleAction::List { course } => commands::module::list(&db_path, course, json),
            ModuleAction::Update {
                id,
                title,
                description,
            } => commands::module::update(
                &db_path,
                user,
                id,
                title.as_deref(),
                description.as_deref(),
                json,
            ),
            ModuleAction::Delete { id } => commands::module::delete(&db_path, user, id),
            ModuleAction::Order { course, pairs } => {
                commands::module::order(&db_path, user, course, &pairs, json)
            }
        },
        Commands::Content { action } => match action {
            ContentAction::Add {
                module,
                kind,
                title,
                value,
                order,
            } => commands::content::add(
                &db_path, user, module, &kind, &title, &value, order, json,
            ),
            ContentAction::List { module } => {
                commands::content::list(&db_path, user, module, json)
            }
            ContentAction::Show { id } => commands::content::show(&db_path, user, id, json),
            ContentAction::Update { id, title, value } => commands::content::update(
                &db_path,
                user,
                id,
                title.as_deref(),
                value.as_deref(),
                json,
            ),
            ContentAction::Delete { id } => commands::content::delete(&db_path, user, id),
            ContentAction::Order { module, pairs } => {
                commands::content::order(&db_path, user, module, &pairs, json)
            }
        },
        Commands::Serve { host, port } => commands::serve::run(&db_path, &host, port),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

use std::path::PathBuf;

use clap::Parser;
use course_server::{
    catalog::{self, NewLesson},
    config::Config,
    progress::{
        self,
        aggregate::{UnlockPolicy, course_progress},
    },
    student::{create_student, delete_student, get_student_info, get_student_list},
    utils::{database_url, open_database},
};

#[derive(Debug, clap::Parser)]
struct Args {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, default_value = "database/course.db")]
    database: PathBuf,
    /// Config file whose unlock policy the progress report follows
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    Module {
        #[command(subcommand)]
        command: ModuleCommand,
    },
    Lesson {
        #[command(subcommand)]
        command: LessonCommand,
    },
    Resource {
        #[command(subcommand)]
        command: ResourceCommand,
    },
    /// Print a student's progress and unlock state
    Progress { student_id: i64 },
}

#[derive(Debug, clap::Subcommand)]
enum UserCommand {
    List,
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ModuleCommand {
    List,
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        order: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, clap::Subcommand)]
enum LessonCommand {
    List {
        module_id: i64,
    },
    Add {
        #[arg(short, long)]
        module_id: i64,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        order: i64,
        #[arg(short, long)]
        video_url: Option<String>,
        /// Markdown file with the lesson text
        #[arg(short, long)]
        content: Option<PathBuf>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ResourceCommand {
    List,
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        url: String,
    },
    Delete {
        id: i64,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    if let Some(parent) = args.database.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let database = open_database(&database_url(&args.database)).await?;

    match args.command {
        Commands::User { command } => match command {
            UserCommand::List => {
                for student in get_student_list(&database).await? {
                    println!("{:<8} {:<24} {}", student.id, student.name, student.email);
                }
            }
            UserCommand::Create {
                name,
                email,
                password,
            } => {
                let id = create_student(&database, name, email, password).await?;
                println!("Student created with id: {}", id);
            }
            UserCommand::Delete { id } => {
                if delete_student(&database, id).await? {
                    println!("Student deleted with id: {}", id);
                } else {
                    println!("No student with id: {}", id);
                }
            }
        },
        Commands::Module { command } => match command {
            ModuleCommand::List => {
                for module in catalog::get_module_list(&database).await? {
                    println!("{:<8} {:<6} {}", module.id, module.order, module.title);
                }
            }
            ModuleCommand::Add { title, order } => {
                let id = catalog::create_module(&database, title, order).await?;
                println!("Module created with id: {}", id);
            }
            ModuleCommand::Delete { id } => {
                if catalog::delete_module(&database, id).await? {
                    println!("Module deleted with id: {}", id);
                } else {
                    println!("No module with id: {}", id);
                }
            }
        },
        Commands::Lesson { command } => match command {
            LessonCommand::List { module_id } => {
                for lesson in catalog::get_module_lessons(&database, module_id).await? {
                    println!("{:<8} {:<6} {}", lesson.id, lesson.order, lesson.title);
                }
            }
            LessonCommand::Add {
                module_id,
                title,
                order,
                video_url,
                content,
            } => {
                let content = match content {
                    Some(path) => Some(tokio::fs::read_to_string(path).await?),
                    None => None,
                };
                let id = catalog::create_lesson(
                    &database,
                    NewLesson {
                        module_id,
                        title,
                        order,
                        video_url,
                        content,
                    },
                )
                .await?;
                println!("Lesson created with id: {}", id);
            }
            LessonCommand::Delete { id } => {
                if catalog::delete_lesson(&database, id).await? {
                    println!("Lesson deleted with id: {}", id);
                } else {
                    println!("No lesson with id: {}", id);
                }
            }
        },
        Commands::Resource { command } => match command {
            ResourceCommand::List => {
                for resource in catalog::get_resource_list(&database).await? {
                    println!("{:<8} {:<24} {}", resource.id, resource.title, resource.url);
                }
            }
            ResourceCommand::Add { title, url } => {
                let id = catalog::create_resource(&database, title, url).await?;
                println!("Resource created with id: {}", id);
            }
            ResourceCommand::Delete { id } => {
                if catalog::delete_resource(&database, id).await? {
                    println!("Resource deleted with id: {}", id);
                } else {
                    println!("No resource with id: {}", id);
                }
            }
        },
        Commands::Progress { student_id } => {
            let Some(student) = get_student_info(&database, student_id).await? else {
                anyhow::bail!("No student with id: {}", student_id);
            };
            let policy = match args.config {
                Some(path) => Config::load(path)?.unlock_policy,
                None => UnlockPolicy::default(),
            };
            let modules = catalog::get_module_list(&database).await?;
            let lessons = catalog::get_lessons_by_module(&database).await?;
            let completed = progress::get_completed_lesson_ids(&database, student_id).await?;
            let course = course_progress(&modules, &lessons, &completed, policy);
            println!("{} <{}>", student.name, student.email);
            for status in course.modules {
                println!(
                    "{:<8} {:<32} {:>3}/{:<3} {:>6.1}% {}",
                    status.module.id,
                    status.module.title,
                    status.progress.completed_lessons,
                    status.progress.total_lessons,
                    status.progress.progress_percentage,
                    if status.unlocked { "open" } else { "locked" }
                );
            }
            println!(
                "Overall: {}/{} lessons, {:.1}%",
                course.overall.completed_lessons,
                course.overall.total_lessons,
                course.overall.progress_percentage
            );
        }
    }
    Ok(())
}

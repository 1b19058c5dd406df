use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use habit_app::app::{parse_weekday, run, Action, AppConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "habit_dashboard", about = "Habit and task dashboard")]
struct Cli {
    /// JSON data file holding habits, todos and their logs.
    #[arg(long)]
    data_file: Option<PathBuf>,
    /// Directory for persisted session state.
    #[arg(long)]
    state_dir: Option<PathBuf>,
    /// Show the dashboard for this user instead of the signed-in one.
    #[arg(long)]
    user: Option<String>,
    /// Day weekly habits fall due on.
    #[arg(long, value_parser = parse_weekday)]
    week_start: Option<chrono::Weekday>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dashboard.
    Show,
    /// Log a completion for a habit.
    CompleteHabit { id: String },
    /// Mark a todo as done.
    CompleteTodo { id: String },
    /// Remember a user as the signed-in session.
    SignIn {
        id: String,
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Forget the signed-in session.
    SignOut,
}

impl From<Command> for Action {
    fn from(command: Command) -> Self {
        match command {
            Command::Show => Action::Show,
            Command::CompleteHabit { id } => Action::CompleteHabit(id),
            Command::CompleteTodo { id } => Action::CompleteTodo(id),
            Command::SignIn {
                id,
                username,
                email,
            } => Action::SignIn {
                user_id: id,
                username,
                email,
            },
            Command::SignOut => Action::SignOut,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(path) = cli.data_file {
        config.data_file = path;
    }
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }
    if cli.user.is_some() {
        config.user_id = cli.user;
    }
    if let Some(day) = cli.week_start {
        config.dashboard.week_start = day;
    }

    let action = cli.command.map(Action::from).unwrap_or(Action::Show);
    let rendered = run(config, action).await?;
    print!("{rendered}");
    Ok(())
}

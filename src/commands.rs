// ─── Console Commands ───
// Line-oriented front end over the task supervisor and launch coordinator.
// Installs run in the background, so the prompt stays responsive while a
// download is paused or in progress.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::PlayerIdentity;
use crate::core::profile::Profile;
use crate::core::state::AppState;
use crate::core::task::{StartOutcome, TaskStatus};

const HELP: &str = "\
Commands:
  versions                             list installable and installed versions
  install <version>                    install a version in the background
  pause [version]                      pause or resume an install
  cancel [version]                     cancel an install
  status [version]                     show install progress
  wait [version]                       follow an install until it ends
  launch <version> [profile] [name]    start the game (profiles: standard, fps-boost, ultra)
  profiles                             list performance profiles
  help                                 show this help
  quit                                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Versions,
    Install(String),
    Pause(Option<String>),
    Cancel(Option<String>),
    Status(Option<String>),
    Wait(Option<String>),
    Launch {
        version: String,
        profile: Option<Profile>,
        username: Option<String>,
    },
    Profiles,
    Help,
    Quit,
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> LauncherResult<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let target = rest.first().map(|s| s.to_string());

    let command = match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("versions" | "list", []) => Command::Versions,
        ("install", [version]) => Command::Install(version.to_string()),
        ("pause" | "resume", [] | [_]) => Command::Pause(target),
        ("cancel", [] | [_]) => Command::Cancel(target),
        ("status", [] | [_]) => Command::Status(target),
        ("wait", [] | [_]) => Command::Wait(target),
        ("launch" | "play", [version, tail @ ..]) if tail.len() <= 2 => Command::Launch {
            version: version.to_string(),
            profile: tail.first().map(|p| p.parse::<Profile>()).transpose()?,
            username: tail.get(1).map(|u| u.to_string()),
        },
        ("profiles", []) => Command::Profiles,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => {
            return Err(LauncherError::Other(format!(
                "Unrecognised command {:?}; type `help`",
                line.trim()
            )))
        }
    };
    Ok(Some(command))
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run_console(mut state: AppState) -> LauncherResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(&mut state, command).await {
                    error!("Command failed: {}", e);
                    println!("Error: {}", e);
                }
            }
            Err(e) => println!("{}", e),
        }
    }

    info!("Console closed");
    Ok(())
}

async fn execute(state: &mut AppState, command: Command) -> LauncherResult<()> {
    match command {
        Command::Versions => {
            let current = state.current_version().map(str::to_string);
            for version in &state.catalog.versions {
                let installed = state.layout.version_dir(version).exists();
                println!(
                    "{} {}{}",
                    if current.as_deref() == Some(version.as_str()) { "*" } else { " " },
                    version,
                    if installed { "  [installed]" } else { "" }
                );
            }
        }
        Command::Install(version) => {
            match state.supervisor.start(&version) {
                StartOutcome::Started => println!("Installing {} in the background", version),
                StartOutcome::AlreadyRunning => println!("{} is already being installed", version),
            }
            state.set_current_version(version);
        }
        Command::Pause(version) => {
            let version = target_version(state, version)?;
            let paused = state.supervisor.toggle_pause(&version);
            println!("{}: {}", version, if paused { "paused" } else { "resumed" });
        }
        Command::Cancel(version) => {
            let version = target_version(state, version)?;
            if state.supervisor.cancel(&version) {
                println!("{}: cancelling", version);
            } else {
                println!("{}: nothing to cancel", version);
            }
        }
        Command::Status(None) => {
            let statuses = state.supervisor.statuses();
            if statuses.is_empty() {
                println!("No installs yet");
            }
            for status in &statuses {
                println!("{}", format_status(status));
            }
        }
        Command::Status(Some(version)) => match state.supervisor.status(&version) {
            Some(status) => println!("{}", format_status(&status)),
            None => println!("{}: idle", version),
        },
        Command::Wait(version) => {
            let version = target_version(state, version)?;
            follow_install(state, &version).await;
        }
        Command::Launch {
            version,
            profile,
            username,
        } => {
            let profile = profile.unwrap_or(state.settings.default_profile);
            let identity = PlayerIdentity::offline(
                username
                    .as_deref()
                    .unwrap_or(&state.settings.default_username),
            );
            let launched = state
                .coordinator
                .launch(&version, profile, identity, &state.settings.display)
                .await?;
            println!(
                "Started {} with profile {} (pid {})",
                version, profile, launched.pid
            );
            state.set_current_version(version);
        }
        Command::Profiles => {
            for profile in Profile::ALL {
                println!("  {}", profile);
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn target_version(state: &AppState, version: Option<String>) -> LauncherResult<String> {
    version
        .or_else(|| state.current_version().map(str::to_string))
        .ok_or_else(|| LauncherError::Other("No version selected".into()))
}

/// Print progress updates for `version` until its task ends.
async fn follow_install(state: &AppState, version: &str) {
    let supervisor = state.supervisor.clone();
    let Some(mut watcher) = supervisor.watch_progress(version) else {
        println!("{}: idle", version);
        return;
    };

    let finished = supervisor.wait(version);
    tokio::pin!(finished);
    let mut watching = true;
    loop {
        tokio::select! {
            status = &mut finished => {
                match status {
                    Some(status) => println!("{}", format_status(&status)),
                    None => println!("{}: idle", version),
                }
                return;
            }
            update = watcher.changed(), if watching => match update {
                Some(snapshot) => println!("  {}  {}", snapshot.counter_label(), snapshot.status),
                None => watching = false,
            },
        }
    }
}

fn format_status(status: &TaskStatus) -> String {
    let mut line = format!(
        "{}: {}  {}  {}",
        status.version,
        status.state,
        status.progress.counter_label(),
        status.progress.status
    );
    if let Some(error) = &status.error {
        line.push_str(&format!("  ({})", error));
    }
    line
}

use std::fmt::Display;

use colored::Colorize;
use log::{Level, LevelFilter};

/// Dependencies are only heard from when something goes wrong
const EXTERNAL_LEVEL: LevelFilter = LevelFilter::Warn;

/// Logs couch's own crates at `level` to stdout
pub fn init_logger(level: LevelFilter) {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            let scope = match scope(record.target()) {
                Some(scope) => format!("{} ", scope.dimmed()),
                None => String::new(),
            };

            out.finish(format_args!(
                "{:^5} {} {:^8} {}{}",
                level_to_string(&record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                scope,
                message
            ))
        })
        .filter(move |meta| is_enabled(meta.target(), meta.level(), level))
        .chain(std::io::stdout())
        .apply()
        .expect("logging is initialized")
}

fn is_enabled(target: &str, level: Level, local_level: LevelFilter) -> bool {
    let max = if Target::from_str(target).is_local() {
        local_level
    } else {
        EXTERNAL_LEVEL
    };

    level <= max
}

/// The module within a couch crate, such as `handlers::room`, if there is one
fn scope(target: &str) -> Option<&str> {
    let (module, rest) = target.split_once("::")?;
    Target::from_str(module).is_local().then_some(rest)
}

#[derive(Debug, PartialEq)]
enum Target {
    External(String),
    Main,
    Server,
    Collab,
    Core,
}

impl Target {
    fn from_str(str: &str) -> Self {
        let module = str.split("::").next().unwrap_or_default();

        match module {
            "couch" => Self::Main,
            "couch_core" => Self::Core,
            "couch_server" => Self::Server,
            "couch_collab" => Self::Collab,
            other => Target::External(other.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::Main => "COUCH".bright_cyan(),
            Target::Server => "SERVER".bright_green(),
            Target::Collab => "COLLAB".bright_purple(),
            Target::Core => "CORE".blue(),
        };

        Display::fmt(&result, f)
    }
}

fn level_to_string(level: &Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}

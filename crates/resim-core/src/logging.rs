use crate::config::LoggingConfig;
use crate::constants::env as env_keys;
use crate::errors::ConfigError;
use chrono::{Local, NaiveDate};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::Level;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const SESSION_PREFIX: &str = "resim_";
const SESSION_SUFFIX: &str = ".log";
const LATEST_LINK: &str = "resim.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// `-v` raises the default `info` to debug, `-vv` and above to trace.
    pub fn from_verbosity(verbose: u8) -> Self {
        let index = (LogLevel::Info as usize + verbose as usize).min(Self::ALL.len() - 1);
        Self::ALL[index]
    }

    fn from_index(index: u8) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or(LogLevel::Info)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown log level '{}'", s))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Level::from(*self), f)
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    LogLevel::from_index(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_log_level_from_verbosity(verbose: u8) {
    if verbose > 0 {
        set_log_level(LogLevel::from_verbosity(verbose));
    }
}

/// Applies `RESIM_LOG_LEVEL`; unknown values are ignored.
pub fn set_log_level_from_env() {
    if let Some(level) = std::env::var(env_keys::LOG_LEVEL)
        .ok()
        .and_then(|v| v.parse::<LogLevel>().ok())
    {
        set_log_level(level);
    }
}

struct LocalClock;

impl FormatTime for LocalClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// `RUST_LOG` wins over the level chosen on the command line.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level().to_string().to_lowercase()))
}

fn is_session_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(SESSION_PREFIX) && n.ends_with(SESSION_SUFFIX))
}

/// Start of the day encoded in a session log name (`resim_<date>_<time>_<pid>.log`).
fn session_started(path: &Path) -> Option<SystemTime> {
    let name = path.file_name()?.to_str()?;
    let date = name.strip_prefix(SESSION_PREFIX)?.split('_').next()?;
    let midnight = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?
        .and_local_timezone(Local)
        .single()?;
    Some(midnight.into())
}

fn session_logs(log_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut logs: Vec<PathBuf> = fs_err::read_dir(log_dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| is_session_log(p))
        .collect();
    // Names start with the timestamp, so this is oldest first.
    logs.sort();
    Ok(logs)
}

/// Deletes session logs beyond `max_files` and older than `max_age_days`.
/// A zero limit disables that rule. Returns the number of files removed.
fn rotate_logs(log_dir: &Path, config: &LoggingConfig) -> Result<usize, ConfigError> {
    fs_err::create_dir_all(log_dir)?;
    let mut logs = session_logs(log_dir)?;
    let mut stale = Vec::new();

    if config.max_files > 0 && logs.len() > config.max_files {
        let excess = logs.len() - config.max_files;
        stale.extend(logs.drain(..excess));
    }

    if config.max_age_days > 0 {
        let max_age = Duration::from_secs(config.max_age_days * 24 * 60 * 60);
        let now = SystemTime::now();
        let (expired, kept): (Vec<_>, Vec<_>) = logs.into_iter().partition(|path| {
            session_started(path)
                .and_then(|t| now.duration_since(t).ok())
                .is_some_and(|age| age > max_age)
        });
        stale.extend(expired);
        logs = kept;
    }

    let removed = stale
        .iter()
        .filter(|path| fs_err::remove_file(path).is_ok())
        .count();
    tracing::trace!("{} session log(s) kept in '{}'", logs.len(), log_dir.display());
    Ok(removed)
}

fn install_file_subscriber(log_path: &Path) -> Result<(), ConfigError> {
    let log_file = fs_err::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?
        .into_parts()
        .0;

    let file_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(Mutex::new(log_file))
        .with_timer(LocalClock)
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let tee = std::env::var_os(env_keys::LOG_TEE).is_some().then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_timer(LocalClock)
            .with_ansi(false)
            .with_target(false)
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(tee)
        .try_init();
    Ok(())
}

/// Logs this process to a fresh file under `$XDG_CACHE_HOME/resim/logs` and
/// points `resim.log` next to that directory at it.
pub fn init_session_logger(config: &LoggingConfig) -> Result<(), ConfigError> {
    let cache_home = xdg::BaseDirectories::with_prefix("resim")
        .get_cache_home()
        .ok_or_else(|| ConfigError::Xdg("no cache home directory".to_string()))?;
    let log_dir = cache_home.join("logs");

    let removed = rotate_logs(&log_dir, config)?;

    let file_name = format!(
        "{}{}_{}{}",
        SESSION_PREFIX,
        Local::now().format("%Y-%m-%d_%H-%M-%S"),
        std::process::id(),
        SESSION_SUFFIX
    );
    let log_path = log_dir.join(&file_name);
    install_file_subscriber(&log_path)?;

    let latest = cache_home.join(LATEST_LINK);
    let _ = fs_err::remove_file(&latest);
    #[cfg(unix)]
    {
        let _ = std::os::unix::fs::symlink(Path::new("logs").join(&file_name), &latest);
    }

    tracing::info!("Session log started at '{}'", log_path.display());
    if removed > 0 {
        tracing::debug!("Removed {} old session log(s)", removed);
    }
    Ok(())
}

pub fn init_stderr_logger() {
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_timer(LocalClock)
        .with_target(false)
        .try_init();
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains(|c: char| c.is_whitespace() || c == '\'') {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

fn command_line(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| shell_quote(&part.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Records a spawned command in a form that can be pasted into a shell.
pub fn log_command(command: &Command) {
    tracing::debug!("[CMD] {}", command_line(command));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn test_rotation_keeps_newest_files() {
        let dir = tempdir().unwrap();
        let logs: Vec<PathBuf> = (1..=4)
            .map(|day| touch(dir.path(), &format!("resim_2023-01-0{}_10-00-00_7.log", day)))
            .collect();
        let unrelated = touch(dir.path(), "notes.txt");

        let config = LoggingConfig {
            max_files: 2,
            max_age_days: 0,
        };
        assert_eq!(rotate_logs(dir.path(), &config).unwrap(), 2);

        assert!(!logs[0].exists() && !logs[1].exists());
        assert!(logs[2].exists() && logs[3].exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_rotation_drops_expired_files() {
        let dir = tempdir().unwrap();
        let today = Local::now();
        let stale_day = today - chrono::Duration::days(9);
        let fresh = touch(
            dir.path(),
            &format!("resim_{}_08-30-00_1.log", today.format("%Y-%m-%d")),
        );
        let stale = touch(
            dir.path(),
            &format!("resim_{}_08-30-00_1.log", stale_day.format("%Y-%m-%d")),
        );

        let config = LoggingConfig {
            max_files: 0,
            max_age_days: 7,
        };
        rotate_logs(dir.path(), &config).unwrap();

        assert!(fresh.exists());
        assert!(!stale.exists());
    }

    #[test]
    fn test_rotation_creates_missing_dir() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("cache/logs");
        assert_eq!(rotate_logs(&logs, &LoggingConfig::default()).unwrap(), 0);
        assert!(logs.is_dir());
    }

    #[test]
    fn test_level_parsing_and_verbosity() {
        assert_eq!("debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(" WARN ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(9), LogLevel::Trace);
    }

    #[test]
    fn test_command_line_quotes_arguments() {
        let mut cmd = Command::new("/opt/sim/run");
        cmd.arg("CASE_0").arg("two words").arg("").arg("it's");
        assert_eq!(
            command_line(&cmd),
            r"/opt/sim/run CASE_0 'two words' '' 'it'\''s'"
        );
    }
}

use crate::config::{LoggingConfig, Section};
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, Layer, Registry};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

// -------- level helpers --------

fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Empty `file_level` falls back to `console_level`.
fn file_level_of(section: &Section) -> LevelFilter {
    if section.file_level.trim().is_empty() {
        parse_level(&section.console_level)
    } else {
        parse_level(&section.file_level)
    }
}

// -------- rotating writer --------

#[derive(Clone)]
struct RotatingWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut file) => file.write(buf),
            // poisoned by a panicking writer; drop the record
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}

impl<'a> fmt::MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Resolve a log file path against `base_dir` (home_dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating_writer(section: &Section, base_dir: &Path) -> std::io::Result<RotatingWriter> {
    let path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(10).max(1) * 1024 * 1024;
    let files = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n.max(1)),
        None => FileLimit::Age(chrono::Duration::days(7)),
    };

    let rot = FileRotate::new(
        &path,
        AppendTimestamp::default(files),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        Some({
            use std::os::unix::fs::OpenOptionsExt;
            let mut o = std::fs::OpenOptions::new();
            o.read(true).create(true).append(true).mode(0o600);
            o
        }),
    );
    Ok(RotatingWriter(Arc::new(Mutex::new(rot))))
}

// -------- filters --------

/// Subsystems are every non-default key; the default section covers the rest.
fn subsystems(cfg: &LoggingConfig) -> impl Iterator<Item = (&String, &Section)> {
    cfg.iter().filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
}

fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default = cfg
        .get(DEFAULT_SECTION)
        .map(|s| parse_level(&s.console_level))
        .unwrap_or(LevelFilter::WARN);

    subsystems(cfg).fold(Targets::new().with_default(default), |t, (name, section)| {
        t.with_target(name.clone(), parse_level(&section.console_level))
    })
}

/// Filter for a file sink owned by `owner`. The default file excludes subsystems
/// that write to their own file.
fn file_targets(cfg: &LoggingConfig, owner: &str, section: &Section) -> Targets {
    if owner != DEFAULT_SECTION {
        return Targets::new()
            .with_default(LevelFilter::OFF)
            .with_target(owner.to_string(), file_level_of(section));
    }

    subsystems(cfg).fold(
        Targets::new().with_default(file_level_of(section)),
        |t, (name, sub)| {
            if sub.file.trim().is_empty() {
                t.with_target(name.clone(), file_level_of(sub).min(file_level_of(section)))
            } else {
                t.with_target(name.clone(), LevelFilter::OFF)
            }
        },
    )
}

fn build_layers(cfg: &LoggingConfig, base_dir: &Path) -> Vec<BoxedLayer> {
    let ansi = atty::is(atty::Stream::Stderr);
    let mut layers: Vec<BoxedLayer> = Vec::new();

    // Console goes to stderr so command output on stdout stays clean.
    layers.push(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_filter(console_targets(cfg))
            .boxed(),
    );

    for (owner, section) in cfg.iter() {
        if section.file.trim().is_empty() {
            continue;
        }
        match open_rotating_writer(section, base_dir) {
            Ok(writer) => layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .with_writer(writer)
                    .with_filter(file_targets(cfg, owner, section))
                    .boxed(),
            ),
            Err(e) => eprintln!(
                "Failed to open log file '{}' for '{}': {}",
                resolve_log_path(&section.file, base_dir).display(),
                owner,
                e
            ),
        }
    }

    layers
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: logging sections keyed by subsystem (crate target prefix) plus `default`
/// - `base_dir`: base directory for relative log file paths (usually client.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    let layers = build_layers(cfg, base_dir);
    let _ = tracing::subscriber::set_global_default(Registry::default().with(layers));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(parse_level("trace"), LevelFilter::TRACE);
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level("Warning"), LevelFilter::WARN);
        assert_eq!(parse_level("off"), LevelFilter::OFF);
        assert_eq!(parse_level("none"), LevelFilter::OFF);
        assert_eq!(parse_level("bogus"), LevelFilter::INFO);
    }

    #[test]
    fn test_file_level_falls_back_to_console() {
        assert_eq!(file_level_of(&section("debug", "x.log", "")), LevelFilter::DEBUG);
        assert_eq!(file_level_of(&section("debug", "x.log", "error")), LevelFilter::ERROR);
    }

    #[test]
    fn test_console_targets_respect_subsystems() {
        let mut cfg = default_logging_config();
        cfg.insert("clientkit".into(), section("trace", "", ""));

        let targets = console_targets(&cfg);
        assert!(targets.would_enable("clientkit::http", &tracing::Level::TRACE));
        assert!(targets.would_enable("obras", &tracing::Level::WARN));
        assert!(!targets.would_enable("obras", &tracing::Level::INFO));
    }

    #[test]
    fn test_default_file_excludes_subsystems_with_own_file() {
        let mut cfg = default_logging_config();
        cfg.insert("clientkit".into(), section("info", "logs/http.log", "debug"));

        let default = cfg["default"].clone();
        let default_targets = file_targets(&cfg, "default", &default);
        assert!(!default_targets.would_enable("clientkit::http", &tracing::Level::ERROR));
        assert!(default_targets.would_enable("obras::domain", &tracing::Level::DEBUG));

        let own = cfg["clientkit"].clone();
        let own_targets = file_targets(&cfg, "clientkit", &own);
        assert!(own_targets.would_enable("clientkit::http", &tracing::Level::DEBUG));
        assert!(!own_targets.would_enable("obras", &tracing::Level::ERROR));
    }

    #[test]
    fn test_log_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));

        let absolute = tmp.path().join("abs.log");
        assert_eq!(
            resolve_log_path(&absolute.to_string_lossy(), Path::new("/elsewhere")),
            absolute
        );
    }

    #[test]
    fn test_rotating_writer_creates_parent() {
        let tmp = tempdir().unwrap();
        let s = section("info", "nested/dir/app.log", "debug");

        let mut writer = open_rotating_writer(&s, tmp.path()).expect("writer should open");
        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();

        assert!(tmp.path().join("nested/dir").is_dir());
    }

    #[test]
    fn test_build_layers_counts_file_sinks() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert("clientkit".into(), section("info", "logs/http.log", "debug"));
        cfg.insert("obras".into(), section("info", "", ""));

        // console + default file + clientkit file
        assert_eq!(build_layers(&cfg, tmp.path()).len(), 3);
    }
}

//! File watcher: builds on startup, then rebuilds when templates change.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands::{self, Session};
use crate::error;
use crate::types::TemplateLayout;

/// Debounce delay between filesystem events and rebuild.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that signals on template changes.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
    layout: TemplateLayout,
) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
            && event.paths.iter().any(|path| return touches_template(path, &layout))
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::Watch {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Rebuild after each burst of change signals until the channel closes.
/// Signals arriving within the debounce window fold into one rebuild.
fn rebuild_on_change(
    session: &Session,
    out_dir: &Path,
    rx: &crossbeam_channel::Receiver<()>,
    mut last_code: ExitCode,
) -> ExitCode {
    let debounce = Duration::from_millis(DEBOUNCE_MS);
    while rx.recv().is_ok() {
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, rebuilding...");
        last_code = run_build(session, out_dir);
    }
    return last_code;
}

/// Entry point for the watch command.
///
/// Builds every template once, then watches the roots and rebuilds on
/// changes. One session, and so one set of synthetic names, spans every
/// rebuild.
///
/// # Errors
///
/// Returns errors from the initial build's output writing or watcher setup.
pub fn run(session: &Session, out_dir: &Path) -> Result<ExitCode, error::Error> {
    eprintln!("watch: initial build");
    let last_code = run_build(session, out_dir);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx, session.config().layout.clone())?;

    let roots = &session.config().roots;
    for root in roots.iter().filter(|root| return root.is_dir()) {
        watcher.watch(root, RecursiveMode::Recursive).map_err(|e| {
            return error::Error::Watch {
                reason: format!("cannot watch {}: {e}", root.display()),
            };
        })?;
    }

    let root_count = roots.len();
    eprintln!("watch: monitoring {root_count} roots, press Ctrl+C to stop");

    return Ok(rebuild_on_change(session, out_dir, &rx, last_code));
}

/// Build once and report. Returns the exit code the build would have had.
fn run_build(session: &Session, out_dir: &Path) -> ExitCode {
    return match commands::build(session, out_dir) {
        Ok(report) => report.exit_code(),
        Err(e) => {
            crate::diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}

/// Whether an event path could affect the build: a template file, or a
/// directory (renames and removals of directories carry no extension).
fn touches_template(path: &Path, layout: &TemplateLayout) -> bool {
    return match path.file_name() {
        Some(name) => layout.has_extension(&name.to_string_lossy()) || path.extension().is_none(),
        None => false,
    };
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::config::Config;

    fn session_with_root(dir: &TempDir) -> Session {
        let root = dir.path().join("templates");
        fs::create_dir_all(&root).unwrap();
        let config = Config::load(dir.path()).unwrap().override_roots(&[root]);
        return Session::new(config);
    }

    #[test]
    fn burst_of_changes_rebuilds_and_picks_up_new_templates() {
        let dir = TempDir::new().unwrap();
        let session = session_with_root(&dir);
        let out = dir.path().join("out");
        fs::write(dir.path().join("templates/home.dust"), "home").unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        for _ in 0..3 {
            tx.send(()).unwrap();
        }
        drop(tx);

        let code = rebuild_on_change(&session, &out, &rx, ExitCode::FAILURE);
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(out.join("home.js").is_file());
    }

    #[test]
    fn failing_rebuild_reports_failure() {
        let dir = TempDir::new().unwrap();
        let session = session_with_root(&dir);
        fs::write(dir.path().join("templates/bad.dust"), "{>missing/}").unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(()).unwrap();
        drop(tx);

        let code = rebuild_on_change(&session, &dir.path().join("out"), &rx, ExitCode::SUCCESS);
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn watcher_signals_when_a_template_is_written() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("templates");
        fs::create_dir_all(&root).unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut watcher = create_watcher(tx, TemplateLayout::default()).unwrap();
        watcher.watch(&root, RecursiveMode::Recursive).unwrap();

        fs::write(root.join("page.dust"), "page").unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn template_and_directory_events_trigger_rebuilds() {
        let layout = TemplateLayout::default();
        assert!(touches_template(Path::new("/t/home/welcome.dust"), &layout));
        assert!(touches_template(Path::new("/t/home/widgets"), &layout));
        assert!(!touches_template(Path::new("/t/out/home.js"), &layout));
        assert!(!touches_template(Path::new("/t/home/.welcome.dust.swp"), &layout));
    }
}

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use linesettings::{ConfigError, Settings};
use renderer::RenderParameters;
use tracing::{debug, info, warn};

/// Detects edits to the settings file between polls.
///
/// A missing file counts as "all defaults", so deleting the file resets the
/// wallpaper.
#[derive(Debug)]
pub struct SettingsPoller {
    path: PathBuf,
    last_contents: Option<Option<String>>,
}

impl SettingsPoller {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_contents: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the freshly parsed settings when the file changed since the
    /// previous poll, `None` otherwise. The first poll always reports.
    pub fn poll(&mut self) -> Option<Result<Settings, ConfigError>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Some(Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                }))
            }
        };

        if self.last_contents.as_ref() == Some(&contents) {
            return None;
        }

        let parsed = match contents.as_deref() {
            Some(text) => Settings::from_toml_str(text),
            None => Ok(Settings::default()),
        };
        self.last_contents = Some(contents);
        Some(parsed)
    }
}

/// Background thread that keeps [`RenderParameters`] in sync with the
/// settings file.
pub struct SettingsWatcher {
    shutdown: Sender<()>,
    join_handle: Option<JoinHandle<()>>,
}

impl SettingsWatcher {
    /// Spawns the watcher. `poller` should already have been polled once so
    /// the initial settings are not applied twice.
    pub fn spawn(
        mut poller: SettingsPoller,
        params: Arc<RenderParameters>,
        interval: Duration,
    ) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("lineswall-settings".into())
            .spawn(move || {
                debug!(
                    path = %poller.path().display(),
                    interval_ms = interval.as_millis() as u64,
                    "settings watcher started"
                );
                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => apply_poll(&mut poller, &params),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("settings watcher stopped");
            })
            .map_err(|err| anyhow!("failed to spawn settings watcher: {err}"))?;

        Ok(Self {
            shutdown: shutdown_tx,
            join_handle: Some(handle),
        })
    }

    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.shutdown.try_send(());
            handle
                .join()
                .map_err(|err| anyhow!("settings watcher panicked: {err:?}"))?;
        }
        Ok(())
    }
}

impl Drop for SettingsWatcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Polls once and stores any change. Invalid files keep the previous values.
pub fn apply_poll(poller: &mut SettingsPoller, params: &RenderParameters) {
    match poller.poll() {
        Some(Ok(settings)) => {
            params.apply(&settings);
            info!(path = %poller.path().display(), "settings reloaded");
        }
        Some(Err(err)) => {
            warn!(
                path = %poller.path().display(),
                "ignoring invalid settings file: {err}"
            );
        }
        None => {}
    }
}

/// First read at startup. An unreadable or invalid file falls back to the
/// defaults; the watcher picks up the file once it is fixed.
pub fn initial_settings(poller: &mut SettingsPoller) -> Settings {
    match poller.poll() {
        Some(Ok(settings)) => settings,
        Some(Err(err)) => {
            warn!(
                path = %poller.path().display(),
                "invalid settings file, starting with defaults: {err}"
            );
            Settings::default()
        }
        None => Settings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_poll_reports_and_repeats_are_quiet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "blur = 200\n").unwrap();

        let mut poller = SettingsPoller::new(path.clone());
        let settings = poller.poll().unwrap().unwrap();
        assert_eq!(settings.blur, 200);
        assert!(poller.poll().is_none());

        fs::write(&path, "blur = 10\n").unwrap();
        let settings = poller.poll().unwrap().unwrap();
        assert_eq!(settings.blur, 10);
        assert!(poller.poll().is_none());
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        let mut poller = SettingsPoller::new(path.clone());
        assert_eq!(poller.poll().unwrap().unwrap(), Settings::default());
        assert!(poller.poll().is_none());

        fs::write(&path, "speed = 3\n").unwrap();
        assert_eq!(poller.poll().unwrap().unwrap().speed, 3);

        fs::remove_file(&path).unwrap();
        assert_eq!(poller.poll().unwrap().unwrap(), Settings::default());
    }

    #[test]
    fn invalid_file_keeps_previous_parameters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "linesColor = \"#ff0000\"\n").unwrap();

        let params = RenderParameters::new();
        let mut poller = SettingsPoller::new(path.clone());
        apply_poll(&mut poller, &params);
        assert_eq!(params.snapshot().lines, [1.0, 0.0, 0.0]);

        fs::write(&path, "blur = 999\n").unwrap();
        apply_poll(&mut poller, &params);
        assert_eq!(params.snapshot().lines, [1.0, 0.0, 0.0]);
        assert_eq!(params.snapshot().blur_factor, 1.0);
    }

    #[test]
    fn invalid_file_at_startup_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "blur = 999\n").unwrap();

        let mut poller = SettingsPoller::new(path.clone());
        assert_eq!(initial_settings(&mut poller), Settings::default());
        assert!(poller.poll().is_none());

        fs::write(&path, "blur = 40\n").unwrap();
        let params = RenderParameters::from_settings(&Settings::default());
        apply_poll(&mut poller, &params);
        let expected = RenderParameters::from_settings(&Settings {
            blur: 40,
            ..Settings::default()
        });
        assert_eq!(
            params.snapshot().blur_factor,
            expected.snapshot().blur_factor
        );
    }

    #[test]
    fn valid_file_at_startup_is_used() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "speed = 12\n").unwrap();
        let mut poller = SettingsPoller::new(path);
        assert_eq!(initial_settings(&mut poller).speed, 12);
    }

    #[test]
    fn watcher_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let poller = SettingsPoller::new(dir.path().join("settings.toml"));
        let params = Arc::new(RenderParameters::new());
        let watcher =
            SettingsWatcher::spawn(poller, Arc::clone(&params), Duration::from_millis(5)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        watcher.shutdown().unwrap();
    }
}

//! Hot reload of the page file
//!
//! The file is re-parsed shortly after every modification and the new page is
//! queued for the tick loop. A file that fails to parse is reported and the
//! running page stays in place.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::PageConfig;

/// Editors write in several steps; give them this long to finish
const SETTLE: Duration = Duration::from_millis(100);

const QUEUE_DEPTH: usize = 4;

/// Owns the file watch; reloaded pages come out of [`PageWatcher::next_page`]
pub struct PageWatcher {
    _watch: RecommendedWatcher,
    pages: mpsc::Receiver<PageConfig>,
}

impl PageWatcher {
    /// Parse `path` once and keep watching it
    ///
    /// Must be called inside a Tokio runtime: reloads run as tasks on it.
    pub async fn new(path: impl Into<PathBuf>) -> Result<(Self, PageConfig)> {
        let path = path.into();
        let page = PageConfig::load(&path)
            .await
            .with_context(|| format!("Cannot load page file {}", path.display()))?;

        let (tx, pages) = mpsc::channel(QUEUE_DEPTH);
        let runtime = Handle::current();
        let reload_path = path.clone();
        let mut watch = notify::recommended_watcher(move |event: notify::Result<Event>| match event {
            Ok(event) if matches!(event.kind, EventKind::Modify(_)) => {
                debug!("Page file touched: {:?}", event.paths);
                runtime.spawn(reload(reload_path.clone(), tx.clone()));
            }
            Ok(_) => {}
            Err(e) => error!("Page file watch failed: {}", e),
        })?;
        watch
            .watch(&path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Cannot watch page file {}", path.display()))?;
        info!("👀 Watching {}", path.display());

        Ok((Self { _watch: watch, pages }, page))
    }

    /// Next successfully reloaded page; `None` once the watch is gone
    pub async fn next_page(&mut self) -> Option<PageConfig> {
        self.pages.recv().await
    }
}

async fn reload(path: PathBuf, tx: mpsc::Sender<PageConfig>) {
    tokio::time::sleep(SETTLE).await;
    match PageConfig::load(&path).await {
        Ok(page) => {
            info!("🔄 Page '{}' reloaded from {}", page.name, path.display());
            if tx.send(page).await.is_err() {
                debug!("Page watcher dropped, reload discarded");
            }
        }
        Err(e) => warn!("Keeping the running page, {} is invalid: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn page_yaml(name: &str, channels: usize) -> String {
        format!(
            "name: {name}\nsurfaces:\n  - name: XTouch\n    channel_count: {channels}\n    zones: [{{ name: Home }}]\n"
        )
    }

    #[tokio::test]
    async fn test_edit_delivers_new_page() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("page.yaml");
        fs::write(&path, page_yaml("First", 8))?;

        let (mut watcher, page) = PageWatcher::new(&path).await?;
        assert_eq!(page.name, "First");

        tokio::time::sleep(SETTLE).await;
        fs::write(&path, page_yaml("Second", 4))?;

        // Not every filesystem reports writes; only check what does arrive
        if let Ok(Some(page)) = tokio::time::timeout(Duration::from_secs(2), watcher.next_page()).await {
            assert_eq!(page.name, "Second");
            assert_eq!(page.surfaces[0].channel_count, 4);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(PageWatcher::new(dir.path().join("absent.yaml")).await.is_err());
    }
}

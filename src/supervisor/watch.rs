//! Change detection over the files of the last successful cycle.

use std::future::{Future, pending};
use std::path::PathBuf;
use std::time::Duration;

use notify::event::EventKind;
use notify::{Config, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::graph::VisitedSet;
use crate::{debug, log};

/// Files whose change restarts the script.
pub trait WatchSet {
    /// Replace every watch with `paths`.
    fn rearm(&mut self, paths: &VisitedSet) -> notify::Result<()>;

    /// Next changed path. Never resolves while nothing is armed.
    fn changed(&mut self) -> impl Future<Output = PathBuf>;

    /// Drop changes already reported but not yet consumed.
    fn discard_pending(&mut self);

    fn paths(&self) -> &[PathBuf];
}

/// Polling watcher; the poll loop runs on a thread owned by `notify`.
pub struct PollWatchSet {
    interval: Duration,
    watcher: Option<PollWatcher>,
    events: Option<mpsc::UnboundedReceiver<PathBuf>>,
    paths: Vec<PathBuf>,
}

impl PollWatchSet {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            watcher: None,
            events: None,
            paths: Vec::new(),
        }
    }
}

impl WatchSet for PollWatchSet {
    fn rearm(&mut self, paths: &VisitedSet) -> notify::Result<()> {
        // Old watches stop before new ones start; nothing is carried over.
        self.watcher = None;
        self.events = None;
        self.paths.clear();

        let (tx, rx) = mpsc::unbounded_channel();
        // mtime is compared in whole seconds; contents catch same-second edits.
        let config = Config::default()
            .with_poll_interval(self.interval)
            .with_compare_contents(true);
        let mut watcher = PollWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if !is_change(&event.kind) {
                        return;
                    }
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Err(e) => log!("watch"; "notify error: {}", e),
            },
            config,
        )?;

        for path in paths {
            if !path.exists() {
                debug!("watch"; "skipping missing {}", path.display());
                continue;
            }
            watcher.watch(path, RecursiveMode::NonRecursive)?;
            self.paths.push(path.clone());
        }
        debug!("watch"; "watching {} file(s)", self.paths.len());

        self.watcher = Some(watcher);
        self.events = Some(rx);
        Ok(())
    }

    async fn changed(&mut self) -> PathBuf {
        match self.events.as_mut() {
            Some(rx) => match rx.recv().await {
                Some(path) => path,
                None => pending().await,
            },
            None => pending().await,
        }
    }

    fn discard_pending(&mut self) {
        if let Some(rx) = self.events.as_mut() {
            while rx.try_recv().is_ok() {}
        }
    }

    fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Polling reports mtime changes as metadata modifications, so those count.
fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, MetadataKind, ModifyKind};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_change() {
        assert!(is_change(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::WriteTime
        ))));
        assert!(is_change(&EventKind::Create(CreateKind::File)));
        assert!(!is_change(&EventKind::Access(notify::event::AccessKind::Any)));
    }

    #[tokio::test]
    async fn test_rearm_skips_missing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("index.js");
        fs::write(&file, "").unwrap();

        let visited: VisitedSet = [file.clone(), dir.path().join("gone.js")].into_iter().collect();
        let mut watch = PollWatchSet::new(Duration::from_millis(20));
        watch.rearm(&visited).unwrap();
        assert_eq!(watch.paths(), &[file]);

        watch.rearm(&VisitedSet::default()).unwrap();
        assert!(watch.paths().is_empty());
    }

    async fn next_change(watch: &mut PollWatchSet) -> PathBuf {
        tokio::time::timeout(Duration::from_secs(5), watch.changed())
            .await
            .expect("change not reported")
    }

    #[tokio::test]
    async fn test_detects_change() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("index.js");
        fs::write(&file, "a").unwrap();

        let visited: VisitedSet = [file.clone()].into_iter().collect();
        let mut watch = PollWatchSet::new(Duration::from_millis(20));
        watch.rearm(&visited).unwrap();

        fs::write(&file, "changed content").unwrap();
        assert_eq!(next_change(&mut watch).await, file);
    }

    #[tokio::test]
    async fn test_detects_edit_right_after_rearm() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("index.js");
        fs::write(&file, "one").unwrap();
        let visited: VisitedSet = [file.clone()].into_iter().collect();
        let mut watch = PollWatchSet::new(Duration::from_millis(20));

        // Edit, rearm, edit again: all within the same mtime second.
        watch.rearm(&visited).unwrap();
        fs::write(&file, "two").unwrap();
        assert_eq!(next_change(&mut watch).await, file);

        watch.rearm(&visited).unwrap();
        fs::write(&file, "three").unwrap();
        assert_eq!(next_change(&mut watch).await, file);
    }

    #[tokio::test]
    async fn test_unarmed_never_resolves() {
        let mut watch = PollWatchSet::new(Duration::from_millis(20));
        let waited = tokio::time::timeout(Duration::from_millis(50), watch.changed()).await;
        assert!(waited.is_err());
    }
}

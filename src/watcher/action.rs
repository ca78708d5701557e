//! Classification of raw filesystem events.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind};

use super::tree::WatchTree;

/// What the watcher should do about one path of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// A directory appeared (possibly again): register it and its subtree.
    WatchDirectory { dir: PathBuf },

    /// A tracked directory disappeared.
    UnwatchDirectory { dir: PathBuf },

    /// Schedule a debounced regeneration of `dir`, triggered by `path`.
    Regenerate { dir: PathBuf, path: PathBuf },

    /// Nothing to do.
    Ignore,
}

fn is_structural(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Name(_)) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Classify every path of `event`.
///
/// Renames arrive as name-change events for the old and the new path; the
/// old path is gone from disk and is treated like a removal, the new one
/// like a creation. Paths are judged by the tree's exclusion rules.
pub fn classify(event: &Event, tree: &WatchTree) -> Vec<WatchAction> {
    if !is_structural(&event.kind) {
        return vec![WatchAction::Ignore];
    }

    let mut actions = Vec::new();
    for path in &event.paths {
        classify_path(&event.kind, path, tree, &mut actions);
    }
    actions
}

fn classify_path(kind: &EventKind, path: &Path, tree: &WatchTree, actions: &mut Vec<WatchAction>) {
    let exclusions = tree.exclusions();

    if path.is_dir() {
        let appeared = matches!(
            kind,
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
        );
        // Tracked paths included: a directory deleted and recreated before
        // its removal was seen needs a fresh registration
        if appeared && !exclusions.is_excluded(path) {
            actions.push(WatchAction::WatchDirectory {
                dir: path.to_path_buf(),
            });
        } else {
            actions.push(WatchAction::Ignore);
        }
        return;
    }

    if !path.exists() && tree.contains(path) {
        actions.push(WatchAction::UnwatchDirectory {
            dir: path.to_path_buf(),
        });
        // A removed unit directory still has a registry entry to retire
        actions.push(WatchAction::Regenerate {
            dir: path.to_path_buf(),
            path: path.to_path_buf(),
        });
        return;
    }

    if exclusions.is_tracked_source(path) {
        if let Some(parent) = path.parent() {
            actions.push(WatchAction::Regenerate {
                dir: parent.to_path_buf(),
                path: path.to_path_buf(),
            });
        }
        return;
    }

    actions.push(WatchAction::Ignore);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::exclude::Exclusions;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, WatchTree) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("users")).unwrap();
        let mut tree = WatchTree::new(Exclusions::new(temp.path(), &Settings::default()));
        tree.scan();
        (temp, tree)
    }

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event::new(kind).add_path(path)
    }

    #[test]
    fn test_source_write_regenerates_parent() {
        let (temp, tree) = setup();
        let file = temp.path().join("users/user.ts");
        fs::write(&file, "").unwrap();

        let actions = classify(
            &event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), file.clone()),
            &tree,
        );
        assert_eq!(
            actions,
            vec![WatchAction::Regenerate {
                dir: temp.path().join("users"),
                path: file
            }]
        );
    }

    #[test]
    fn test_removed_source_regenerates_parent() {
        let (temp, tree) = setup();
        let marker = temp.path().join("users/encore.service.ts");
        let actions = classify(&event(EventKind::Remove(RemoveKind::File), marker.clone()), &tree);
        assert_eq!(
            actions,
            vec![WatchAction::Regenerate {
                dir: temp.path().join("users"),
                path: marker
            }]
        );
    }

    #[test]
    fn test_generated_and_excluded_files_are_ignored() {
        let (temp, tree) = setup();
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Any));

        for path in [
            temp.path().join("users/users.restate.ts"),
            temp.path().join("restate.gen/services/index.ts"),
            temp.path().join("node_modules/pkg/index.ts"),
            temp.path().join("users/.users.restate.ts.tmp"),
            temp.path().join("users/README.md"),
        ] {
            assert_eq!(
                classify(&event(kind, path.clone()), &tree),
                vec![WatchAction::Ignore],
                "{path:?}"
            );
        }
    }

    #[test]
    fn test_created_directory_is_watched() {
        let (temp, tree) = setup();
        let dir = temp.path().join("billing");
        fs::create_dir_all(&dir).unwrap();

        let actions = classify(&event(EventKind::Create(CreateKind::Folder), dir.clone()), &tree);
        assert_eq!(actions, vec![WatchAction::WatchDirectory { dir }]);
    }

    #[test]
    fn test_recreated_tracked_directory_is_watched_again() {
        let (temp, tree) = setup();
        let dir = temp.path().join("users");
        fs::remove_dir_all(&dir).unwrap();
        fs::create_dir_all(&dir).unwrap();
        assert!(tree.contains(&dir));

        // The late removal sees a directory on disk and does nothing
        assert_eq!(
            classify(&event(EventKind::Remove(RemoveKind::Folder), dir.clone()), &tree),
            vec![WatchAction::Ignore]
        );
        assert_eq!(
            classify(&event(EventKind::Create(CreateKind::Folder), dir.clone()), &tree),
            vec![WatchAction::WatchDirectory { dir }]
        );
    }

    #[test]
    fn test_created_excluded_directory_is_ignored() {
        let (temp, tree) = setup();
        let dir = temp.path().join("users/node_modules");
        fs::create_dir_all(&dir).unwrap();

        assert_eq!(
            classify(&event(EventKind::Create(CreateKind::Folder), dir), &tree),
            vec![WatchAction::Ignore]
        );
    }

    #[test]
    fn test_removed_directory_is_unwatched_and_retired() {
        let (temp, tree) = setup();
        let dir = temp.path().join("users");
        fs::remove_dir_all(&dir).unwrap();

        let actions = classify(&event(EventKind::Remove(RemoveKind::Folder), dir.clone()), &tree);
        assert_eq!(
            actions,
            vec![
                WatchAction::UnwatchDirectory { dir: dir.clone() },
                WatchAction::Regenerate {
                    dir: dir.clone(),
                    path: dir
                }
            ]
        );
    }

    #[test]
    fn test_rename_both_paths_are_classified() {
        let (temp, tree) = setup();
        let from = temp.path().join("users/old.ts");
        let to = temp.path().join("users/new.ts");
        fs::write(&to, "").unwrap();

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(from.clone())
            .add_path(to.clone());
        let dir = temp.path().join("users");
        assert_eq!(
            classify(&rename, &tree),
            vec![
                WatchAction::Regenerate {
                    dir: dir.clone(),
                    path: from
                },
                WatchAction::Regenerate { dir, path: to }
            ]
        );
    }

    #[test]
    fn test_access_and_metadata_events_are_ignored() {
        let (temp, tree) = setup();
        let file = temp.path().join("users/user.ts");
        fs::write(&file, "").unwrap();

        for kind in [
            EventKind::Access(AccessKind::Any),
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)),
        ] {
            assert_eq!(
                classify(&event(kind, file.clone()), &tree),
                vec![WatchAction::Ignore]
            );
        }
    }
}

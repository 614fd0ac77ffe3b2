use launcher::aggregator::{BoundedHistory, Collection, HistoryKind};
use launcher::model::Entry;
use std::path::Path;
use tempfile::tempdir;

fn app(name: &str) -> Entry {
    let mut entry = Entry::new(name);
    entry.exec = name.to_lowercase();
    entry
}

fn names(history: &BoundedHistory) -> Vec<String> {
    history.newest_first().iter().map(|e| e.name.clone()).collect()
}

#[test]
fn oldest_item_is_evicted_past_capacity() {
    let dir = tempdir().unwrap();
    let mut history = BoundedHistory::new(HistoryKind::Recent, dir.path().to_path_buf(), 2);

    history.add_item(app("X")).unwrap();
    history.add_item(app("Y")).unwrap();
    history.add_item(app("Z")).unwrap();

    assert_eq!(history.all().len(), 2);
    assert!(!history.has("X"));
    assert_eq!(names(&history), vec!["Z", "Y"]);
    assert!(!dir.path().join("X.desktop").exists());
}

#[test]
fn size_never_exceeds_capacity() {
    let dir = tempdir().unwrap();
    let mut history = BoundedHistory::new(HistoryKind::Recent, dir.path().to_path_buf(), 3);

    for name in ["a", "b", "c", "a", "d", "e", "b", "f"] {
        history.add_item(app(name)).unwrap();
        assert!(history.all().len() <= 3);
    }
    assert_eq!(names(&history), vec!["f", "b", "e"]);
}

#[test]
fn touched_item_survives_the_next_eviction() {
    let dir = tempdir().unwrap();
    let mut history = BoundedHistory::new(HistoryKind::Recent, dir.path().to_path_buf(), 2);

    history.add_item(app("X")).unwrap();
    history.add_item(app("Y")).unwrap();
    history.touch_item("X").unwrap();
    history.add_item(app("Z")).unwrap();

    assert_eq!(names(&history), vec!["Z", "X"]);
}

#[test]
fn reload_reproduces_the_touched_order() {
    let dir = tempdir().unwrap();
    let mut history = BoundedHistory::new(HistoryKind::Recent, dir.path().to_path_buf(), 5);
    for name in ["one", "two", "three"] {
        history.add_item(app(name)).unwrap();
    }
    history.touch_item("one").unwrap();
    let in_memory = names(&history);

    let mut reloaded = BoundedHistory::new(HistoryKind::Recent, dir.path().to_path_buf(), 5);
    reloaded.refresh();
    assert_eq!(names(&reloaded), in_memory);
    assert_eq!(in_memory, vec!["one", "three", "two"]);
}

#[test]
fn documents_with_the_same_base_name_are_kept_apart() {
    let dir = tempdir().unwrap();
    let mut docs = BoundedHistory::new(HistoryKind::Documents, dir.path().to_path_buf(), 5);

    docs.add_document(Path::new("/a/notes.txt")).unwrap();
    docs.add_document(Path::new("/b/notes.txt")).unwrap();
    assert_eq!(docs.all().len(), 2);

    docs.refresh();
    let urls: Vec<String> = docs.newest_first().iter().map(|e| e.url.clone()).collect();
    assert_eq!(urls, vec!["file:///b/notes.txt", "file:///a/notes.txt"]);
}

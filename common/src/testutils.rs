use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::Backend;
use crate::entry::{self, Entry, EntryKind};
use crate::error::{Error, ErrorKind, Result};

/// Backend call, recorded in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Stat(String),
    List(String),
    RemoveFile(String),
    RemoveDir(String),
    MakeDir(String),
    Rename(String, String),
    Read(String),
    Save(String),
}

impl Op {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Op::Stat(_) | Op::List(_) | Op::Read(_))
    }
}

#[derive(Debug, Clone)]
enum Node {
    File(bytes::Bytes),
    Directory,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    ops: Vec<Op>,
    // path -> remaining failures, None fails forever
    remove_failures: HashMap<String, Option<usize>>,
    list_failures: HashMap<String, Option<usize>>,
    // path -> listings that still succeed before every further one fails
    list_failures_after: HashMap<String, usize>,
    stat_failures: HashMap<String, Option<usize>>,
    // directory -> names listed without any entry behind them
    phantoms: HashMap<String, Vec<String>>,
    vanish_after_list: HashSet<String>,
    racing_make_dir: HashSet<String>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

fn injected_failure(failures: &mut HashMap<String, Option<usize>>, path: &str) -> Option<Error> {
    let remaining = failures.get_mut(path)?;
    match remaining {
        None => {}
        Some(0) => return None,
        Some(count) => *count -= 1,
    }
    Some(permission_denied(path))
}

fn permission_denied(path: &str) -> Error {
    Error::other(anyhow::anyhow!("{path:?}: permission denied (injected)"))
}

impl State {
    fn exists(&self, path: &str) -> bool {
        is_root(path) || self.nodes.contains_key(path)
    }

    fn is_dir(&self, path: &str) -> bool {
        is_root(path) || matches!(self.nodes.get(path), Some(Node::Directory))
    }

    fn children(&self, path: &str) -> Vec<String> {
        self.nodes
            .keys()
            .filter(|key| parent_of(key) == path)
            .cloned()
            .collect()
    }

    fn remove_subtree(&mut self, path: &str) {
        let prefix = format!("{path}/");
        self.nodes
            .retain(|key, _| key != path && !key.starts_with(&prefix));
    }

    fn insert_with_ancestors(&mut self, path: &str, node: Node) {
        let path = normalize(path);
        let mut parent = parent_of(&path);
        while !is_root(&parent) {
            self.nodes
                .entry(parent.clone())
                .or_insert(Node::Directory);
            parent = parent_of(&parent);
        }
        self.nodes.insert(path, node);
    }
}

/// In-memory backend with failure injection, used to exercise the recursive algorithms.
#[derive(Debug, Default)]
pub struct MemBackend {
    state: Mutex<State>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .insert_with_ancestors(path, Node::Directory);
        self
    }

    pub fn add_file(&self, path: &str, contents: &str) -> &Self {
        self.state.lock().unwrap().insert_with_ancestors(
            path,
            Node::File(bytes::Bytes::copy_from_slice(contents.as_bytes())),
        );
        self
    }

    /// Removal of `path` fails `times` times, or forever if `None`.
    pub fn fail_remove(&self, path: &str, times: Option<usize>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .remove_failures
            .insert(normalize(path), times);
        self
    }

    /// Listing `path` fails `times` times, or forever if `None`.
    pub fn fail_list(&self, path: &str, times: Option<usize>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .list_failures
            .insert(normalize(path), times);
        self
    }

    /// The first `successes` listings of `path` work, every later one fails.
    pub fn fail_list_after(&self, path: &str, successes: usize) -> &Self {
        self.state
            .lock()
            .unwrap()
            .list_failures_after
            .insert(normalize(path), successes);
        self
    }

    /// Stat of `path` fails `times` times, or forever if `None`.
    pub fn fail_stat(&self, path: &str, times: Option<usize>) -> &Self {
        self.state
            .lock()
            .unwrap()
            .stat_failures
            .insert(normalize(path), times);
        self
    }

    /// Every listing of `dir` also reports `name`, which never exists.
    pub fn phantom_entry(&self, dir: &str, name: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .phantoms
            .entry(normalize(dir))
            .or_default()
            .push(name.to_string());
        self
    }

    /// The next listing of `path` returns its children and then a concurrent actor deletes them.
    pub fn vanish_after_list(&self, path: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .vanish_after_list
            .insert(normalize(path));
        self
    }

    /// `make_dir(path)` creates the directory but still reports failure, as when another actor
    /// wins the race.
    pub fn race_make_dir(&self, path: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .racing_make_dir
            .insert(normalize(path));
        self
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().unwrap().ops.clear();
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().nodes.keys().cloned().collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().unwrap().exists(&normalize(path))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        let state = self.state.lock().unwrap();
        let path = normalize(path);
        state.exists(&path) && state.is_dir(&path)
    }
}

#[async_trait]
impl Backend for MemBackend {
    async fn stat(&self, path: &str) -> Result<Entry> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Stat(path.to_string()));
        let key = normalize(path);
        if let Some(error) = injected_failure(&mut state.stat_failures, &key) {
            return Err(error);
        }
        if is_root(&key) {
            return Ok(Entry::directory(key));
        }
        match state.nodes.get(&key) {
            Some(Node::Directory) => Ok(Entry::directory(entry::base_name(&key))),
            Some(Node::File(_)) => Ok(Entry::file(entry::base_name(&key))),
            None => Err(Error::not_found(path)),
        }
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<Entry>> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::List(path.to_string()));
        let key = normalize(path);
        if let Some(error) = injected_failure(&mut state.list_failures, &key) {
            return Err(error);
        }
        if let Some(successes) = state.list_failures_after.get_mut(&key) {
            if *successes == 0 {
                return Err(permission_denied(&key));
            }
            *successes -= 1;
        }
        if !state.exists(&key) {
            return Err(Error::not_found(path));
        }
        if !state.is_dir(&key) {
            return Err(Error::not_a_directory(path));
        }
        let children = state.children(&key);
        let mut entries: Vec<Entry> = children
            .iter()
            .map(|child| match state.nodes.get(child) {
                Some(Node::Directory) => Entry::directory(entry::base_name(child)),
                _ => Entry::file(entry::base_name(child)),
            })
            .collect();
        if let Some(names) = state.phantoms.get(&key) {
            entries.extend(names.iter().map(|name| Entry::file(name.clone())));
        }
        if state.vanish_after_list.remove(&key) {
            for child in &children {
                state.remove_subtree(child);
            }
        }
        Ok(entries)
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::RemoveFile(path.to_string()));
        let key = normalize(path);
        if let Some(error) = injected_failure(&mut state.remove_failures, &key) {
            return Err(error);
        }
        match state.nodes.get(&key) {
            None => Err(Error::not_found(path)),
            Some(Node::Directory) => Err(Error::new(
                ErrorKind::Invalid,
                anyhow::anyhow!("{path:?}: is a directory"),
            )),
            Some(Node::File(_)) => {
                state.nodes.remove(&key);
                Ok(())
            }
        }
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::RemoveDir(path.to_string()));
        let key = normalize(path);
        if let Some(error) = injected_failure(&mut state.remove_failures, &key) {
            return Err(error);
        }
        match state.nodes.get(&key) {
            None => Err(Error::not_found(path)),
            Some(Node::File(_)) => Err(Error::not_a_directory(path)),
            Some(Node::Directory) => {
                if !state.children(&key).is_empty() {
                    return Err(Error::new(
                        ErrorKind::NotEmpty,
                        anyhow::anyhow!("{path:?}: directory not empty"),
                    ));
                }
                state.nodes.remove(&key);
                Ok(())
            }
        }
    }

    async fn make_dir(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::MakeDir(path.to_string()));
        let key = normalize(path);
        if state.racing_make_dir.remove(&key) {
            state.nodes.insert(key, Node::Directory);
            return Err(Error::other(anyhow::anyhow!("{path:?}: file exists")));
        }
        if state.exists(&key) {
            return Err(Error::other(anyhow::anyhow!("{path:?}: file exists")));
        }
        let parent = parent_of(&key);
        if !state.exists(&parent) {
            return Err(Error::not_found(&parent));
        }
        if !state.is_dir(&parent) {
            return Err(Error::not_a_directory(&parent));
        }
        state.nodes.insert(key, Node::Directory);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Rename(from.to_string(), to.to_string()));
        let from = normalize(from);
        let to = normalize(to);
        if !state.nodes.contains_key(&from) {
            return Err(Error::not_found(&from));
        }
        let prefix = format!("{from}/");
        let moved: Vec<(String, Node)> = state
            .nodes
            .iter()
            .filter(|(key, _)| **key == from || key.starts_with(&prefix))
            .map(|(key, node)| (format!("{to}{}", &key[from.len()..]), node.clone()))
            .collect();
        state.remove_subtree(&from);
        state.nodes.extend(moved);
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<bytes::Bytes> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Read(path.to_string()));
        match state.nodes.get(&normalize(path)) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Directory) => Err(Error::new(
                ErrorKind::Invalid,
                anyhow::anyhow!("{path:?}: is a directory"),
            )),
            None => Err(Error::not_found(path)),
        }
    }

    async fn save_file(&self, path: &str, data: bytes::Bytes) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Save(path.to_string()));
        let key = normalize(path);
        if !state.is_dir(&parent_of(&key)) {
            return Err(Error::not_found(path));
        }
        state.nodes.insert(key, Node::File(data));
        Ok(())
    }
}

pub fn kind_of(entries: &[Entry], name: &str) -> Option<EntryKind> {
    entries
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| entry.kind)
}

/// Disk fixture used by the local backend tests:
/// ```text
/// foo
/// |- 0.txt
/// |- bar
///    |- 1.txt
///    |- 2.txt
/// |- baz
///    |- 3.txt
///    |- 4.txt -> ../bar/2.txt
/// ```
pub fn setup_test_dir() -> anyhow::Result<tempfile::TempDir> {
    let tmp_dir = tempfile::tempdir()?;
    let foo_path = tmp_dir.path().join("foo");
    std::fs::create_dir(&foo_path)?;
    std::fs::write(foo_path.join("0.txt"), "0")?;
    let bar_path = foo_path.join("bar");
    std::fs::create_dir(&bar_path)?;
    std::fs::write(bar_path.join("1.txt"), "1")?;
    std::fs::write(bar_path.join("2.txt"), "2")?;
    let baz_path = foo_path.join("baz");
    std::fs::create_dir(&baz_path)?;
    std::fs::write(baz_path.join("3.txt"), "3")?;
    std::os::unix::fs::symlink("../bar/2.txt", baz_path.join("4.txt"))?;
    Ok(tmp_dir)
}

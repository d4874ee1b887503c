//! Context frames
//!
//! A frame is a small key/value scope chained to its parent. Lookups walk the
//! chain outward and return the nearest value; writes always land on the
//! frame they are made on. Each section owns one frame, created when the
//! section is declared.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Failure;

/// A type-erased value stored in a frame
pub type Value = Arc<dyn Any + Send + Sync>;

/// Key under which trailing command-line arguments are stored in the root frame
pub const ARGV_KEY: &str = "argv";

/// Name/value pairs returned by define, before and after hooks
#[derive(Default, Clone)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, builder style
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Insert an already shared value without re-wrapping it
    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Copy every binding of `other` into this set, overwriting by key
    pub fn extend(&mut self, other: Bindings) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Bindings").field("keys", &keys).finish()
    }
}

struct FrameInner {
    parent: Option<Frame>,
    slots: RwLock<HashMap<String, Value>>,
}

/// Handle to a context frame. Cloning shares the same frame.
#[derive(Clone)]
pub struct Frame {
    inner: Arc<FrameInner>,
}

impl Frame {
    /// Create a root frame with no parent
    pub fn root() -> Self {
        Self::root_with(Bindings::new())
    }

    /// Create a root frame pre-populated with `bindings`
    pub fn root_with(bindings: Bindings) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                parent: None,
                slots: RwLock::new(bindings.values),
            }),
        }
    }

    /// Create a new frame delegating lookups to this one
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                parent: Some(self.clone()),
                slots: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn parent(&self) -> Option<&Frame> {
        self.inner.parent.as_ref()
    }

    /// Nearest value bound to `name`, walking outward through the parents
    pub fn get_value(&self, name: &str) -> Option<Value> {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if let Some(value) = current.inner.slots.read().get(name) {
                return Some(value.clone());
            }
            frame = current.parent();
        }
        None
    }

    /// Nearest value bound to `name`, downcast to `T`.
    ///
    /// Returns `None` when the name is undefined or the nearest value has a
    /// different type. A closer value of another type shadows a farther one.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get_value(name)?.downcast::<T>().ok()
    }

    /// Like [`Frame::get`] but failing with a message naming the key
    #[track_caller]
    pub fn require<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, Failure> {
        match self.get_value(name) {
            None => Err(Failure::new(format!("context value `{}` is undefined", name))),
            Some(value) => value.downcast::<T>().map_err(|_| {
                Failure::new(format!(
                    "context value `{}` is not a {}",
                    name,
                    std::any::type_name::<T>()
                ))
            }),
        }
    }

    /// Whether `name` is bound on this frame or an ancestor
    pub fn contains(&self, name: &str) -> bool {
        self.get_value(name).is_some()
    }

    /// Whether `name` is bound on this frame itself
    pub fn has_own(&self, name: &str) -> bool {
        self.inner.slots.read().contains_key(name)
    }

    /// Assign every binding onto this frame only, overwriting by key
    pub fn merge_own(&self, bindings: Bindings) {
        if bindings.is_empty() {
            return;
        }
        self.inner.slots.write().extend(bindings.values);
    }

    /// Bind a single value on this frame
    pub fn set<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.inner
            .slots
            .write()
            .insert(name.into(), Arc::new(value));
    }

    /// Number of frames from the root, the root being 0
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.parent();
        while let Some(parent) = frame {
            depth += 1;
            frame = parent.parent();
        }
        depth
    }

    /// Keys bound on this frame, sorted
    pub fn own_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.slots.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("depth", &self.depth())
            .field("keys", &self.own_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_to_nearest_ancestor() {
        let root = Frame::root_with(Bindings::new().with("token", "root".to_string()));
        let child = root.child();
        let grandchild = child.child();

        assert_eq!(grandchild.get::<String>("token").unwrap().as_str(), "root");

        child.set("token", "child".to_string());
        assert_eq!(grandchild.get::<String>("token").unwrap().as_str(), "child");
        assert_eq!(root.get::<String>("token").unwrap().as_str(), "root");
    }

    #[test]
    fn test_merge_lands_on_own_frame_only() {
        let root = Frame::root();
        let child = root.child();

        child.merge_own(Bindings::new().with("balance", 10u64));

        assert!(child.has_own("balance"));
        assert!(!root.contains("balance"));
        assert_eq!(*child.get::<u64>("balance").unwrap(), 10);
    }

    #[test]
    fn test_merge_overwrites_by_key() {
        let frame = Frame::root_with(Bindings::new().with("a", 1u32).with("b", 2u32));
        frame.merge_own(Bindings::new().with("b", 3u32));

        assert_eq!(*frame.get::<u32>("a").unwrap(), 1);
        assert_eq!(*frame.get::<u32>("b").unwrap(), 3);
        assert_eq!(frame.own_keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_undefined_and_mistyped_values() {
        let frame = Frame::root_with(Bindings::new().with("count", 1u8));

        assert!(frame.get::<u8>("missing").is_none());
        assert!(frame.get::<String>("count").is_none());

        let missing = frame.require::<u8>("missing").unwrap_err();
        assert_eq!(missing.message(), "context value `missing` is undefined");

        let mistyped = frame.require::<String>("count").unwrap_err();
        assert!(mistyped.message().starts_with("context value `count` is not a"));
    }

    #[test]
    fn test_depth_counts_parents() {
        let root = Frame::root();
        assert_eq!(root.depth(), 0);
        assert_eq!(root.child().child().depth(), 2);
    }
}

use openxr as xr;
use std::{fmt, sync::Arc};

/// An interned hierarchical path. Equal handles imply equal names, so
/// equality and hashing go through the handle alone. A path is empty iff
/// its handle is NULL. Immutable after construction; create them through
/// [`crate::instance::Instance::path`].
#[derive(Clone)]
pub struct Path {
    handle: xr::Path,
    name: Arc<str>,
}

impl Path {
    pub(crate) fn new(handle: xr::Path, name: Arc<str>) -> Self {
        Self { handle, name }
    }

    pub fn empty() -> Self {
        Self {
            handle: xr::Path::NULL,
            name: Arc::from(""),
        }
    }

    pub fn handle(&self) -> xr::Path {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.handle == xr::Path::NULL
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Path {}

impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({})", self.name)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

use crate::{
    error::{ResultExt, XrError},
    path::Path,
    runtime::{Extension, Hand, SuggestedBinding, XrRuntime},
};
use openxr as xr;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Wraps the injected runtime entry points with the process-wide state that
/// lives as long as they do: the path intern cache and the common top-level
/// user paths every profile needs.
pub struct Instance {
    runtime: Arc<dyn XrRuntime>,
    paths: Mutex<PathCache>,
    hand_paths: [Path; 2],
    head_path: Path,
}

#[derive(Default)]
struct PathCache {
    by_name: HashMap<Arc<str>, Path>,
    by_handle: HashMap<xr::Path, Path>,
}

impl Instance {
    pub fn new(runtime: Arc<dyn XrRuntime>) -> Result<Arc<Self>, XrError> {
        let instance = Self {
            runtime,
            paths: Mutex::new(PathCache::default()),
            hand_paths: [Path::empty(), Path::empty()],
            head_path: Path::empty(),
        };
        let left = instance.path(Hand::Left.user_path())?;
        let right = instance.path(Hand::Right.user_path())?;
        let head = instance.path("/user/head")?;
        Ok(Arc::new(Self {
            hand_paths: [left, right],
            head_path: head,
            ..instance
        }))
    }

    pub fn runtime(&self) -> &Arc<dyn XrRuntime> {
        &self.runtime
    }

    pub fn supports(&self, extension: Extension) -> bool {
        self.runtime.supports_extension(extension)
    }

    /// Interns a path string, reusing the cached entry when available.
    pub fn path(&self, name: &str) -> Result<Path, XrError> {
        let mut cache = self.paths.lock().unwrap();
        if let Some(path) = cache.by_name.get(name) {
            return Ok(path.clone());
        }
        let handle = self.runtime.string_to_path(name).or_xr("xrStringToPath")?;
        let name: Arc<str> = Arc::from(name);
        let path = Path::new(handle, name.clone());
        cache.by_name.insert(name, path.clone());
        cache.by_handle.insert(handle, path.clone());
        Ok(path)
    }

    /// Resolves a runtime-returned handle back to a path. NULL handles
    /// resolve to the empty path.
    pub fn path_from_handle(&self, handle: xr::Path) -> Result<Path, XrError> {
        if handle == xr::Path::NULL {
            return Ok(Path::empty());
        }
        {
            let cache = self.paths.lock().unwrap();
            if let Some(path) = cache.by_handle.get(&handle) {
                return Ok(path.clone());
            }
        }
        let name = self
            .runtime
            .path_to_string(handle)
            .or_xr("xrPathToString")?;
        let name: Arc<str> = Arc::from(name.as_str());
        let path = Path::new(handle, name.clone());
        let mut cache = self.paths.lock().unwrap();
        cache.by_name.insert(name, path.clone());
        cache.by_handle.insert(handle, path.clone());
        Ok(path)
    }

    pub fn hand_path(&self, hand: Hand) -> &Path {
        match hand {
            Hand::Left => &self.hand_paths[0],
            Hand::Right => &self.hand_paths[1],
        }
    }

    pub fn head_path(&self) -> &Path {
        &self.head_path
    }

    /// Submits a full binding table for one interaction profile. Suggestions
    /// cannot be amended incrementally; each profile gets exactly one call
    /// per action-set build.
    pub fn suggest_bindings(
        &self,
        interaction_profile: &Path,
        bindings: &[SuggestedBinding],
    ) -> Result<(), XrError> {
        log::debug!(
            "suggesting {} bindings for {}",
            bindings.len(),
            interaction_profile
        );
        self.runtime
            .suggest_bindings(interaction_profile.handle(), bindings)
            .or_xr("xrSuggestInteractionProfileBindings")
    }
}

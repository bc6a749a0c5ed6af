//! Locating process resources by name

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::trace;

use flowspec_common::{Error, Result};

/// File extensions of deployable resources
pub const DEPLOYABLE_EXTENSIONS: &[&str] = &["bpmn", "dmn"];

/// Looks up the content of process resources named in a spec
pub trait ResourceResolver {
    /// Fails with [`Error::ResourceNotFound`] if no resource has this name
    fn get_resource(&self, name: &str) -> Result<Vec<u8>>;

    /// Names of all deployable resources this resolver can provide
    fn list_resources(&self) -> Result<Vec<String>>;
}

/// Resolves resources relative to a root directory
#[derive(Debug, Clone)]
pub struct DirectoryResourceResolver {
    root: PathBuf,
}

impl DirectoryResourceResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for DirectoryResourceResolver {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceResolver for DirectoryResourceResolver {
    fn get_resource(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.root.join(name);
        trace!("Reading resource [name: '{}', path: {}]", name, path.display());

        match std::fs::read(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ResourceNotFound {
                name: name.to_string(),
                location: self.root.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn list_resources(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(Error::ResourceNotFound {
                name: String::new(),
                location: self.root.display().to_string(),
            });
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let deployable = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| DEPLOYABLE_EXTENSIONS.contains(&ext))
                .unwrap_or(false);

            if deployable && path.is_file() {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Resources held in memory, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceResolver {
    resources: BTreeMap<String, Vec<u8>>,
}

impl InMemoryResourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.resources.insert(name.into(), content.into());
    }
}

impl ResourceResolver for InMemoryResourceResolver {
    fn get_resource(&self, name: &str) -> Result<Vec<u8>> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound {
                name: name.to_string(),
                location: "memory".to_string(),
            })
    }

    fn list_resources(&self) -> Result<Vec<String>> {
        Ok(self.resources.keys().cloned().collect())
    }
}

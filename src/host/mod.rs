//! The hosted application as the protocol engine sees it.
//!
//! The engine knows nothing about what an application does. It asks pure
//! questions about paths ([`AppPaths`]) and hands every request that survives
//! the protocol checks to [`Application::process_request`].

pub mod static_site;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::SiteConfig;
use crate::http::worker::WorkerRequest;

pub use static_site::StaticSite;

/// Where a virtual path sits relative to the hosted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathScope {
    /// Inside the application tree.
    App,
    /// Inside the reserved client-script tree, served straight from disk.
    ClientScript,
}

/// Virtual and physical layout of a hosted application.
#[derive(Debug, Clone)]
pub struct AppPaths {
    virtual_path: String,
    lower_virtual_path: String,
    normalized_virtual_path: String,
    physical_path: PathBuf,
    normalized_client_script_path: String,
    physical_client_script_path: PathBuf,
    directory_listing: bool,
}

impl AppPaths {
    /// Builds the layout for an application mounted at `virtual_path` and
    /// stored under `physical_path`.
    pub fn new(virtual_path: &str, physical_path: impl Into<PathBuf>) -> Self {
        let physical_path = physical_path.into();
        let mut virtual_path = format!("/{}", virtual_path.trim_matches('/'));
        if virtual_path.len() > 1 && virtual_path.ends_with('/') {
            virtual_path.pop();
        }

        let lower_virtual_path = virtual_path.to_ascii_lowercase();
        let normalized_virtual_path = if lower_virtual_path.ends_with('/') {
            lower_virtual_path.clone()
        } else {
            format!("{lower_virtual_path}/")
        };

        Self {
            virtual_path,
            lower_virtual_path,
            normalized_virtual_path,
            physical_client_script_path: physical_path.join("aspnet_client"),
            physical_path,
            normalized_client_script_path: "/aspnet_client/".to_string(),
            directory_listing: false,
        }
    }

    pub fn from_config(site: &SiteConfig) -> Self {
        let mut paths = Self::new(&site.virtual_path, site.physical_path.clone())
            .with_directory_listing(site.directory_listing);
        let physical = site
            .physical_client_script_path
            .clone()
            .unwrap_or_else(|| paths.physical_path.join("aspnet_client"));
        paths = paths.with_client_script(&site.client_script_path, physical);
        paths
    }

    /// Mounts the client-script tree at `virtual_path`, backed by `physical`.
    pub fn with_client_script(mut self, virtual_path: &str, physical: impl Into<PathBuf>) -> Self {
        self.normalized_client_script_path = format!("/{}/", virtual_path.trim_matches('/').to_ascii_lowercase());
        self.physical_client_script_path = physical.into();
        self
    }

    pub fn with_directory_listing(mut self, enabled: bool) -> Self {
        self.directory_listing = enabled;
        self
    }

    pub fn virtual_path(&self) -> &str {
        &self.virtual_path
    }

    pub fn physical_path(&self) -> &Path {
        &self.physical_path
    }

    pub fn physical_client_script_path(&self) -> &Path {
        &self.physical_client_script_path
    }

    pub fn normalized_client_script_path(&self) -> &str {
        &self.normalized_client_script_path
    }

    pub fn directory_listing(&self) -> bool {
        self.directory_listing
    }

    /// Whether `path` names the application root itself.
    pub fn is_app_path(&self, path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        lower == self.lower_virtual_path || lower == self.normalized_virtual_path
    }

    /// Classifies `path`, or `None` when it lies outside the application.
    pub fn path_scope(&self, path: &str) -> Option<PathScope> {
        let lower = path.to_ascii_lowercase();

        if lower.starts_with(&self.normalized_client_script_path) {
            return Some(PathScope::ClientScript);
        }

        if self.virtual_path == "/" && lower.starts_with('/') {
            return Some(PathScope::App);
        }

        if lower.starts_with(&self.normalized_virtual_path) || lower == self.lower_virtual_path {
            return Some(PathScope::App);
        }

        None
    }

    /// Maps a virtual path to its location on disk.
    ///
    /// Paths outside the application are taken relative to its root.
    pub fn map_path(&self, path: &str) -> PathBuf {
        if path.is_empty() || path == "/" || self.is_app_path(path) {
            return self.physical_path.clone();
        }

        let (root, rest) = match self.path_scope(path) {
            Some(PathScope::ClientScript) => (
                &self.physical_client_script_path,
                path.get(self.normalized_client_script_path.len()..).unwrap_or(""),
            ),
            Some(PathScope::App) => (
                &self.physical_path,
                path.get(self.normalized_virtual_path.len()..).unwrap_or(""),
            ),
            None => (&self.physical_path, path.trim_start_matches('/')),
        };

        rest.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(root.clone(), |acc, segment| acc.join(segment))
    }
}

/// Raised by an application to stop processing a request.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The application ended the response early. Whatever it queued is
    /// still delivered.
    #[error("response ended by application")]
    ResponseEnded,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl From<std::io::Error> for ProcessError {
    fn from(e: std::io::Error) -> Self {
        ProcessError::Failed(e.into())
    }
}

/// The downstream collaborator that turns a parsed request into a response.
///
/// One instance serves every connection at once, so implementations must be
/// safe to call concurrently.
pub trait Application: Send + Sync {
    fn paths(&self) -> &AppPaths;

    fn is_app_path(&self, path: &str) -> bool {
        self.paths().is_app_path(path)
    }

    fn path_scope(&self, path: &str) -> Option<PathScope> {
        self.paths().path_scope(path)
    }

    fn map_path(&self, path: &str) -> PathBuf {
        self.paths().map_path(path)
    }

    /// Reads the request and writes the response through `request`.
    fn process_request(&self, request: &mut WorkerRequest<'_>) -> Result<(), ProcessError>;

    /// Renders a directory listing page. `None` leaves the 404 in place.
    fn format_directory_listing(&self, _listing: &DirectoryListing) -> Option<String> {
        None
    }
}

/// One entry of a directory being listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// What a directory listing formatter gets to work with.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    /// Virtual path of the directory.
    pub path: String,
    /// Virtual path of its parent, if that is still inside the application.
    pub parent: Option<String>,
    pub entries: Vec<DirEntryInfo>,
}

impl DirectoryListing {
    /// Reads `dir`. An unreadable directory lists as empty.
    pub fn read(dir: &Path, path: &str, parent: Option<String>) -> Self {
        let mut entries: Vec<DirEntryInfo> = std::fs::read_dir(dir)
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .filter_map(|entry| {
                        let meta = entry.metadata().ok()?;
                        Some(DirEntryInfo {
                            name: entry.file_name().to_string_lossy().into_owned(),
                            is_dir: meta.is_dir(),
                            len: meta.len(),
                            modified: meta.modified().ok(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

        Self {
            path: path.to_string(),
            parent,
            entries,
        }
    }
}

use std::path::PathBuf;
use std::time::SystemTime;

use uuid::Uuid;

/// Which side of the conversation a [`LogInfo`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Request,
    Response,
}

/// Record of one side of a request/response exchange.
///
/// Filled in by the owning connection as parsing and writing progress.
/// Consumers only ever see clones taken at request end.
#[derive(Debug, Clone)]
pub struct LogInfo {
    pub conversation_id: Uuid,
    pub kind: LogKind,
    pub created: SystemTime,
    pub url: Option<String>,
    pub path_translated: Option<PathBuf>,
    pub physical_path: Option<PathBuf>,
    pub headers: Option<String>,
    pub body: Option<Vec<u8>>,
    pub status_code: Option<u16>,
}

impl LogInfo {
    pub fn request(conversation_id: Uuid, physical_path: PathBuf) -> Self {
        Self {
            conversation_id,
            kind: LogKind::Request,
            created: SystemTime::now(),
            url: None,
            path_translated: None,
            physical_path: Some(physical_path),
            headers: None,
            body: None,
            status_code: None,
        }
    }

    pub fn response(conversation_id: Uuid) -> Self {
        Self {
            conversation_id,
            kind: LogKind::Response,
            created: SystemTime::now(),
            url: None,
            path_translated: None,
            physical_path: None,
            headers: None,
            body: None,
            status_code: None,
        }
    }

    /// Completes a response record with the body sent and the request's
    /// location fields.
    pub fn finalize_response(&mut self, request: &LogInfo, body: Vec<u8>) {
        self.body = Some(body);
        self.created = SystemTime::now();
        self.url = request.url.clone();
        self.path_translated = request.path_translated.clone();
        self.physical_path = request.physical_path.clone();
    }
}

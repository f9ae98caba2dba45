use std::fmt::Write as _;

use crate::host::{AppPaths, Application, DirectoryListing, ProcessError};
use crate::http::headers::ResponseHeader;
use crate::http::request::Method;
use crate::http::response::{GENERIC_BINARY, StatusCode};
use crate::http::worker::WorkerRequest;
use crate::http::writer::error_body;

/// Serves files under the physical root as they are.
///
/// Responses carry the static-file markers (`Accept-Ranges: bytes`, a
/// generic binary type) so the engine fills in a real content type.
#[derive(Debug, Clone)]
pub struct StaticSite {
    paths: AppPaths,
}

impl StaticSite {
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }
}

impl Application for StaticSite {
    fn paths(&self) -> &AppPaths {
        &self.paths
    }

    fn process_request(&self, request: &mut WorkerRequest<'_>) -> Result<(), ProcessError> {
        let is_head = match request.verb() {
            Method::GET => false,
            Method::HEAD => true,
            _ => {
                request.send_status(StatusCode::new(405), "Method Not Allowed");
                request.send_known_response_header(ResponseHeader::Allow, "GET, HEAD");
                request.send_calculated_content_length(0);
                return Ok(());
            }
        };

        let path = request.file_path_translated().to_path_buf();
        if !path.is_file() {
            let body = error_body(StatusCode::NOT_FOUND, request.app_path(), None);
            request.send_status(StatusCode::NOT_FOUND, "Not Found");
            request.send_known_response_header(ResponseHeader::ContentType, "text/html; charset=utf-8");
            request.send_calculated_content_length(body.len());
            request.send_response_from_memory(body.as_bytes());
            return Ok(());
        }

        let meta = std::fs::metadata(&path)?;
        request.send_known_response_header(ResponseHeader::ContentType, GENERIC_BINARY);
        request.send_known_response_header(ResponseHeader::AcceptRanges, "bytes");
        if let Ok(modified) = meta.modified() {
            request.send_known_response_header(ResponseHeader::LastModified, &httpdate::fmt_http_date(modified));
        }
        request.send_calculated_content_length(meta.len() as usize);

        if !is_head {
            request.send_response_from_file(&path, 0, None)?;
        }
        Ok(())
    }

    fn format_directory_listing(&self, listing: &DirectoryListing) -> Option<String> {
        let title = escape(&listing.path);
        let mut html = format!("<html>\r\n<head><title>Directory Listing -- {title}</title></head>\r\n<body>\r\n<h2>Directory Listing -- {title}</h2>\r\n<hr>\r\n<pre>\r\n");

        if let Some(parent) = &listing.parent {
            let href = if parent.ends_with('/') { parent.clone() } else { format!("{parent}/") };
            let _ = write!(html, "<a href=\"{}\">[To Parent Directory]</a>\r\n\r\n", escape(&href));
        }

        let base = if listing.path.ends_with('/') {
            listing.path.clone()
        } else {
            format!("{}/", listing.path)
        };

        for entry in &listing.entries {
            let modified = entry
                .modified
                .map(httpdate::fmt_http_date)
                .unwrap_or_default();
            let size = if entry.is_dir { "&lt;dir&gt;".to_string() } else { entry.len.to_string() };
            let slash = if entry.is_dir { "/" } else { "" };
            let _ = write!(
                html,
                "{modified:>29} {size:>12} <a href=\"{href}{slash}\">{name}</a>\r\n",
                href = escape(&format!("{base}{}", entry.name)),
                name = escape(&entry.name),
            );
        }

        html.push_str("</pre>\r\n<hr>\r\n</body>\r\n</html>\r\n");
        Some(html)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

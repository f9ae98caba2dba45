mod common;

use common::ScriptedConnection;
use huygens::host::{AppPaths, StaticSite};
use huygens::http::headers::ResponseHeader;
use huygens::http::parser::read_request;
use huygens::http::response::{GENERIC_BINARY, ResponseState, StatusCode};
use huygens::http::worker::{MAX_CHUNK_LENGTH, WorkerRequest};
use huygens::http::writer::{ResponseHead, error_body, url_encode_redirect};

fn worker_for<'a>(
    app: &'a StaticSite,
    conn: &'a mut ScriptedConnection,
) -> WorkerRequest<'a> {
    let request = read_request(conn, app).unwrap();
    WorkerRequest::new(app, conn, request)
}

fn site() -> StaticSite {
    StaticSite::new(AppPaths::new("/", "/srv/site"))
}

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::OK.as_u16(), 200);
    assert_eq!(StatusCode::FOUND.as_u16(), 302);
    assert_eq!(StatusCode::BAD_REQUEST.as_u16(), 400);
    assert_eq!(StatusCode::FORBIDDEN.as_u16(), 403);
    assert_eq!(StatusCode::NOT_FOUND.as_u16(), 404);
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), 500);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    assert_eq!(StatusCode::CONTINUE.reason_phrase(), "Continue");
    assert_eq!(StatusCode::FORBIDDEN.reason_phrase(), "Forbidden");
    assert_eq!(StatusCode::new(418).reason_phrase(), "");
}

#[test]
fn test_response_state_defaults() {
    let state = ResponseState::default();
    assert_eq!(state.status(), StatusCode::OK);
    assert_eq!(state.reason(), "OK");
    assert!(!state.headers_sent());
    assert_eq!(state.pending_body_len(), 0);
}

#[test]
fn test_response_head_serialization() {
    let extra = vec![("Location".to_string(), "/foo/".to_string())];
    let head = ResponseHead {
        status: StatusCode::FOUND,
        reason: "",
        content_length: Some(12),
        extra_headers: &extra,
        keep_alive: false,
    };

    let text = String::from_utf8(head.to_bytes()).unwrap();
    assert!(text.starts_with("HTTP/1.1 302 Found\r\nDate: "));
    assert!(text.contains("\r\nContent-Length: 12\r\nLocation: /foo/\r\nConnection: Close\r\n\r\n"));
    assert_eq!(text.matches("Date: ").count(), 1);
}

#[test]
fn test_keep_alive_omits_connection_close() {
    let head = ResponseHead {
        keep_alive: true,
        ..ResponseHead::new(StatusCode::OK)
    };
    assert!(!head.header_text().contains("Connection"));
}

#[test]
fn test_error_body_carries_status_and_message() {
    let body = error_body(StatusCode::BAD_REQUEST, "/app", Some("bad line"));
    assert!(body.contains("HTTP Error 400 - Bad Request."));
    assert!(body.contains("'/app'"));
    assert!(body.ends_with("\r\n<!--\r\nbad line\r\n-->"));

    let plain = error_body(StatusCode::NOT_FOUND, "/", None);
    assert!(!plain.contains("<!--"));
}

#[test]
fn test_url_encode_redirect_only_touches_spaces_and_high_bytes() {
    assert_eq!(url_encode_redirect("/my dir/"), "/my%20dir/");
    assert_eq!(url_encode_redirect("/caf\u{e9}/"), "/caf%c3%a9/");
    assert_eq!(url_encode_redirect("/a+b?c=d&e/"), "/a+b?c=d&e/");
}

#[test]
fn test_flush_twice_does_not_repeat_headers() {
    let app = site();
    let mut conn = ScriptedConnection::new([b"GET /page HTTP/1.1\r\n\r\n"]);

    {
        let mut worker = worker_for(&app, &mut conn);
        worker.send_unknown_response_header("X-Test", "1");
        worker.send_response_from_memory(b"one");
        worker.flush_response(false);
        worker.flush_response(false);
        assert!(worker.headers_sent());

        worker.send_unknown_response_header("X-Late", "ignored");
        worker.send_response_from_memory(b"two");
        worker.flush_response(false);
        worker.flush_response(true);
        worker.flush_response(true);
    }

    let text = conn.output_text();
    assert_eq!(text.matches("HTTP/1.1 200 OK").count(), 1);
    assert_eq!(text.matches("X-Test: 1").count(), 1);
    assert!(!text.contains("X-Late"));
    assert!(text.ends_with("\r\n\r\nonetwo"));
    assert!(conn.closed);
}

#[test]
fn test_status_and_reason_reach_the_wire() {
    let app = site();
    let mut conn = ScriptedConnection::new([b"GET /page HTTP/1.1\r\n\r\n"]);

    {
        let mut worker = worker_for(&app, &mut conn);
        worker.send_status(StatusCode::new(201), "Made It");
        worker.send_calculated_content_length(0);
        worker.flush_response(true);
    }

    let text = conn.output_text();
    assert!(text.starts_with("HTTP/1.1 201 Made It\r\n"));
    assert!(text.contains("Content-Length: 0\r\n"));
    assert!(text.contains("Connection: Close\r\n"));
}

#[test]
fn test_static_file_headers_pass_and_type_is_guessed() {
    let app = site();
    let mut conn = ScriptedConnection::new([b"GET /css/site.css HTTP/1.1\r\n\r\n"]);

    {
        let mut worker = worker_for(&app, &mut conn);
        worker.send_known_response_header(ResponseHeader::ContentType, GENERIC_BINARY);
        worker.send_known_response_header(ResponseHeader::LastModified, "Tue, 01 Jan 2030 00:00:00 GMT");
        worker.send_known_response_header(ResponseHeader::AcceptRanges, "bytes");
        worker.flush_response(true);
    }

    let text = conn.output_text();
    assert!(text.contains("Content-Type: text/css\r\n"));
    assert!(text.contains("Last-Modified: Tue, 01 Jan 2030 00:00:00 GMT\r\n"));
    assert!(text.contains("Accept-Ranges: bytes\r\n"));
}

#[test]
fn test_dynamic_response_drops_caching_headers() {
    let app = site();
    let mut conn = ScriptedConnection::new([b"GET /css/site.css HTTP/1.1\r\n\r\n"]);

    {
        let mut worker = worker_for(&app, &mut conn);
        worker.send_known_response_header(ResponseHeader::ContentType, GENERIC_BINARY);
        worker.send_known_response_header(ResponseHeader::Expires, "-1");
        worker.send_known_response_header(ResponseHeader::Date, "yesterday");
        worker.send_known_response_header(ResponseHeader::Server, "other");
        worker.flush_response(true);
    }

    let text = conn.output_text();
    assert!(text.contains(&format!("Content-Type: {GENERIC_BINARY}\r\n")));
    assert!(!text.contains("Expires"));
    assert!(!text.contains("yesterday"));
    assert!(!text.contains("Server"));
    assert_eq!(text.matches("Date: ").count(), 1);
}

#[test]
fn test_send_response_from_file_chunks_large_files() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("big.bin");
    let data: Vec<u8> = (0..(MAX_CHUNK_LENGTH * 2 + 100)).map(|i| (i % 251) as u8).collect();
    std::fs::write(&file, &data).unwrap();

    let app = site();
    let mut conn = ScriptedConnection::new([b"GET /big.bin HTTP/1.1\r\n\r\n"]);

    {
        let mut worker = worker_for(&app, &mut conn);
        worker.send_response_from_file(&file, 0, None).unwrap();
        // every chunk but the last was flushed already
        assert!(worker.headers_sent());
        assert_eq!(worker.response().pending_body_len(), 100);
        worker.flush_response(true);
    }

    let head_end = conn.output.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    assert_eq!(&conn.output[head_end..], &data[..]);
}

#[test]
fn test_send_response_from_file_range() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("small.txt");
    std::fs::write(&file, b"0123456789").unwrap();

    let app = site();
    let mut conn = ScriptedConnection::new([b"GET /small.txt HTTP/1.1\r\n\r\n"]);

    {
        let mut worker = worker_for(&app, &mut conn);
        worker.send_response_from_file(&file, 2, Some(5)).unwrap();
        worker.send_response_from_file(&file, 8, Some(5)).unwrap();
        worker.send_response_from_file(&file, 0, Some(0)).unwrap();
        assert_eq!(worker.response().pending_body_len(), 5);
        worker.flush_response(true);
    }

    assert!(conn.output_text().ends_with("\r\n\r\n23456"));
}

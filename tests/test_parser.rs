mod common;

use common::{ScriptedConnection, padded_header_block};
use huygens::connection::{Connection, MemoryConnection};
use huygens::host::{AppPaths, StaticSite};
use huygens::http::headers::RequestHeader;
use huygens::http::parser::{MAX_HEADER_BYTES, ParseError, read_request};
use huygens::http::request::Method;
use huygens::http::response::StatusCode;
use huygens::server::DirectRequest;
use std::path::PathBuf;

fn site() -> StaticSite {
    StaticSite::new(AppPaths::new("/", "/srv/site"))
}

fn parse(raw: &[u8]) -> Result<huygens::http::request::ParsedRequest, ParseError> {
    let mut conn = ScriptedConnection::new([raw]);
    read_request(&mut conn, &site())
}

#[test]
fn test_parse_simple_get_request() {
    let parsed = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();

    assert_eq!(*parsed.verb(), Method::GET);
    assert_eq!(parsed.path(), "/index.html");
    assert_eq!(parsed.protocol(), "HTTP/1.1");
    assert_eq!(parsed.headers().known(RequestHeader::Host), Some("example.com"));
    assert_eq!(parsed.path_translated(), PathBuf::from("/srv/site/index.html"));
    assert!(!parsed.is_client_script_path());
}

#[test]
fn test_parse_two_token_request_line() {
    let parsed = parse(b"GET /\r\n\r\n").unwrap();
    assert_eq!(parsed.protocol(), "HTTP/1.0");
}

#[test]
fn test_parse_rejects_wrong_token_counts() {
    for raw in [&b"GET\r\n\r\n"[..], b"GET / HTTP/1.1 extra\r\n\r\n", b"A B C D E\r\n\r\n"] {
        let err = parse(raw).unwrap_err();
        assert!(matches!(err, ParseError::MalformedRequestLine { .. }), "{err:?}");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

#[test]
fn test_parse_missing_request_line() {
    let err = parse(b"\r\nHost: x\r\n\r\n").unwrap_err();
    assert_eq!(err, ParseError::MissingRequestLine);
}

#[test]
fn test_parse_rejects_bad_paths_regardless_of_headers() {
    for path in ["/a/../b", "/a//b", "/a>b", "/a<b", "/c:x", "/a\\b", "/a%252e"] {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n");
        let err = parse(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::BadPath(_)), "{path}: {err:?}");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}

#[test]
fn test_parse_rejects_path_outside_application() {
    let app = StaticSite::new(AppPaths::new("/app", "/srv/app"));
    let mut conn = ScriptedConnection::new([b"GET /other/page HTTP/1.1\r\n\r\n"]);

    let err = read_request(&mut conn, &app).unwrap_err();
    assert_eq!(err, ParseError::OutsideApplication("/other/page".to_string()));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_parse_across_partial_reads() {
    let mut conn = ScriptedConnection::new([
        &b"POST /form HT"[..],
        b"TP/1.1\r\nContent-Length: 4\r\nX-Trace: t1\r\n",
        b"\r\nbody",
    ]);

    let parsed = read_request(&mut conn, &site()).unwrap();
    assert_eq!(*parsed.verb(), Method::POST);
    assert_eq!(parsed.content_length(), 4);
    assert_eq!(parsed.preloaded_body(), b"body");
    assert!(parsed.is_entire_body_preloaded());
    assert_eq!(parsed.headers().unknown("x-trace"), Some("t1"));
}

#[test]
fn test_parse_accepts_bare_lf() {
    let parsed = parse(b"GET /a HTTP/1.1\nHost: h\n\n").unwrap();
    assert_eq!(parsed.headers().known(RequestHeader::Host), Some("h"));
    assert_eq!(parsed.headers().all_raw(), "Host: h\n\n");
}

#[test]
fn test_preloaded_body_is_capped_at_content_length() {
    let parsed = parse(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nabcd").unwrap();
    assert_eq!(parsed.preloaded_body(), b"ab");
}

#[test]
fn test_partial_body_is_not_entirely_preloaded() {
    let parsed = parse(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").unwrap();
    assert_eq!(parsed.preloaded_body(), b"abc");
    assert!(!parsed.is_entire_body_preloaded());
}

#[test]
fn test_unparsable_content_length_is_zero() {
    let parsed = parse(b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\nabcd").unwrap();
    assert_eq!(parsed.content_length(), 0);
    assert!(parsed.preloaded_body().is_empty());
}

#[test]
fn test_headers_are_partitioned() {
    let parsed = parse(b"GET / HTTP/1.1\r\nhost: a\r\nX-One: 1\r\nCOOKIE: c=1\r\nno colon here\r\n\r\n").unwrap();
    let headers = parsed.headers();

    assert_eq!(headers.known(RequestHeader::Host), Some("a"));
    assert_eq!(headers.known(RequestHeader::Cookie), Some("c=1"));
    assert_eq!(headers.unknown_headers(), &[("X-One".to_string(), "1".to_string())]);
    assert_eq!(headers.unknown("host"), None);
    assert_eq!(headers.all_raw(), "host: a\r\nX-One: 1\r\nCOOKIE: c=1\r\nno colon here\r\n\r\n");
}

#[test]
fn test_request_line_only_has_empty_all_raw() {
    let parsed = parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parsed.headers().all_raw(), "");
}

#[test]
fn test_header_block_exactly_at_cap_parses() {
    let block = padded_header_block(MAX_HEADER_BYTES);
    assert_eq!(block.len(), MAX_HEADER_BYTES);

    let parsed = parse(&block).unwrap();
    assert_eq!(parsed.path(), "/");
    assert_eq!(parsed.headers().unknown("X-Pad").map(str::len), Some(MAX_HEADER_BYTES - 27));
}

#[test]
fn test_header_block_one_over_cap_fails() {
    let block = padded_header_block(MAX_HEADER_BYTES + 1);
    let err = parse(&block).unwrap_err();
    assert_eq!(err, ParseError::HeadersTooLarge);

    // the next request on a fresh connection is unaffected
    let parsed = parse(b"GET /next HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parsed.path(), "/next");
    assert!(parsed.headers().unknown("X-Pad").is_none());
}

#[test]
fn test_header_cap_applies_across_partial_reads() {
    let block = padded_header_block(MAX_HEADER_BYTES + 1);
    let (first, second) = block.split_at(1000);
    let mut conn = ScriptedConnection::new([first, second]);

    let err = read_request(&mut conn, &site()).unwrap_err();
    assert_eq!(err, ParseError::HeadersTooLarge);
}

#[test]
fn test_header_cap_on_memory_transport() {
    let paths = AppPaths::new("/", "/srv/site");
    let pad = |n: usize| "a".repeat(n);

    // "GET / HTTP/1.1\r\n" + "X-Pad: " + pad + "\r\n" + "\r\n"
    let mut at_cap = DirectRequest::new("GET", "/");
    at_cap.headers.insert("X-Pad".to_string(), pad(MAX_HEADER_BYTES - 27));
    let mut conn = MemoryConnection::new(at_cap, &paths);
    assert!(read_request(&mut conn, &site()).is_ok());

    let mut over = DirectRequest::new("GET", "/");
    over.headers.insert("X-Pad".to_string(), pad(MAX_HEADER_BYTES - 26));
    let mut conn = MemoryConnection::new(over, &paths);
    assert_eq!(read_request(&mut conn, &site()).unwrap_err(), ParseError::HeadersTooLarge);
}

#[test]
fn test_no_data_is_fatal() {
    let mut conn = ScriptedConnection::new(Vec::<Vec<u8>>::new());
    assert_eq!(read_request(&mut conn, &site()).unwrap_err(), ParseError::NoData);

    let mut conn = ScriptedConnection::new([b"GET / HTTP/1.1\r\nHost: x\r\n"]);
    assert_eq!(read_request(&mut conn, &site()).unwrap_err(), ParseError::NoData);
}

#[test]
fn test_percent_decoding_rebuilds_url() {
    let parsed = parse(b"GET /my%20files/report.txt?x=%41 HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parsed.path(), "/my files/report.txt");
    assert_eq!(parsed.url(), "/my files/report.txt?x=%41");
    assert_eq!(parsed.query_string(), Some("x=%41"));
    assert_eq!(parsed.query_string_bytes(), b"x=%41");
}

#[test]
fn test_client_script_path_is_flagged() {
    let parsed = parse(b"GET /aspnet_client/lib.js HTTP/1.1\r\n\r\n").unwrap();
    assert!(parsed.is_client_script_path());
}

#[test]
fn test_parse_fills_request_log() {
    let mut conn = ScriptedConnection::new([b"POST /a.aspx/info HTTP/1.1\r\nHost: h\r\nContent-Length: 2\r\n\r\nhi"]);
    let parsed = read_request(&mut conn, &site()).unwrap();

    assert_eq!(parsed.file_path(), "/a.aspx");
    assert_eq!(parsed.path_info(), "/info");

    let log = conn.request_log();
    assert_eq!(log.url.as_deref(), Some("/a.aspx/info"));
    assert_eq!(log.path_translated, Some(PathBuf::from("/srv/site/a.aspx")));
    assert_eq!(
        log.headers.as_deref(),
        Some("POST /a.aspx/info HTTP/1.1\r\nHost: h\r\nContent-Length: 2")
    );
    assert_eq!(log.body.as_deref(), Some(&b"hi"[..]));
}

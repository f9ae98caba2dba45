//! Canonical header names the worker request tracks in fixed slots.
//!
//! Request headers whose name matches one of [`RequestHeader`] (ignoring
//! case) land in a dense slot array; everything else goes to the open
//! "unknown" list. Response headers sent through the known-header path use
//! [`ResponseHeader`].

macro_rules! header_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Number of slots needed to index every variant.
            pub const COUNT: usize = Self::ALL.len();

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn index(&self) -> usize {
                *self as usize
            }

            /// Case-insensitive lookup of a canonical header name.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|h| h.name().eq_ignore_ascii_case(name))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

header_enum! {
    /// Request headers with a dedicated slot.
    RequestHeader {
        CacheControl => "Cache-Control",
        Connection => "Connection",
        Date => "Date",
        KeepAlive => "Keep-Alive",
        Pragma => "Pragma",
        Trailer => "Trailer",
        TransferEncoding => "Transfer-Encoding",
        Upgrade => "Upgrade",
        Via => "Via",
        Warning => "Warning",
        Allow => "Allow",
        ContentLength => "Content-Length",
        ContentType => "Content-Type",
        ContentEncoding => "Content-Encoding",
        ContentLanguage => "Content-Language",
        ContentLocation => "Content-Location",
        ContentMd5 => "Content-MD5",
        ContentRange => "Content-Range",
        Expires => "Expires",
        LastModified => "Last-Modified",
        Accept => "Accept",
        AcceptCharset => "Accept-Charset",
        AcceptEncoding => "Accept-Encoding",
        AcceptLanguage => "Accept-Language",
        Authorization => "Authorization",
        Cookie => "Cookie",
        Expect => "Expect",
        From => "From",
        Host => "Host",
        IfMatch => "If-Match",
        IfModifiedSince => "If-Modified-Since",
        IfNoneMatch => "If-None-Match",
        IfRange => "If-Range",
        IfUnmodifiedSince => "If-Unmodified-Since",
        MaxForwards => "Max-Forwards",
        ProxyAuthorization => "Proxy-Authorization",
        Referer => "Referer",
        Range => "Range",
        Te => "TE",
        UserAgent => "User-Agent",
    }
}

header_enum! {
    /// Response headers an application can send through the known-header path.
    ResponseHeader {
        CacheControl => "Cache-Control",
        Connection => "Connection",
        Date => "Date",
        KeepAlive => "Keep-Alive",
        Pragma => "Pragma",
        Trailer => "Trailer",
        TransferEncoding => "Transfer-Encoding",
        Upgrade => "Upgrade",
        Via => "Via",
        Warning => "Warning",
        Allow => "Allow",
        ContentLength => "Content-Length",
        ContentType => "Content-Type",
        ContentEncoding => "Content-Encoding",
        ContentLanguage => "Content-Language",
        ContentLocation => "Content-Location",
        ContentMd5 => "Content-MD5",
        ContentRange => "Content-Range",
        Expires => "Expires",
        LastModified => "Last-Modified",
        AcceptRanges => "Accept-Ranges",
        Age => "Age",
        Etag => "ETag",
        Location => "Location",
        ProxyAuthenticate => "Proxy-Authenticate",
        RetryAfter => "Retry-After",
        Server => "Server",
        SetCookie => "Set-Cookie",
        Vary => "Vary",
        WwwAuthenticate => "WWW-Authenticate",
    }
}

use crate::error::ProxyError;

/// End-of-headers marker for HTTP/1.x request and response heads.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Returns the offset of the head terminator, if the buffer holds a
/// complete head.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
}

/// A client proxy request, split once at the head terminator.
///
/// Headers stay an ordered list of raw lines rather than a map: duplicate
/// headers and their relative order must survive the trip to the upstream.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub request_line: String,
    pub headers: Vec<String>,
    pub body: Vec<u8>,
    pub is_connect: bool,
}

impl ProxyRequest {
    /// Parses a buffer that contains a complete request head plus any
    /// already-buffered body bytes.
    pub fn parse(buf: &[u8]) -> Result<Self, ProxyError> {
        let head_end = find_head_end(buf).ok_or_else(|| {
            ProxyError::ClientProtocol("request head is incomplete".to_string())
        })?;

        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let body = buf[head_end + HEAD_TERMINATOR.len()..].to_vec();

        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or("").to_string();
        if request_line.is_empty() {
            return Err(ProxyError::ClientProtocol("empty request line".to_string()));
        }

        let headers: Vec<String> = lines.map(str::to_string).collect();
        let is_connect = request_line.starts_with("CONNECT ");

        Ok(Self {
            request_line,
            headers,
            body,
            is_connect,
        })
    }

    /// Serializes the request for the upstream proxy.
    ///
    /// Every client-supplied `Proxy-Authorization` line is dropped, and the
    /// configured credential (when present) goes in as the first header
    /// after the request line. All other headers keep their original order;
    /// the body is appended verbatim.
    pub fn rewrite(&self, auth: Option<&str>) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.request_line.len() + self.body.len() + 256);

        out.extend_from_slice(self.request_line.as_bytes());
        out.extend_from_slice(b"\r\n");

        if let Some(value) = auth {
            out.extend_from_slice(b"Proxy-Authorization: ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }

        for header in &self.headers {
            if is_proxy_authorization(header) {
                continue;
            }
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(b"\r\n");
        }

        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

fn is_proxy_authorization(header_line: &str) -> bool {
    let Some((name, _)) = header_line.split_once(':') else {
        return false;
    };
    name.trim().eq_ignore_ascii_case("proxy-authorization")
}

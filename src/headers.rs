use std::collections::HashMap;
use std::net::SocketAddr;

/// One discovery response: parsed SSDP headers plus the responder's address
///
/// Header names are kept exactly as the device sent them (`LOCATION`,
/// `device-group.roku.com`, ...). Records are immutable once built; the
/// discovery session hands back a fresh list on every call.
#[derive(Debug, Clone)]
pub struct DiscoveryRecord {
    headers: HashMap<String, String>,
    sender: SocketAddr,
}

impl DiscoveryRecord {
    pub(crate) fn new(headers: HashMap<String, String>, sender: SocketAddr) -> Self {
        Self { headers, sender }
    }

    /// Look up a header by its exact (case-preserved) name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The `Server` header, identifying the responder's software
    pub fn server(&self) -> Option<&str> {
        self.get("Server")
    }

    /// The `LOCATION` header, the base URL of the device's control API
    pub fn location(&self) -> Option<&str> {
        self.get("LOCATION")
    }

    /// Address the response datagram came from
    pub fn sender(&self) -> SocketAddr {
        self.sender
    }

    /// All parsed headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Whether the `Server` header identifies a Roku device
    ///
    /// Case-insensitive substring match. Discovery itself never filters;
    /// this is the aggregator's vendor check.
    pub fn is_roku(&self) -> bool {
        self.server()
            .is_some_and(|s| s.to_lowercase().contains("roku"))
    }
}

/// Parse one raw SSDP response datagram into a header map
///
/// The first line is the HTTP status line and is discarded, as are the two
/// blank terminator lines at the end. Every interior line is split at the
/// first `:`; the value is trimmed of surrounding whitespace (including the
/// `\r` left over from splitting CRLF data on `\n`). A line with no colon
/// becomes a key with an empty value rather than an error, while blank lines
/// are skipped entirely. When a header name repeats, the last occurrence
/// wins.
pub fn parse_headers(raw: &[u8]) -> HashMap<String, String> {
    let decoded = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = decoded.split('\n').collect();

    let mut headers = HashMap::new();
    if lines.len() < 3 {
        tracing::warn!("discovery response too short to carry headers");
        return headers;
    }

    for line in &lines[1..lines.len() - 2] {
        // Blank fragments from the trailing terminator lines carry no header
        if line.trim().is_empty() {
            continue;
        }
        let (name, value) = header_line(line);
        headers.insert(name, value);
    }

    headers
}

/// Split a single `name:value` header line at the first colon
///
/// `"USN: uuid:roku:ecp:ABC"` becomes `("USN", "uuid:roku:ecp:ABC")`.
pub fn header_line(line: &str) -> (String, String) {
    match line.split_once(':') {
        Some((name, value)) => (name.to_string(), value.trim().to_string()),
        None => (line.trim_end().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &[u8] = b"HTTP/1.1 200 OK\r\n\
Cache-Control: max-age=3600\r\n\
ST: roku:ecp\r\n\
USN: uuid:roku:ecp:YN00XF7876856\r\n\
Ext:\r\n\
Server: Roku/9.2.0 UPnP/1.0 Roku/9.2.0\r\n\
LOCATION: http://192.168.1.61:8060/\r\n\
device-group.roku.com: DD45456B11E45456E51\r\n\
WAKEUP: MAC=e6-48-b0-c7-42-5c;Timeout=10\r\n\
\r\n\
\r\n";

    #[test]
    fn parses_full_discovery_response() {
        let headers = parse_headers(FIXTURE);

        assert_eq!(headers.len(), 8);
        assert_eq!(headers["Cache-Control"], "max-age=3600");
        assert_eq!(headers["ST"], "roku:ecp");
        assert_eq!(headers["USN"], "uuid:roku:ecp:YN00XF7876856");
        assert_eq!(headers["Ext"], "");
        assert_eq!(headers["Server"], "Roku/9.2.0 UPnP/1.0 Roku/9.2.0");
        assert_eq!(headers["LOCATION"], "http://192.168.1.61:8060/");
        assert_eq!(headers["device-group.roku.com"], "DD45456B11E45456E51");
        assert_eq!(headers["WAKEUP"], "MAC=e6-48-b0-c7-42-5c;Timeout=10");
    }

    #[test]
    fn status_line_is_not_a_header() {
        let headers = parse_headers(FIXTURE);
        assert!(!headers.keys().any(|k| k.contains("HTTP")));
    }

    #[test]
    fn splits_on_first_colon_only() {
        let (name, value) = header_line("USN: uuid:roku:ecp:ABC");
        assert_eq!(name, "USN");
        assert_eq!(value, "uuid:roku:ecp:ABC");
    }

    #[test]
    fn line_without_colon_becomes_empty_value() {
        let (name, value) = header_line("garbage\r");
        assert_eq!(name, "garbage");
        assert_eq!(value, "");
    }

    #[test]
    fn trailing_blank_lines_never_become_headers() {
        // Splitting the CRLF terminators on `\n` leaves bare `\r` fragments
        // inside the interior slice; they must not turn into header entries.
        let headers = parse_headers(FIXTURE);
        assert!(!headers.contains_key(""));
        assert!(!headers.contains_key("\r"));

        let raw = b"HTTP/1.1 200 OK\r\nST: roku:ecp\r\n\r\n\r\n\r\n";
        let headers = parse_headers(raw);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["ST"], "roku:ecp");
    }

    #[test]
    fn duplicate_headers_last_wins() {
        let raw = b"HTTP/1.1 200 OK\r\nST: first\r\nST: second\r\n\r\n\r\n";
        let headers = parse_headers(raw);
        assert_eq!(headers["ST"], "second");
    }

    #[test]
    fn short_input_yields_no_headers() {
        assert!(parse_headers(b"HTTP/1.1 200 OK").is_empty());
        assert!(parse_headers(b"").is_empty());
    }

    #[test]
    fn roku_check_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("Server".to_string(), "ROKU/9.2.0 UPnP/1.0".to_string());
        let record = DiscoveryRecord::new(headers, "127.0.0.1:1900".parse().unwrap());
        assert!(record.is_roku());

        let other = DiscoveryRecord::new(HashMap::new(), "127.0.0.1:1900".parse().unwrap());
        assert!(!other.is_roku());
    }
}

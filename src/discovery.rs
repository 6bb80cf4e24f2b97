use crate::error::Result;
use crate::headers::{parse_headers, DiscoveryRecord};
use std::fmt;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Response-spread hint sent in the M-SEARCH `MX` header
const MX_SECONDS: u8 = 2;

/// Largest payload a single UDP datagram can carry
const MAX_DATAGRAM: usize = 65507;

/// SSDP search target selecting the discovery scope
///
/// `RokuEcp` restricts responses to Roku devices; `UpnpRootDevice` broadens
/// the query to every UPnP root device on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    RokuEcp,
    UpnpRootDevice,
}

impl SearchTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTarget::RokuEcp => "roku:ecp",
            SearchTarget::UpnpRootDevice => "upnp:rootdevice",
        }
    }
}

impl fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SSDP discovery session driver
///
/// Sends a single M-SEARCH query to the SSDP multicast group and collects
/// responses until the configured window elapses with no further data. Each
/// call owns its own socket, bound to an ephemeral port (never 1900, so a
/// UPnP server on the same host keeps receiving its own traffic), and returns
/// a freshly built list of records in arrival order.
///
/// # Example
///
/// ```no_run
/// use roku_scanner::Scanner;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let scanner = Scanner::new();
///     for record in scanner.discover().await? {
///         println!("{} at {}", record.server().unwrap_or("?"), record.sender());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Scanner {
    timeout: Duration,
    search_target: SearchTarget,
}

impl Scanner {
    /// Create a scanner with the default 2 second window, Roku-only scope
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            search_target: SearchTarget::RokuEcp,
        }
    }

    /// Set the receive window applied to each datagram wait
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the search target scope
    pub fn with_search_target(mut self, search_target: SearchTarget) -> Self {
        self.search_target = search_target;
        self
    }

    /// Run one discovery session and return every response received
    ///
    /// Duplicate responses from the same device are kept; the timeout is the
    /// only termination condition. Any socket error other than the receive
    /// timeout aborts the session.
    pub async fn discover(&self) -> Result<Vec<DiscoveryRecord>> {
        self.run(SSDP_MULTICAST_ADDR).await
    }

    async fn run(&self, destination: &str) -> Result<Vec<DiscoveryRecord>> {
        let message = build_msearch(self.search_target.as_str());

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.send_to(message.as_bytes(), destination).await?;
        tracing::info!(
            "sent M-SEARCH for {} to {}",
            self.search_target,
            destination
        );

        let mut discovered = Vec::new();
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            match timeout(self.timeout, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, sender))) => {
                    tracing::debug!("received {} byte response from {}", len, sender);
                    let headers = parse_headers(&buf[..len]);
                    discovered.push(DiscoveryRecord::new(headers, sender));
                }
                Ok(Err(e)) => {
                    tracing::error!("discovery socket error: {}", e);
                    return Err(e.into());
                }
                // Window elapsed with no further data
                Err(_) => break,
            }
        }

        tracing::info!("discovery window closed, {} response(s)", discovered.len());
        Ok(discovered)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

fn build_msearch(search_target: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST:{SSDP_MULTICAST_ADDR}\r\n\
         ST:{search_target}\r\n\
         MX:{MX_SECONDS}\r\n\
         MAN:\"ssdp:discover\"\r\n\
         \r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
ST: roku:ecp\r\n\
USN: uuid:roku:ecp:YN00XF7876856\r\n\
Server: Roku/9.2.0 UPnP/1.0 Roku/9.2.0\r\n\
LOCATION: http://192.168.1.61:8060/\r\n\
\r\n\
\r\n";

    #[test]
    fn msearch_message_format() {
        let message = build_msearch("roku:ecp");
        assert!(message.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(message.contains("HOST:239.255.255.250:1900\r\n"));
        assert!(message.contains("ST:roku:ecp\r\n"));
        assert!(message.contains("MX:2\r\n"));
        assert!(message.contains("MAN:\"ssdp:discover\"\r\n"));
        assert!(message.ends_with("\r\n\r\n"));
    }

    #[test]
    fn search_target_strings() {
        assert_eq!(SearchTarget::RokuEcp.as_str(), "roku:ecp");
        assert_eq!(SearchTarget::UpnpRootDevice.as_str(), "upnp:rootdevice");
    }

    #[tokio::test]
    async fn silent_network_returns_empty_after_timeout() {
        // A bound socket that never answers stands in for an empty network.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = silent.local_addr().unwrap().to_string();

        let window = Duration::from_millis(250);
        let scanner = Scanner::new().with_timeout(window);

        let start = Instant::now();
        let discovered = scanner.run(&dest).await.unwrap();
        let elapsed = start.elapsed();

        assert!(discovered.is_empty());
        assert!(elapsed >= window, "returned before the window elapsed");
        assert!(elapsed < window * 4, "hung well past the window");
    }

    #[tokio::test]
    async fn collects_responses_without_deduplication() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = responder.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            let (_, from) = responder.recv_from(&mut buf).await.unwrap();
            // Same device answering twice; both responses must be kept.
            responder.send_to(RESPONSE, from).await.unwrap();
            responder.send_to(RESPONSE, from).await.unwrap();
        });

        let scanner = Scanner::new().with_timeout(Duration::from_millis(300));
        let discovered = scanner.run(&dest).await.unwrap();

        assert_eq!(discovered.len(), 2);
        assert!(discovered[0].is_roku());
        assert_eq!(
            discovered[0].location(),
            Some("http://192.168.1.61:8060/")
        );
        assert_eq!(discovered[0].sender(), discovered[1].sender());
    }
}

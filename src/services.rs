//! Service detection based on well-known port numbers.
//!
//! Maps TCP port numbers to service names. The table starts from a built-in
//! list of IANA names and is overlaid with the system services database
//! (`/etc/services`) when it can be read, so names match what the platform's
//! `getservbyport` would report. It is built once per process and never
//! modified afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// Placeholder returned for ports with no known service.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Location of the system services database.
pub const SYSTEM_SERVICES_PATH: &str = "/etc/services";

/// Built-in well-known TCP services.
const BUILTIN_SERVICES: &[(u16, &str)] = &[
    (1, "tcpmux"),
    (7, "echo"),
    (9, "discard"),
    (13, "daytime"),
    (17, "qotd"),
    (19, "chargen"),
    (20, "ftp-data"),
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (37, "time"),
    (43, "whois"),
    (49, "tacacs"),
    (53, "domain"),
    (70, "gopher"),
    (79, "finger"),
    (80, "http"),
    (88, "kerberos"),
    (102, "iso-tsap"),
    (110, "pop3"),
    (111, "sunrpc"),
    (113, "auth"),
    (119, "nntp"),
    (135, "epmap"),
    (139, "netbios-ssn"),
    (143, "imap2"),
    (179, "bgp"),
    (389, "ldap"),
    (443, "https"),
    (445, "microsoft-ds"),
    (465, "submissions"),
    (513, "login"),
    (514, "shell"),
    (515, "printer"),
    (543, "klogin"),
    (544, "kshell"),
    (548, "afpovertcp"),
    (554, "rtsp"),
    (587, "submission"),
    (631, "ipp"),
    (636, "ldaps"),
    (873, "rsync"),
    (989, "ftps-data"),
    (990, "ftps"),
    (992, "telnets"),
    (993, "imaps"),
    (995, "pop3s"),
    (1080, "socks"),
    (1194, "openvpn"),
    (1433, "ms-sql-s"),
    (1521, "oracle"),
    (1723, "pptp"),
    (1883, "mqtt"),
    (2049, "nfs"),
    (2181, "zookeeper"),
    (2375, "docker"),
    (2376, "docker-s"),
    (3128, "squid-http"),
    (3260, "iscsi-target"),
    (3306, "mysql"),
    (3389, "ms-wbt-server"),
    (3690, "svn"),
    (4369, "epmd"),
    (5060, "sip"),
    (5061, "sip-tls"),
    (5222, "xmpp-client"),
    (5269, "xmpp-server"),
    (5432, "postgresql"),
    (5672, "amqp"),
    (5900, "rfb"),
    (5984, "couchdb"),
    (6379, "redis"),
    (6443, "kubernetes-api"),
    (6667, "ircd"),
    (8080, "http-alt"),
    (8443, "https-alt"),
    (9042, "cassandra"),
    (9092, "kafka"),
    (9200, "elasticsearch"),
    (9418, "git"),
    (10000, "webmin"),
    (11211, "memcache"),
    (27017, "mongodb"),
];

/// Process-wide service table, initialised on first use.
static SERVICES: LazyLock<ServiceTable> = LazyLock::new(ServiceTable::system);

/// Read-only mapping from TCP port to service name.
#[derive(Debug, Clone, Default)]
pub struct ServiceTable {
    entries: HashMap<u16, String>,
}

impl ServiceTable {
    /// Table holding only the built-in entries.
    pub fn builtin() -> Self {
        let entries = BUILTIN_SERVICES
            .iter()
            .map(|&(port, name)| (port, name.to_string()))
            .collect();
        Self { entries }
    }

    /// Built-in entries overlaid with the system services database.
    ///
    /// A missing or unreadable file leaves the built-in table as is.
    pub fn system() -> Self {
        let mut table = Self::builtin();
        match Self::load(Path::new(SYSTEM_SERVICES_PATH)) {
            Ok(system) => {
                debug!(entries = system.len(), "loaded system services database");
                table.entries.extend(system.entries);
            }
            Err(e) => debug!(error = %e, "system services database unavailable"),
        }
        table
    }

    /// Load a services file from disk.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        fs::read_to_string(path).map(|content| Self::parse(&content))
    }

    /// Parse the `/etc/services` format:
    ///
    /// ```text
    /// # name      port/proto  aliases...   # comment
    /// http        80/tcp      www
    /// ```
    ///
    /// Only TCP entries are kept. When a port is listed more than once, the
    /// first entry wins. Malformed lines are skipped.
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let mut fields = line.split_whitespace();
            let (Some(name), Some(port_proto)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Some((port, proto)) = port_proto.split_once('/') else {
                continue;
            };
            if !proto.eq_ignore_ascii_case("tcp") {
                continue;
            }
            if let Ok(port) = port.parse::<u16>() {
                entries.entry(port).or_insert_with(|| name.to_string());
            }
        }

        Self { entries }
    }

    /// Look up the service name for a port.
    pub fn get(&self, port: u16) -> Option<&str> {
        self.entries.get(&port).map(String::as_str)
    }

    /// Service name for a port, or [`UNKNOWN_SERVICE`].
    pub fn describe(&self, port: u16) -> &str {
        self.get(port).unwrap_or(UNKNOWN_SERVICE)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The process-wide service table.
pub fn table() -> &'static ServiceTable {
    &SERVICES
}

/// Resolve the service name for a TCP port.
///
/// Returns `"unknown"` if the port is not recognized.
pub fn resolve(port: u16) -> &'static str {
    SERVICES.describe(port)
}

//! Profile Configuration Materializer
//!
//! Parses the OpenVPN-style configuration text the service serves for a
//! profile into the structured fields the local network stack consumes.
//!
//! The directive syntax is `KEYWORD <args>`, one per line, case-sensitive
//! keyword; blank lines and `#`/`;` comments are skipped. Inline blocks
//! (`<ca>` ... `</ca>`) carry embedded credentials. Directives this module
//! does not model structurally are preserved verbatim in
//! [`OvpnConfig::extras`] so new server-side options reach downstream
//! consumers unmodified. The parse fails only when the input contains no
//! directive lines at all.

use std::collections::HashMap;

/// Parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OvpnError {
    #[error("No recognizable directive lines")]
    Unparseable,

    #[error("Unterminated inline block <{0}>")]
    UnterminatedBlock(String),
}

/// One `remote` directive: host, optional port, optional protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub host: String,
    pub port: Option<u16>,
    pub proto: Option<String>,
}

/// Structured view of a profile configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OvpnConfig {
    /// `remote` directives in order of appearance.
    pub remotes: Vec<RemoteEndpoint>,
    pub proto: Option<String>,
    pub dev: Option<String>,
    pub cipher: Option<String>,
    pub auth: Option<String>,
    pub comp_lzo: Option<String>,
    pub remote_cert_tls: Option<String>,
    pub server_poll_timeout: Option<u32>,
    /// Raw argument text of `route` directives.
    pub routes: Vec<String>,
    /// DNS servers pushed via `dhcp-option DNS`.
    pub dns: Vec<String>,
    /// Inline credential blocks (`ca`, `cert`, `key`, `tls-auth`, ...),
    /// keyed by tag, contents verbatim.
    pub inline: HashMap<String, String>,
    /// Directive lines with keywords this module does not model,
    /// preserved unmodified.
    pub extras: Vec<String>,
}

impl OvpnConfig {
    fn directive_count(&self) -> usize {
        self.remotes.len()
            + self.routes.len()
            + self.dns.len()
            + self.inline.len()
            + self.extras.len()
            + [
                self.proto.is_some(),
                self.dev.is_some(),
                self.cipher.is_some(),
                self.auth.is_some(),
                self.comp_lzo.is_some(),
                self.remote_cert_tls.is_some(),
                self.server_poll_timeout.is_some(),
            ]
            .iter()
            .filter(|set| **set)
            .count()
    }
}

/// Parse profile configuration text.
pub fn parse_ovpn(text: &str) -> Result<OvpnConfig, OvpnError> {
    let mut config = OvpnConfig::default();
    let mut lines = text.lines();

    while let Some(raw) = lines.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        // Inline block: collect verbatim until the matching close tag.
        if let Some(tag) = block_open(line) {
            let close = format!("</{tag}>");
            let mut body = String::new();
            let mut terminated = false;
            for inner in lines.by_ref() {
                if inner.trim() == close {
                    terminated = true;
                    break;
                }
                body.push_str(inner);
                body.push('\n');
            }
            if !terminated {
                return Err(OvpnError::UnterminatedBlock(tag.to_string()));
            }
            config.inline.insert(tag.to_string(), body);
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        if !keyword.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            // Not a directive line at all; skip it.
            continue;
        }
        let args: Vec<&str> = parts.collect();

        match keyword {
            "remote" if !args.is_empty() => {
                config.remotes.push(RemoteEndpoint {
                    host: args[0].to_string(),
                    port: args.get(1).and_then(|p| p.parse().ok()),
                    proto: args.get(2).map(|p| p.to_string()),
                });
            }
            "proto" if !args.is_empty() => config.proto = Some(args[0].to_string()),
            "dev" if !args.is_empty() => config.dev = Some(args[0].to_string()),
            "cipher" if !args.is_empty() => config.cipher = Some(args[0].to_string()),
            "auth" if !args.is_empty() => config.auth = Some(args[0].to_string()),
            "comp-lzo" => config.comp_lzo = Some(args.join(" ")),
            "remote-cert-tls" if !args.is_empty() => {
                config.remote_cert_tls = Some(args[0].to_string());
            }
            "server-poll-timeout" if args.first().is_some_and(|a| a.parse::<u32>().is_ok()) => {
                config.server_poll_timeout = args[0].parse().ok();
            }
            "route" if !args.is_empty() => config.routes.push(args.join(" ")),
            "dhcp-option" if args.first() == Some(&"DNS") && args.len() >= 2 => {
                config.dns.push(args[1].to_string());
            }
            _ => config.extras.push(raw.to_string()),
        }
    }

    if config.directive_count() == 0 {
        return Err(OvpnError::Unparseable);
    }
    Ok(config)
}

fn block_open(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('<')?.strip_suffix('>')?;
    if inner.is_empty() || inner.starts_with('/') {
        return None;
    }
    Some(inner)
}

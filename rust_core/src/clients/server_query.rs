//! Live game-server status probing via the Source A2S_INFO query.
//!
//! The probe is strictly best-effort: malformed addresses, timeouts and
//! unparseable replies all degrade to an offline status. Callers must never
//! see an error from here.

use crate::types::ServerStatus;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

const A2S_INFO_REQUEST: &[u8] = b"\xFF\xFF\xFF\xFFTSource Engine Query\x00";
const A2S_INFO_REPLY: u8 = 0x49;
const A2S_CHALLENGE_REPLY: u8 = 0x41;

/// Best-effort live status probe for one `host:port` address.
#[async_trait]
pub trait ServerStatusProbe: Send + Sync {
    async fn probe(&self, address: &str) -> ServerStatus;
}

/// Source-engine A2S_INFO prober.
#[derive(Debug, Clone)]
pub struct A2sProbe {
    timeout: Duration,
}

impl A2sProbe {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn query(&self, address: &str) -> Result<ServerStatus> {
        let (host, port) =
            parse_address(address).ok_or_else(|| anyhow!("unparseable address {address}"))?;

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect((host.as_str(), port)).await?;

        let reply = self.exchange(&socket, A2S_INFO_REQUEST.to_vec()).await?;
        let payload = strip_header(&reply)?;

        match payload.first() {
            Some(&A2S_INFO_REPLY) => parse_info(&payload[1..]),
            Some(&A2S_CHALLENGE_REPLY) if payload.len() >= 5 => {
                // Server demands a challenge token appended to the request.
                let mut request = A2S_INFO_REQUEST.to_vec();
                request.extend_from_slice(&payload[1..5]);
                let reply = self.exchange(&socket, request).await?;
                let payload = strip_header(&reply)?;
                match payload.first() {
                    Some(&A2S_INFO_REPLY) => parse_info(&payload[1..]),
                    other => bail!("unexpected reply kind {other:?} after challenge"),
                }
            }
            other => bail!("unexpected reply kind {other:?}"),
        }
    }

    async fn exchange(&self, socket: &UdpSocket, request: Vec<u8>) -> Result<Vec<u8>> {
        socket.send(&request).await?;
        let mut buf = vec![0u8; 1400];
        let len = timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| anyhow!("probe timed out"))??;
        buf.truncate(len);
        Ok(buf)
    }
}

impl Default for A2sProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerStatusProbe for A2sProbe {
    async fn probe(&self, address: &str) -> ServerStatus {
        match self.query(address).await {
            Ok(status) => status,
            Err(err) => {
                debug!("server probe failed for {address}: {err:#}");
                ServerStatus::default()
            }
        }
    }
}

/// Split `host:port`; the port is everything after the last colon.
pub fn parse_address(address: &str) -> Option<(String, u16)> {
    let (host, port) = address.trim().rsplit_once(':')?;
    let host = host.trim();
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port.trim().parse().ok()?))
}

fn strip_header(reply: &[u8]) -> Result<&[u8]> {
    reply
        .strip_prefix(&[0xFF, 0xFF, 0xFF, 0xFF][..])
        .ok_or_else(|| anyhow!("missing simple-response header"))
}

/// Parse the body of an A2S_INFO reply (after the 0x49 kind byte).
fn parse_info(body: &[u8]) -> Result<ServerStatus> {
    let mut cursor = Cursor { body, pos: 0 };

    let _protocol = cursor.take_u8()?;
    let server_name = cursor.take_cstring()?;
    let map_name = cursor.take_cstring()?;
    let _folder = cursor.take_cstring()?;
    let _game = cursor.take_cstring()?;
    let _app_id = cursor.take_u16()?;
    let players = cursor.take_u8()?;
    let max_players = cursor.take_u8()?;
    let _bots = cursor.take_u8()?;
    let _server_type = cursor.take_u8()?;
    let _environment = cursor.take_u8()?;
    let visibility = cursor.take_u8()?;

    Ok(ServerStatus {
        online: true,
        server_name: Some(server_name),
        map_name: Some(map_name),
        player_count: Some(players as u32),
        max_players: Some(max_players as u32),
        password_protected: Some(visibility == 1),
    })
}

struct Cursor<'a> {
    body: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take_u8(&mut self) -> Result<u8> {
        let byte = *self
            .body
            .get(self.pos)
            .ok_or_else(|| anyhow!("truncated info reply"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take_u16(&mut self) -> Result<u16> {
        let lo = self.take_u8()?;
        let hi = self.take_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn take_cstring(&mut self) -> Result<String> {
        let rest = &self.body[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| anyhow!("unterminated string in info reply"))?;
        let text = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(text)
    }
}

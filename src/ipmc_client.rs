//! IPMC telnet console client
//!
//! Talks to the IPMC command console (default port 23).
//! Protocol: command bytes are sent one at a time and each is echoed back.
//! The response follows, terminated by the `>> ` prompt.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};
use std::time::Duration;

use crate::error::{IpmcError, Result};

/// Console prompt byte that ends a response
const PROMPT: u8 = b'>';

/// Bytes left on the wire after the first prompt byte (`>` and a space)
const PROMPT_TRAILER_LEN: usize = 2;

/// Largest response payload collected per command
pub const MAX_RESPONSE_SIZE: usize = 2048;

/// Response line prefixes the console uses to refuse a command
const REJECTION_PREFIXES: &[&str] = &["error", "invalid"];

/// Phrases that mark a refused command anywhere in a response line
const REJECTION_PHRASES: &[&str] = &["unknown command", "command not found"];

/// Client connected to an IPMC console
pub struct IpmcClient {
    stream: TcpStream,
    timeout: Duration,
    endpoint: String,
}

impl IpmcClient {
    /// Connect to the console, failing if the IPMC does not answer within `timeout`.
    pub async fn connect(endpoint: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to IPMC console at {}", endpoint);

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(endpoint)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(IpmcError::ConnectionFailed(format!(
                    "Failed to connect to {}: {}",
                    endpoint, e
                )));
            }
            Err(_) => {
                return Err(IpmcError::ConnectionFailed(format!(
                    "Failed to connect to {} after {:?}",
                    endpoint, timeout
                )));
            }
        };

        info!("Connection established to: {}", endpoint);
        debug!("Timeout set to: {:?}", timeout);

        Ok(Self {
            stream,
            timeout,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a console command and read the response up to the next prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<String> {
        debug!("IPMC command: {}", command.trim_end());

        for byte in command.bytes() {
            self.stream.write_all(&[byte]).await.map_err(|e| {
                IpmcError::ConnectionFailed(format!("Write failed: {}", e))
            })?;
            // Echo
            self.read_byte(command).await?;
        }

        let response = self.read_response(command).await?;

        debug!("IPMC response: {}", response.trim());
        Ok(response)
    }

    /// Send a command and fail if the console refuses it.
    pub async fn write_checked(&mut self, command: &str) -> Result<String> {
        let response = self.send_command(command).await?;
        if is_rejection(&response) {
            return Err(IpmcError::CommandRejected {
                command: command.trim_end().to_string(),
                response: response.trim().to_string(),
            });
        }
        Ok(response)
    }

    /// Read payload bytes until the prompt, then drain the prompt trailer
    async fn read_response(&mut self, command: &str) -> Result<String> {
        let mut buf = Vec::with_capacity(MAX_RESPONSE_SIZE);

        while buf.len() < MAX_RESPONSE_SIZE {
            let byte = self.read_byte(command).await?;
            if byte == PROMPT {
                // A prompt left over from the previous exchange
                if buf.is_empty() {
                    continue;
                }
                break;
            }
            buf.push(byte);
        }

        for _ in 0..PROMPT_TRAILER_LEN {
            self.read_byte(command).await?;
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn read_byte(&mut self, command: &str) -> Result<u8> {
        let mut byte = [0u8; 1];
        match tokio::time::timeout(self.timeout, self.stream.read(&mut byte)).await {
            Ok(Ok(0)) => Err(IpmcError::ConnectionClosed),
            Ok(Ok(_)) => Ok(byte[0]),
            Ok(Err(e)) => Err(IpmcError::ConnectionFailed(format!("Read failed: {}", e))),
            Err(_) => Err(IpmcError::Timeout(command.trim_end().to_string())),
        }
    }
}

/// True if any response line carries a console rejection marker
pub fn is_rejection(response: &str) -> bool {
    response.lines().any(|line| {
        let line = line.trim().to_ascii_lowercase();
        REJECTION_PREFIXES.iter().any(|p| line.starts_with(p))
            || REJECTION_PHRASES.iter().any(|p| line.contains(p))
    })
}

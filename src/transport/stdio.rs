//! Stdio transport.
//!
//! Each stdin line is one message from a single conversation; the reply is
//! written to stdout followed by a blank line. Logs go to stderr.

use crate::bot::Coordinator;
use crate::error::{BotError, BotResult};
use crate::transport::{Transport, wait_for_signal};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

pub struct StdioTransport {
    coordinator: Arc<Coordinator>,
    conversation_id: String,
}

impl StdioTransport {
    pub fn new(coordinator: Arc<Coordinator>, conversation_id: impl Into<String>) -> Self {
        Self {
            coordinator,
            conversation_id: conversation_id.into(),
        }
    }

    /// Answer every line of `reader` on `writer` until end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> BotResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| BotError::transport(format!("Failed to read stdin: {e}")))?
        {
            if line.trim().is_empty() {
                continue;
            }
            debug!(len = line.len(), "Message received on stdin");
            let response = self.coordinator.handle(&self.conversation_id, &line).await;
            let out = format!("{}\n\n", response.text);
            writer.write_all(out.as_bytes()).await.map_err(write_error)?;
            writer.flush().await.map_err(write_error)?;
        }
        info!("End of input");
        Ok(())
    }
}

fn write_error(e: std::io::Error) -> BotError {
    BotError::transport(format!("Failed to write stdout: {e}"))
}

impl Transport for StdioTransport {
    async fn run(&self) -> BotResult<()> {
        info!(conversation_id = %self.conversation_id, "Starting stdio transport");
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();

        tokio::select! {
            result = self.serve(reader, writer) => result,
            _ = wait_for_signal() => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

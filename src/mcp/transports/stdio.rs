//! Stdio transport for MCP servers running as local processes.

use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};

use super::{extract_result, id_key, notification_frame, request_frame, McpTransport};
use crate::mcp::error::McpError;

type PendingMap = Arc<RwLock<HashMap<String, oneshot::Sender<Value>>>>;

/// Line-delimited JSON-RPC over a child process's stdin/stdout.
///
/// A writer task drains an mpsc queue into stdin; a reader task matches
/// responses on stdout to pending requests by id. Server stderr goes to
/// `log::debug!`.
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    timeout: Duration,
    tx: mpsc::Sender<String>,
    pending: PendingMap,
    child: Mutex<Option<Child>>,
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("command", &self.command)
            .field("args", &self.args)
            .finish()
    }
}

impl StdioTransport {
    /// Start the server process and wire up the reader/writer tasks.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::protocol("child stdin was not piped"))?;
        let mut stdout = BufReader::new(
            child
                .stdout
                .take()
                .ok_or_else(|| McpError::protocol("child stdout was not piped"))?,
        );
        let stderr = child.stderr.take();

        let (tx, mut rx) = mpsc::channel::<String>(64);
        let pending: PendingMap = Arc::new(RwLock::new(HashMap::new()));
        let reader_pending = Arc::clone(&pending);
        let label = command.to_string();

        tokio::spawn(async move {
            let mut line = String::new();
            loop {
                line.clear();
                match stdout.read_line(&mut line).await {
                    Ok(0) => {
                        log::debug!("MCP server '{}' closed stdout", label);
                        break;
                    }
                    Ok(_) => {
                        let Ok(frame) = serde_json::from_str::<Value>(line.trim()) else {
                            log::debug!("Ignoring non-JSON line from '{}'", label);
                            continue;
                        };
                        let Some(id) = frame.get("id").and_then(id_key) else {
                            // Server-initiated notification.
                            continue;
                        };
                        if let Some(sender) = reader_pending.write().await.remove(&id) {
                            let _ = sender.send(frame);
                        }
                    }
                    Err(e) => {
                        log::warn!("Error reading from MCP server '{}': {}", label, e);
                        break;
                    }
                }
            }
            // Wake every waiter: their receivers see a closed channel.
            reader_pending.write().await.clear();
        });

        if let Some(stderr) = stderr {
            let label = command.to_string();
            tokio::spawn(async move {
                let mut stderr = BufReader::new(stderr);
                let mut line = String::new();
                loop {
                    line.clear();
                    match stderr.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => log::debug!("[{}] {}", label, line.trim_end()),
                    }
                }
            });
        }

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let written = async {
                    stdin.write_all(message.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                }
                .await;
                if let Err(e) = written {
                    log::warn!("Failed to write to MCP server stdin: {}", e);
                    break;
                }
            }
        });

        log::info!("Stdio transport connected: {} {}", command, args.join(" "));

        Ok(Self {
            command: command.to_string(),
            args: args.to_vec(),
            timeout,
            tx,
            pending,
            child: Mutex::new(Some(child)),
        })
    }

    async fn send(&self, frame: &Value) -> Result<(), McpError> {
        let message = serde_json::to_string(frame)?;
        self.tx
            .send(message)
            .await
            .map_err(|_| McpError::protocol("stdin writer task has stopped"))
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = uuid::Uuid::new_v4().to_string();
        let (resp_tx, resp_rx) = oneshot::channel();
        self.pending.write().await.insert(id.clone(), resp_tx);

        if let Err(e) = self.send(&request_frame(&Value::String(id.clone()), method, params)).await {
            self.pending.write().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, resp_rx).await {
            Ok(Ok(response)) => extract_result(response),
            Ok(Err(_)) => Err(McpError::protocol(format!(
                "MCP server '{}' exited before answering '{}'",
                self.command, method
            ))),
            Err(_) => {
                self.pending.write().await.remove(&id);
                Err(McpError::Timeout {
                    method: method.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        self.send(&notification_frame(method, params)).await
    }

    async fn close(&self) -> Result<(), McpError> {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                log::debug!("MCP server '{}' already gone: {}", self.command, e);
            }
            log::info!("Stdio transport disconnected: {}", self.server_identifier());
        }
        Ok(())
    }

    fn server_identifier(&self) -> String {
        if self.args.is_empty() {
            format!("stdio:{}", self.command)
        } else {
            format!("stdio:{}:{}", self.command, self.args.join(":"))
        }
    }
}

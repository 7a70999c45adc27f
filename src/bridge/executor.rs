//! Runtime bridge: execute a capability wherever its agent lives.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::invoker::{CapabilityInvoker, EchoExecutor, HttpInvoker, McpInvoker};
use crate::adapters::TransportDescriptor;
use crate::capabilities::Capability;
use crate::config::ExecutionConfig;
use crate::discovery::{AgentFormat, DiscoveredAgent};

/// Normalized outcome of one capability execution. Exactly one of `result`
/// and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    /// Source format of the agent the call was dispatched for.
    pub framework_used: String,
}

impl ExecutionResult {
    pub fn ok(result: Value, elapsed: Duration, framework: AgentFormat) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            execution_time_ms: elapsed.as_millis() as u64,
            framework_used: framework.to_string(),
        }
    }

    pub fn failed(error: impl Into<String>, elapsed: Duration, framework: AgentFormat) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            execution_time_ms: elapsed.as_millis() as u64,
            framework_used: framework.to_string(),
        }
    }
}

/// One entry of [`RuntimeBridge::execute_batch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCall {
    /// Capability id, name, or normalized name.
    pub capability: String,
    #[serde(default)]
    pub input: Value,
}

pub struct RuntimeBridge {
    config: ExecutionConfig,
    mcp: McpInvoker,
    http: HttpInvoker,
    echo: EchoExecutor,
}

impl RuntimeBridge {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            mcp: McpInvoker,
            http: HttpInvoker::default(),
            echo: EchoExecutor,
        }
    }

    /// Reuse a shared `reqwest` client for HTTP invocations.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = HttpInvoker::new(client);
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Pick the invoker for `agent`.
    ///
    /// MCP agents always speak MCP. Other recognised formats go over HTTP
    /// when the endpoint is a URL and over MCP when it is a process; with no
    /// endpoint the HTTP invoker reports the missing transport. Unknown
    /// formats get the echo fallback.
    fn invoker_for(&self, agent: &DiscoveredAgent) -> &dyn CapabilityInvoker {
        match agent.format {
            AgentFormat::Mcp => &self.mcp,
            AgentFormat::Ossa | AgentFormat::LangChain | AgentFormat::CrewAi | AgentFormat::OpenAi => {
                match &agent.endpoint {
                    Some(TransportDescriptor::Stdio { .. }) => &self.mcp,
                    Some(TransportDescriptor::Network { .. }) | None => &self.http,
                }
            }
            AgentFormat::Unknown => &self.echo,
        }
    }

    /// Caller timeout, else the endpoint's declared one, else the default.
    fn effective_timeout(&self, agent: &DiscoveredAgent, timeout: Option<Duration>) -> Duration {
        timeout
            .or_else(|| {
                agent
                    .endpoint
                    .as_ref()
                    .and_then(TransportDescriptor::declared_timeout_ms)
                    .map(Duration::from_millis)
            })
            .unwrap_or_else(|| Duration::from_millis(self.config.default_timeout_ms))
    }

    /// Execute `capability` on `agent`'s runtime.
    ///
    /// Never fails: transport errors, tool errors and timeouts all come back
    /// as an envelope with `success == false`.
    pub async fn execute_capability(
        &self,
        agent: &DiscoveredAgent,
        capability: &Capability,
        input: Value,
        timeout: Option<Duration>,
    ) -> ExecutionResult {
        let timeout = self.effective_timeout(agent, timeout);
        let invoker = self.invoker_for(agent);
        log::debug!(
            "Executing {}/{} via {} (timeout {}ms)",
            agent.id,
            capability.id(),
            invoker.name(),
            timeout.as_millis()
        );

        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, invoker.invoke(agent, capability, &input, timeout)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(value)) => ExecutionResult::ok(value, elapsed, agent.format),
            Ok(Err(e)) => {
                log::warn!("Execution of {}/{} failed: {}", agent.id, capability.id(), e);
                ExecutionResult::failed(e.to_string(), elapsed, agent.format)
            }
            Err(_) => {
                log::warn!(
                    "Execution of {}/{} timed out after {}ms",
                    agent.id,
                    capability.id(),
                    timeout.as_millis()
                );
                ExecutionResult::failed(
                    format!("timed out after {}ms", timeout.as_millis()),
                    elapsed,
                    agent.format,
                )
            }
        }
    }

    /// Run `calls` in order, one envelope each. Unknown capabilities produce
    /// a failure envelope without contacting the runtime.
    pub async fn execute_batch(
        &self,
        agent: &DiscoveredAgent,
        calls: &[BatchCall],
        timeout: Option<Duration>,
    ) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = match agent.find_capability(&call.capability) {
                Some(capability) => {
                    self.execute_capability(agent, capability, call.input.clone(), timeout)
                        .await
                }
                None => ExecutionResult::failed(
                    format!("unknown capability '{}' on agent '{}'", call.capability, agent.id),
                    Duration::ZERO,
                    agent.format,
                ),
            };
            results.push(result);
        }
        results
    }
}

impl Default for RuntimeBridge {
    fn default() -> Self {
        Self::new(ExecutionConfig::default())
    }
}

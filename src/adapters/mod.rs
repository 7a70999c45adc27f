//! # Protocol Adapters
//!
//! Pure, stateless conversions between the capability model and external
//! protocol shapes:
//!
//! - [`mcp`]: tools, resources, prompts, and content-hashed server configs
//! - [`langchain`]: `StructuredTool` descriptions with snake_case names
//! - [`transport`]: how a runtime is reached (stdio process or network URL)

pub mod error;
pub mod langchain;
pub mod mcp;
pub mod transport;

pub use error::AdapterError;
pub use langchain::{
    capability_to_langchain_tool, langchain_tool_to_capability, snake_case_name, LangChainTool,
};
pub use mcp::{
    build_server_config, capabilities_to_tools, capability_to_prompt, capability_to_tool,
    protocol_resource_to_resource, resource_to_protocol_resource, tool_to_capability,
    tools_from_value, PromptArgument, ProtocolPrompt, ProtocolResource, ServerConfig, ToolSpec,
};
pub use transport::TransportDescriptor;

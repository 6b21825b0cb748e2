// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod dynamo_source;
pub mod http_response;

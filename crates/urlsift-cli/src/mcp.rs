//! MCP (Model Context Protocol) server implementation

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use urlsift::{
    tool_specs, ProcessMultipleUrlsRequest, ProcessUrlRequest, Processor, SearchWebRequest,
};

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Tool call content block holding pretty-printed JSON or an error
fn tool_result(outcome: Result<Value, String>) -> Value {
    match outcome {
        Ok(content) => json!({
            "content": [{
                "type": "text",
                "text": serde_json::to_string_pretty(&content).unwrap_or_default()
            }]
        }),
        Err(message) => json!({
            "content": [{
                "type": "text",
                "text": format!("Error: {}", message)
            }],
            "isError": true
        }),
    }
}

/// MCP Server implementation
struct McpServer {
    processor: Processor,
}

impl McpServer {
    fn new(processor: Processor) -> Self {
        Self { processor }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "notifications/initialized" => {
                // This is a notification, no response needed
                JsonRpcResponse::success(request.id, json!(null))
            }
            _ => JsonRpcResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "urlsift",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = tool_specs()
            .into_iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "inputSchema": spec.input_schema
                })
            })
            .collect();

        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let tool_name = params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        let outcome = match tool_name {
            "process_url" => match parse_arguments::<ProcessUrlRequest>(arguments) {
                Ok(req) => to_value(self.processor.process_url(&req.url).await),
                Err(e) => return JsonRpcResponse::error(id, -32602, e),
            },
            "process_multiple_urls" => {
                match parse_arguments::<ProcessMultipleUrlsRequest>(arguments) {
                    Ok(req) => to_value(Ok::<_, String>(
                        self.processor.process_multiple_urls(req.urls).await,
                    )),
                    Err(e) => return JsonRpcResponse::error(id, -32602, e),
                }
            }
            "search_web" => match parse_arguments::<SearchWebRequest>(arguments) {
                Ok(req) => to_value(self.processor.search_web(&req.query).await),
                Err(e) => return JsonRpcResponse::error(id, -32602, e),
            },
            _ => {
                return JsonRpcResponse::error(id, -32602, format!("Unknown tool: {}", tool_name));
            }
        };

        JsonRpcResponse::success(id, tool_result(outcome))
    }
}

fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, String> {
    serde_json::from_value(arguments).map_err(|e| format!("Invalid arguments: {}", e))
}

fn to_value<T: Serialize, E: std::fmt::Display>(outcome: Result<T, E>) -> Result<Value, String> {
    outcome
        .map(|v| serde_json::to_value(v).unwrap_or(json!({})))
        .map_err(|e| e.to_string())
}

/// Run the MCP server over stdio
pub async fn run_server(processor: Processor) {
    let server = McpServer::new(processor);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                continue;
            }
        };

        if line.is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let response = JsonRpcResponse::error(None, -32700, format!("Parse error: {}", e));
                let json = serde_json::to_string(&response).unwrap_or_default();
                let _ = writeln!(stdout, "{}", json);
                let _ = stdout.flush();
                continue;
            }
        };

        // Skip notifications (no id)
        if request.id.is_none() && request.method.starts_with("notifications/") {
            continue;
        }

        let response = server.handle_request(request).await;
        let json = serde_json::to_string(&response).unwrap_or_default();
        let _ = writeln!(stdout, "{}", json);
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(Processor::new().unwrap())
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = server().handle_request(request("tools/list", json!({}))).await;
        let tools = response.result.unwrap()["tools"].clone();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["process_url", "process_multiple_urls", "search_web"]);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let response = server()
            .handle_request(request("tools/call", json!({"name": "fetch_page"})))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let response = server()
            .handle_request(request(
                "tools/call",
                json!({"name": "process_url", "arguments": {"link": "x"}}),
            ))
            .await;
        assert!(response.error.unwrap().message.starts_with("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_process_error_is_tool_error() {
        let response = server()
            .handle_request(request(
                "tools/call",
                json!({"name": "process_url", "arguments": {"url": "not a url"}}),
            ))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = server().handle_request(request("resources/list", json!({}))).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }
}

use anyhow::Result;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::use_cases::{ApiUseCase, LotteryUseCase, SuggestionUseCase};

#[derive(Debug, serde::Deserialize)]
struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

impl JsonRpcResponse {
    fn success(result: Value, id: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id: Some(id.unwrap_or(json!(1))),
        }
    }

    fn failure(code: i32, message: String, id: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id: Some(id.unwrap_or(json!(1))),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn lottery_property() -> Value {
    json!({
        "type": ["string", "integer"],
        "description": "Lottery name (e.g. EuroMilhões) or numeric id"
    })
}

pub struct MCPHandler {
    lottery_use_case: Arc<LotteryUseCase>,
    suggestion_use_case: Arc<SuggestionUseCase>,
    api_use_case: Arc<ApiUseCase>,
}

impl MCPHandler {
    pub fn new(
        lottery_use_case: Arc<LotteryUseCase>,
        suggestion_use_case: Arc<SuggestionUseCase>,
        api_use_case: Arc<ApiUseCase>,
    ) -> Self {
        Self {
            lottery_use_case,
            suggestion_use_case,
            api_use_case,
        }
    }

    pub async fn serve<R, W>(self, reader: R, mut writer: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Failed to parse request: {} - Line: {}", e, line);
                    let error_response = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        result: None,
                        error: Some(JsonRpcError {
                            code: -32700,
                            message: "Parse error".to_string(),
                            data: Some(json!(e.to_string())),
                        }),
                        id: None,
                    };
                    let response_json = serde_json::to_string(&error_response)?;
                    writeln!(writer, "{}", response_json)?;
                    writer.flush()?;
                    continue;
                }
            };

            // Notifications get no response
            let is_notification =
                request.id.is_none() || request.method.starts_with("notifications/");
            if is_notification {
                if request.method == "notifications/initialized" {
                    info!("🎰 Client initialized");
                }
                continue;
            }

            let response = self.handle_request(request).await;
            let response_json = serde_json::to_string(&response)?;
            writeln!(writer, "{}", response_json)?;
            writer.flush()?;
        }

        Ok(())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id).await,
            "tools/list" => self.handle_list_tools(request.id).await,
            "tools/call" => self.handle_call_tool(request.params, request.id).await,
            _ => JsonRpcResponse::failure(
                -32601,
                format!("Method not found: {}", request.method),
                request.id,
            ),
        }
    }

    async fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("🎰 Initializing lottery suggestion MCP server");
        JsonRpcResponse::success(
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "lottery-mcp-server",
                    "version": "0.2.0"
                }
            }),
            id,
        )
    }

    async fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools = self.get_tools();
        JsonRpcResponse::success(json!({ "tools": tools }), id)
    }

    async fn handle_call_tool(&self, params: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::failure(-32602, "Missing params".to_string(), id);
        };

        let Some(tool_name) = params.get("name").and_then(|n| n.as_str()) else {
            return JsonRpcResponse::failure(-32602, "Missing tool name".to_string(), id);
        };

        let arguments = params
            .get("arguments")
            .filter(|a| !a.is_null())
            .cloned()
            .unwrap_or(json!({}));
        let arguments_map: HashMap<String, Value> = match serde_json::from_value(arguments) {
            Ok(map) => map,
            Err(e) => {
                return JsonRpcResponse::failure(
                    -32602,
                    format!("Tool arguments must be an object: {}", e),
                    id,
                );
            }
        };

        match self.execute_tool(tool_name, &arguments_map).await {
            Ok(content) => JsonRpcResponse::success(
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": content
                        }
                    ]
                }),
                id,
            ),
            Err(e) => {
                warn!("✗ Tool {} failed: {:#}", tool_name, e);
                JsonRpcResponse::failure(-32603, format!("Tool execution error: {:#}", e), id)
            }
        }
    }

    async fn execute_tool(&self, tool_name: &str, arguments: &HashMap<String, Value>) -> Result<String> {
        match tool_name {
            "list_lotteries" => self.lottery_use_case.list_lotteries(arguments).await,
            "set_lottery_active" => self.lottery_use_case.set_lottery_active(arguments).await,
            "get_draw_history" => self.lottery_use_case.get_draw_history(arguments).await,
            "save_draw" => self.lottery_use_case.save_draw(arguments).await,
            "delete_draw" => self.lottery_use_case.delete_draw(arguments).await,
            "get_number_statistics" => self.lottery_use_case.get_number_statistics(arguments).await,
            "next_draw_date" => self.lottery_use_case.next_draw_date(arguments).await,
            "parse_and_insert_raw_json" => self.lottery_use_case.parse_and_insert_raw_json(arguments).await,
            "generate_suggestion" => self.suggestion_use_case.generate_suggestion(arguments).await,
            "generate_for_all_lotteries" => self.suggestion_use_case.generate_for_all_lotteries(arguments).await,
            "validate_suggestions" => self.suggestion_use_case.validate_suggestions(arguments).await,
            "get_suggestions" => self.suggestion_use_case.get_suggestions(arguments).await,
            "suggestion_summary" => self.suggestion_use_case.suggestion_summary(arguments).await,
            "cleanup_suggestions" => self.suggestion_use_case.cleanup_suggestions(arguments).await,
            "fetch_and_save_draws" => self.api_use_case.fetch_and_save_draws(arguments).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }

    fn get_tools(&self) -> Vec<Tool> {
        let weights = json!({
            "type": "object",
            "description": "Override of the configured weights",
            "properties": {
                "base_frequency": {"type": "number"},
                "recency_hot": {"type": "number"},
                "delay_cold": {"type": "number"},
                "pair_affinity": {"type": "number"}
            }
        });

        vec![
            tool(
                "list_lotteries",
                "List the configured lotteries and their rules",
                json!({
                    "type": "object",
                    "properties": {
                        "active_only": {"type": "boolean", "description": "Only active lotteries"}
                    }
                }),
            ),
            tool(
                "set_lottery_active",
                "Include or exclude a lottery from batch generation and sync",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property(),
                        "active": {"type": "boolean"}
                    },
                    "required": ["lottery", "active"]
                }),
            ),
            tool(
                "get_draw_history",
                "Get past draws of a lottery, most recent first",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property(),
                        "limit": {"type": "integer", "description": "Maximum number of draws"}
                    },
                    "required": ["lottery"]
                }),
            ),
            tool(
                "save_draw",
                "Store the official result of a draw",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property(),
                        "draw_date": {"type": "string", "description": "Date in YYYY-MM-DD format"},
                        "main_numbers": {"type": "array", "items": {"type": "integer"}},
                        "extra_numbers": {"type": "array", "items": {"type": "integer"}}
                    },
                    "required": ["lottery", "draw_date", "main_numbers"]
                }),
            ),
            tool(
                "delete_draw",
                "Delete the stored draw of a lottery for a date",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property(),
                        "draw_date": {"type": "string", "description": "Date in YYYY-MM-DD format"}
                    },
                    "required": ["lottery", "draw_date"]
                }),
            ),
            tool(
                "get_number_statistics",
                "Frequency, delay and hot/cold numbers of a lottery",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property(),
                        "limit": {"type": "integer", "description": "Hot/cold list size (default: 10)"}
                    },
                    "required": ["lottery"]
                }),
            ),
            tool(
                "next_draw_date",
                "Next draw date of a lottery after today",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property(),
                        "today": {"type": "string", "description": "Reference date in YYYY-MM-DD format"}
                    },
                    "required": ["lottery"]
                }),
            ),
            tool(
                "generate_suggestion",
                "Generate and store a suggestion for the next draw of a lottery",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property(),
                        "seed": {"type": "integer", "description": "Seed for a reproducible result"},
                        "today": {"type": "string", "description": "Reference date in YYYY-MM-DD format"},
                        "weights": weights
                    },
                    "required": ["lottery"]
                }),
            ),
            tool(
                "generate_for_all_lotteries",
                "Generate suggestions for every active lottery with enough history",
                json!({
                    "type": "object",
                    "properties": {
                        "seed": {"type": "integer"},
                        "today": {"type": "string", "description": "Reference date in YYYY-MM-DD format"},
                        "weights": weights
                    }
                }),
            ),
            tool(
                "validate_suggestions",
                "Check pending suggestions against the stored draws",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property()
                    }
                }),
            ),
            tool(
                "get_suggestions",
                "List stored suggestions, most recent draw date first",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property(),
                        "validated": {"type": "boolean", "description": "Filter on validation state"},
                        "limit": {"type": "integer"}
                    }
                }),
            ),
            tool(
                "suggestion_summary",
                "How stored suggestions performed against real draws",
                json!({
                    "type": "object",
                    "properties": {
                        "lottery": lottery_property()
                    }
                }),
            ),
            tool(
                "cleanup_suggestions",
                "Delete suggestions stored without a draw date",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            tool(
                "parse_and_insert_raw_json",
                "Parse a JSON batch of draws and insert the new ones",
                json!({
                    "type": "object",
                    "properties": {
                        "raw_json": {
                            "type": "string",
                            "description": "{\"lottery\": name, \"draws\": [{\"draw_date\", \"main_numbers\", \"extra_numbers\"}]}"
                        }
                    },
                    "required": ["raw_json"]
                }),
            ),
            tool(
                "fetch_and_save_draws",
                "Fetch recent draws from the results feed, store them and validate suggestions",
                json!({
                    "type": "object",
                    "properties": {
                        "feed_url": {"type": "string", "description": "Overrides LOTTERY_FEED_URL"}
                    }
                }),
            ),
        ]
    }
}

pub fn stdio() -> (BufReader<io::Stdin>, io::Stdout) {
    (BufReader::new(io::stdin()), io::stdout())
}

//! MCP (Model Context Protocol) Server for Revcast
//!
//! Exposes the weekly forecast pipeline to assistant clients as typed tools.
//! Tool implementations live in `revcast_core::tools` so the CLI and the
//! server share one contract.
//!
//! # Available Tools
//!
//! - `forecast_mrr` - run the full pipeline, return the SCQA report
//! - `forecast_trend` - quick trend-based forecast (no model fit)
//! - `get_latest_forecast` - read the persisted predictions table
//! - `get_feature_importance` - read the persisted importance table

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use tracing::info;

use revcast_core::tools::{self, ForecastTrendParams};
use revcast_core::{PipelineConfig, SqliteWarehouse};

fn to_result<T: serde::Serialize>(
    value: revcast_core::Result<T>,
) -> Result<CallToolResult, McpError> {
    match value {
        Ok(result) => Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&result).unwrap_or_default(),
        )])),
        Err(e) => Err(McpError::internal_error(e.to_string(), None)),
    }
}

/// Revcast MCP server state
#[derive(Clone)]
pub struct RevcastMcpServer {
    warehouse: Arc<SqliteWarehouse>,
    config: PipelineConfig,
    tool_router: ToolRouter<Self>,
}

impl RevcastMcpServer {
    pub fn new(warehouse: SqliteWarehouse, config: PipelineConfig) -> Self {
        Self {
            warehouse: Arc::new(warehouse),
            config,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for RevcastMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "revcast".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Revcast MRR Forecasting".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Revcast forecasts weekly MRR from deal-level pipeline data. Use forecast_mrr \
                 for the full weekly report (trend forecast, lever importance, prioritized \
                 actions), forecast_trend for a quick extrapolation, and the get_* tools to \
                 read the persisted outputs of the last run."
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl RevcastMcpServer {
    /// Run the full weekly pipeline and return the SCQA report
    #[tool(
        description = "Generate the weekly MRR forecast report. Auto-executes: aggregates deal data, runs the forecast and lever-importance model, persists outputs, and returns the formatted report."
    )]
    async fn forecast_mrr(&self) -> Result<CallToolResult, McpError> {
        to_result(tools::forecast_mrr(self.warehouse.as_ref(), &self.config))
    }

    /// Quick trend-based forecast
    #[tool(
        description = "Simple trend-based MRR forecast using the recent average weekly change. Optionally pass the number of weeks to forecast (default 4)."
    )]
    async fn forecast_trend(
        &self,
        Parameters(params): Parameters<ForecastTrendParams>,
    ) -> Result<CallToolResult, McpError> {
        to_result(tools::forecast_trend(
            self.warehouse.as_ref(),
            &self.config,
            params,
        ))
    }

    /// Read back the persisted predictions
    #[tool(description = "Most recent persisted MRR forecast predictions, ordered by week.")]
    async fn get_latest_forecast(&self) -> Result<CallToolResult, McpError> {
        to_result(tools::get_latest_forecast(self.warehouse.as_ref()))
    }

    /// Read back the persisted feature importances
    #[tool(
        description = "Most recent persisted feature importances - which levers drive MRR, ranked."
    )]
    async fn get_feature_importance(&self) -> Result<CallToolResult, McpError> {
        to_result(tools::get_feature_importance(self.warehouse.as_ref()))
    }
}

/// Start the MCP server on the given host/port
pub async fn start_mcp_server(
    warehouse: SqliteWarehouse,
    config: PipelineConfig,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
    use rmcp::transport::streamable_http_server::StreamableHttpService;

    info!("Starting MCP server at http://{}:{}/mcp", host, port);

    let service = StreamableHttpService::new(
        move || Ok(RevcastMcpServer::new(warehouse.clone(), config.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("MCP server ready at http://{}/mcp", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use revcast_core::{DealRecord, DealStage};

    fn seeded_server() -> RevcastMcpServer {
        let warehouse = SqliteWarehouse::ephemeral().unwrap();
        let mut deals = Vec::new();
        let first_close = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        for week in 0..8 {
            deals.push(DealRecord {
                deal_id: format!("w{}", week),
                company_name: format!("Company {}", week),
                mrr: 2_000.0 + (week % 3) as f64 * 600.0,
                stage: DealStage::ClosedWon,
                close_date: Some(first_close + chrono::Duration::weeks(week)),
                created_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                region: "EMEA".into(),
                is_at_risk: false,
                days_in_pipeline: 12,
            });
        }
        warehouse.upsert_deals(&deals).unwrap();
        RevcastMcpServer::new(warehouse, PipelineConfig::with_seed(42))
    }

    #[test]
    fn test_server_info_advertises_tools() {
        let server = seeded_server();
        let info = server.get_info();
        assert_eq!(info.server_info.name, "revcast");
        assert!(info.capabilities.tools.is_some());
    }

    /// Pull the text payload out of a tool result via its wire form
    fn payload(result: &CallToolResult) -> serde_json::Value {
        let wire = serde_json::to_value(result).unwrap();
        let text = wire["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_forecast_trend_tool_returns_points() {
        let server = seeded_server();
        let result = server
            .forecast_trend(Parameters(ForecastTrendParams { weeks: Some(3) }))
            .await
            .unwrap();
        assert_eq!(payload(&result)["points"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_forecast_mrr_tool_returns_report() {
        let server = seeded_server();
        let result = server.forecast_mrr().await.unwrap();
        assert!(payload(&result)["report_text"]
            .as_str()
            .unwrap()
            .contains("WEEKLY MRR FORECAST"));
    }
}

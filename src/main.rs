//! Task Dependency MCP Server
//!
//! Serves task storage, dependency resolution and dependency suggestions
//! to MCP clients over stdio.

use anyhow::{Result, bail};
use clap::Parser;
use rmcp::{
    ErrorData, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParams, CallToolResult, Content, InitializeResult, ListToolsResult,
        PaginatedRequestParams, ServerCapabilities,
    },
    service::RequestContext,
    transport::io::stdio,
};
use serde_json::{Value, json};
use std::fs::OpenOptions;
use std::sync::Arc;
use task_deps_mcp::cli::{Cli, Command};
use task_deps_mcp::config::{Config, ConfigLoader, ConfigPaths};
use task_deps_mcp::db::Database;
use task_deps_mcp::error::ToolError;
use task_deps_mcp::format::{OutputFormat, format_relationships_markdown, format_suggestions_markdown};
use task_deps_mcp::tools::{ToolHandler, build_engine};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// MCP server handler.
#[derive(Clone)]
struct TaskDepsServer {
    tool_handler: Arc<ToolHandler>,
}

const INSTRUCTIONS: &str = "\
Task store with dependency resolution. create() tasks with depends_on, link() more dependencies, \
then dependencies(task) to see what blocks a task and what it blocks. \
analyze_dependencies(task) adds suggested dependencies inferred from task content.";

impl ServerHandler for TaskDepsServer {
    fn get_info(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: Default::default(),
            server_info: rmcp::model::Implementation {
                name: "task-deps-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            capabilities: ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.tool_handler.get_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        let tool_name = request.name.clone();
        let start = std::time::Instant::now();

        let args = Value::Object(request.arguments.unwrap_or_default());
        match self.tool_handler.call_tool(&tool_name, args).await {
            Ok(result) => {
                debug!(
                    tool = %tool_name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                Ok(CallToolResult {
                    content: vec![Content::text(result.to_string())],
                    is_error: None,
                    meta: None,
                    structured_content: None,
                })
            }
            Err(e) => {
                let elapsed = start.elapsed();
                let tool_err = ToolError::from(e);
                warn!(
                    tool = %tool_name,
                    error_code = ?tool_err.code,
                    error_message = %tool_err.message,
                    duration_ms = elapsed.as_millis() as u64,
                    "Tool call failed"
                );
                let error_json = serde_json::to_string(&tool_err)
                    .unwrap_or_else(|_| json!({ "error": tool_err.to_string() }).to_string());
                Ok(CallToolResult {
                    content: vec![Content::text(error_json)],
                    is_error: Some(true),
                    meta: None,
                    structured_content: None,
                })
            }
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    match cli.log.as_str() {
        "0" | "off" => {}
        "1" | "stdout" => {
            if matches!(cli.command, None | Some(Command::Serve)) {
                bail!("--log stdout would corrupt the MCP stdio transport; use stderr or a file");
            }
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::load_file(ConfigPaths::discover(), path.into())?,
        None => ConfigLoader::load()?,
    };
    if let Some(path) = loader.config_path() {
        debug!(path = %path.display(), "Using config file");
    }

    let mut config = loader.into_config();
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    Ok(config)
}

fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path)?;
    info!(path = ?config.server.db_path, "Database initialized");
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    let config = load_config(&cli)?;

    match cli.command {
        Some(Command::Resolve { task, user, format }) => {
            let db = open_database(&config)?;
            let mut engine = build_engine(&db, &config);
            if let Some(user_id) = user {
                engine = engine.with_user(&user_id);
            }
            let resolution = engine.resolver().resolve_dependencies(&task)?;
            match OutputFormat::from(format) {
                OutputFormat::Markdown => {
                    print!("{}", format_relationships_markdown(resolution.relationships()))
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolution)?),
            }
        }
        Some(Command::Suggest { task, user }) => {
            let db = open_database(&config)?;
            let mut engine = build_engine(&db, &config);
            if let Some(user_id) = user {
                engine = engine.with_user(&user_id);
            }
            let suggestions = engine.suggest_dependencies(&task)?;
            print!("{}", format_suggestions_markdown(&task, &suggestions));
        }
        Some(Command::Serve) | None => run_server(config).await?,
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Task Dependency MCP Server"
    );

    let db = Arc::new(open_database(&config)?);
    let server = TaskDepsServer {
        tool_handler: Arc::new(ToolHandler::new(db, Arc::new(config))),
    };

    info!("Server ready, listening on stdio");
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}

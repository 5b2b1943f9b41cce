//! office-agent
//!
//! Answers questions about company offices and the weather there. Runs
//! either as an Axum HTTP server or as an interactive prompt; both call the
//! same `run_agent` entry point.

mod agent;
mod config;
mod handlers;
mod repl;
mod state;

use std::sync::Arc;

use axum::{routing::{get, post}, Router};
use clap::{Parser, Subcommand};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::agent::{BlockingRunner, OfficeAgent};
use crate::config::AppConfig;
use crate::handlers::{chat_handler, health_check};
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "office-agent", about = "Office information agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Address to bind, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Interactive prompt on stdin/stdout
    Chat,
    /// Answer a single question and exit
    Ask {
        prompt: String,
        #[arg(long)]
        max_steps: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve { bind: None });

    // Initialize tracing
    let default_filter = match command {
        Command::Serve { .. } => "info,tower_http=debug",
        Command::Chat | Command::Ask { .. } => "warn",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::from_env();
    let agent = OfficeAgent::from_env(&config)?;

    match command {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or(config.bind_addr);
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(serve(agent, &addr))
        }
        Command::Chat => {
            let runner = BlockingRunner::new(agent)?;
            println!("Office agent ready. Type 'exit' to quit.");
            repl::run(std::io::stdin().lock(), std::io::stdout(), |prompt| {
                runner.run_agent(prompt, None)
            })?;
            Ok(())
        }
        Command::Ask { prompt, max_steps } => {
            let runner = BlockingRunner::new(agent)?;
            println!("{}", runner.run_agent(&prompt, max_steps));
            Ok(())
        }
    }
}

pub(crate) fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve(agent: OfficeAgent, addr: &str) -> anyhow::Result<()> {
    let provider = agent.inner().provider().clone();

    // Verify model backend
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to {}", provider.name()),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not available - runs will fail until it is", provider.name());
        }
    }

    tracing::info!("Registered {} tools:", agent.inner().tools().len());
    for name in agent.inner().tools().names() {
        tracing::info!("  • {}", name);
    }

    let app = router(AppState {
        agent: Arc::new(agent),
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("office-agent running on http://{}", addr);
    tracing::info!("  GET  /health   - Health check");
    tracing::info!("  POST /api/chat - Ask the agent");

    axum::serve(listener, app).await?;

    Ok(())
}

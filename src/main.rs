use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::StreamExt;
use intent_runtime::agent::{IntentPipeline, QueryPipeline, ToolAgent, standard_registry};
use intent_runtime::backend::DataServiceClient;
use intent_runtime::config::Settings;
use intent_runtime::context::UserRequest;
use intent_runtime::faq::{FaqAnswerer, FaqCorpus, LlmFaqAnswerer};
use intent_runtime::model::{LanguageModel, OpenAiCompatibleModel};
use intent_runtime::protocol::LlmPlanner;
use intent_runtime::tools::{QueryTicketTimeTool, ToolCatalog, UpdateTicketTimeTool};
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

/// Plan and execute ticketing requests written in natural language.
#[derive(Parser, Debug)]
#[command(name = "intent-runtime", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan an action from text, validate it and run it
    Plan {
        #[arg(short, long)]
        text: String,
        #[arg(short, long)]
        user_id: Option<i64>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        voice: Option<String>,
    },
    /// Let the model extract arguments and call ticket tools itself
    Agent {
        #[arg(short, long)]
        question: String,
    },
    /// Answer a question from the FAQ corpus
    Faq {
        #[arg(short, long)]
        question: String,
        /// Print chunks as they arrive
        #[arg(long)]
        stream: bool,
    },
    /// Free-form question with keyword data prefetch
    Query {
        #[arg(short, long)]
        text: String,
        #[arg(short, long)]
        user_id: Option<i64>,
        /// Model name reported back in the answer
        #[arg(long)]
        model: Option<String>,
    },
}

struct Runtime {
    settings: Settings,
    model: Arc<dyn LanguageModel>,
    data: Arc<DataServiceClient>,
    faq: Arc<LlmFaqAnswerer>,
}

impl Runtime {
    fn new(settings: Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAiCompatibleModel::from_settings(&settings)?);
        let data = Arc::new(DataServiceClient::from_settings(&settings)?);
        let corpus = Arc::new(FaqCorpus::from_path(settings.faq_data_path.clone()));
        let faq = Arc::new(LlmFaqAnswerer::new(model.clone(), corpus));
        Ok(Self {
            settings,
            model,
            data,
            faq,
        })
    }

    fn tool_agent(&self) -> ToolAgent {
        let url = &self.settings.data_service_url;
        let timeout = self.settings.http_timeout;
        let catalog = ToolCatalog::new()
            .register_tool(UpdateTicketTimeTool::new(url, timeout))
            .register_tool(QueryTicketTimeTool::new(url, timeout));
        ToolAgent::new(self.model.clone(), catalog)
    }

    fn intent_pipeline(&self) -> IntentPipeline {
        let registry = standard_registry(
            self.data.clone(),
            self.data.clone(),
            self.faq.clone(),
            Arc::new(self.tool_agent()),
        );
        IntentPipeline::new(Arc::new(LlmPlanner::new(self.model.clone())), registry)
    }
}

fn print_json<T: Serialize>(title: &str, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", format!("--- {title} ---").bold().cyan());
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, runtime: Runtime) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Plan {
            text,
            user_id,
            image,
            voice,
        } => {
            let request = UserRequest {
                user_id,
                text,
                image,
                voice,
                model: None,
            };
            let envelope = runtime.intent_pipeline().handle(&request).await?;
            let title = if envelope.needs_clarification {
                "CLARIFICATION".yellow()
            } else if envelope.error.is_some() {
                "ERROR".red()
            } else {
                "RESULT".green()
            };
            println!("{}", title.bold());
            print_json("ENVELOPE", &envelope)?;
        }
        Command::Agent { question } => {
            let outcome = runtime.tool_agent().run(&question).await?;
            print_json("AGENT", &outcome)?;
        }
        Command::Faq { question, stream } => {
            if stream {
                let mut chunks = runtime.faq.answer_stream(&question).await;
                let mut stdout = std::io::stdout();
                while let Some(chunk) = chunks.next().await {
                    write!(stdout, "{}", chunk?)?;
                    stdout.flush()?;
                }
                println!();
            } else {
                let answer = runtime.faq.answer(&question).await?;
                print_json("FAQ", &answer)?;
            }
        }
        Command::Query {
            text,
            user_id,
            model,
        } => {
            let request = UserRequest {
                user_id,
                text,
                model,
                ..UserRequest::default()
            };
            let pipeline = QueryPipeline::new(runtime.model.clone(), runtime.data.clone(), runtime.data.clone());
            let answer = pipeline.answer(&request).await?;
            print_json("QUERY", &answer)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intent_runtime=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match Runtime::new(Settings::from_env()) {
        Ok(runtime) => run(cli, runtime).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "request failed");
            eprintln!("{} {err}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

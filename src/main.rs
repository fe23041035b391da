use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use datainsight::{
    config::Config,
    conversation::{ConversationEngine, Message},
    gateway::{Gateway, HttpGateway},
    insights::{present, ExpandedSections},
    models::UploadFile,
    session::{SessionController, UploadOutcome},
    utils::{init_file_logger, init_stderr_logger},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Terminal client for the DataInsight AI data analysis service.
#[derive(Parser, Debug)]
#[command(name = "datainsight", version, about)]
struct Cli {
    /// Backend base URL (overrides DATAINSIGHT_API_URL / API_URL).
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal UI (default).
    Tui {
        /// Upload this file on startup.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Upload a file, print its insights and answer questions about it.
    Ask {
        file: PathBuf,
        #[arg(required = true)]
        questions: Vec<String>,
    },
    /// List datasets held by the backend.
    Datasets,
    /// Delete a dataset from the backend.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url)?;
    }

    let gateway = Arc::new(HttpGateway::new(&config.api.base_url));

    match cli.command.unwrap_or(Command::Tui { file: None }) {
        Command::Tui { file } => {
            let _guard = init_file_logger(&config.log.dir, &config.log.filter)?;
            datainsight::tui::run(config, gateway, file).await
        }
        Command::Ask { file, questions } => {
            init_stderr_logger(&config.log.filter);
            ask(&config, gateway.as_ref(), file, &questions).await
        }
        Command::Datasets => {
            init_stderr_logger(&config.log.filter);
            list_datasets(gateway.as_ref()).await
        }
        Command::Delete { id } => {
            init_stderr_logger(&config.log.filter);
            let ack = gateway.teardown(&id).await?;
            println!("{}", ack.message);
            Ok(())
        }
    }
}

async fn ask(
    config: &Config,
    gateway: &dyn Gateway,
    path: PathBuf,
    questions: &[String],
) -> anyhow::Result<()> {
    let file = UploadFile::from_path(&path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;

    let mut session = SessionController::new();
    let mut conversation = ConversationEngine::new();

    let dataset = match session.start(gateway, file, &mut conversation).await {
        UploadOutcome::Installed(dataset) => dataset,
        UploadOutcome::Failed(message) => bail!("Upload failed: {}", message),
        other => bail!("Upload did not complete: {:?}", other),
    };

    println!("{} ({})", dataset.filename, dataset.id);
    if let Some(snapshot) = session.insights() {
        for section in present(snapshot, &ExpandedSections::new()) {
            println!("\n== {} ==", section.title);
            if let Some(body) = section.body {
                println!("{}", body.summary());
            }
        }
    }

    for question in questions {
        println!("\n> {}", question);
        if conversation.submit(gateway, &dataset.id, question).await.is_none() {
            warn!("Skipped blank question");
            continue;
        }
        if let Some(reply) = conversation.messages().last() {
            print_reply(reply);
        }
    }

    if config.session.teardown_on_reset {
        if let Some(dropped) = session.reset(&mut conversation) {
            match gateway.teardown(&dropped.id).await {
                Ok(_) => info!("Dataset {} deleted", dropped.id),
                Err(e) => warn!("Could not delete dataset {}: {}", dropped.id, e),
            }
        }
    }

    Ok(())
}

fn print_reply(reply: &Message) {
    println!("{}", reply.text);
    if let Some(detail) = &reply.error_detail {
        println!("  ({})", detail);
    }
    if let Some(answer) = &reply.structured_answer {
        println!("{}", answer.preview());
    }
    if let Some(code) = &reply.generated_code {
        println!("```python\n{}\n```", code);
    }
}

async fn list_datasets(gateway: &dyn Gateway) -> anyhow::Result<()> {
    let datasets = gateway.list_datasets().await?;
    if datasets.is_empty() {
        println!("No datasets");
        return Ok(());
    }

    for dataset in datasets {
        let shape = match (dataset.rows(), dataset.columns()) {
            (Some(rows), Some(columns)) => format!("{} x {}", rows, columns),
            _ => "N/A".to_string(),
        };
        println!(
            "{}\t{}\t{}\t{}",
            dataset.id,
            dataset.filename,
            shape,
            dataset.uploaded_at.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use url::Url;

use orbit_core::actions::ActionKind;
use orbit_core::context::{ViewHandle, WebView};
use orbit_core::events::BridgeEvent;
use orbit_core::messages::Role;
use orbit_core::state::SessionState;
use orbit_llm::OllamaClient;
use orbit_sidecar::{
    EventBus, MenuActionDispatcher, SessionController, SidecarSettings, StaticPage,
    StaticPageProvider,
};
use orbit_telemetry::{init_telemetry, parse_level, LogFormat, TelemetryConfig};

#[derive(Parser)]
#[command(name = "orbit", about = "Ask a local model about a web page")]
struct Cli {
    /// JSON settings file, merged over the defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL.
    #[arg(long, global = true)]
    ollama_url: Option<String>,
    #[arg(long, global = true)]
    model: Option<String>,
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the backend and list installed models.
    Models,
    /// Ask a free-form question about the page.
    Ask {
        question: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Summarize the page content.
    Summarize {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Explain the selected text.
    Explain {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Run a context-menu action against the selection.
    Action {
        #[arg(value_parser = ["explain", "define", "translate", "summarize", "ask"])]
        kind: String,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Args)]
struct PageArgs {
    #[arg(long)]
    url: Option<Url>,
    #[arg(long)]
    title: Option<String>,
    /// Page text read from a file.
    #[arg(long, conflicts_with = "content")]
    content_file: Option<PathBuf>,
    /// Page text given inline.
    #[arg(long)]
    content: Option<String>,
    /// Text currently selected on the page.
    #[arg(long)]
    selection: Option<String>,
}

struct Sidecar {
    bus: Arc<EventBus>,
    provider: Arc<StaticPageProvider>,
    controller: SessionController,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = SidecarSettings::load(cli.config.as_deref())
        .context("failed to load settings")?;
    if let Some(url) = cli.ollama_url {
        settings.backend.base_url = url;
    }
    if let Some(model) = cli.model {
        settings.model = model;
    }
    if cli.log_json {
        settings.logging.json = true;
    }

    let _telemetry = init_telemetry(&TelemetryConfig {
        log_level: parse_level(&settings.logging.level).unwrap_or(tracing::Level::INFO),
        format: if settings.logging.json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        },
        ..TelemetryConfig::default()
    });

    let backend = Arc::new(OllamaClient::new(settings.ollama_config())?);
    let bus = Arc::new(EventBus::new());
    let provider = Arc::new(StaticPageProvider::new());
    let controller = SessionController::new(
        Arc::clone(&bus),
        provider.clone(),
        backend,
        settings.model.clone(),
    );
    controller.settle().await;
    let sidecar = Sidecar {
        bus,
        provider,
        controller,
    };

    match cli.command {
        Command::Models => print_models(&sidecar.controller.snapshot()),
        Command::Ask { question, page } => {
            let _page = sidecar.open(&page).await?;
            sidecar.controller.set_input(question);
            sidecar.controller.send_message().await;
            print_reply(&sidecar.controller.snapshot())
        }
        Command::Summarize { page } => {
            let _page = sidecar.open(&page).await?;
            sidecar.controller.summarize_page().await;
            print_reply(&sidecar.controller.snapshot())
        }
        Command::Explain { page } => {
            let _page = sidecar.open(&page).await?;
            sidecar.controller.explain_selection().await;
            print_reply(&sidecar.controller.snapshot())
        }
        Command::Action { kind, page } => {
            let view = sidecar.open(&page).await?;
            let kind: ActionKind = kind.parse().unwrap_or_default();
            let dispatcher =
                MenuActionDispatcher::new(Arc::clone(&sidecar.bus), sidecar.provider.clone());
            dispatcher.invoke(&ViewHandle::new(&view), kind).await?;
            sidecar.controller.settle().await;
            print_reply(&sidecar.controller.snapshot())
        }
    }
}

impl Sidecar {
    /// Build a page from the flags, attach it and wait for the first context refresh.
    async fn open(&self, args: &PageArgs) -> anyhow::Result<Arc<StaticPage>> {
        let page = StaticPage::new(args.url.clone(), args.title.clone());
        let content = match (&args.content_file, &args.content) {
            (Some(path), _) => Some(
                tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
            ),
            (None, content) => content.clone(),
        };
        if let Some(content) = content {
            self.provider.set_content(page.id(), content);
        }
        if let Some(selection) = &args.selection {
            self.provider.set_selection(page.id(), Some(selection));
        }

        self.controller.attach(ViewHandle::new(&page));
        if let Some(selection) = &args.selection {
            self.bus
                .publish(&BridgeEvent::selection_changed(page.id().clone(), selection.as_str()));
        }
        self.controller.settle().await;
        Ok(page)
    }
}

fn print_models(state: &SessionState) -> anyhow::Result<()> {
    if !state.is_connected {
        bail!("backend is not reachable");
    }
    if let Some(error) = &state.last_error {
        bail!("{error}");
    }
    for model in &state.available_models {
        let marker = if *model == state.selected_model { "*" } else { " " };
        println!("{marker} {model}");
    }
    Ok(())
}

fn print_reply(state: &SessionState) -> anyhow::Result<()> {
    if let Some(error) = &state.last_error {
        bail!("{error}");
    }
    match state.last_message() {
        Some(message) if message.role() == Role::Assistant => {
            println!("{}", message.content());
            Ok(())
        }
        _ => bail!("no reply"),
    }
}

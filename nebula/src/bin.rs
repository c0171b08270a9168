//! The `nebula` command-line front end: a thin dispatcher over the `nebula` library's
//! `Client` wiring. Every subcommand that touches a component or a citation takes and
//! prints the component tree's own canonical JSON — the document-language's bytes-level
//! syntax is out of scope (spec.md §1), so this is the closest thing to a REPL over the
//! Client API a standalone binary can offer without a real parser.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nebula::{build_client, default_key_path, default_repository_root, load_or_generate_notary};
use nebula_lang::Component;
use nebula_remote::{build_router, AppState};
use nebula_vers::{Citation, Tag};

#[derive(Parser, Debug)]
#[clap(
    name = "nebula",
    version,
    about = "A content-addressed, notarized document repository.",
    long_about = "Notarize, commit, checkout, and exchange documents through a local \
                   filesystem repository or a remote Nebula HTTP service."
)]
struct Cli {
    /// Repository root for the local filesystem binding; ignored when `--remote` is set.
    /// Defaults to `<home>/.bali`.
    #[clap(long, global = true)]
    root: Option<PathBuf>,

    /// Base URL of a remote Nebula service to bind against instead of the local filesystem.
    #[clap(long, global = true)]
    remote: Option<String>,

    /// Path to this identity's notary key file; generated on first use.
    #[clap(long, global = true)]
    key: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print this identity's self-signed certificate citation.
    Identity,

    /// Commit this identity's own bootstrap certificate, so peers can resolve its chain.
    CommitCertificate,

    /// Sign and store a draft component under a fresh citation.
    SaveDraft {
        /// Canonical JSON for the component to save, e.g. `{"Catalog":{...}}`.
        component: String,
    },

    /// Fetch, validate, and print a draft.
    RetrieveDraft {
        /// Canonical JSON for the draft's citation.
        citation: String,
    },

    /// Discard a draft; absent is success.
    DiscardDraft {
        /// Canonical JSON for the draft's citation.
        citation: String,
    },

    /// Sign and commit a draft as an immutable document.
    CommitDocument {
        /// Canonical JSON for the component to commit.
        component: String,
    },

    /// Fetch, validate, and print a committed document.
    RetrieveDocument {
        /// Canonical JSON for the document's citation.
        citation: String,
    },

    /// Fetch, validate, and print a stored certificate.
    RetrieveCertificate {
        /// Canonical JSON for the certificate's citation.
        citation: String,
    },

    /// Check out a new draft from a committed document.
    Checkout {
        /// Canonical JSON for the committed document's citation.
        citation: String,
        /// Version level to increment: 0 = last component (default), 1 = first, etc.
        #[clap(long)]
        level: Option<usize>,
    },

    /// Sign and enqueue a message onto a named queue.
    QueueMessage {
        /// The queue identifier.
        queue: String,
        /// Canonical JSON for the message component.
        component: String,
    },

    /// Dequeue and validate the next message on a named queue, if any.
    ReceiveMessage {
        /// The queue identifier.
        queue: String,
    },

    /// Sign and publish an event onto the well-known event queue.
    PublishEvent {
        /// Canonical JSON for the event component.
        component: String,
    },

    /// Sign and send a targeted message onto the well-known send queue.
    SendMessage {
        /// The recipient account tag.
        target: String,
        /// Canonical JSON for the message component.
        component: String,
    },

    /// Run the HTTP service, delegating to a local filesystem repository.
    Serve {
        /// Address to bind the HTTP listener to.
        #[clap(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    nebula_base::init_logging();
    let cli = Cli::parse();

    let root = cli.root.clone().unwrap_or_else(default_repository_root);
    let key_path = cli.key.clone().unwrap_or_else(|| default_key_path(&root));
    let notary = Arc::new(load_or_generate_notary(&key_path)?);

    match cli.command {
        Commands::Serve { bind } => {
            anyhow::ensure!(cli.remote.is_none(), "`serve` always runs a local binding; drop --remote");
            let repository = Arc::new(nebula_local::LocalRepository::new(root));
            let app = build_router(AppState::new(repository, notary.clone()));
            let listener = tokio::net::TcpListener::bind(bind).await.context("bind HTTP listener")?;
            tracing::info!(%bind, "nebula service listening");
            axum::serve(listener, app).await.context("serve HTTP requests")?;
            return Ok(());
        }
        Commands::CommitCertificate => {
            let client = build_client(notary.clone(), &root, cli.remote.as_deref());
            let citation = client.commit_certificate((*notary.certificate()).clone()).await?;
            print_citation(&citation);
        }
        command => {
            let client = build_client(notary, &root, cli.remote.as_deref());
            run(&client, command).await?;
        }
    }
    Ok(())
}

async fn run(client: &nebula_client::Client, command: Commands) -> Result<()> {
    match command {
        Commands::Identity => {
            print_citation(&client.get_citation());
        }
        Commands::SaveDraft { component } => {
            let component = parse_component(&component)?;
            let citation = client.save_draft(component).await?;
            print_citation(&citation);
        }
        Commands::RetrieveDraft { citation } => {
            let citation = parse_citation(&citation)?;
            match client.retrieve_draft(&citation).await? {
                Some(component) => println!("{}", to_json(&component)),
                None => println!("null"),
            }
        }
        Commands::DiscardDraft { citation } => {
            let citation = parse_citation(&citation)?;
            client.discard_draft(&citation).await?;
        }
        Commands::CommitDocument { component } => {
            let component = parse_component(&component)?;
            let citation = client.commit_document(component).await?;
            print_citation(&citation);
        }
        Commands::RetrieveDocument { citation } => {
            let citation = parse_citation(&citation)?;
            match client.retrieve_document(&citation).await? {
                Some(component) => println!("{}", to_json(&component)),
                None => println!("null"),
            }
        }
        Commands::RetrieveCertificate { citation } => {
            let citation = parse_citation(&citation)?;
            match client.retrieve_certificate(&citation).await? {
                Some(component) => println!("{}", to_json(&component)),
                None => println!("null"),
            }
        }
        Commands::Checkout { citation, level } => {
            let citation = parse_citation(&citation)?;
            let draft_citation = client.checkout_document(&citation, level).await?;
            print_citation(&draft_citation);
        }
        Commands::QueueMessage { queue, component } => {
            let component = parse_component(&component)?;
            client.queue_message(&queue, component).await?;
        }
        Commands::ReceiveMessage { queue } => {
            match client.receive_message(&queue).await? {
                Some(component) => println!("{}", to_json(&component)),
                None => println!("null"),
            }
        }
        Commands::PublishEvent { component } => {
            let component = parse_component(&component)?;
            client.publish_event(component).await?;
        }
        Commands::SendMessage { target, component } => {
            let component = parse_component(&component)?;
            client.send_message(Tag::from_canonical(target), component).await?;
        }
        Commands::Serve { .. } | Commands::CommitCertificate => unreachable!("handled before a Client is built"),
    }
    Ok(())
}

fn parse_component(raw: &str) -> Result<Component> {
    Component::parse_canonical(raw.as_bytes()).context("parse component JSON")
}

fn parse_citation(raw: &str) -> Result<Citation> {
    serde_json::from_str(raw).context("parse citation JSON")
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("component/citation serialization is infallible")
}

fn print_citation(citation: &Citation) {
    println!("{}", to_json(citation));
}

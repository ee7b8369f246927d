mod display;
mod prompt;
mod token;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use qmsdesk_api::{ApiClient, ApiError};
use qmsdesk_core::{CatalogDraft, ChatFilters, UploadFile, UploadMetadata, WorkflowStatus};
use qmsdesk_flows::chat::default_session_name;
use qmsdesk_flows::{
    BoardFilter, BoardOrder, ChatController, ChatPhase, Compensation, DropOutcome, FlowError,
    Notification, Workspace,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::display::{
    print_lines, render_column, render_document_card, render_document_types,
    render_indexed, render_interest_groups, render_message, render_models, render_sessions,
    render_users,
};
use crate::token::TokenStore;

const LOGIN_HINT: &str = "Sitzung abgelaufen. Bitte mit `qmsdesk login` erneut anmelden.";
const LOGIN_FAILED: &str = "Anmeldung fehlgeschlagen: Benutzername oder Passwort falsch.";

#[derive(Parser)]
#[command(name = "qmsdesk", version)]
#[command(about = "Document workflow, uploads and RAG chat for the QMS backend")]
struct Cli {
    /// Base URL of the QMS API.
    #[arg(long, global = true, env = "QMSDESK_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Bearer token; takes precedence over the token file.
    #[arg(long, global = true, env = "QMSDESK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Where `login` stores the session token.
    #[arg(long, global = true, env = "QMSDESK_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session token.
    Login {
        #[arg(long, short)]
        username: String,
        #[arg(long, env = "QMSDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session token.
    Logout,
    Whoami,
    /// Show the workflow board, one column per status.
    Board {
        #[arg(long, default_value = "")]
        search: String,
        /// Only documents of this document type id.
        #[arg(long = "type")]
        document_type: Option<i64>,
        #[arg(long)]
        by_chapter: bool,
    },
    /// Move a document to another workflow status.
    Move {
        id: i64,
        /// draft, reviewed, approved, rejected (or the German label).
        status: WorkflowStatus,
        #[arg(long, short)]
        yes: bool,
    },
    Delete {
        id: i64,
        #[arg(long, short)]
        yes: bool,
    },
    /// Upload a file, generate its preview and assign interest groups.
    Upload {
        file: PathBuf,
        #[arg(long = "type")]
        document_type: i64,
        #[arg(long)]
        chapter: String,
        #[arg(long)]
        version: String,
        /// Interest group id; repeat for several groups.
        #[arg(long = "group")]
        groups: Vec<i64>,
        /// Override the MIME type guessed from the file extension.
        #[arg(long)]
        mime: Option<String>,
    },
    /// Document types.
    Types {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Interest groups.
    Groups {
        #[command(subcommand)]
        action: CatalogAction,
    },
    Users,
    Models,
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    Rag {
        #[command(subcommand)]
        action: RagAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    List,
    Create {
        name: String,
        code: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        id: i64,
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    Sessions,
    /// Create a session (default name: "Chat <today>").
    New { name: Option<String> },
    Delete {
        id: i64,
        #[arg(long, short)]
        yes: bool,
    },
    History { id: i64 },
    /// Ask one question.
    Ask {
        question: String,
        /// Session to ask in; defaults to the most recent one.
        #[arg(long)]
        session: Option<i64>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Interactive chat; `/quit` leaves.
    Repl {
        #[arg(long)]
        session: Option<i64>,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only answer from this document type id.
    #[arg(long = "type")]
    document_type: Option<i64>,
    #[arg(long)]
    chapter: Option<String>,
    #[arg(long)]
    approved_only: bool,
}

impl From<FilterArgs> for ChatFilters {
    fn from(args: FilterArgs) -> Self {
        ChatFilters {
            document_type_id: args.document_type,
            qm_chapter: args
                .chapter
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            approved_only: args.approved_only,
        }
    }
}

#[derive(Subcommand)]
enum RagAction {
    /// Documents currently in the retrieval index.
    Indexed,
    Index { id: i64 },
    Reindex { id: i64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = cli
        .token_file
        .clone()
        .or_else(TokenStore::default_path)
        .map(TokenStore::new);

    match run(cli, store.as_ref()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_unauthorized(&err) => {
            if let Some(store) = &store
                && let Err(e) = store.clear()
            {
                warn!(error = %e, "could not remove stale token");
            }
            eprintln!("{LOGIN_HINT}");
            ExitCode::from(2)
        }
        Err(err) => {
            debug!(error = ?err, "command failed");
            eprintln!("Fehler: {}", user_message(&err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<FlowError>()
            .is_some_and(FlowError::is_unauthorized)
            || cause
                .downcast_ref::<ApiError>()
                .is_some_and(ApiError::is_unauthorized)
    })
}

fn user_message(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| {
            cause
                .downcast_ref::<FlowError>()
                .map(FlowError::user_message)
                .or_else(|| cause.downcast_ref::<ApiError>().map(ApiError::user_message))
        })
        .unwrap_or_else(|| format!("{err:#}"))
}

async fn run(cli: Cli, store: Option<&TokenStore>) -> anyhow::Result<()> {
    let token = match cli.token {
        Some(token) => Some(token),
        None => match store {
            Some(store) => store.load()?,
            None => None,
        },
    };
    let mut client = ApiClient::new(cli.api_url);
    if let Some(token) = token {
        client = client.with_token(token);
    }
    info!(api_url = client.base_url(), authenticated = client.has_token(), "starting");
    let ws = Workspace::new(Arc::new(client));

    match cli.command {
        Command::Login { username, password } => login(&ws, store, &username, password).await,
        Command::Logout => {
            if let Some(store) = store {
                store.clear()?;
            }
            println!("Abgemeldet.");
            Ok(())
        }
        Command::Whoami => whoami(ws).await,
        Command::Board {
            search,
            document_type,
            by_chapter,
        } => {
            let filter = BoardFilter {
                search,
                document_type_id: document_type,
                order: if by_chapter {
                    BoardOrder::Chapter
                } else {
                    BoardOrder::Server
                },
            };
            show_board(&ws, &filter).await
        }
        Command::Move { id, status, yes } => move_document(&ws, id, status, yes).await,
        Command::Delete { id, yes } => delete_document(&ws, id, yes).await,
        Command::Upload {
            file,
            document_type,
            chapter,
            version,
            groups,
            mime,
        } => {
            let metadata = UploadMetadata {
                document_type_id: document_type,
                qm_chapter: chapter,
                version,
                interest_group_ids: groups,
            };
            upload(&ws, file, mime, metadata).await
        }
        Command::Types { action } => document_types(&ws, action).await,
        Command::Groups { action } => interest_groups(&ws, action).await,
        Command::Users => {
            print_lines(&render_users(&ws.backend().list_users().await?));
            Ok(())
        }
        Command::Models => {
            print_lines(&render_models(&ws.backend().list_ai_models().await?));
            Ok(())
        }
        Command::Chat { action } => chat(&ws, action).await,
        Command::Rag { action } => rag(&ws, action).await,
    }
}

// ── Session ──

async fn login(
    ws: &Workspace<ApiClient>,
    store: Option<&TokenStore>,
    username: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let Some(store) = store else {
        bail!("no config directory; pass --token-file");
    };
    let password = match password {
        Some(p) => p,
        None => prompt::read_line("Passwort: ")?.context("no password given")?,
    };
    let resp = ws
        .backend()
        .login(username, &password)
        .await
        .map_err(login_error)?;
    store.save(&resp.access_token)?;

    let client = ApiClient::new(ws.backend().base_url()).with_token(resp.access_token);
    let user = client.current_user().await?;
    println!("Angemeldet als {} <{}>.", user.full_name, user.email);
    Ok(())
}

/// Rejected credentials are not an expired session: keep the stored token
/// and report the failed sign-in instead of the re-login hint.
fn login_error(err: ApiError) -> anyhow::Error {
    if err.is_unauthorized() {
        anyhow::anyhow!(LOGIN_FAILED)
    } else {
        err.into()
    }
}

async fn whoami(ws: Workspace<ApiClient>) -> anyhow::Result<()> {
    let user = ws.backend().current_user().await?;
    let ws = ws.with_user(user);
    if let Some(user) = ws.current_user() {
        println!("{} <{}>", user.full_name, user.email);
        if let Some(unit) = &user.organizational_unit {
            println!("Organisationseinheit: {unit}");
        }
    }
    Ok(())
}

// ── Board ──

async fn type_names(ws: &Workspace<ApiClient>) -> HashMap<i64, String> {
    match ws.catalog().document_type_names().await {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "document types unavailable, showing ids only");
            HashMap::new()
        }
    }
}

async fn show_board(ws: &Workspace<ApiClient>, filter: &BoardFilter) -> anyhow::Result<()> {
    let mut board = ws.board();
    let names = type_names(ws).await;
    board.load().await?;

    for status in WorkflowStatus::ALL {
        print_lines(&render_column(status, &board.visible(status, filter), &names));
        println!();
    }
    Ok(())
}

async fn move_document(
    ws: &Workspace<ApiClient>,
    id: i64,
    status: WorkflowStatus,
    yes: bool,
) -> anyhow::Result<()> {
    let mut board = ws.board();
    board.load().await?;

    match board.request_transition(id, status)? {
        DropOutcome::ConfirmationRequired(pending) => {
            if !prompt::confirm(&pending.prompt(), yes)? {
                board.cancel();
                println!("Abgebrochen.");
                return Ok(());
            }
            let done = board.confirm().await?;
            println!(
                "Dokument #{} ist jetzt \"{}\" (vorher \"{}\").",
                done.document_id,
                done.to.label(),
                done.from.label()
            );
            if let Some(reload_error) = board.error() {
                eprintln!("{reload_error}");
            }
        }
        DropOutcome::SameBucket => {
            println!("Dokument #{id} ist bereits \"{}\".", status.label());
        }
        DropOutcome::NotDragging => {}
    }
    Ok(())
}

async fn delete_document(ws: &Workspace<ApiClient>, id: i64, yes: bool) -> anyhow::Result<()> {
    let mut board = ws.board();
    board.load().await?;

    let pending = board.request_delete(id)?;
    if !prompt::confirm(&pending.prompt(), yes)? {
        board.cancel_delete();
        println!("Abgebrochen.");
        return Ok(());
    }
    let done = board.confirm_delete().await?;
    println!("Dokument \"{}\" gelöscht.", done.document_name);
    if let Some(reload_error) = board.error() {
        eprintln!("{reload_error}");
    }
    Ok(())
}

// ── Upload ──

async fn upload(
    ws: &Workspace<ApiClient>,
    path: PathBuf,
    mime: Option<String>,
    metadata: UploadMetadata,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mime_type = mime.unwrap_or_else(|| {
        mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = UploadFile {
        file_name,
        mime_type,
        bytes,
    };

    match ws.uploader().run(&file, &metadata).await {
        Ok(document) => {
            println!("Dokument hochgeladen:");
            print_lines(&render_document_card(&document));
            Ok(())
        }
        Err(FlowError::Upload(e)) => {
            match e.compensation {
                Compensation::NotNeeded => {}
                Compensation::Deleted { document_id } => {
                    eprintln!("Das unvollständige Dokument #{document_id} wurde wieder entfernt.");
                }
                Compensation::Failed { document_id } => {
                    eprintln!(
                        "Dokument #{document_id} konnte nicht entfernt werden und muss manuell gelöscht werden."
                    );
                }
            }
            Err(FlowError::Upload(e).into())
        }
        Err(e) => Err(e.into()),
    }
}

// ── Catalog ──

async fn document_types(ws: &Workspace<ApiClient>, action: CatalogAction) -> anyhow::Result<()> {
    let catalog = ws.catalog();
    match action {
        CatalogAction::List => print_lines(&render_document_types(&catalog.document_types().await?)),
        CatalogAction::Create {
            name,
            code,
            description,
        } => {
            let draft = CatalogDraft::new(&name, &code, description.as_deref());
            let created = catalog.create_document_type(&draft).await?;
            println!("Dokumenttyp #{} \"{}\" angelegt.", created.id, created.name);
        }
        CatalogAction::Delete { id, yes } => {
            if prompt::confirm(&format!("Dokumenttyp #{id} löschen?"), yes)? {
                catalog.delete_document_type(id).await?;
                println!("Dokumenttyp #{id} gelöscht.");
            }
        }
    }
    Ok(())
}

async fn interest_groups(ws: &Workspace<ApiClient>, action: CatalogAction) -> anyhow::Result<()> {
    let catalog = ws.catalog();
    match action {
        CatalogAction::List => {
            print_lines(&render_interest_groups(&catalog.interest_groups().await?))
        }
        CatalogAction::Create {
            name,
            code,
            description,
        } => {
            let draft = CatalogDraft::new(&name, &code, description.as_deref());
            let created = catalog.create_interest_group(&draft).await?;
            println!("Interessengruppe #{} \"{}\" angelegt.", created.id, created.name);
        }
        CatalogAction::Delete { id, yes } => {
            if prompt::confirm(&format!("Interessengruppe #{id} löschen?"), yes)? {
                catalog.delete_interest_group(id).await?;
                println!("Interessengruppe #{id} gelöscht.");
            }
        }
    }
    Ok(())
}

// ── Chat ──

fn print_notifications(chat: &mut ChatController<ApiClient>) {
    for note in chat.take_notifications() {
        match note {
            Notification::Info(text) => println!("{text}"),
            Notification::Error(text) => eprintln!("Fehler: {text}"),
        }
    }
}

/// Select `session`, or fall back to the first (possibly newly created) one.
async fn open_session(
    chat: &mut ChatController<ApiClient>,
    session: Option<i64>,
) -> anyhow::Result<()> {
    match session {
        Some(id) => {
            chat.refresh_sessions().await?;
            chat.select_session(id).await?;
        }
        None => chat.initialize().await?,
    }
    Ok(())
}

/// Send the current input and print the reply. The fallback reply is
/// printed when the question failed.
async fn ask_and_print(chat: &mut ChatController<ApiClient>) -> Result<(), FlowError> {
    let outcome = chat.submit().await.map(render_message);
    match outcome {
        Ok(lines) => print_lines(&lines),
        Err(e) => {
            if chat.phase() == ChatPhase::Error
                && let Some(fallback) = chat.messages().last()
            {
                print_lines(&render_message(fallback));
            }
            return Err(e);
        }
    }
    Ok(())
}

async fn chat(ws: &Workspace<ApiClient>, action: ChatAction) -> anyhow::Result<()> {
    let mut chat = ws.chat();
    match action {
        ChatAction::Sessions => {
            chat.refresh_sessions().await?;
            print_lines(&render_sessions(chat.sessions(), None));
        }
        ChatAction::New { name } => {
            let name = name.unwrap_or_else(|| {
                default_session_name(chrono::Local::now().date_naive())
            });
            let session = chat.create_session(&name).await?;
            println!("Chat-Sitzung #{} \"{}\" angelegt.", session.id, session.session_name);
        }
        ChatAction::Delete { id, yes } => {
            if prompt::confirm(&format!("Chat-Sitzung #{id} löschen?"), yes)? {
                chat.delete_session(id).await?;
                print_notifications(&mut chat);
            }
        }
        ChatAction::History { id } => {
            open_session(&mut chat, Some(id)).await?;
            print_lines(&render_sessions(chat.sessions(), Some(id)));
            println!();
            for msg in chat.messages() {
                print_lines(&render_message(msg));
            }
        }
        ChatAction::Ask {
            question,
            session,
            filters,
        } => {
            open_session(&mut chat, session).await?;
            chat.set_filters(filters.into());
            chat.set_input(question);
            let result = ask_and_print(&mut chat).await;
            // The error itself is reported by main.
            chat.take_notifications();
            result?;
        }
        ChatAction::Repl { session, filters } => {
            open_session(&mut chat, session).await?;
            chat.set_filters(filters.into());
            repl(&mut chat).await?;
        }
    }
    Ok(())
}

async fn repl(chat: &mut ChatController<ApiClient>) -> anyhow::Result<()> {
    if let Some(session) = chat.current_session() {
        eprintln!(
            "Chat-Sitzung #{} \"{}\". /quit beendet.",
            session.id, session.session_name
        );
    }
    while let Some(line) = prompt::read_line("> ")? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            _ => {}
        }
        chat.set_input(line);
        match ask_and_print(chat).await {
            Ok(()) => {}
            Err(e) if e.is_unauthorized() => return Err(e.into()),
            Err(e) if chat.phase() != ChatPhase::Error => eprintln!("Fehler: {}", e.user_message()),
            Err(_) => {}
        }
        print_notifications(chat);
        println!();
    }
    Ok(())
}

// ── RAG index ──

async fn rag(ws: &Workspace<ApiClient>, action: RagAction) -> anyhow::Result<()> {
    let client = ws.backend();
    match action {
        RagAction::Indexed => print_lines(&render_indexed(&client.list_indexed_documents().await?)),
        RagAction::Index { id } => {
            client.index_document(id).await?;
            println!("Dokument #{id} indiziert.");
        }
        RagAction::Reindex { id } => {
            client.reindex_document(id).await?;
            println!("Dokument #{id} neu indiziert.");
        }
    }
    Ok(())
}

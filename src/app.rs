use std::fmt;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::cli::args::{
    ApplicationAction, ApplicationFields, CliArgs, Command, ConfigAction, CvAction, DeleteArgs,
    ListArgs, UserAction, UserFields, VacancyAction, VacancyFields,
};
use crate::cli::validation;
use crate::client::{
    build_http_client, fetch_application_columns, ApiOptions, CollectionSource, HttpCollection,
};
use crate::config::{self, ConfigFile, DEFAULT_API_URL, DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT_SECONDS};
use crate::controller::{ListController, ListView};
use crate::filter::FilterPatch;
use crate::output::{self, OutputFormat, TableRow};
use crate::records::{
    Application, ApplicationDraft, Entity, RecordId, User, UserDraft, Vacancy, VacancyDraft,
};
use crate::session::{self, AccessDenied, Page, Redirect, Session};
use crate::upload::{self, CvUpload};

/// Failure of one CLI invocation. `Reported` failures were already shown to
/// the user and only set the exit code.
#[derive(Debug, PartialEq, Eq)]
pub enum CliError {
    Reported,
    Message(String),
}

impl From<String> for CliError {
    fn from(message: String) -> Self {
        CliError::Message(message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Reported => f.write_str("failure already reported"),
            CliError::Message(message) => f.write_str(message),
        }
    }
}

/// Effective settings after flags, config file and defaults are merged.
#[derive(Clone, Debug)]
struct Settings {
    api: ApiOptions,
    page_size: usize,
    session_path: PathBuf,
    format: OutputFormat,
    no_color: bool,
    config_path: Option<PathBuf>,
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<12}: {}", label, value);
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "error",
        1 => "talenttrack=info",
        2 => "talenttrack=debug",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .with(env_filter)
        .try_init();
}

fn build_settings(
    args: &CliArgs,
    cfg: ConfigFile,
    config_path: Option<PathBuf>,
) -> Result<Settings, String> {
    validation::validate(args)?;

    let format_raw = args
        .output_format
        .clone()
        .or(cfg.output_format)
        .unwrap_or_else(|| "text".to_string());
    let format = OutputFormat::parse(&format_raw)
        .ok_or_else(|| format!("invalid output_format '{format_raw}', expected text or json"))?;

    let page_size = args.page_size.or(cfg.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err("invalid page_size, expected positive integer".to_string());
    }
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let base_url = args
        .api_url
        .clone()
        .or(cfg.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let proxy = args
        .proxy
        .clone()
        .or(cfg.proxy)
        .filter(|p| !p.trim().is_empty());

    let session_path = match args.session_file.clone().or(cfg.session_file) {
        Some(path) => config::expand_tilde(&path),
        None => config::default_session_path().ok_or_else(|| {
            "could not determine home directory, pass --session-file".to_string()
        })?,
    };
    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    Ok(Settings {
        api: ApiOptions {
            base_url,
            timeout_seconds: timeout,
            proxy,
        },
        page_size,
        session_path,
        format,
        no_color,
        config_path,
    })
}

/// Fills form fields from command line values; absent flags keep the form value.
trait Overlay<D> {
    fn overlay(self, draft: &mut D);
}

impl Overlay<UserDraft> for UserFields {
    fn overlay(self, draft: &mut UserDraft) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(email) = self.email {
            draft.email = email;
        }
        if let Some(password) = self.password {
            draft.password = password;
        }
        if let Some(role) = self.role {
            draft.role_id = role.id();
        }
    }
}

impl Overlay<VacancyDraft> for VacancyFields {
    fn overlay(self, draft: &mut VacancyDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(location) = self.location {
            draft.location = location;
        }
        if let Some(modality) = self.modality {
            draft.modality = modality;
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
    }
}

impl Overlay<ApplicationDraft> for ApplicationFields {
    fn overlay(self, draft: &mut ApplicationDraft) {
        if let Some(vacancy_id) = self.vacancy_id {
            draft.vacancy_id = vacancy_id;
        }
        if let Some(name) = self.candidate_name {
            draft.candidate_name = name;
        }
        if let Some(email) = self.candidate_email {
            draft.candidate_email = email;
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(score) = self.score {
            draft.score = Some(score);
        }
    }
}

/// One list-page action, independent of the entity.
enum EntityOp<F> {
    List {
        list: ListArgs,
        category: Option<String>,
    },
    Create(F),
    Update {
        id: RecordId,
        fields: F,
    },
    Delete(DeleteArgs),
    Stats,
}

impl From<UserAction> for EntityOp<UserFields> {
    fn from(action: UserAction) -> Self {
        match action {
            UserAction::List { list, role } => EntityOp::List {
                list,
                category: role.map(|r| r.id().to_string()),
            },
            UserAction::Create { fields } => EntityOp::Create(fields),
            UserAction::Update { id, fields } => EntityOp::Update { id, fields },
            UserAction::Delete(args) => EntityOp::Delete(args),
            UserAction::Stats => EntityOp::Stats,
        }
    }
}

impl From<VacancyAction> for EntityOp<VacancyFields> {
    fn from(action: VacancyAction) -> Self {
        match action {
            VacancyAction::List { list, status } => EntityOp::List {
                list,
                category: status,
            },
            VacancyAction::Create { fields } => EntityOp::Create(fields),
            VacancyAction::Update { id, fields } => EntityOp::Update { id, fields },
            VacancyAction::Delete(args) => EntityOp::Delete(args),
            VacancyAction::Stats => EntityOp::Stats,
        }
    }
}

/// `column` is not a list-page action and is handed back unchanged.
impl TryFrom<ApplicationAction> for EntityOp<ApplicationFields> {
    type Error = ApplicationAction;

    fn try_from(action: ApplicationAction) -> Result<Self, Self::Error> {
        match action {
            ApplicationAction::List { list, status } => Ok(EntityOp::List {
                list,
                category: status,
            }),
            ApplicationAction::Create { fields } => Ok(EntityOp::Create(fields)),
            ApplicationAction::Update { id, fields } => Ok(EntityOp::Update { id, fields }),
            ApplicationAction::Delete(args) => Ok(EntityOp::Delete(args)),
            ApplicationAction::Stats => Ok(EntityOp::Stats),
            other @ ApplicationAction::Column => Err(other),
        }
    }
}

fn spinner(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template(":: {spinner} {msg}") {
        pb.set_style(style);
    }
    pb
}

async fn with_spinner<T>(enabled: bool, message: String, fut: impl Future<Output = T>) -> T {
    let pb = spinner(enabled);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    let out = fut.await;
    pb.finish_and_clear();
    out
}

/// Spinner that follows the controller's published busy flag.
struct BusySpinner {
    pb: ProgressBar,
    handle: JoinHandle<()>,
}

impl BusySpinner {
    fn watch<E: Entity>(
        mut rx: watch::Receiver<ListView<E>>,
        message: String,
        enabled: bool,
    ) -> Self {
        let pb = spinner(enabled);
        let bar = pb.clone();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let busy = rx.borrow_and_update().busy;
                if busy {
                    bar.set_message(message.clone());
                    bar.enable_steady_tick(Duration::from_millis(120));
                } else {
                    bar.finish_and_clear();
                    break;
                }
            }
        });
        Self { pb, handle }
    }

    fn finish(self) {
        self.handle.abort();
        self.pb.finish_and_clear();
    }
}

fn emit(bytes: &[u8]) -> Result<(), String> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(bytes)
        .map_err(|e| format!("failed to write output: {e}"))?;
    if !bytes.ends_with(b"\n") {
        stdout
            .write_all(b"\n")
            .map_err(|e| format!("failed to write output: {e}"))?;
    }
    stdout
        .flush()
        .map_err(|e| format!("failed to write output: {e}"))
}

fn emit_notice<E: Entity>(view: &ListView<E>, format: OutputFormat) -> Result<(), String> {
    let Some(notice) = &view.notice else {
        return Ok(());
    };
    match format {
        OutputFormat::Text => emit(output::render_notice(notice).as_bytes()),
        OutputFormat::Json => emit(
            &serde_json::to_vec_pretty(&serde_json::json!({ "notice": notice }))
                .map_err(|e| format!("failed to encode notice: {e}"))?,
        ),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn read_line(prompt: &str) -> Result<String, String> {
    print!("{prompt}");
    std::io::stdout()
        .flush()
        .map_err(|e| format!("failed to write prompt: {e}"))?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines
        .next_line()
        .await
        .map_err(|e| format!("failed to read stdin: {e}"))?;
    Ok(line.unwrap_or_default())
}

async fn run_entity<E, S, F>(
    mut ctl: ListController<E, S>,
    op: EntityOp<F>,
    settings: &Settings,
) -> Result<(), CliError>
where
    E: TableRow,
    S: CollectionSource<E>,
    F: Overlay<E::Draft>,
{
    let show_progress = settings.format == OutputFormat::Text;
    let loaded = with_spinner(
        show_progress,
        format!("loading {}", E::ENDPOINT),
        ctl.load(),
    )
    .await;

    match op {
        EntityOp::List { list, category } => {
            if let Err(err) = loaded {
                debug!(endpoint = E::ENDPOINT, error = %err, "list not shown");
                emit_notice(&ctl.view(), settings.format)?;
                return Err(CliError::Reported);
            }
            ctl.set_filter(FilterPatch {
                search: list.search,
                category,
            });
            if let Some(page) = list.page {
                ctl.set_page(page);
            }
            Ok(emit(&output::render_list(&ctl.view(), settings.format))?)
        }
        EntityOp::Stats => {
            loaded.map_err(|e| format!("failed to load {}: {e}", E::ENDPOINT))?;
            Ok(emit(&output::render_stats::<E>(
                &ctl.category_counts(),
                ctl.records().len(),
                settings.format,
            ))?)
        }
        EntityOp::Create(fields) => {
            ctl.begin_create();
            submit_form(ctl, fields, settings).await
        }
        EntityOp::Update { id, fields } => {
            loaded.map_err(|e| format!("failed to load {}: {e}", E::ENDPOINT))?;
            if !ctl.begin_edit(id) {
                return Err(format!("{} {id} not found", E::LABEL).into());
            }
            submit_form(ctl, fields, settings).await
        }
        EntityOp::Delete(args) => {
            ctl.begin_delete(args.id);
            if !args.yes {
                let prompt = format!(
                    "Delete {} {}? This cannot be undone. [y/N] ",
                    E::LABEL.to_lowercase(),
                    args.id
                );
                if !is_yes(&read_line(&prompt).await?) {
                    ctl.cancel_delete();
                    println!("cancelled");
                    return Ok(());
                }
            }
            let spinner = BusySpinner::watch(
                ctl.subscribe(),
                format!("deleting {} {}", E::LABEL.to_lowercase(), args.id),
                show_progress,
            );
            let result = ctl.confirm_delete().await;
            spinner.finish();
            emit_notice(&ctl.view(), settings.format)?;
            result.map_err(|_| CliError::Reported)
        }
    }
}

async fn submit_form<E, S, F>(
    mut ctl: ListController<E, S>,
    fields: F,
    settings: &Settings,
) -> Result<(), CliError>
where
    E: TableRow,
    S: CollectionSource<E>,
    F: Overlay<E::Draft>,
{
    let mut draft = ctl.form().cloned().unwrap_or_default();
    fields.overlay(&mut draft);
    let spinner = BusySpinner::watch(
        ctl.subscribe(),
        format!("saving {}", E::LABEL.to_lowercase()),
        settings.format == OutputFormat::Text,
    );
    let result = ctl.submit(draft).await;
    spinner.finish();
    emit_notice(&ctl.view(), settings.format)?;
    result.map_err(|_| CliError::Reported)
}

fn controller<E: Entity>(
    http: &reqwest::Client,
    settings: &Settings,
) -> ListController<E, HttpCollection<E>> {
    ListController::new(
        HttpCollection::new(http.clone(), settings.api.base_url.clone()),
        settings.page_size,
    )
}

fn read_session(settings: &Settings) -> Result<Option<Session>, String> {
    session::load_session(&settings.session_path).map_err(|e| e.to_string())
}

/// Applies the page guard; a refused admin page falls back to the vacancies list.
async fn enter_page(
    page: Page,
    http: &reqwest::Client,
    settings: &Settings,
) -> Result<Session, CliError> {
    let current = read_session(settings)?;
    match session::guard(current.as_ref(), page) {
        Ok(s) => Ok(s.clone()),
        Err(denied) => {
            debug!(page = %page, "access denied");
            match denied.redirect() {
                Redirect::Page(target) => {
                    eprintln!("{denied}, showing {target} instead");
                    let op: EntityOp<VacancyFields> = EntityOp::List {
                        list: ListArgs::default(),
                        category: None,
                    };
                    run_entity(controller::<Vacancy>(http, settings), op, settings).await?;
                    Err(CliError::Reported)
                }
                Redirect::Login => Err(denied.to_string().into()),
            }
        }
    }
}

async fn run_async(command: Command, settings: Settings) -> Result<(), CliError> {
    match command {
        Command::Config { action } => return Ok(run_config(action, &settings)?),
        Command::Logout => {
            let removed = session::clear_session(&settings.session_path)
                .map_err(|e| e.to_string())?;
            println!("{}", if removed { "signed out" } else { "no active session" });
            return Ok(());
        }
        Command::Whoami => {
            let current = read_session(&settings)?.ok_or(AccessDenied::NotSignedIn);
            let current = current.map_err(|e| e.to_string())?;
            return Ok(emit(&output::render_session(&current, settings.format))?);
        }
        Command::Pages => {
            let current = read_session(&settings)?.ok_or(AccessDenied::NotSignedIn);
            let current = current.map_err(|e| e.to_string())?;
            return Ok(emit(&output::render_pages(
                &Page::visible_for(&current),
                settings.format,
            ))?);
        }
        _ => {}
    }

    let http = build_http_client(&settings.api).map_err(|e| e.to_string())?;
    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_line("Password (input is visible): ").await?,
            };
            let signed_in = session::login(&http, &settings.api.base_url, &email, &password)
                .await
                .map_err(|e| e.to_string())?;
            session::save_session(&settings.session_path, &signed_in)
                .map_err(|e| e.to_string())?;
            println!(
                "signed in as {} ({})",
                signed_in.name,
                signed_in.role_name()
            );
            Ok(())
        }
        Command::Users { action } => {
            enter_page(Page::Users, &http, &settings).await?;
            let op: EntityOp<UserFields> = action.into();
            run_entity(controller::<User>(&http, &settings), op, &settings).await
        }
        Command::Vacancies { action } => {
            enter_page(Page::Vacancies, &http, &settings).await?;
            let op: EntityOp<VacancyFields> = action.into();
            run_entity(controller::<Vacancy>(&http, &settings), op, &settings).await
        }
        Command::Applications { action } => {
            enter_page(Page::Candidates, &http, &settings).await?;
            match EntityOp::<ApplicationFields>::try_from(action) {
                Ok(op) => {
                    run_entity(controller::<Application>(&http, &settings), op, &settings).await
                }
                Err(_) => Ok(run_columns(&http, &settings).await?),
            }
        }
        Command::Cv {
            action: CvAction::Upload { vacancy_id, files },
        } => {
            enter_page(Page::UploadCvs, &http, &settings).await?;
            Ok(run_upload(&http, vacancy_id, files, &settings).await?)
        }
        Command::Config { .. } | Command::Logout | Command::Whoami | Command::Pages => Ok(()),
    }
}

async fn run_columns(http: &reqwest::Client, settings: &Settings) -> Result<(), String> {
    let rows = with_spinner(
        settings.format == OutputFormat::Text,
        "loading application counts".to_string(),
        fetch_application_columns(http, &settings.api.base_url),
    )
    .await
    .map_err(|e| format!("failed to load application counts: {e}"))?;
    emit(&output::render_columns(&rows, settings.format))
}

async fn run_upload(
    http: &reqwest::Client,
    vacancy_id: RecordId,
    files: Vec<PathBuf>,
    settings: &Settings,
) -> Result<(), String> {
    let show_progress = settings.format == OutputFormat::Text;
    let mut vacancies = controller::<Vacancy>(http, settings);
    with_spinner(show_progress, "loading vacancies".to_string(), vacancies.load())
        .await
        .map_err(|e| format!("failed to load vacancies: {e}"))?;

    let cv_upload = CvUpload::for_vacancy(vacancies.records(), vacancy_id, files)
        .map_err(|e| e.to_string())?;
    let count = cv_upload.files.len();
    let reply = with_spinner(
        show_progress,
        format!("uploading {count} CV(s) for {}", cv_upload.vacancy_title),
        upload::upload_cvs(http, &settings.api.base_url, &cv_upload),
    )
    .await
    .map_err(|e| e.to_string())?;

    match settings.format {
        OutputFormat::Json => emit(
            &serde_json::to_vec_pretty(&reply).map_err(|e| format!("failed to encode reply: {e}"))?,
        ),
        OutputFormat::Text => emit(
            output::render_notice(&crate::controller::Notice::success(format!(
                "{count} CV(s) uploaded for {}.",
                cv_upload.vacancy_title
            )))
            .as_bytes(),
        ),
    }
}

fn run_config(action: ConfigAction, settings: &Settings) -> Result<(), String> {
    match action {
        ConfigAction::Init => {
            let path = match settings.config_path.clone() {
                Some(path) => path,
                None => config::default_config_path()
                    .ok_or_else(|| "could not determine home directory, pass --config".to_string())?,
            };
            if config::ensure_default_config_file(&path)? {
                println!("wrote {}", path.display());
            } else {
                println!("{} already exists", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config_path = settings
                .config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            format_kv_line("Config", &config_path);
            format_kv_line("API", &settings.api.base_url);
            format_kv_line("Timeout", &format!("{}s", settings.api.timeout_seconds));
            format_kv_line("Proxy", settings.api.proxy.as_deref().unwrap_or("-"));
            format_kv_line("Page size", &settings.page_size.to_string());
            format_kv_line("Session", &settings.session_path.display().to_string());
            let format = match settings.format {
                OutputFormat::Text => "text",
                OutputFormat::Json => "json",
            };
            format_kv_line("Format", format);
            Ok(())
        }
    }
}

pub fn run_cli() -> Result<(), CliError> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{e}");
                return Ok(());
            }
            _ => {
                let _ = e.print();
                return Err(CliError::Reported);
            }
        },
    };
    init_tracing(args.verbose);

    let (cfg, config_path) = match args.config.as_deref() {
        Some(path) => {
            let path = config::expand_tilde(path);
            (config::load_config(&path, false)?, Some(path))
        }
        None => match config::default_config_path() {
            Some(path) => (config::load_config(&path, true)?, Some(path)),
            None => (ConfigFile::default(), None),
        },
    };

    let settings = build_settings(&args, cfg, config_path)?;
    if settings.no_color {
        colored::control::set_override(false);
    }
    debug!(api = %settings.api.base_url, page_size = settings.page_size, "settings resolved");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(args.command, settings))
}

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::records::{RecordId, Role};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "talenttrack",
    version,
    about = "recruitment management client",
    long_about = "TalentTrack manages users, vacancies, applications and CV uploads against the recruitment backend.\n\nExamples:\n  talenttrack login --email ana@talent.io\n  talenttrack vacancies list --search backend --status open\n  talenttrack users create --name \"Bo Li\" --email bo@talent.io --password 'Secr3t!' --role recruiter\n  talenttrack cv upload --vacancy 7 ./cvs/ana.pdf ./cvs/bo.pdf\n\nTip: run `talenttrack config init` to write ~/.talenttrack/config.yml and keep invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv). RUST_LOG overrides."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        global = true,
        help_heading = "Output",
        help = "Output format (text or json)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.talenttrack/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "api",
        visible_alias = "api-url",
        value_name = "URL",
        global = true,
        help_heading = "Backend",
        help = "Base URL of the backend API."
    )]
    pub api_url: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "Backend",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "proxy",
        value_name = "URL",
        global = true,
        help_heading = "Backend",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        global = true,
        help_heading = "Lists",
        help = "Rows per page (default 8)."
    )]
    pub page_size: Option<usize>,

    #[arg(
        long = "sf",
        visible_alias = "session-file",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Session file written by `login` (defaults to ~/.talenttrack/session.json)."
    )]
    pub session_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage users (admin only).
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage vacancies.
    #[command(visible_alias = "vac")]
    Vacancies {
        #[command(subcommand)]
        action: VacancyAction,
    },
    /// Manage candidate applications.
    #[command(visible_alias = "candidates")]
    Applications {
        #[command(subcommand)]
        action: ApplicationAction,
    },
    /// Upload CVs for a vacancy.
    Cv {
        #[command(subcommand)]
        action: CvAction,
    },
    /// Sign in and store the session.
    Login {
        #[arg(short = 'e', long = "email", value_name = "EMAIL")]
        email: String,

        #[arg(
            long = "password",
            value_name = "PASSWORD",
            help = "Password; prompted for on stdin when omitted (the typed input is echoed)."
        )]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List the pages available to the signed-in user.
    Pages,
    /// Config file helpers.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(short = 's', long = "search", value_name = "TEXT", help = "Case-insensitive text search.")]
    pub search: Option<String>,

    #[arg(long = "page", value_name = "N", help = "Page to show (clamped to the last page).")]
    pub page: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(value_name = "ID")]
    pub id: RecordId,

    #[arg(short = 'y', long = "yes", help = "Skip the confirmation prompt.")]
    pub yes: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UserFields {
    #[arg(long = "name", value_name = "NAME")]
    pub name: Option<String>,

    #[arg(long = "email", value_name = "EMAIL")]
    pub email: Option<String>,

    #[arg(
        long = "password",
        value_name = "PASSWORD",
        help = "Required on create; leave out on update to keep the current one."
    )]
    pub password: Option<String>,

    #[arg(long = "role", value_name = "ROLE", help = "admin, recruiter, or a role id.")]
    pub role: Option<Role>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum UserAction {
    /// List users.
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        #[arg(long = "role", value_name = "ROLE", help = "Only users with this role.")]
        role: Option<Role>,
    },
    /// Create a user.
    Create {
        #[command(flatten)]
        fields: UserFields,
    },
    /// Update a user; only the given fields change.
    Update {
        #[arg(value_name = "ID")]
        id: RecordId,

        #[command(flatten)]
        fields: UserFields,
    },
    /// Delete a user.
    #[command(visible_alias = "rm")]
    Delete(DeleteArgs),
    /// Users per role.
    Stats,
}

#[derive(Args, Debug, Clone, Default)]
pub struct VacancyFields {
    #[arg(long = "title", value_name = "TITLE")]
    pub title: Option<String>,

    #[arg(long = "description", value_name = "TEXT")]
    pub description: Option<String>,

    #[arg(long = "location", value_name = "TEXT")]
    pub location: Option<String>,

    #[arg(long = "modality", value_name = "TEXT", help = "e.g. remote, hybrid, on-site.")]
    pub modality: Option<String>,

    #[arg(long = "status", value_name = "STATUS", help = "e.g. open, closed.")]
    pub status: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum VacancyAction {
    /// List vacancies.
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        #[arg(long = "status", value_name = "STATUS", help = "Only vacancies with this status.")]
        status: Option<String>,
    },
    /// Create a vacancy.
    Create {
        #[command(flatten)]
        fields: VacancyFields,
    },
    /// Update a vacancy; only the given fields change.
    Update {
        #[arg(value_name = "ID")]
        id: RecordId,

        #[command(flatten)]
        fields: VacancyFields,
    },
    /// Delete a vacancy.
    #[command(visible_alias = "rm")]
    Delete(DeleteArgs),
    /// Vacancies per status.
    Stats,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ApplicationFields {
    #[arg(long = "vacancy", value_name = "ID")]
    pub vacancy_id: Option<RecordId>,

    #[arg(long = "name", value_name = "NAME")]
    pub candidate_name: Option<String>,

    #[arg(long = "email", value_name = "EMAIL")]
    pub candidate_email: Option<String>,

    #[arg(long = "status", value_name = "STATUS")]
    pub status: Option<String>,

    #[arg(long = "score", value_name = "0-100")]
    pub score: Option<f64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ApplicationAction {
    /// List applications.
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        #[arg(long = "status", value_name = "STATUS", help = "Only applications with this status.")]
        status: Option<String>,
    },
    /// Register an application.
    Create {
        #[command(flatten)]
        fields: ApplicationFields,
    },
    /// Update an application; only the given fields change.
    Update {
        #[arg(value_name = "ID")]
        id: RecordId,

        #[command(flatten)]
        fields: ApplicationFields,
    },
    /// Delete an application.
    #[command(visible_alias = "rm")]
    Delete(DeleteArgs),
    /// Applications per status.
    Stats,
    /// Application counts per vacancy, as reported by the server.
    Column,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CvAction {
    /// Send CV files to be parsed for a vacancy.
    Upload {
        #[arg(long = "vacancy", value_name = "ID")]
        vacancy_id: RecordId,

        #[arg(value_name = "FILE", required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Write the default config file if none exists.
    Init,
    /// Print the effective settings.
    Show,
}

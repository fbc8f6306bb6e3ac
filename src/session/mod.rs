//! Signed-in user and page access rules.
//!
//! The session is read once per invocation from a JSON file holding the user
//! returned by the login endpoint.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::client::{self, ClientError};
use crate::records::Role;
use crate::validators::{self, PasswordPolicy, ValidationError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role_id: i64,
}

impl Session {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn is_recruiter(&self) -> bool {
        self.role() == Some(Role::Recruiter)
    }

    pub fn role_name(&self) -> &'static str {
        Role::name_for_id(self.role_id)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write session file: {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("session file is corrupt: {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] ClientError),
}

/// Missing file means nobody is signed in.
pub fn load_session(path: &Path) -> Result<Option<Session>, SessionError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SessionError::Read {
                path: path.display().to_string(),
                source: e,
            })
        }
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| SessionError::Parse {
            path: path.display().to_string(),
            source: e,
        })
}

pub fn save_session(path: &Path, session: &Session) -> Result<(), SessionError> {
    let write_err = |e| SessionError::Write {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let contents = serde_json::to_string_pretty(session).map_err(|e| SessionError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    std::fs::write(path, contents).map_err(write_err)
}

/// Returns whether a session file was removed.
pub fn clear_session(path: &Path) -> Result<bool, SessionError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(SessionError::Write {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

/// Posts credentials to `{base}/auth/login` and returns the signed-in user.
pub async fn login(
    http: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> Result<Session, SessionError> {
    if validators::is_empty(email) || validators::is_empty(password) {
        return Err(ValidationError::new("Please fill in all required fields.").into());
    }
    if !validators::is_email_valid(email.trim()) {
        return Err(ValidationError::new("Please enter a valid email address.").into());
    }
    if !validators::is_password_valid(password, PasswordPolicy::Login) {
        return Err(ValidationError::new("Please enter your password.").into());
    }

    let url = client::endpoint_url(base_url, &["auth", "login"])?;
    debug!(%url, "login request");
    let response = http
        .post(url)
        .json(&json!({ "email": email.trim(), "password": password }))
        .send()
        .await
        .map_err(|e| ClientError::transport(format!("login request failed: {e}")))?;
    let bytes = client::read_response(response, None).await?;
    Ok(decode_login(&bytes)?)
}

/// Accepts either the user object itself or `{ "user": {...} }`.
fn decode_login(bytes: &[u8]) -> Result<Session, ClientError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LoginBody {
        Wrapped { user: Session },
        Bare(Session),
    }
    let body: LoginBody = client::decode(bytes)?;
    Ok(match body {
        LoginBody::Wrapped { user } => user,
        LoginBody::Bare(user) => user,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Vacancies,
    Candidates,
    UploadCvs,
    Users,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Vacancies, Page::Candidates, Page::UploadCvs, Page::Users];

    pub fn label(self) -> &'static str {
        match self {
            Page::Vacancies => "Vacancies",
            Page::Candidates => "Candidates",
            Page::UploadCvs => "Upload CVs",
            Page::Users => "Users",
        }
    }

    pub fn admin_only(self) -> bool {
        matches!(self, Page::Users)
    }

    /// Navigation entries offered to `session`.
    pub fn visible_for(session: &Session) -> Vec<Page> {
        Page::ALL
            .into_iter()
            .filter(|p| !p.admin_only() || session.is_admin())
            .collect()
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a refused visitor is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Redirect {
    Login,
    Page(Page),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("you are not signed in, run `talenttrack login` first")]
    NotSignedIn,

    #[error("you do not have permission to access {page}")]
    Forbidden { page: Page, redirect: Redirect },
}

impl AccessDenied {
    pub fn redirect(&self) -> Redirect {
        match self {
            AccessDenied::NotSignedIn => Redirect::Login,
            AccessDenied::Forbidden { redirect, .. } => *redirect,
        }
    }
}

/// Page guard: a session is required everywhere, and admin-only pages send
/// everyone else to the vacancies page.
pub fn guard<'a>(session: Option<&'a Session>, page: Page) -> Result<&'a Session, AccessDenied> {
    let session = session.ok_or(AccessDenied::NotSignedIn)?;
    if page.admin_only() && !session.is_admin() {
        return Err(AccessDenied::Forbidden {
            page,
            redirect: Redirect::Page(Page::Vacancies),
        });
    }
    Ok(session)
}

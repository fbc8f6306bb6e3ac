use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use super::{required_fields_missing, Draft, Entity, FormMode, RecordId};
use crate::validators::{self, PasswordPolicy, ValidationError};

/// Roles are fixed on the server side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Recruiter,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Recruiter];

    pub fn id(self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::Recruiter => 2,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Recruiter),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Recruiter => "Recruiter",
        }
    }

    pub fn name_for_id(id: i64) -> &'static str {
        Role::from_id(id).map(Role::name).unwrap_or("User")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if let Ok(id) = raw.parse::<i64>() {
            return Role::from_id(id).ok_or_else(|| format!("unknown role id '{raw}'"));
        }
        match raw.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "recruiter" => Ok(Role::Recruiter),
            _ => Err(format!("unknown role '{raw}', expected admin or recruiter")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: RecordId,
    pub name: String,
    pub email: String,
    pub role_id: i64,
}

impl User {
    pub fn role_name(&self) -> &'static str {
        Role::name_for_id(self.role_id)
    }

    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase()
    }
}

impl Entity for User {
    type Draft = UserDraft;

    const ENDPOINT: &'static str = "users";
    const LABEL: &'static str = "User";
    const ID_FIELD: &'static str = "user_id";

    fn id(&self) -> RecordId {
        self.user_id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }

    fn category(&self) -> Option<String> {
        Some(self.role_id.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: i64,
}

impl Default for UserDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            password: String::new(),
            role_id: Role::Recruiter.id(),
        }
    }
}

impl Draft<User> for UserDraft {
    fn from_record(record: &User) -> Self {
        // the stored password is never sent back, editing starts blank
        Self {
            name: record.name.clone(),
            email: record.email.clone(),
            password: String::new(),
            role_id: record.role_id,
        }
    }

    fn validate(&self, mode: FormMode) -> Result<(), ValidationError> {
        if validators::is_empty(&self.name)
            || validators::is_empty(&self.email)
            || !validators::is_role_valid(self.role_id)
        {
            return Err(required_fields_missing());
        }
        if !validators::is_name_valid(&self.name) {
            return Err(ValidationError::new(
                "Name must be at least 2 characters long.",
            ));
        }
        if !validators::is_email_valid(self.email.trim()) {
            return Err(ValidationError::new("Please enter a valid email address."));
        }
        if Role::from_id(self.role_id).is_none() {
            return Err(ValidationError::new("Please select a valid role."));
        }
        if mode == FormMode::Create && self.password.is_empty() {
            return Err(ValidationError::new("Password is required for new users."));
        }
        if !self.password.is_empty()
            && !validators::is_password_valid(&self.password, PasswordPolicy::Registration)
        {
            return Err(ValidationError::new(validators::PASSWORD_RULES));
        }
        Ok(())
    }

    fn payload(&self, mode: FormMode) -> JsonValue {
        let mut body = json!({
            "name": self.name.trim(),
            "email": self.email.trim(),
            "role_id": self.role_id,
        });
        if mode == FormMode::Create || !self.password.is_empty() {
            body["password"] = JsonValue::String(self.password.clone());
        }
        body
    }
}

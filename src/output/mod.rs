use std::collections::BTreeMap;

use colored::Colorize;
use serde::Serialize;

use crate::controller::{ListView, Notice};
use crate::filter::FilterCriteria;
use crate::pagination::PageWindow;
use crate::records::{Application, ApplicationColumn, Entity, Role, User, Vacancy};
use crate::session::{Page, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" | "table" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Table columns for one entity.
pub trait TableRow: Entity {
    const COLUMNS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

impl TableRow for User {
    const COLUMNS: &'static [&'static str] = &["ID", "", "NAME", "EMAIL", "ROLE"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.user_id.to_string(),
            self.initials(),
            self.name.clone(),
            self.email.clone(),
            self.role_name().to_string(),
        ]
    }
}

impl TableRow for Vacancy {
    const COLUMNS: &'static [&'static str] = &["ID", "TITLE", "LOCATION", "MODALITY", "STATUS"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.vacancy_id.to_string(),
            self.title.clone(),
            or_dash(self.location.as_deref()),
            or_dash(self.modality.as_deref()),
            or_dash(self.status.as_deref()),
        ]
    }
}

impl TableRow for Application {
    const COLUMNS: &'static [&'static str] =
        &["ID", "VACANCY", "CANDIDATE", "EMAIL", "STATUS", "SCORE"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.application_id.to_string(),
            self.vacancy_id.to_string(),
            or_dash(self.candidate_name.as_deref()),
            or_dash(self.candidate_email.as_deref()),
            or_dash(self.status.as_deref()),
            self.score
                .map(|s| format!("{s:.0}"))
                .unwrap_or_else(|| "-".to_string()),
        ]
    }
}

fn pad_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Footer under a list: "Showing 9-16 of 18 · Page 3 of 3".
pub fn render_footer(window: &PageWindow) -> String {
    format!(
        "Showing {} · Page {}",
        window.range_label(),
        window.label()
    )
}

fn describe_criteria(criteria: &FilterCriteria, category_label: fn(&str) -> String) -> String {
    let mut parts = Vec::new();
    if !criteria.search.trim().is_empty() {
        parts.push(format!("search \"{}\"", criteria.search.trim()));
    }
    if !criteria.category.trim().is_empty() {
        parts.push(category_label(criteria.category.trim()));
    }
    parts.join(", ")
}

fn plain_category(value: &str) -> String {
    format!("category {value}")
}

/// Category criterion as shown to the operator; users filter on role ids.
pub fn category_label<E: Entity>(value: &str) -> String {
    if E::ENDPOINT == User::ENDPOINT {
        if let Ok(id) = value.parse::<i64>() {
            return format!("role {}", Role::name_for_id(id));
        }
    }
    plain_category(value)
}

pub fn render_notice(notice: &Notice) -> String {
    if notice.is_error() {
        format!("{} {}", "[!]".bold().red(), notice.text.red())
    } else {
        format!("{} {}", "[+]".bold().green(), notice.text.green())
    }
}

pub fn render_list_text<E: TableRow>(view: &ListView<E>) -> String {
    let mut out = String::new();
    if view.visible.is_empty() {
        let empty = if view.criteria.is_active() {
            format!("No {} match the current filters.", E::ENDPOINT)
        } else {
            format!("No {} found.", E::ENDPOINT)
        };
        out.push_str(&empty.dimmed().to_string());
        out.push('\n');
    } else {
        let header: Vec<String> = E::COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows: Vec<Vec<String>> = view.visible.iter().map(TableRow::cells).collect();
        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        out.push_str(&pad_row(&header, &widths).bold().white().to_string());
        out.push('\n');
        for row in &rows {
            out.push_str(&pad_row(row, &widths));
            out.push('\n');
        }
    }
    out.push_str(&render_footer(&view.window).dimmed().to_string());
    out.push('\n');
    let filters = describe_criteria(&view.criteria, category_label::<E>);
    if !filters.is_empty() {
        out.push_str(&format!("{} {}\n", "filters:".bold().white(), filters));
    }
    if let Some(notice) = &view.notice {
        out.push_str(&render_notice(notice));
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct ListJson<'a, E: Serialize> {
    records: &'a [E],
    page: usize,
    total_pages: usize,
    total: usize,
    range: String,
    criteria: &'a FilterCriteria,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'a Notice>,
}

pub fn render_list_json<E: Entity>(view: &ListView<E>) -> Vec<u8> {
    let body = ListJson {
        records: &view.visible,
        page: view.window.page,
        total_pages: view.window.total_pages,
        total: view.window.total,
        range: view.window.range_label(),
        criteria: &view.criteria,
        notice: view.notice.as_ref(),
    };
    serde_json::to_vec_pretty(&body).unwrap_or_else(|_| b"{}\n".to_vec())
}

pub fn render_list<E: TableRow>(view: &ListView<E>, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Text => render_list_text(view).into_bytes(),
        OutputFormat::Json => render_list_json(view),
    }
}

/// Per-category counts over the whole cache.
pub fn render_stats<E: Entity>(
    counts: &BTreeMap<String, usize>,
    total: usize,
    format: OutputFormat,
) -> Vec<u8> {
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({ "total": total, "by_category": counts });
            serde_json::to_vec_pretty(&body).unwrap_or_else(|_| b"{}\n".to_vec())
        }
        OutputFormat::Text => {
            let mut out = format!(
                "{} {}\n",
                format!("{} total:", E::LABEL).bold().white(),
                total
            );
            for (category, count) in counts {
                let name = category_label::<E>(category);
                out.push_str(&format!("  {name:<24} {count}\n"));
            }
            out.into_bytes()
        }
    }
}

pub fn render_columns(rows: &[ApplicationColumn], format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Json => serde_json::to_vec_pretty(rows).unwrap_or_else(|_| b"[]\n".to_vec()),
        OutputFormat::Text => {
            let header = ["ID", "VACANCY", "APPLICATIONS"].map(str::to_string);
            let body: Vec<[String; 3]> = rows
                .iter()
                .map(|row| {
                    [
                        row.vacancy_id.to_string(),
                        or_dash(row.title.as_deref()),
                        row.applications_count.to_string(),
                    ]
                })
                .collect();
            let mut widths = header.clone().map(|h| h.len());
            for cells in &body {
                for (width, cell) in widths.iter_mut().zip(cells) {
                    *width = (*width).max(cell.chars().count());
                }
            }
            let mut out = format!("{}\n", pad_row(&header, &widths).bold().white());
            for cells in &body {
                out.push_str(&pad_row(cells, &widths));
                out.push('\n');
            }
            let total: i64 = rows.iter().map(|r| r.applications_count).sum();
            out.push_str(&format!("{} {total}\n", "Total applications:".bold()));
            out.into_bytes()
        }
    }
}

pub fn render_session(session: &Session, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Json => {
            serde_json::to_vec_pretty(session).unwrap_or_else(|_| b"{}\n".to_vec())
        }
        OutputFormat::Text => format!(
            "{} ({}) {}\n",
            session.name.bold().white(),
            session.email,
            format!("[{}]", session.role_name()).bold().cyan()
        )
        .into_bytes(),
    }
}

pub fn render_pages(pages: &[Page], format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Json => {
            let labels: Vec<&str> = pages.iter().map(|p| p.label()).collect();
            serde_json::to_vec_pretty(&labels).unwrap_or_else(|_| b"[]\n".to_vec())
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for page in pages {
                out.push_str(&format!("{} {}\n", "*".bold().blue(), page.label()));
            }
            out.into_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Phase;
    use crate::pagination::paginate;

    fn user(id: i64, name: &str, role_id: i64) -> User {
        User {
            user_id: id,
            name: name.to_string(),
            email: format!("u{id}@talent.io"),
            role_id,
        }
    }

    fn view(visible: Vec<User>, total: usize, page: usize) -> ListView<User> {
        ListView {
            visible,
            window: paginate(total, 8, page),
            criteria: FilterCriteria::default(),
            busy: false,
            notice: None,
            phase: Phase::Idle,
            edit_target: None,
            delete_target: None,
            form: None,
        }
    }

    #[test]
    fn column_summary_lists_counts_and_total() {
        let rows = vec![
            ApplicationColumn {
                vacancy_id: 1,
                title: Some("Backend Developer".to_string()),
                applications_count: 4,
            },
            ApplicationColumn {
                vacancy_id: 2,
                title: None,
                applications_count: 3,
            },
        ];
        let text = String::from_utf8(render_columns(&rows, OutputFormat::Text)).unwrap();
        assert!(text.contains("Backend Developer"));
        assert!(text.lines().nth(2).unwrap().starts_with("2   -"));
        assert!(text.contains("Total applications:"));
        assert!(text.trim_end().ends_with('7'));

        let json: serde_json::Value =
            serde_json::from_slice(&render_columns(&rows, OutputFormat::Json)).unwrap();
        assert_eq!(json[0]["applications_count"], 4);
        assert_eq!(json[1]["title"], serde_json::Value::Null);
    }

    #[test]
    fn format_parse() {
        assert_eq!(OutputFormat::parse(" JSON "), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("table"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("xml"), None);
    }

    #[test]
    fn text_table_has_rows_and_footer() {
        let v = view(vec![user(1, "Ana Ruiz", 1), user(2, "Bo", 2)], 18, 3);
        let text = render_list_text(&v);
        assert!(text.contains("Ana Ruiz"));
        assert!(text.contains("Admin"));
        assert!(text.contains("Showing 17-18 of 18"));
        assert!(text.contains("Page 3 of 3"));
    }

    #[test]
    fn empty_list_footer() {
        let mut v = view(vec![], 0, 1);
        v.criteria.search = "zzz".to_string();
        let text = render_list_text(&v);
        assert!(text.contains("No users match the current filters."));
        assert!(text.contains("Showing 0-0 of 0"));
        assert!(text.contains("Page 0 of 0"));
    }

    #[test]
    fn json_list_shape() {
        let mut v = view(vec![user(1, "Ana Ruiz", 1)], 1, 1);
        v.notice = Some(Notice::success("User created successfully!"));
        let body: serde_json::Value = serde_json::from_slice(&render_list_json(&v)).unwrap();
        assert_eq!(body["records"][0]["user_id"], 1);
        assert_eq!(body["total_pages"], 1);
        assert_eq!(body["range"], "1-1 of 1");
        assert_eq!(body["notice"]["kind"], "success");
    }

    #[test]
    fn user_roles_are_named_in_stats() {
        let mut counts = BTreeMap::new();
        counts.insert("1".to_string(), 2);
        counts.insert("2".to_string(), 5);
        let text = String::from_utf8(render_stats::<User>(&counts, 7, OutputFormat::Text)).unwrap();
        assert!(text.contains("role Recruiter"));
        assert!(text.contains('7'));
    }
}

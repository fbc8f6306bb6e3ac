//! CV upload for a vacancy. The server parses the CVs and attaches the
//! resulting candidates to the vacancy.

use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use crate::client::{self, ClientError};
use crate::records::{RecordId, Vacancy};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("select at least one CV file")]
    NoFiles,

    #[error("vacancy {id} does not exist")]
    UnknownVacancy { id: RecordId },

    #[error("failed to read CV file: {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build upload form: {source}")]
    Form {
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Remote(#[from] ClientError),
}

#[derive(Clone, Debug)]
pub struct CvUpload {
    pub vacancy_id: RecordId,
    pub vacancy_title: String,
    pub files: Vec<PathBuf>,
}

impl CvUpload {
    /// Picks the vacancy out of the loaded list so the title travels with the id.
    pub fn for_vacancy(
        vacancies: &[Vacancy],
        vacancy_id: RecordId,
        files: Vec<PathBuf>,
    ) -> Result<Self, UploadError> {
        if files.is_empty() {
            return Err(UploadError::NoFiles);
        }
        let vacancy = vacancies
            .iter()
            .find(|v| v.vacancy_id == vacancy_id)
            .ok_or(UploadError::UnknownVacancy { id: vacancy_id })?;
        Ok(Self {
            vacancy_id,
            vacancy_title: vacancy.title.clone(),
            files,
        })
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

async fn build_form(upload: &CvUpload) -> Result<Form, UploadError> {
    let mut form = Form::new()
        .text("vacancy_id", upload.vacancy_id.to_string())
        .text("vacancyTitle", upload.vacancy_title.clone());
    for path in &upload.files {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::FileRead {
                path: path.display().to_string(),
                source: e,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "cv".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))
            .map_err(|e| UploadError::Form { source: e })?;
        form = form.part("files", part);
    }
    Ok(form)
}

/// Posts the CVs as multipart to `{base}/aicv/` and returns the server's reply.
pub async fn upload_cvs(
    http: &reqwest::Client,
    base_url: &str,
    upload: &CvUpload,
) -> Result<JsonValue, UploadError> {
    if upload.files.is_empty() {
        return Err(UploadError::NoFiles);
    }
    let mut url = client::endpoint_url(base_url, &["aicv"])?;
    let with_slash = format!("{}/", url.path());
    url.set_path(&with_slash);

    let form = build_form(upload).await?;
    debug!(%url, files = upload.files.len(), vacancy = upload.vacancy_id, "cv upload");
    let response = http
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| ClientError::transport(format!("CV upload failed: {e}")))?;
    let bytes = client::read_response(response, None).await?;
    if bytes.is_empty() {
        return Ok(JsonValue::Null);
    }
    Ok(client::decode(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vacancies() -> Vec<Vacancy> {
        vec![Vacancy {
            vacancy_id: 7,
            title: "Backend Developer".to_string(),
            description: None,
            location: None,
            modality: None,
            status: Some("open".to_string()),
        }]
    }

    #[test]
    fn upload_needs_files_and_a_known_vacancy() {
        assert!(matches!(
            CvUpload::for_vacancy(&vacancies(), 7, vec![]),
            Err(UploadError::NoFiles)
        ));
        assert!(matches!(
            CvUpload::for_vacancy(&vacancies(), 8, vec![PathBuf::from("a.pdf")]),
            Err(UploadError::UnknownVacancy { id: 8 })
        ));
        let upload =
            CvUpload::for_vacancy(&vacancies(), 7, vec![PathBuf::from("a.pdf")]).unwrap();
        assert_eq!(upload.vacancy_title, "Backend Developer");
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for(Path::new("cv.PDF")), "application/pdf");
        assert_eq!(mime_for(Path::new("cv")), "application/octet-stream");
    }

    #[tokio::test]
    async fn posts_multipart_with_vacancy_fields() {
        let dir = tempfile::tempdir().unwrap();
        let cv = dir.path().join("ana.pdf");
        std::fs::write(&cv, b"%PDF-1.4 fake").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/aicv/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"processed": 1})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let upload = CvUpload::for_vacancy(&vacancies(), 7, vec![cv]).unwrap();
        let reply = upload_cvs(
            &reqwest::Client::new(),
            &format!("{}/api", server.uri()),
            &upload,
        )
        .await
        .unwrap();
        assert_eq!(reply["processed"], 1);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"vacancyTitle\""));
        assert!(body.contains("Backend Developer"));
        assert!(body.contains("filename=\"ana.pdf\""));
    }

    #[tokio::test]
    async fn server_failure_keeps_status() {
        let dir = tempfile::tempdir().unwrap();
        let cv = dir.path().join("ana.pdf");
        std::fs::write(&cv, b"x").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let upload = CvUpload::for_vacancy(&vacancies(), 7, vec![cv]).unwrap();
        let err = upload_cvs(&reqwest::Client::new(), &server.uri(), &upload)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Remote(ClientError::Transport {
                status: Some(502),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_reported_before_sending() {
        let upload = CvUpload {
            vacancy_id: 7,
            vacancy_title: "Backend Developer".to_string(),
            files: vec![PathBuf::from("/definitely/not/here.pdf")],
        };
        let err = upload_cvs(&reqwest::Client::new(), "http://127.0.0.1:9", &upload)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::FileRead { .. }));
    }
}

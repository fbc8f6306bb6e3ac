use crate::cli::args::{CliArgs, Command, CvAction};
use crate::output::OutputFormat;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text or json"
            ));
        }
    }
    if let Some(size) = args.page_size {
        if size == 0 {
            return Err("invalid page-size, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive number of seconds".to_string());
        }
    }
    if let Some(raw) = args.api_url.as_deref() {
        reqwest::Url::parse(raw).map_err(|e| format!("invalid --api-url '{raw}': {e}"))?;
    }
    if let Some(raw) = args.proxy.as_deref() {
        reqwest::Url::parse(raw).map_err(|e| format!("invalid --proxy '{raw}': {e}"))?;
    }
    if let Command::Cv {
        action: CvAction::Upload { vacancy_id, .. },
    } = &args.command
    {
        if *vacancy_id <= 0 {
            return Err("invalid --vacancy, expected positive id".to_string());
        }
    }
    Ok(())
}

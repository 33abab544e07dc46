use crate::coverage::{merge_reports, Report};
use crate::errors::CrvError;
use crate::jacoco::parse_jacoco;
use crate::lcov::parse_lcov;
use crate::runtime::FileSystem;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Produces a fresh coverage model on every call.
pub trait ReportLoader: Send + Sync {
    fn load(&self) -> Result<Report, CrvError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Auto,
    Jacoco,
    Lcov,
    Json,
}

/// Picks a concrete format from the contents. XML is recognised by its root
/// element; anything else that is not a JSON object is treated as LCOV.
pub fn detect_format(contents: &str) -> Result<ReportFormat, CrvError> {
    let trimmed = contents.trim_start();
    if trimmed.is_empty() {
        return Err(CrvError::ReportParse(
            "unsupported or empty report format".to_string(),
        ));
    }
    if trimmed.starts_with('<') {
        let root = xml_root(trimmed)?;
        return match root.as_str() {
            "report" => Ok(ReportFormat::Jacoco),
            other => Err(CrvError::ReportParse(format!(
                "unsupported xml root element: {other}"
            ))),
        };
    }
    if trimmed.starts_with('{') {
        return Ok(ReportFormat::Json);
    }
    Ok(ReportFormat::Lcov)
}

fn xml_root(contents: &str) -> Result<String, CrvError> {
    let mut reader = Reader::from_str(contents);
    loop {
        match reader.read_event() {
            Ok(XmlEvent::Start(tag)) | Ok(XmlEvent::Empty(tag)) => {
                return Ok(String::from_utf8_lossy(tag.local_name().as_ref()).into_owned());
            }
            Ok(XmlEvent::Eof) => {
                return Err(CrvError::ReportParse(
                    "unsupported xml report format".to_string(),
                ))
            }
            Ok(_) => {}
            Err(e) => return Err(CrvError::ReportParse(format!("detect format: {e}"))),
        }
    }
}

pub fn parse_report(path: &Path, contents: &str) -> Result<Report, CrvError> {
    parse_report_as(path, contents, ReportFormat::Auto)
}

/// Parses `contents` as `format`, detecting it first when `Auto`. Parse
/// errors are prefixed with the path.
pub fn parse_report_as(
    path: &Path,
    contents: &str,
    format: ReportFormat,
) -> Result<Report, CrvError> {
    let format = match format {
        ReportFormat::Auto => detect_format(contents),
        concrete => Ok(concrete),
    };
    let parsed = match format {
        Ok(ReportFormat::Json) => serde_json::from_str(contents)
            .map_err(|e| CrvError::ReportParse(e.to_string())),
        Ok(ReportFormat::Jacoco) => parse_jacoco(contents),
        Ok(ReportFormat::Lcov | ReportFormat::Auto) => parse_lcov(contents),
        Err(e) => Err(e),
    };
    parsed.map_err(|e| match e {
        CrvError::ReportParse(message) => {
            CrvError::ReportParse(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

/// Reads every configured path and merges the results into one model.
pub struct FileReportLoader {
    paths: Vec<PathBuf>,
    format: ReportFormat,
    fs: Arc<dyn FileSystem>,
}

impl FileReportLoader {
    pub fn new(paths: Vec<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            paths,
            format: ReportFormat::Auto,
            fs,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }
}

impl ReportLoader for FileReportLoader {
    fn load(&self) -> Result<Report, CrvError> {
        if self.paths.is_empty() {
            return Err(CrvError::InvalidConfig(
                "at least one report path is required".to_string(),
            ));
        }
        let mut reports = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let contents = self.fs.read_to_string(path)?;
            reports.push(parse_report_as(path, &contents, self.format)?);
        }
        if reports.len() == 1 {
            return Ok(reports.remove(0));
        }
        Ok(merge_reports(reports))
    }
}

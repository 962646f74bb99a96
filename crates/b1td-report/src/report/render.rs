//! Document rendering
//!
//! Output is produced in full before anything touches the destination, then
//! written through a temp file in the same directory and renamed into place.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use tracing::{debug, info};

use super::assembler::group_thousands;
use crate::error::{Error, Result};
use crate::models::ReportData;

/// Template shipped with the binary
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/report.html.hbs");

const TEMPLATE_NAME: &str = "report";

/// Turns report data into a document file
pub trait DocumentRenderer: Send + Sync {
    /// Render `data` to `path`, leaving no file behind on failure
    fn render(&self, data: &ReportData, path: &Path) -> Result<()>;
}

/// Handlebars template renderer
pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// Renderer for a template given as text
    pub fn new(template: &str) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_helper("json", Box::new(json_helper));
        handlebars.register_helper("thousands", Box::new(thousands_helper));
        handlebars.register_template_string(TEMPLATE_NAME, template)?;
        Ok(Self { handlebars })
    }

    /// Renderer for a template file
    pub fn from_file(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path)
            .map_err(|e| Error::render(format!("template {}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded template");
        Self::new(&template)
    }

    /// Renderer for the built-in HTML template
    pub fn builtin() -> Result<Self> {
        Self::new(DEFAULT_TEMPLATE)
    }

    /// Render `data` without touching the filesystem
    pub fn render_to_string(&self, data: &ReportData) -> Result<String> {
        Ok(self.handlebars.render(TEMPLATE_NAME, data)?)
    }
}

impl DocumentRenderer for HandlebarsRenderer {
    fn render(&self, data: &ReportData, path: &Path) -> Result<()> {
        let document = self.render_to_string(data)?;
        backup_existing(path)?;
        write_atomic(path, document.as_bytes())?;
        info!(path = %path.display(), "Document created");
        Ok(())
    }
}

/// Move an existing file at `path` to `<path>.bak`
pub(crate) fn backup_existing(path: &Path) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    let backup = PathBuf::from(backup);
    std::fs::rename(path, &backup)?;
    info!(backup = %backup.display(), "Output file exists, moved aside");
    Ok(Some(backup))
}

/// Write `contents` to `path` via a temp file and rename
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn json_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    if let Some(v) = h.param(0) {
        out.write(&serde_json::to_string(v.value()).unwrap_or_default())?;
    }
    Ok(())
}

fn thousands_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let value = h.param(0).map(|p| p.value());
    match value.and_then(serde_json::Value::as_u64) {
        Some(n) => out.write(&group_thousands(n))?,
        None => {
            return Err(handlebars::RenderErrorReason::Other(format!(
                "thousands expects a non-negative integer, got {}",
                value.map_or_else(|| "nothing".to_string(), ToString::to_string)
            ))
            .into())
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(fields: serde_json::Value) -> ReportData {
        serde_json::from_value(fields).unwrap()
    }

    #[test]
    fn test_render_to_string_with_helpers() {
        let renderer =
            HandlebarsRenderer::new("{{customer}}: {{thousands hits}} {{json series}}").unwrap();
        let text = renderer
            .render_to_string(&data(json!({
                "customer": "Acme",
                "hits": 1234567,
                "series": [1, 2]
            })))
            .unwrap();
        assert_eq!(text, "Acme: 1,234,567 [1,2]");
    }

    #[test]
    fn test_invalid_template() {
        let err = HandlebarsRenderer::new("{{#if customer}}unclosed").err().unwrap();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_missing_template_file() {
        let err = HandlebarsRenderer::from_file(Path::new("/nonexistent/template.hbs"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_failed_render_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        let renderer = HandlebarsRenderer::new("{{thousands customer}}").unwrap();

        let err = renderer
            .render(&data(json!({ "customer": "Acme" })), &path)
            .unwrap_err();

        assert!(matches!(err, Error::Render(_)));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_existing_output_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        std::fs::write(&path, "old").unwrap();

        let renderer = HandlebarsRenderer::new("new {{customer}}").unwrap();
        renderer
            .render(&data(json!({ "customer": "Acme" })), &path)
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new Acme");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("report.html.bak")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_builtin_template_tolerates_empty_insights() {
        let renderer = HandlebarsRenderer::builtin().unwrap();
        let text = renderer
            .render_to_string(&data(json!({
                "doc_title": "Assessment",
                "customer": "Acme",
                "data_dex": {},
                "data_malware": { "results": [{ "key": "tproperty", "count": 3, "sub_bucket": [
                    { "key": "Malware.Trojan", "count": 3 }
                ] }] },
                "total_events": "1,000",
                "chart_series": []
            })))
            .unwrap();
        assert!(text.contains("Acme"));
        assert!(text.contains("Malware.Trojan"));
    }
}

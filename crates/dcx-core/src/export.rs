//! The export serializer: turns an ordered run of messages into one of four
//! flat documents on disk.
//!
//! Input arrives newest first (the order Discord's history API returns
//! messages); every format emits oldest first. That reversal is a fixed
//! contract, not an option.

use std::{
    fs,
    io::Write,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::{domain::MessageRecord, formatting::escape_html, Result};

/// Output encoding for an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Html,
    Txt,
    Json,
    Csv,
}

impl ExportFormat {
    /// Parse a user-supplied format name.
    ///
    /// Unrecognized values fall back to HTML. That is deliberate policy, not
    /// an error: the format option is advisory and the export should still
    /// happen.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Self::Txt,
            "json" => Self::Json,
            "csv" => Self::Csv,
            _ => Self::Html,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Txt => "txt",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// One export invocation; lives only for the duration of the call.
#[derive(Clone, Debug)]
pub struct ExportRequest {
    /// Used for the file name and, for HTML, as the page title.
    pub channel_name: String,
    pub format: ExportFormat,
    /// Newest first, as returned by the platform history API.
    pub messages: Vec<MessageRecord>,
}

/// Writes export documents into a directory of its own.
///
/// Stateless apart from the target directory; concurrent exports always get
/// independent files.
#[derive(Clone, Debug)]
pub struct Exporter {
    temp_dir: PathBuf,
}

static EXPORT_SEQ: AtomicU64 = AtomicU64::new(0);

impl Exporter {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// Serialize `req` to a freshly created file and return its path.
    ///
    /// The document is assembled in memory in a single pass over the whole
    /// message run, then written out in one go; the file is closed before
    /// the path is returned. A failed write removes the partial file, so an
    /// export either produces a complete document or nothing.
    pub fn export(&self, req: &ExportRequest) -> Result<PathBuf> {
        // Oldest first in every output format.
        let chronological: Vec<&MessageRecord> = req.messages.iter().rev().collect();

        let mut doc: Vec<u8> = Vec::new();
        match req.format {
            ExportFormat::Html => render_html(&mut doc, &req.channel_name, &chronological)?,
            ExportFormat::Txt => render_txt(&mut doc, &chronological)?,
            ExportFormat::Json => render_json(&mut doc, &chronological)?,
            ExportFormat::Csv => render_csv(&mut doc, &chronological)?,
        }

        let path = self.unique_path(&req.channel_name, req.format);
        if let Err(e) = fs::write(&path, &doc) {
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        tracing::debug!(
            path = %path.display(),
            format = ?req.format,
            messages = req.messages.len(),
            "export written"
        );
        Ok(path)
    }

    fn unique_path(&self, channel_name: &str, format: ExportFormat) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let pid = std::process::id();
        let seq = EXPORT_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{}-{stamp}-{pid}-{seq}.{}",
            sanitize_file_stem(channel_name),
            format.extension()
        );
        self.temp_dir.join(name)
    }
}

/// Keep file names portable: anything outside `[A-Za-z0-9_-]` collapses to `-`.
fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "channel".to_string()
    } else {
        cleaned
    }
}

fn stamp(m: &MessageRecord) -> String {
    m.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn render_html<W: Write>(
    out: &mut W,
    channel_name: &str,
    messages: &[&MessageRecord],
) -> Result<()> {
    let title = escape_html(channel_name);
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(
        out,
        "<html><head><meta charset=\"utf-8\"><title>{title}</title></head><body>"
    )?;
    writeln!(out, "<h1>{title}</h1>")?;
    for m in messages {
        writeln!(
            out,
            "<p><b>{}</b> ({}): {}</p>",
            escape_html(&m.author_name),
            stamp(m),
            escape_html(&m.content)
        )?;
    }
    writeln!(out, "</body></html>")?;
    Ok(())
}

fn render_txt<W: Write>(out: &mut W, messages: &[&MessageRecord]) -> Result<()> {
    for m in messages {
        writeln!(out, "[{}] {}: {}", stamp(m), m.author_name, m.content)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonMessage<'a> {
    author: &'a str,
    content: &'a str,
    timestamp: String,
}

fn render_json<W: Write>(out: &mut W, messages: &[&MessageRecord]) -> Result<()> {
    let body: Vec<JsonMessage<'_>> = messages
        .iter()
        .map(|m| JsonMessage {
            author: &m.author_name,
            content: &m.content,
            timestamp: stamp(m),
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &body)?;
    writeln!(out)?;
    Ok(())
}

fn render_csv<W: Write>(out: &mut W, messages: &[&MessageRecord]) -> Result<()> {
    // Bare header, every data field quoted. Quoting is the csv crate's job
    // so embedded quotes and newlines stay RFC 4180 clean.
    writeln!(out, "Timestamp,Author,Content")?;

    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(out);
    for m in messages {
        wtr.write_record([stamp(m).as_str(), &m.author_name, &m.content])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(author: &str, content: &str, secs: i64) -> MessageRecord {
        MessageRecord {
            author_name: author.to_string(),
            content: content.to_string(),
            timestamp: chrono::Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    // Newest first, as the history API hands them out.
    fn newest_first() -> Vec<MessageRecord> {
        vec![
            msg("carol", "third", 1_704_067_320),
            msg("bob", "second", 1_704_067_260),
            msg("alice", "first", 1_704_067_200),
        ]
    }

    fn run_export(format: ExportFormat, messages: Vec<MessageRecord>) -> (String, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());
        let req = ExportRequest {
            channel_name: "general".to_string(),
            format,
            messages,
        };
        let path = exporter.export(&req).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        (body, path)
    }

    #[test]
    fn txt_renders_the_documented_line_shape() {
        let messages = vec![msg(
            "alice",
            "hi",
            chrono::Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .unwrap()
                .timestamp(),
        )];
        let (body, path) = run_export(ExportFormat::Txt, messages);
        assert_eq!(body, "[2024-01-01T00:00:00Z] alice: hi\n");
        assert_eq!(path.extension().unwrap(), "txt");
    }

    #[test]
    fn every_format_emits_oldest_first() {
        for format in [
            ExportFormat::Html,
            ExportFormat::Txt,
            ExportFormat::Json,
            ExportFormat::Csv,
        ] {
            let (body, _) = run_export(format, newest_first());
            let first = body.find("first").unwrap();
            let second = body.find("second").unwrap();
            let third = body.find("third").unwrap();
            assert!(first < second && second < third, "{format:?}: {body}");
        }
    }

    #[test]
    fn empty_input_yields_valid_empty_documents() {
        let (html, _) = run_export(ExportFormat::Html, vec![]);
        assert!(html.contains("<h1>general</h1>"));
        assert!(html.contains("</body></html>"));
        assert!(!html.contains("<p>"));

        let (txt, _) = run_export(ExportFormat::Txt, vec![]);
        assert!(txt.is_empty());

        let (json, _) = run_export(ExportFormat::Json, vec![]);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serde_json::json!([]));

        let (csv_body, _) = run_export(ExportFormat::Csv, vec![]);
        assert_eq!(csv_body, "Timestamp,Author,Content\n");
    }

    #[test]
    fn csv_doubles_embedded_quotes() {
        let (body, _) = run_export(
            ExportFormat::Csv,
            vec![msg("alice", r#"He said "hi""#, 1_704_067_200)],
        );
        assert!(body.contains(r#""He said ""hi""""#), "{body}");
    }

    #[test]
    fn csv_round_trips_newlines_in_content() {
        let (body, _) = run_export(
            ExportFormat::Csv,
            vec![msg("alice", "line one\nline two", 1_704_067_200)],
        );

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(body.as_bytes());
        let record = rdr.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "alice");
        assert_eq!(&record[2], "line one\nline two");
    }

    #[test]
    fn json_stays_valid_for_hostile_content() {
        let hostile = "back\\slash \"quote\"\nnewline \u{0007}bell";
        let (body, _) = run_export(
            ExportFormat::Json,
            vec![msg("alice", hostile, 1_704_067_200)],
        );

        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed[0]["author"], "alice");
        assert_eq!(parsed[0]["content"], hostile);
        assert_eq!(parsed[0]["timestamp"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn json_escapes_quotes() {
        let (body, _) = run_export(
            ExportFormat::Json,
            vec![msg("alice", r#"say "hi""#, 1_704_067_200)],
        );
        assert!(body.contains(r#"say \"hi\""#), "{body}");
    }

    #[test]
    fn html_escapes_markup_in_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());
        let req = ExportRequest {
            channel_name: "<general & \"misc\">".to_string(),
            format: ExportFormat::Html,
            messages: vec![msg("<b>alice</b>", "<script>alert(1)</script>", 1_704_067_200)],
        };
        let path = exporter.export(&req).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();

        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(body.contains("<h1>&lt;general &amp; &quot;misc&quot;&gt;</h1>"));
        assert!(body.contains("<b>&lt;b&gt;alice&lt;/b&gt;</b>"));
    }

    #[test]
    fn unrecognized_format_falls_back_to_html() {
        assert_eq!(ExportFormat::parse("xml"), ExportFormat::Html);
        assert_eq!(ExportFormat::parse(""), ExportFormat::Html);

        let (body, path) = run_export(ExportFormat::parse("xml"), newest_first());
        assert_eq!(path.extension().unwrap(), "html");
        assert!(body.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn known_format_names_parse_case_insensitively() {
        assert_eq!(ExportFormat::parse("CSV"), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse(" json "), ExportFormat::Json);
        assert_eq!(ExportFormat::parse("text"), ExportFormat::Txt);
        assert_eq!(ExportFormat::parse("Html"), ExportFormat::Html);
    }

    #[test]
    fn repeated_exports_never_share_a_path() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());
        let req = ExportRequest {
            channel_name: "general".to_string(),
            format: ExportFormat::Txt,
            messages: newest_first(),
        };

        let a = exporter.export(&req).unwrap();
        let b = exporter.export(&req).unwrap();
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
    }

    #[test]
    fn failed_export_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let exporter = Exporter::new(&missing);
        let req = ExportRequest {
            channel_name: "general".to_string(),
            format: ExportFormat::Txt,
            messages: newest_first(),
        };

        let err = exporter.export(&req).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
        assert!(!missing.exists());
    }

    #[test]
    fn channel_names_are_sanitized_for_file_names() {
        assert_eq!(sanitize_file_stem("general chat/⭐"), "general-chat--");
        assert_eq!(sanitize_file_stem(""), "channel");
        assert_eq!(sanitize_file_stem("dev_ops-2"), "dev_ops-2");
    }
}

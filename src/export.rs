//! Bulk export rendering: a filtered complaint set to CSV or PDF bytes.
//! Rendering is pure and deterministic (same rows in, same bytes out) and
//! never touches storage or complaint state. Row order is whatever the
//! unpaginated list query produced.

use anyhow::Result;

use crate::error::{AppError, AppResult};
use crate::model::Complaint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(AppError::validation("bad_format", format!("unsupported export format '{}'", other))),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "complaints.csv",
            ExportFormat::Pdf => "complaints.pdf",
        }
    }
}

pub fn render(rows: &[Complaint], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => render_csv(rows),
        ExportFormat::Pdf => Ok(render_pdf(rows)),
    }
}

const CSV_HEADER: [&str; 10] = [
    "id", "text", "submitted_by", "category", "status", "sentiment", "priority", "confidence", "created_at", "updated_at",
];

pub fn render_csv(rows: &[Complaint]) -> Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(CSV_HEADER)?;
    for c in rows {
        let confidence = c.confidence.map(|v| format!("{:.4}", v)).unwrap_or_default();
        let created = c.created_at.to_rfc3339();
        let updated = c.updated_at.map(|t| t.to_rfc3339()).unwrap_or_default();
        w.write_record([
            c.id.as_str(),
            c.text.as_str(),
            c.submitted_by.as_str(),
            c.category.as_str(),
            c.status.as_str(),
            c.sentiment.map(|s| s.as_str()).unwrap_or(""),
            c.priority.map(|p| p.as_str()).unwrap_or(""),
            confidence.as_str(),
            created.as_str(),
            updated.as_str(),
        ])?;
    }
    w.into_inner().map_err(|e| anyhow::anyhow!("csv flush failed: {}", e))
}

const PDF_LINES_PER_PAGE: usize = 54;

fn pdf_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' | '\r' | '\t' => out.push(' '),
            c if (c as u32) < 0x20 || (c as u32) > 0x7e => out.push('?'),
            c => out.push(c),
        }
    }
    out
}

fn complaint_line(c: &Complaint) -> String {
    format!(
        "{} | {} | {} | {} | {} | {} | {} | {}",
        c.id,
        c.submitted_by,
        c.category.as_str(),
        c.status.as_str(),
        c.sentiment.map(|s| s.as_str()).unwrap_or("-"),
        c.priority.map(|p| p.as_str()).unwrap_or("-"),
        c.created_at.format("%Y-%m-%d %H:%M:%S"),
        c.text,
    )
}

/// Minimal single-font PDF writer: one Courier text column, fixed leading,
/// page broken every PDF_LINES_PER_PAGE lines. Enough for an audit-friendly
/// dump without pulling in a rendering stack.
pub fn render_pdf(rows: &[Complaint]) -> Vec<u8> {
    let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 2);
    lines.push("Complaint Export".to_string());
    lines.push(format!("{} complaint(s)", rows.len()));
    for c in rows {
        lines.push(complaint_line(c));
    }

    let pages: Vec<&[String]> = lines.chunks(PDF_LINES_PER_PAGE).collect();
    let page_count = pages.len().max(1);

    // object layout: 1 catalog, 2 pages, 3 font, then (page, content) pairs
    let page_obj = |i: usize| 4 + 2 * i;
    let content_obj = |i: usize| 5 + 2 * i;
    let total_objects = 3 + 2 * page_count;

    let mut body: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; total_objects + 1];
    body.extend_from_slice(b"%PDF-1.4\n");

    let push_obj = |body: &mut Vec<u8>, offsets: &mut Vec<usize>, id: usize, payload: String| {
        offsets[id] = body.len();
        body.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, payload).as_bytes());
    };

    let kids: Vec<String> = (0..page_count).map(|i| format!("{} 0 R", page_obj(i))).collect();
    push_obj(&mut body, &mut offsets, 1, "<< /Type /Catalog /Pages 2 0 R >>".to_string());
    push_obj(
        &mut body,
        &mut offsets,
        2,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), page_count),
    );
    push_obj(
        &mut body,
        &mut offsets,
        3,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>".to_string(),
    );

    for i in 0..page_count {
        let empty: &[String] = &[];
        let page_lines = pages.get(i).copied().unwrap_or(empty);
        let mut stream = String::from("BT\n/F1 9 Tf\n12 TL\n50 780 Td\n");
        for (n, line) in page_lines.iter().enumerate() {
            if n > 0 {
                stream.push_str("T*\n");
            }
            stream.push_str(&format!("({}) Tj\n", pdf_escape(line)));
        }
        stream.push_str("ET");
        push_obj(
            &mut body,
            &mut offsets,
            page_obj(i),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                content_obj(i)
            ),
        );
        push_obj(
            &mut body,
            &mut offsets,
            content_obj(i),
            format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream),
        );
    }

    let xref_offset = body.len();
    body.extend_from_slice(format!("xref\n0 {}\n", total_objects + 1).as_bytes());
    body.extend_from_slice(b"0000000000 65535 f \n");
    for id in 1..=total_objects {
        body.extend_from_slice(format!("{:010} 00000 n \n", offsets[id]).as_bytes());
    }
    body.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            total_objects + 1,
            xref_offset
        )
        .as_bytes(),
    );
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Priority, Sentiment, Status};
    use chrono::{TimeZone, Utc};

    fn complaint(id: &str) -> Complaint {
        Complaint {
            id: id.into(),
            text: "box arrived \"crushed\", very late".into(),
            submitted_by: "alice".into(),
            category: Category::Delivery,
            status: Status::Pending,
            sentiment: Some(Sentiment::Negative),
            priority: Some(Priority::High),
            confidence: Some(0.8125),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn unsupported_format_is_a_validation_error() {
        assert_eq!(ExportFormat::parse("csv").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("pdf").unwrap(), ExportFormat::Pdf);
        let err = ExportFormat::parse("xlsx").unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn csv_has_header_and_one_row_per_complaint() {
        let bytes = render_csv(&[complaint("c1"), complaint("c2")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.trim_end().lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,text,submitted_by,category,status"));
        assert!(lines[1].contains("alice"));
        assert!(lines[1].contains("delivery"));
        assert!(lines[1].contains("0.8125"));
    }

    #[test]
    fn csv_quotes_embedded_delimiters() {
        let bytes = render_csv(&[complaint("c1")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        // text field contains commas and quotes, so the writer must quote it
        assert!(text.contains("\"box arrived \"\"crushed\"\", very late\""));
    }

    #[test]
    fn pdf_output_is_deterministic_and_well_formed() {
        let rows = vec![complaint("c1"), complaint("c2")];
        let a = render_pdf(&rows);
        let b = render_pdf(&rows);
        assert_eq!(a, b);
        assert!(a.starts_with(b"%PDF-1.4"));
        assert!(a.ends_with(b"%%EOF\n"));
        let text = String::from_utf8_lossy(&a);
        assert!(text.contains("/Count 1"));
        assert!(text.contains("(c1 | alice | delivery | pending"));
    }

    #[test]
    fn pdf_escapes_parentheses_in_text() {
        let mut c = complaint("c1");
        c.text = "paren (test) and \\slash".into();
        let text = String::from_utf8_lossy(&render_pdf(&[c])).to_string();
        assert!(text.contains("paren \\(test\\) and \\\\slash"));
    }

    #[test]
    fn long_exports_break_across_pages() {
        let rows: Vec<Complaint> = (0..120).map(|i| complaint(&format!("c{}", i))).collect();
        let text = String::from_utf8_lossy(&render_pdf(&rows)).to_string();
        // 122 lines at 54 per page = 3 pages
        assert!(text.contains("/Count 3"));
    }
}

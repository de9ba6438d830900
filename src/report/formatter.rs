//! Report formatter implementation

use super::{LayerReport, Report, ReportError, ReportFormat};
use crate::types::Layer;

/// Formats a report into the supported output formats. JSON is the
/// machine contract; text and markdown are renderings of the same data
/// for humans and reviews.
pub struct ReportFormatter;

impl ReportFormatter {
    pub fn format(report: &Report, format: ReportFormat) -> Result<String, ReportError> {
        match format {
            ReportFormat::Json => Self::to_json(report),
            ReportFormat::PlainText => Self::to_text(report),
            ReportFormat::Markdown => Self::to_markdown(report),
        }
    }

    fn to_json(report: &Report) -> Result<String, ReportError> {
        serde_json::to_string_pretty(report)
            .map_err(|e| ReportError::SerializationError(e.to_string()))
    }

    fn to_text(report: &Report) -> Result<String, ReportError> {
        let mut out = String::new();
        out.push_str("Document Verification Report\n");
        out.push_str("============================\n\n");

        out.push_str(&format!("Generated:  {}\n", report.generated_at));
        out.push_str(&format!("Run:        {}\n", report.run_id));
        out.push_str(&format!(
            "Document:   {} ({}, {} pages)\n",
            report.document_hash, report.preprocess.kind, report.preprocess.page_count
        ));
        if let Some(routing) = &report.routing {
            out.push_str(&format!("Route:      {}\n", routing.reason));
        }
        out.push_str(&format!("Verdict:    {}\n", report.verdict.overall));
        if report.cancelled {
            out.push_str("Note:       run was cancelled; verdict is partial\n");
        }
        out.push('\n');

        out.push_str("Layers:\n");
        for (layer, layer_report) in Self::layers(report) {
            out.push_str(&format!(
                "- {:<9} {:<9} {} finding(s), {} ms\n",
                layer,
                layer_report.status.as_str(),
                layer_report.findings.len(),
                layer_report.duration_ms
            ));
            for finding in &layer_report.findings {
                out.push_str(&format!(
                    "    [{}] {} ({})\n",
                    finding.id, finding.code, finding.severity
                ));
            }
            if let Some(error) = &layer_report.error {
                out.push_str(&format!("    error: {error}\n"));
            }
        }

        if !report.verdict.reasons.is_empty() {
            out.push_str("\nReasons:\n");
            for reason in &report.verdict.reasons {
                out.push_str(&format!("- {reason}\n"));
            }
        }

        Ok(out)
    }

    fn to_markdown(report: &Report) -> Result<String, ReportError> {
        let mut md = String::new();
        md.push_str("# Document Verification Report\n\n");

        md.push_str(&format!("- **Document**: `{}`\n", report.document_hash));
        md.push_str(&format!("- **Kind**: {}\n", report.preprocess.kind));
        md.push_str(&format!("- **Pages**: {}\n", report.preprocess.page_count));
        md.push_str(&format!("- **Verdict**: **{}**\n", report.verdict.overall));
        md.push_str(&format!("- **Duration**: {} ms\n\n", report.duration_ms));

        md.push_str("## Layers\n\n");
        md.push_str("| Layer | Status | Findings | Duration |\n");
        md.push_str("|-------|--------|----------|----------|\n");
        for (layer, layer_report) in Self::layers(report) {
            md.push_str(&format!(
                "| {} | {} | {} | {} ms |\n",
                layer,
                layer_report.status.as_str(),
                layer_report.findings.len(),
                layer_report.duration_ms
            ));
        }

        let findings: Vec<_> = Self::layers(report)
            .into_iter()
            .flat_map(|(_, l)| l.findings.iter())
            .collect();
        if !findings.is_empty() {
            md.push_str("\n## Findings\n\n");
            md.push_str("| Id | Severity | Code |\n");
            md.push_str("|----|----------|------|\n");
            for finding in findings {
                md.push_str(&format!(
                    "| `{}` | {} | {} |\n",
                    finding.id, finding.severity, finding.code
                ));
            }
        }

        if !report.verdict.reasons.is_empty() {
            md.push_str("\n## Reasons\n\n");
            for reason in &report.verdict.reasons {
                md.push_str(&format!("- `{reason}`\n"));
            }
        }

        Ok(md)
    }

    fn layers(report: &Report) -> [(Layer, &LayerReport); 4] {
        [
            (Layer::Signature, &report.per_layer.signature),
            (Layer::Structure, &report.per_layer.structure),
            (Layer::Visual, &report.per_layer.visual),
            (Layer::Text, &report.per_layer.text),
        ]
    }
}

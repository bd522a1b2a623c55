#![forbid(unsafe_code)]

use leadflow_kernel_contracts::query::{AssigneeFilter, LeadQuery};
use leadflow_storage::repo::LeadRepo;

use crate::error::OpError;

pub const EXPORT_SCAN_LIMIT: u16 = 5000;

const EXPORT_HEADER: &str = "ID,Company Name,FRN,Email,Phone,Status,Assigned To,Created At";

/// Whole-collection CSV export, newest first, admin surface only (the
/// adapter enforces the role). Free-text fields are quoted so embedded
/// commas survive.
#[derive(Debug, Clone, Default)]
pub struct ExportRuntime;

impl ExportRuntime {
    pub fn run<R: LeadRepo>(&self, store: &R) -> Result<String, OpError> {
        let page = store.list_leads(&LeadQuery {
            search: None,
            status: None,
            assigned: AssigneeFilter::Any,
            cursor: None,
            limit: EXPORT_SCAN_LIMIT,
        })?;

        let mut out = String::from(EXPORT_HEADER);
        for lead in &page.documents {
            out.push('\n');
            out.push_str(lead.id.as_str());
            out.push(',');
            push_quoted(&mut out, &lead.company_name);
            out.push(',');
            push_quoted(&mut out, lead.frn.as_str());
            out.push(',');
            push_quoted(&mut out, lead.contact_email.as_deref().unwrap_or(""));
            out.push(',');
            push_quoted(&mut out, lead.contact_phone.as_deref().unwrap_or(""));
            out.push(',');
            out.push_str(lead.pipeline_status.as_str());
            out.push(',');
            out.push_str(
                lead.assigned_employee_id
                    .as_ref()
                    .map(|id| id.as_str())
                    .unwrap_or("Unassigned"),
            );
            out.push(',');
            out.push_str(&lead.created_at.0.to_string());
        }
        Ok(out)
    }
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}

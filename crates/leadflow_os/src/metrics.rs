#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::Serialize;

use leadflow_kernel_contracts::lead::PIPELINE_STATUSES;
use leadflow_kernel_contracts::principal::PrincipalId;
use leadflow_kernel_contracts::query::{AssigneeFilter, LeadQuery};
use leadflow_storage::repo::LeadRepo;

use crate::error::OpError;

pub const METRICS_SCAN_LIMIT: u16 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsBucket {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub total_leads: u64,
    pub status_data: Vec<MetricsBucket>,
    pub employee_data: Vec<MetricsBucket>,
}

/// In-memory aggregation over the lead collection: stage distribution
/// (every stage zero-filled) and per-employee load. Employee names come
/// from the identity collaborator and are passed in explicitly; unknown
/// assignees keep their raw id out of the report.
#[derive(Debug, Clone, Default)]
pub struct MetricsRuntime;

impl MetricsRuntime {
    pub fn run<R: LeadRepo>(
        &self,
        store: &R,
        employee_names: &BTreeMap<PrincipalId, String>,
    ) -> Result<MetricsReport, OpError> {
        let page = store.list_leads(&LeadQuery {
            search: None,
            status: None,
            assigned: AssigneeFilter::Any,
            cursor: None,
            limit: METRICS_SCAN_LIMIT,
        })?;

        let mut by_status: BTreeMap<&'static str, u64> = PIPELINE_STATUSES
            .iter()
            .map(|s| (s.as_str(), 0u64))
            .collect();
        let mut by_employee: BTreeMap<String, u64> = BTreeMap::new();

        for lead in &page.documents {
            *by_status.entry(lead.pipeline_status.as_str()).or_insert(0) += 1;
            let bucket = match &lead.assigned_employee_id {
                Some(id) => employee_names
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                None => "Unassigned".to_string(),
            };
            *by_employee.entry(bucket).or_insert(0) += 1;
        }

        // Stage buckets keep pipeline order, not map order.
        let status_data = PIPELINE_STATUSES
            .iter()
            .map(|s| MetricsBucket {
                name: s.as_str().to_string(),
                value: by_status[s.as_str()],
            })
            .collect();
        let employee_data = by_employee
            .into_iter()
            .map(|(name, value)| MetricsBucket { name, value })
            .collect();

        Ok(MetricsReport {
            total_leads: page.total,
            status_data,
            employee_data,
        })
    }
}

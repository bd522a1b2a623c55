#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use leadflow_kernel_contracts::import::{ImportDetails, ImportSummary};
use leadflow_kernel_contracts::lead::{HistoryActor, LeadId, LeadRecord, PipelineStatus};
use leadflow_kernel_contracts::ops::{ClaimRequest, StatusUpdateRequest};
use leadflow_kernel_contracts::principal::{Principal, PrincipalId, Role};
use leadflow_kernel_contracts::query::{AssigneeFilter, LeadPage, RequestedLeadQuery};
use leadflow_kernel_contracts::{ContractViolation, MonotonicTimeNs};
use leadflow_os::claim::ClaimRuntime;
use leadflow_os::error::OpError;
use leadflow_os::export::ExportRuntime;
use leadflow_os::import::ImportRuntime;
use leadflow_os::leads::LeadDirectoryRuntime;
use leadflow_os::metrics::{MetricsReport, MetricsRuntime};
use leadflow_os::pipeline::StatusUpdateRuntime;
use leadflow_storage::leads::LeadStore;

pub mod reason_codes {
    use leadflow_kernel_contracts::ReasonCodeId;

    pub const ADAPTER_SESSION_MISSING: ReasonCodeId = ReasonCodeId(0xAD70_00F1);
    pub const ADAPTER_SESSION_UNKNOWN: ReasonCodeId = ReasonCodeId(0xAD70_00F2);
    pub const ADAPTER_ADMIN_REQUIRED: ReasonCodeId = ReasonCodeId(0xAD70_00F3);
    pub const ADAPTER_FILE_NOT_FOUND: ReasonCodeId = ReasonCodeId(0xAD70_00F4);
}

// ---------------------------------------------------------------------------
// Wire DTOs. Field names mirror the persisted document schema; contract
// types never cross the HTTP boundary directly.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HistoryEventDto {
    pub by: String,
    pub action: String,
    pub ts_ns: u64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LeadDto {
    pub id: String,
    pub frn: String,
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub service_type: Option<String>,
    pub website: Option<String>,
    #[serde(rename = "assignedEmployeeId")]
    pub assigned_employee_id: Option<String>,
    #[serde(rename = "pipelineStatus")]
    pub pipeline_status: String,
    pub history: Vec<HistoryEventDto>,
    #[serde(rename = "createdAt")]
    pub created_at_ns: u64,
    pub sequence: u64,
}

impl LeadDto {
    fn from_record(lead: &LeadRecord) -> Self {
        Self {
            id: lead.id.as_str().to_string(),
            frn: lead.frn.as_str().to_string(),
            company_name: lead.company_name.clone(),
            contact_email: lead.contact_email.clone(),
            contact_phone: lead.contact_phone.clone(),
            service_type: lead.service_type.clone(),
            website: lead.website.clone(),
            assigned_employee_id: lead
                .assigned_employee_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
            pipeline_status: lead.pipeline_status.as_str().to_string(),
            history: lead
                .history
                .iter()
                .map(|e| HistoryEventDto {
                    by: match &e.actor {
                        HistoryActor::Principal(id) => id.as_str().to_string(),
                        HistoryActor::System => "system".to_string(),
                    },
                    action: e.action.clone(),
                    ts_ns: e.at.0,
                })
                .collect(),
            created_at_ns: lead.created_at.0,
            sequence: lead.sequence,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LeadPageDto {
    pub documents: Vec<LeadDto>,
    pub total: u64,
}

impl LeadPageDto {
    fn from_page(page: &LeadPage) -> Self {
        Self {
            documents: page.documents.iter().map(LeadDto::from_record).collect(),
            total: page.total,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClaimBody {
    #[serde(rename = "leadId")]
    pub lead_id: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StatusPatchBody {
    #[serde(rename = "pipelineStatus")]
    pub pipeline_status: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ListParams {
    pub cursor: Option<String>,
    pub search: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "assignedTo")]
    pub assigned_to: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct UploadCsvBody {
    pub filename: Option<String>,
    #[serde(rename = "contentBase64")]
    pub content_base64: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadCsvResponse {
    #[serde(rename = "fileId")]
    pub file_id: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProcessCsvBody {
    #[serde(rename = "fileId")]
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProcessCsvResponse {
    pub success: bool,
    pub summary: ImportSummary,
    pub details: ImportDetails,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub lead_count: u64,
    pub session_count: u64,
}

/// HTTP status for each operation error; exact codes are part of the
/// external contract.
pub fn http_status_for(e: &OpError) -> u16 {
    match e {
        OpError::Authentication { .. } => 401,
        OpError::Authorization { .. } => 403,
        OpError::Validation { .. } => 400,
        OpError::Conflict { .. } => 409,
        OpError::NotFound { .. } => 404,
        OpError::Storage(_) => 500,
    }
}

pub fn error_message(e: &OpError) -> String {
    match e {
        OpError::Authentication { reason, .. } => (*reason).to_string(),
        OpError::Authorization { reason, .. } => (*reason).to_string(),
        OpError::Validation { violation, .. } => match violation {
            ContractViolation::InvalidValue { field, reason } => format!("{field}: {reason}"),
            ContractViolation::InvalidRange { field, .. } => format!("{field}: out of range"),
        },
        OpError::Conflict { reason, .. } => (*reason).to_string(),
        OpError::NotFound { what, key, .. } => format!("{what} {key} not found"),
        OpError::Storage(_) => "internal server error".to_string(),
    }
}

/// Extract the session token from an `Authorization: Bearer <token>`
/// header value.
pub fn bearer_token(header_value: Option<&str>) -> Option<&str> {
    header_value
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn system_time_now_ns() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(1);
    if nanos > u64::MAX as u128 {
        u64::MAX
    } else {
        nanos as u64
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// One process-wide runtime: the lead store, the session directory
/// resolved from the identity collaborator, the uploaded-file object
/// store, and the orchestration runtimes. Every handler resolves its
/// principal here explicitly; there is no ambient identity and no
/// bypass credential.
#[derive(Debug, Default)]
pub struct AdapterRuntime {
    store: LeadStore,
    sessions: BTreeMap<String, Principal>,
    files: BTreeMap<String, Vec<u8>>,
    claim_runtime: ClaimRuntime,
    status_runtime: StatusUpdateRuntime,
    directory_runtime: LeadDirectoryRuntime,
    import_runtime: ImportRuntime,
    metrics_runtime: MetricsRuntime,
    export_runtime: ExportRuntime,
}

impl AdapterRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a runtime seeded from `LEADFLOW_SESSIONS`:
    /// `token:principal_id:email:name:role[+role]` entries separated by
    /// commas. An unset variable yields an empty session directory (every
    /// request is then unauthenticated).
    pub fn default_from_env() -> Result<Self, String> {
        let mut runtime = Self::new();
        let raw = match env::var("LEADFLOW_SESSIONS") {
            Ok(v) => v,
            Err(_) => return Ok(runtime),
        };
        for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
            let parts: Vec<&str> = entry.trim().split(':').collect();
            if parts.len() != 5 {
                return Err(format!(
                    "LEADFLOW_SESSIONS entry must have 5 ':'-separated fields, got {}",
                    parts.len()
                ));
            }
            let mut roles = BTreeSet::new();
            for label in parts[4].split('+') {
                match Role::parse(label.trim()) {
                    Some(role) => {
                        roles.insert(role);
                    }
                    None => return Err(format!("unknown role label: {label}")),
                }
            }
            let principal = PrincipalId::new(parts[1])
                .and_then(|id| Principal::v1(id, parts[2], parts[3], roles))
                .map_err(|v| format!("invalid LEADFLOW_SESSIONS principal: {v:?}"))?;
            runtime.insert_session(parts[0], principal);
        }
        Ok(runtime)
    }

    pub fn insert_session(&mut self, token: impl Into<String>, principal: Principal) {
        self.sessions.insert(token.into(), principal);
    }

    pub fn store_mut(&mut self) -> &mut LeadStore {
        &mut self.store
    }

    fn principal_for(&self, token: Option<&str>) -> Result<Principal, OpError> {
        let token = token.ok_or(OpError::Authentication {
            code: reason_codes::ADAPTER_SESSION_MISSING,
            reason: "authentication required",
        })?;
        self.sessions
            .get(token)
            .cloned()
            .ok_or(OpError::Authentication {
                code: reason_codes::ADAPTER_SESSION_UNKNOWN,
                reason: "invalid or expired session",
            })
    }

    fn require_admin(principal: &Principal) -> Result<(), OpError> {
        if principal.is_admin() {
            Ok(())
        } else {
            Err(OpError::Authorization {
                code: reason_codes::ADAPTER_ADMIN_REQUIRED,
                reason: "admin role required",
            })
        }
    }

    fn now() -> MonotonicTimeNs {
        MonotonicTimeNs(system_time_now_ns())
    }

    /// Names of every principal known to the session directory, keyed by
    /// id. Admins can claim too, so the map is not limited to the
    /// employee role. Stands in for the identity collaborator's member
    /// listing.
    fn principal_names(&self) -> BTreeMap<PrincipalId, String> {
        self.sessions
            .values()
            .map(|p| (p.id.clone(), p.name.clone()))
            .collect()
    }

    pub fn claim(&mut self, token: Option<&str>, body: &ClaimBody) -> Result<LeadDto, OpError> {
        let principal = self.principal_for(token)?;
        let lead_id = required_lead_id(body.lead_id.as_deref(), "leadId")?;
        let lead = self.claim_runtime.run(
            &mut self.store,
            &ClaimRequest {
                lead_id,
                principal,
                now: Self::now(),
            },
        )?;
        Ok(LeadDto::from_record(&lead))
    }

    pub fn set_status(
        &mut self,
        token: Option<&str>,
        lead_id_raw: &str,
        body: &StatusPatchBody,
    ) -> Result<LeadDto, OpError> {
        let principal = self.principal_for(token)?;
        let lead_id = required_lead_id(Some(lead_id_raw), "id")?;
        let new_status_raw = body
            .pipeline_status
            .clone()
            .ok_or(OpError::Validation {
                code: leadflow_os::error::reason_codes::OP_CONTRACT_INVALID,
                violation: ContractViolation::InvalidValue {
                    field: "pipelineStatus",
                    reason: "is required",
                },
            })?;
        let lead = self.status_runtime.run(
            &mut self.store,
            &StatusUpdateRequest {
                lead_id,
                principal,
                new_status_raw,
                now: Self::now(),
            },
        )?;
        Ok(LeadDto::from_record(&lead))
    }

    pub fn list(&self, token: Option<&str>, params: &ListParams) -> Result<LeadPageDto, OpError> {
        let principal = self.principal_for(token)?;
        let requested = requested_query(params)?;
        let page = self
            .directory_runtime
            .list(&self.store, &principal, &requested)?;
        Ok(LeadPageDto::from_page(&page))
    }

    pub fn get_lead(&self, token: Option<&str>, lead_id_raw: &str) -> Result<LeadDto, OpError> {
        let principal = self.principal_for(token)?;
        let lead_id = required_lead_id(Some(lead_id_raw), "id")?;
        let lead = self
            .directory_runtime
            .get(&self.store, &principal, &lead_id)?;
        Ok(LeadDto::from_record(&lead))
    }

    pub fn upload_csv(
        &mut self,
        token: Option<&str>,
        body: &UploadCsvBody,
    ) -> Result<UploadCsvResponse, OpError> {
        let principal = self.principal_for(token)?;
        Self::require_admin(&principal)?;
        let encoded = body.content_base64.as_deref().ok_or(OpError::Validation {
            code: leadflow_os::error::reason_codes::OP_CONTRACT_INVALID,
            violation: ContractViolation::InvalidValue {
                field: "contentBase64",
                reason: "is required",
            },
        })?;
        let bytes = BASE64.decode(encoded).map_err(|_| OpError::Validation {
            code: leadflow_os::error::reason_codes::OP_CONTRACT_INVALID,
            violation: ContractViolation::InvalidValue {
                field: "contentBase64",
                reason: "is not valid base64",
            },
        })?;

        // Content-addressed: re-uploading the same bytes yields the same id.
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();
        let mut file_id = String::with_capacity(64);
        for byte in digest {
            file_id.push_str(&format!("{byte:02x}"));
        }
        self.files.insert(file_id.clone(), bytes);
        Ok(UploadCsvResponse { file_id })
    }

    pub fn process_csv(
        &mut self,
        token: Option<&str>,
        body: &ProcessCsvBody,
    ) -> Result<ProcessCsvResponse, OpError> {
        let principal = self.principal_for(token)?;
        Self::require_admin(&principal)?;
        let file_id = body.file_id.as_deref().ok_or(OpError::Validation {
            code: leadflow_os::error::reason_codes::OP_CONTRACT_INVALID,
            violation: ContractViolation::InvalidValue {
                field: "fileId",
                reason: "is required",
            },
        })?;
        let bytes = self
            .files
            .get(file_id)
            .cloned()
            .ok_or_else(|| OpError::NotFound {
                code: reason_codes::ADAPTER_FILE_NOT_FOUND,
                what: "file",
                key: file_id.to_string(),
            })?;
        let report = self
            .import_runtime
            .run(&mut self.store, &bytes, Self::now())?;
        Ok(ProcessCsvResponse {
            success: true,
            summary: report.summary,
            details: report.details,
        })
    }

    pub fn metrics(&self, token: Option<&str>) -> Result<MetricsReport, OpError> {
        let principal = self.principal_for(token)?;
        Self::require_admin(&principal)?;
        self.metrics_runtime
            .run(&self.store, &self.principal_names())
    }

    pub fn export_csv(&self, token: Option<&str>) -> Result<String, OpError> {
        let principal = self.principal_for(token)?;
        Self::require_admin(&principal)?;
        self.export_runtime.run(&self.store)
    }

    pub fn health_report(&self) -> AdapterHealthResponse {
        AdapterHealthResponse {
            status: "ok".to_string(),
            lead_count: self.store.len() as u64,
            session_count: self.sessions.len() as u64,
        }
    }
}

fn required_lead_id(raw: Option<&str>, field: &'static str) -> Result<LeadId, OpError> {
    let raw = raw.ok_or(OpError::Validation {
        code: leadflow_os::error::reason_codes::OP_CONTRACT_INVALID,
        violation: ContractViolation::InvalidValue {
            field,
            reason: "is required",
        },
    })?;
    Ok(LeadId::new(raw)?)
}

fn requested_query(params: &ListParams) -> Result<RequestedLeadQuery, OpError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(PipelineStatus::parse(raw)?),
        None => None,
    };
    let assigned = match params.assigned_to.as_deref() {
        None => AssigneeFilter::Any,
        Some("null") => AssigneeFilter::Unassigned,
        Some(id) => AssigneeFilter::Principal(PrincipalId::new(id)?),
    };
    let cursor = match params.cursor.as_deref() {
        Some(raw) => Some(LeadId::new(raw)?),
        None => None,
    };
    // Unparseable limits fall back to the default; the cap is applied by
    // the access filter.
    let limit = params
        .limit
        .as_deref()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(leadflow_kernel_contracts::query::LIST_LIMIT_DEFAULT);
    Ok(RequestedLeadQuery {
        search: params.search.clone(),
        status,
        assigned,
        cursor,
        limit,
    })
}

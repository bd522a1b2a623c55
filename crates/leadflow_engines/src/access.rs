#![forbid(unsafe_code)]

use std::cmp::min;

use leadflow_kernel_contracts::lead::{LeadRecord, PipelineStatus};
use leadflow_kernel_contracts::principal::Principal;
use leadflow_kernel_contracts::query::{
    AssigneeFilter, LeadQuery, RequestedLeadQuery, LIST_LIMIT_CAP, LIST_LIMIT_DEFAULT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFilterConfig {
    pub list_limit_cap: u16,
    pub list_limit_default: u16,
}

impl AccessFilterConfig {
    pub fn mvp_v1() -> Self {
        Self {
            list_limit_cap: LIST_LIMIT_CAP,
            list_limit_default: LIST_LIMIT_DEFAULT,
        }
    }
}

/// Row-level authorization. Pure with respect to the store: computes what
/// I/O is permitted, never issues any itself.
#[derive(Debug, Clone)]
pub struct AccessFilterRuntime {
    config: AccessFilterConfig,
}

impl AccessFilterRuntime {
    pub fn new(config: AccessFilterConfig) -> Self {
        Self { config }
    }

    /// Narrow a client-supplied filter set to what the store may execute.
    ///
    /// Admins pass through under the hard page-size cap. Non-admins are
    /// held to exactly two shapes: unclaimed leads, or their own leads.
    /// Asking for the `Unassigned` stage with no assignee filter counts
    /// as the unclaimed shape. Anything else is silently overridden to
    /// their own leads rather than erroring.
    pub fn sanitize_list_query(
        &self,
        principal: &Principal,
        requested: &RequestedLeadQuery,
    ) -> LeadQuery {
        let limit = if requested.limit == 0 {
            self.config.list_limit_default
        } else {
            min(requested.limit, self.config.list_limit_cap)
        };

        let assigned = if principal.is_admin() {
            requested.assigned.clone()
        } else {
            match &requested.assigned {
                AssigneeFilter::Unassigned => AssigneeFilter::Unassigned,
                AssigneeFilter::Principal(id) if *id == principal.id => {
                    AssigneeFilter::Principal(principal.id.clone())
                }
                AssigneeFilter::Any
                    if requested.status == Some(PipelineStatus::Unassigned) =>
                {
                    AssigneeFilter::Unassigned
                }
                AssigneeFilter::Any | AssigneeFilter::Principal(_) => {
                    AssigneeFilter::Principal(principal.id.clone())
                }
            }
        };

        LeadQuery {
            search: requested.search.clone(),
            status: requested.status,
            assigned,
            cursor: requested.cursor.clone(),
            limit,
        }
    }

    /// Single-document fetch rule: admin, unclaimed, or owner.
    pub fn can_view(&self, principal: &Principal, lead: &LeadRecord) -> bool {
        principal.is_admin()
            || lead.is_unclaimed()
            || lead.assigned_employee_id.as_ref() == Some(&principal.id)
    }

    /// Mutation rule: admin or current assignee. Enforced independently
    /// of the list filter.
    pub fn can_update(&self, principal: &Principal, lead: &LeadRecord) -> bool {
        principal.is_admin() || lead.assigned_employee_id.as_ref() == Some(&principal.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use leadflow_kernel_contracts::lead::{Frn, LeadId, PipelineStatus};
    use leadflow_kernel_contracts::principal::{PrincipalId, Role};
    use leadflow_kernel_contracts::MonotonicTimeNs;

    fn admin() -> Principal {
        Principal::v1(
            PrincipalId::new("adm_1").unwrap(),
            "admin@example.com",
            "Admin One",
            BTreeSet::from([Role::Admin]),
        )
        .unwrap()
    }

    fn employee(id: &str) -> Principal {
        Principal::v1(
            PrincipalId::new(id).unwrap(),
            format!("{id}@example.com"),
            "Employee",
            BTreeSet::from([Role::Employee]),
        )
        .unwrap()
    }

    fn lead(assignee: Option<&str>) -> LeadRecord {
        let assigned = assignee.map(|id| PrincipalId::new(id).unwrap());
        LeadRecord {
            id: LeadId::new("lead_1").unwrap(),
            frn: Frn::new("1234567890").unwrap(),
            company_name: "Acme".to_string(),
            contact_email: None,
            contact_phone: None,
            service_type: None,
            website: None,
            pipeline_status: if assigned.is_some() {
                PipelineStatus::EmailSent
            } else {
                PipelineStatus::Unassigned
            },
            assigned_employee_id: assigned,
            history: vec![],
            created_at: MonotonicTimeNs(1),
            sequence: 1,
        }
    }

    fn runtime() -> AccessFilterRuntime {
        AccessFilterRuntime::new(AccessFilterConfig::mvp_v1())
    }

    #[test]
    fn at_access_01_admin_filters_pass_through_with_limit_cap() {
        let requested = RequestedLeadQuery {
            search: Some("acme".to_string()),
            status: Some(PipelineStatus::Approved),
            assigned: AssigneeFilter::Principal(PrincipalId::new("emp_2").unwrap()),
            cursor: None,
            limit: 500,
        };
        let q = runtime().sanitize_list_query(&admin(), &requested);
        assert_eq!(q.search.as_deref(), Some("acme"));
        assert_eq!(q.status, Some(PipelineStatus::Approved));
        assert_eq!(
            q.assigned,
            AssigneeFilter::Principal(PrincipalId::new("emp_2").unwrap())
        );
        assert_eq!(q.limit, 100);
    }

    #[test]
    fn at_access_02_employee_unassigned_shape_is_honored() {
        let requested = RequestedLeadQuery {
            status: Some(PipelineStatus::Unassigned),
            assigned: AssigneeFilter::Unassigned,
            ..RequestedLeadQuery::unfiltered()
        };
        let q = runtime().sanitize_list_query(&employee("emp_1"), &requested);
        assert_eq!(q.assigned, AssigneeFilter::Unassigned);
    }

    #[test]
    fn at_access_03_employee_own_leads_shape_is_honored() {
        let requested = RequestedLeadQuery {
            assigned: AssigneeFilter::Principal(PrincipalId::new("emp_1").unwrap()),
            ..RequestedLeadQuery::unfiltered()
        };
        let q = runtime().sanitize_list_query(&employee("emp_1"), &requested);
        assert_eq!(
            q.assigned,
            AssigneeFilter::Principal(PrincipalId::new("emp_1").unwrap())
        );
    }

    #[test]
    fn at_access_04_employee_snooping_is_overridden_to_own_leads() {
        let own = AssigneeFilter::Principal(PrincipalId::new("emp_1").unwrap());

        let other = RequestedLeadQuery {
            assigned: AssigneeFilter::Principal(PrincipalId::new("emp_2").unwrap()),
            ..RequestedLeadQuery::unfiltered()
        };
        assert_eq!(
            runtime()
                .sanitize_list_query(&employee("emp_1"), &other)
                .assigned,
            own
        );

        let unfiltered = RequestedLeadQuery::unfiltered();
        assert_eq!(
            runtime()
                .sanitize_list_query(&employee("emp_1"), &unfiltered)
                .assigned,
            own
        );

        let status_without_ownership = RequestedLeadQuery {
            status: Some(PipelineStatus::Approved),
            ..RequestedLeadQuery::unfiltered()
        };
        assert_eq!(
            runtime()
                .sanitize_list_query(&employee("emp_1"), &status_without_ownership)
                .assigned,
            own
        );
    }

    #[test]
    fn at_access_05_zero_limit_falls_back_to_default() {
        let requested = RequestedLeadQuery {
            limit: 0,
            ..RequestedLeadQuery::unfiltered()
        };
        let q = runtime().sanitize_list_query(&employee("emp_1"), &requested);
        assert_eq!(q.limit, LIST_LIMIT_DEFAULT);
    }

    #[test]
    fn at_access_06_single_document_rules() {
        let r = runtime();
        let e1 = employee("emp_1");

        assert!(r.can_view(&e1, &lead(None)));
        assert!(r.can_view(&e1, &lead(Some("emp_1"))));
        assert!(!r.can_view(&e1, &lead(Some("emp_2"))));
        assert!(r.can_view(&admin(), &lead(Some("emp_2"))));

        assert!(!r.can_update(&e1, &lead(None)));
        assert!(r.can_update(&e1, &lead(Some("emp_1"))));
        assert!(!r.can_update(&e1, &lead(Some("emp_2"))));
        assert!(r.can_update(&admin(), &lead(Some("emp_2"))));
    }

    #[test]
    fn at_access_07_unassigned_stage_alone_selects_the_pool() {
        // Asking for the Unassigned stage without an assignee filter is
        // the unclaimed-pool shape, not a snooping attempt.
        let requested = RequestedLeadQuery {
            status: Some(PipelineStatus::Unassigned),
            ..RequestedLeadQuery::unfiltered()
        };
        let q = runtime().sanitize_list_query(&employee("emp_1"), &requested);
        assert_eq!(q.assigned, AssigneeFilter::Unassigned);
        assert_eq!(q.status, Some(PipelineStatus::Unassigned));
    }
}

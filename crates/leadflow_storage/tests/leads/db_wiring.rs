#![forbid(unsafe_code)]

use leadflow_kernel_contracts::lead::{
    Frn, HistoryActor, HistoryEvent, LeadCreateInput, PipelineStatus,
};
use leadflow_kernel_contracts::principal::PrincipalId;
use leadflow_kernel_contracts::query::{AssigneeFilter, LeadQuery};
use leadflow_kernel_contracts::MonotonicTimeNs;
use leadflow_storage::leads::{LeadStore, StorageError};
use leadflow_storage::repo::LeadRepo;

fn input(frn: &str, company: &str) -> LeadCreateInput {
    LeadCreateInput::v1(Frn::new(frn).unwrap(), company, None, None, None, None).unwrap()
}

fn seed(at: u64) -> Vec<HistoryEvent> {
    vec![HistoryEvent::v1(HistoryActor::System, "csv_import", MonotonicTimeNs(at)).unwrap()]
}

fn query(assigned: AssigneeFilter, limit: u16) -> LeadQuery {
    LeadQuery {
        search: None,
        status: None,
        assigned,
        cursor: None,
        limit,
    }
}

#[test]
fn at_leads_db_01_create_assigns_id_and_seeds_document() {
    let mut s = LeadStore::new_in_memory();
    let lead = s
        .create_lead(input("1234567890", "Acme"), seed(5), MonotonicTimeNs(5))
        .unwrap();

    assert!(lead.id.as_str().starts_with("lead_"));
    assert_eq!(lead.pipeline_status, PipelineStatus::Unassigned);
    assert!(lead.assigned_employee_id.is_none());
    assert_eq!(lead.created_at, MonotonicTimeNs(5));
    assert_eq!(lead.sequence, 1);
    assert_eq!(lead.history.len(), 1);
    assert_eq!(s.get_lead(&lead.id), Some(&lead));
}

#[test]
fn at_leads_db_02_ids_are_unique_across_identical_frns() {
    let mut s = LeadStore::new_in_memory();
    let a = s
        .create_lead(input("1234567890", "Acme"), vec![], MonotonicTimeNs(1))
        .unwrap();
    let b = s
        .create_lead(input("1234567890", "Acme Again"), vec![], MonotonicTimeNs(2))
        .unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(s.len(), 2);
}

#[test]
fn at_leads_db_03_update_is_whole_document_and_bumps_sequence() {
    let mut s = LeadStore::new_in_memory();
    let mut lead = s
        .create_lead(input("1234567890", "Acme"), vec![], MonotonicTimeNs(1))
        .unwrap();

    let claimant = PrincipalId::new("emp_1").unwrap();
    lead.assigned_employee_id = Some(claimant.clone());
    lead.pipeline_status = PipelineStatus::EmailSent;
    lead.history.push(
        HistoryEvent::v1(
            HistoryActor::Principal(claimant.clone()),
            "claimed",
            MonotonicTimeNs(9),
        )
        .unwrap(),
    );

    let updated = s.update_lead(lead.clone()).unwrap();
    assert_eq!(updated.sequence, 2);
    assert_eq!(updated.assigned_employee_id, Some(claimant));
    assert_eq!(s.get_lead(&lead.id).unwrap().sequence, 2);
}

#[test]
fn at_leads_db_04_update_of_unknown_document_is_not_found() {
    let mut s = LeadStore::new_in_memory();
    let lead = s
        .create_lead(input("1234567890", "Acme"), vec![], MonotonicTimeNs(1))
        .unwrap();
    let mut empty = LeadStore::new_in_memory();
    assert!(matches!(
        empty.update_lead(lead),
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn at_leads_db_05_list_is_newest_first_with_true_total() {
    let mut s = LeadStore::new_in_memory();
    for (i, frn) in ["1111111111", "2222222222", "3333333333"].iter().enumerate() {
        s.create_lead(
            input(frn, &format!("Company {i}")),
            vec![],
            MonotonicTimeNs(i as u64),
        )
        .unwrap();
    }

    let page = s.list_leads(&query(AssigneeFilter::Any, 2)).unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.documents.len(), 2);
    assert_eq!(page.documents[0].frn.as_str(), "3333333333");
    assert_eq!(page.documents[1].frn.as_str(), "2222222222");
}

#[test]
fn at_leads_db_06_cursor_pagination_walks_every_document_once() {
    let mut s = LeadStore::new_in_memory();
    for i in 0..7u64 {
        s.create_lead(
            input(&format!("{:010}", 1_000_000_000 + i), "Walk"),
            vec![],
            MonotonicTimeNs(i),
        )
        .unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let mut q = query(AssigneeFilter::Any, 3);
        q.cursor = cursor.clone();
        let page = s.list_leads(&q).unwrap();
        let short = page.documents.len() < 3;
        for doc in page.documents {
            cursor = Some(doc.id.clone());
            seen.push(doc.frn.as_str().to_string());
        }
        if short {
            break;
        }
    }
    assert_eq!(seen.len(), 7);
    let unique: std::collections::BTreeSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), 7);
}

#[test]
fn at_leads_db_07_filters_compose() {
    let mut s = LeadStore::new_in_memory();
    let mut a = s
        .create_lead(input("1111111111", "Acme Fuel"), vec![], MonotonicTimeNs(1))
        .unwrap();
    s.create_lead(input("2222222222", "Globex"), vec![], MonotonicTimeNs(2))
        .unwrap();

    let emp = PrincipalId::new("emp_1").unwrap();
    a.assigned_employee_id = Some(emp.clone());
    a.pipeline_status = PipelineStatus::Approved;
    s.update_lead(a).unwrap();

    let own = s
        .list_leads(&query(AssigneeFilter::Principal(emp.clone()), 10))
        .unwrap();
    assert_eq!(own.total, 1);
    assert_eq!(own.documents[0].frn.as_str(), "1111111111");

    let unassigned = s.list_leads(&query(AssigneeFilter::Unassigned, 10)).unwrap();
    assert_eq!(unassigned.total, 1);
    assert_eq!(unassigned.documents[0].frn.as_str(), "2222222222");

    let mut by_status = query(AssigneeFilter::Any, 10);
    by_status.status = Some(PipelineStatus::Approved);
    assert_eq!(s.list_leads(&by_status).unwrap().total, 1);

    let mut by_search = query(AssigneeFilter::Any, 10);
    by_search.search = Some("fuel".to_string());
    assert_eq!(s.list_leads(&by_search).unwrap().total, 1);
}

#[test]
fn at_leads_db_08_unknown_cursor_is_not_found() {
    let mut s = LeadStore::new_in_memory();
    s.create_lead(input("1234567890", "Acme"), vec![], MonotonicTimeNs(1))
        .unwrap();
    let mut q = query(AssigneeFilter::Any, 10);
    q.cursor = Some(
        leadflow_kernel_contracts::lead::LeadId::new("lead_missing").unwrap(),
    );
    assert!(matches!(
        s.list_leads(&q),
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn at_leads_db_09_injected_create_failure_rejects_only_that_frn() {
    let mut s = LeadStore::new_in_memory();
    s.inject_create_failure(Frn::new("9999999999").unwrap());

    assert!(matches!(
        s.create_lead(input("9999999999", "Doomed"), vec![], MonotonicTimeNs(1)),
        Err(StorageError::WriteRejected { .. })
    ));
    assert!(s
        .create_lead(input("1234567890", "Fine"), vec![], MonotonicTimeNs(2))
        .is_ok());
}

#[test]
fn at_leads_db_10_queued_race_write_lands_after_the_next_update() {
    let mut s = LeadStore::new_in_memory();
    let lead = s
        .create_lead(input("1234567890", "Acme"), vec![], MonotonicTimeNs(1))
        .unwrap();

    let loser = PrincipalId::new("emp_loser").unwrap();
    let winner = PrincipalId::new("emp_winner").unwrap();
    s.queue_race_overwrite(winner.clone());

    let mut attempt = lead.clone();
    attempt.assigned_employee_id = Some(loser);
    attempt.pipeline_status = PipelineStatus::EmailSent;
    attempt.history.push(
        HistoryEvent::v1(
            HistoryActor::Principal(PrincipalId::new("emp_loser").unwrap()),
            "claimed",
            MonotonicTimeNs(2),
        )
        .unwrap(),
    );
    s.update_lead(attempt).unwrap();

    let stored = s.get_lead(&lead.id).unwrap();
    assert_eq!(stored.assigned_employee_id, Some(winner));
}

#![forbid(unsafe_code)]

use leadflow_kernel_contracts::import::{CsvLeadRow, RowValidationError, ValidatedRow};
use leadflow_kernel_contracts::lead::{Frn, LeadCreateInput};
use leadflow_kernel_contracts::ContractViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvImportConfig {
    pub max_rows: usize,
}

impl CsvImportConfig {
    pub fn mvp_v1() -> Self {
        Self { max_rows: 50_000 }
    }
}

/// Parse + per-row validation half of the batch importer. Pure: bytes in,
/// typed rows and rejections out. Dedup and creation stay in the
/// orchestration layer.
#[derive(Debug, Clone)]
pub struct CsvImportRuntime {
    config: CsvImportConfig,
}

impl CsvImportRuntime {
    pub fn new(config: CsvImportConfig) -> Self {
        Self { config }
    }

    /// Parse the uploaded bytes as a delimited table with a header row.
    /// Any parse failure is fatal for the whole request: no partial rows
    /// come back. A missing column is not fatal; affected rows fail the
    /// per-row checks instead.
    pub fn parse(&self, raw: &[u8]) -> Result<Vec<CsvLeadRow>, ContractViolation> {
        // Strict record lengths: a ragged row (or a quote swallowing the
        // rest of the file) fails the whole request.
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(raw);

        let headers = reader
            .headers()
            .map_err(|_| ContractViolation::InvalidValue {
                field: "csv",
                reason: "header row could not be parsed",
            })?
            .clone();

        let mut column = |name: &str| -> Option<usize> {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let frn_col = column("frn");
        let company_col = column("company_name");
        let email_col = column("contact_email");
        let phone_col = column("contact_phone");
        let service_col = column("service_type");
        let website_col = column("website");

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|_| ContractViolation::InvalidValue {
                field: "csv",
                reason: "malformed CSV row",
            })?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let field = |col: Option<usize>| -> String {
                col.and_then(|i| record.get(i))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default()
            };
            rows.push(CsvLeadRow {
                frn: field(frn_col),
                company_name: field(company_col),
                contact_email: field(email_col),
                contact_phone: field(phone_col),
                service_type: field(service_col),
                website: field(website_col),
            });
            if rows.len() > self.config.max_rows {
                return Err(ContractViolation::InvalidValue {
                    field: "csv",
                    reason: "row budget exceeded",
                });
            }
        }
        Ok(rows)
    }

    /// Apply the per-row rules. Rejected rows carry the user-visible CSV
    /// line number (data index + 2: 1-indexed plus the header line) and
    /// never abort the remaining rows.
    pub fn validate_rows(&self, rows: &[CsvLeadRow]) -> (Vec<ValidatedRow>, Vec<RowValidationError>) {
        let mut valid = Vec::new();
        let mut errors = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let row_number = index + 2;
            match validate_row(row_number, row) {
                Ok(v) => valid.push(v),
                Err(e) => errors.push(e),
            }
        }
        (valid, errors)
    }
}

fn validate_row(row_number: usize, row: &CsvLeadRow) -> Result<ValidatedRow, RowValidationError> {
    if row.frn.is_empty() {
        return Err(RowValidationError {
            row: row_number,
            field: "frn",
            value: row.frn.clone(),
            message: "FRN is required",
        });
    }
    if row.company_name.is_empty() {
        return Err(RowValidationError {
            row: row_number,
            field: "company_name",
            value: row.company_name.clone(),
            message: "Company name is required",
        });
    }
    let frn = Frn::new(row.frn.clone()).map_err(|_| RowValidationError {
        row: row_number,
        field: "frn",
        value: row.frn.clone(),
        message: "FRN must be 10 digits",
    })?;
    if !row.contact_email.is_empty() && !email_shape_ok(&row.contact_email) {
        return Err(RowValidationError {
            row: row_number,
            field: "contact_email",
            value: row.contact_email.clone(),
            message: "Invalid email format",
        });
    }
    if !row.contact_phone.is_empty() && !phone_shape_ok(&row.contact_phone) {
        return Err(RowValidationError {
            row: row_number,
            field: "contact_phone",
            value: row.contact_phone.clone(),
            message: "Invalid phone format (min 10 digits)",
        });
    }

    let optional = |v: &str| -> Option<String> {
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    };
    let input = LeadCreateInput::v1(
        frn,
        row.company_name.clone(),
        optional(&row.contact_email),
        optional(&row.contact_phone),
        optional(&row.service_type),
        optional(&row.website),
    )
    .map_err(|_| RowValidationError {
        row: row_number,
        field: "company_name",
        value: row.company_name.clone(),
        message: "Company name is invalid",
    })?;
    Ok(ValidatedRow {
        row: row_number,
        input,
    })
}

/// `local@domain.tld` shape: exactly one `@`, no whitespace, and a dot in
/// the domain that is neither its first nor its last character.
fn email_shape_ok(s: &str) -> bool {
    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let chars: Vec<char> = domain.chars().collect();
    chars.len() >= 3 && chars[1..chars.len() - 1].contains(&'.')
}

/// At least 10 characters drawn from digits, space, `-`, `+`, parentheses.
fn phone_shape_ok(s: &str) -> bool {
    s.chars().count() >= 10
        && s.chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-' || c == '+' || c == '(' || c == ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> CsvImportRuntime {
        CsvImportRuntime::new(CsvImportConfig::mvp_v1())
    }

    #[test]
    fn at_import_01_parse_maps_columns_by_header_name() {
        let raw = b"frn,company_name,contact_email\n1234567890,Acme,sales@acme.com\n";
        let rows = runtime().parse(raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].frn, "1234567890");
        assert_eq!(rows[0].company_name, "Acme");
        assert_eq!(rows[0].contact_email, "sales@acme.com");
        assert_eq!(rows[0].website, "");
    }

    #[test]
    fn at_import_02_parse_failure_is_fatal() {
        let raw = b"frn,company_name\n\"unterminated,Acme\n";
        assert!(runtime().parse(raw).is_err());
    }

    #[test]
    fn at_import_03_blank_lines_are_skipped() {
        let raw = b"frn,company_name\n1234567890,Acme\n,\n9876543210,Globex\n";
        let rows = runtime().parse(raw).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn at_import_04_required_fields_are_enforced() {
        let rows = vec![
            CsvLeadRow {
                company_name: "Acme".to_string(),
                ..CsvLeadRow::default()
            },
            CsvLeadRow {
                frn: "1234567890".to_string(),
                ..CsvLeadRow::default()
            },
        ];
        let (valid, errors) = runtime().validate_rows(&rows);
        assert!(valid.is_empty());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "frn");
        assert_eq!(errors[0].message, "FRN is required");
        assert_eq!(errors[1].field, "company_name");
    }

    #[test]
    fn at_import_05_frn_shape_is_enforced() {
        let rows = vec![CsvLeadRow {
            frn: "12AB".to_string(),
            company_name: "Bad".to_string(),
            ..CsvLeadRow::default()
        }];
        let (valid, errors) = runtime().validate_rows(&rows);
        assert!(valid.is_empty());
        assert_eq!(errors[0].field, "frn");
        assert_eq!(errors[0].message, "FRN must be 10 digits");
    }

    #[test]
    fn at_import_06_optional_email_and_phone_shapes() {
        let base = CsvLeadRow {
            frn: "1234567890".to_string(),
            company_name: "Acme".to_string(),
            ..CsvLeadRow::default()
        };

        let bad_email = CsvLeadRow {
            contact_email: "not-an-email".to_string(),
            ..base.clone()
        };
        let (_, errors) = runtime().validate_rows(std::slice::from_ref(&bad_email));
        assert_eq!(errors[0].field, "contact_email");

        let bad_phone = CsvLeadRow {
            contact_phone: "12345".to_string(),
            ..base.clone()
        };
        let (_, errors) = runtime().validate_rows(std::slice::from_ref(&bad_phone));
        assert_eq!(errors[0].field, "contact_phone");

        let ok = CsvLeadRow {
            contact_email: "a@b.co".to_string(),
            contact_phone: "+1 (202) 555-0100".to_string(),
            ..base
        };
        let (valid, errors) = runtime().validate_rows(std::slice::from_ref(&ok));
        assert!(errors.is_empty());
        let input = &valid[0].input;
        assert_eq!(input.contact_email.as_deref(), Some("a@b.co"));
        assert_eq!(input.contact_phone.as_deref(), Some("+1 (202) 555-0100"));
    }

    #[test]
    fn at_import_07_row_numbers_count_from_after_the_header() {
        let rows = vec![
            CsvLeadRow {
                frn: "1234567890".to_string(),
                company_name: "Acme".to_string(),
                ..CsvLeadRow::default()
            },
            CsvLeadRow {
                frn: "12AB".to_string(),
                company_name: "Bad".to_string(),
                ..CsvLeadRow::default()
            },
        ];
        let (_, errors) = runtime().validate_rows(&rows);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 3);
    }

    #[test]
    fn at_import_08_email_shape_edges() {
        assert!(email_shape_ok("a@b.co"));
        assert!(email_shape_ok("first.last@mail.example.org"));
        assert!(!email_shape_ok("a@b"));
        assert!(!email_shape_ok("a@.co"));
        assert!(!email_shape_ok("a b@c.co"));
        assert!(!email_shape_ok("a@@b.co"));
        assert!(!email_shape_ok("@b.co"));
    }
}

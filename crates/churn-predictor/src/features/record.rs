use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Categorical inputs expanded into `<field>_<value>` indicator columns.
///
/// `TenureGroup` is derived from `tenure` rather than read from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoricalField {
    Gender,
    Partner,
    Dependents,
    PhoneService,
    MultipleLines,
    InternetService,
    OnlineSecurity,
    OnlineBackup,
    DeviceProtection,
    TechSupport,
    StreamingTv,
    StreamingMovies,
    Contract,
    PaperlessBilling,
    PaymentMethod,
    TenureGroup,
}

impl CategoricalField {
    /// Expansion order, matching the training frame's dummy-encoding order.
    pub const ALL: [CategoricalField; 16] = [
        Self::Gender,
        Self::Partner,
        Self::Dependents,
        Self::PhoneService,
        Self::MultipleLines,
        Self::InternetService,
        Self::OnlineSecurity,
        Self::OnlineBackup,
        Self::DeviceProtection,
        Self::TechSupport,
        Self::StreamingTv,
        Self::StreamingMovies,
        Self::Contract,
        Self::PaperlessBilling,
        Self::PaymentMethod,
        Self::TenureGroup,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::Partner => "Partner",
            Self::Dependents => "Dependents",
            Self::PhoneService => "PhoneService",
            Self::MultipleLines => "MultipleLines",
            Self::InternetService => "InternetService",
            Self::OnlineSecurity => "OnlineSecurity",
            Self::OnlineBackup => "OnlineBackup",
            Self::DeviceProtection => "DeviceProtection",
            Self::TechSupport => "TechSupport",
            Self::StreamingTv => "StreamingTV",
            Self::StreamingMovies => "StreamingMovies",
            Self::Contract => "Contract",
            Self::PaperlessBilling => "PaperlessBilling",
            Self::PaymentMethod => "PaymentMethod",
            Self::TenureGroup => "tenure_group",
        }
    }

    /// Prefix shared by this field's indicator columns.
    pub fn column_prefix(self) -> String {
        format!("{}_", self.name())
    }

    pub fn column_for(self, value: &str) -> String {
        format!("{}_{}", self.name(), value)
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The 19 request keys, in the order the web form submits them.
pub const REQUIRED_FIELDS: [&str; 19] = [
    "SeniorCitizen",
    "MonthlyCharges",
    "TotalCharges",
    "gender",
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
    "tenure",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    Missing,
    Null,
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub kind: IssueKind,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Missing => write!(f, "missing field '{}'", self.field),
            IssueKind::Null => write!(f, "field '{}' must not be null", self.field),
            IssueKind::Invalid(detail) => write!(f, "field '{}' {}", self.field, detail),
        }
    }
}

/// A request body that cannot become a [`RawRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing or invalid input: request body must be a JSON object")]
    NotAnObject,
    #[error("Missing or invalid input: {0}")]
    Malformed(String),
    #[error("Missing or invalid input: {}", join_issues(.0))]
    Fields(Vec<FieldIssue>),
}

impl ValidationError {
    /// Names of the fields that failed validation.
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ValidationError::Fields(issues) => issues.iter().map(|issue| issue.field).collect(),
            _ => Vec::new(),
        }
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One validated customer, request-scoped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub senior_citizen: i64,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub tenure: i64,
    pub gender: String,
    pub partner: String,
    pub dependents: String,
    pub phone_service: String,
    pub multiple_lines: String,
    pub internet_service: String,
    pub online_security: String,
    pub online_backup: String,
    pub device_protection: String,
    pub tech_support: String,
    pub streaming_tv: String,
    pub streaming_movies: String,
    pub contract: String,
    pub paperless_billing: String,
    pub payment_method: String,
}

impl RawRecord {
    /// Validates a decoded request body. Every offending field is reported,
    /// not just the first one.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or(ValidationError::NotAnObject)?;
        let mut reader = FieldReader::new(object);

        let senior_citizen = reader.flag("SeniorCitizen");
        let monthly_charges = reader.real("MonthlyCharges");
        let total_charges = reader.real("TotalCharges");
        let gender = reader.category("gender");
        let partner = reader.category("Partner");
        let dependents = reader.category("Dependents");
        let phone_service = reader.category("PhoneService");
        let multiple_lines = reader.category("MultipleLines");
        let internet_service = reader.category("InternetService");
        let online_security = reader.category("OnlineSecurity");
        let online_backup = reader.category("OnlineBackup");
        let device_protection = reader.category("DeviceProtection");
        let tech_support = reader.category("TechSupport");
        let streaming_tv = reader.category("StreamingTV");
        let streaming_movies = reader.category("StreamingMovies");
        let contract = reader.category("Contract");
        let paperless_billing = reader.category("PaperlessBilling");
        let payment_method = reader.category("PaymentMethod");
        let tenure = reader.integer("tenure");

        if !reader.issues.is_empty() {
            return Err(ValidationError::Fields(reader.issues));
        }

        // Every accessor yields Some when no issue was recorded.
        let (
            Some(senior_citizen),
            Some(monthly_charges),
            Some(total_charges),
            Some(tenure),
            Some(gender),
            Some(partner),
            Some(dependents),
            Some(phone_service),
            Some(multiple_lines),
            Some(internet_service),
            Some(online_security),
            Some(online_backup),
            Some(device_protection),
            Some(tech_support),
            Some(streaming_tv),
            Some(streaming_movies),
            Some(contract),
            Some(paperless_billing),
            Some(payment_method),
        ) = (
            senior_citizen,
            monthly_charges,
            total_charges,
            tenure,
            gender,
            partner,
            dependents,
            phone_service,
            multiple_lines,
            internet_service,
            online_security,
            online_backup,
            device_protection,
            tech_support,
            streaming_tv,
            streaming_movies,
            contract,
            paperless_billing,
            payment_method,
        )
        else {
            return Err(ValidationError::Malformed(
                "request fields could not be decoded".to_string(),
            ));
        };

        Ok(Self {
            senior_citizen,
            monthly_charges,
            total_charges,
            tenure,
            gender,
            partner,
            dependents,
            phone_service,
            multiple_lines,
            internet_service,
            online_security,
            online_backup,
            device_protection,
            tech_support,
            streaming_tv,
            streaming_movies,
            contract,
            paperless_billing,
            payment_method,
        })
    }

    /// Raw categorical values, in expansion order. `TenureGroup` is not
    /// included since it is derived.
    pub fn categories(&self) -> [(CategoricalField, &str); 15] {
        [
            (CategoricalField::Gender, self.gender.as_str()),
            (CategoricalField::Partner, self.partner.as_str()),
            (CategoricalField::Dependents, self.dependents.as_str()),
            (CategoricalField::PhoneService, self.phone_service.as_str()),
            (CategoricalField::MultipleLines, self.multiple_lines.as_str()),
            (CategoricalField::InternetService, self.internet_service.as_str()),
            (CategoricalField::OnlineSecurity, self.online_security.as_str()),
            (CategoricalField::OnlineBackup, self.online_backup.as_str()),
            (CategoricalField::DeviceProtection, self.device_protection.as_str()),
            (CategoricalField::TechSupport, self.tech_support.as_str()),
            (CategoricalField::StreamingTv, self.streaming_tv.as_str()),
            (CategoricalField::StreamingMovies, self.streaming_movies.as_str()),
            (CategoricalField::Contract, self.contract.as_str()),
            (CategoricalField::PaperlessBilling, self.paperless_billing.as_str()),
            (CategoricalField::PaymentMethod, self.payment_method.as_str()),
        ]
    }
}

struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    issues: Vec<FieldIssue>,
}

impl<'a> FieldReader<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            issues: Vec::new(),
        }
    }

    fn present(&mut self, field: &'static str) -> Option<&'a Value> {
        let object = self.object;
        match object.get(field) {
            None => {
                self.reject(field, IssueKind::Missing);
                None
            }
            Some(Value::Null) => {
                self.reject(field, IssueKind::Null);
                None
            }
            Some(value) => Some(value),
        }
    }

    fn reject(&mut self, field: &'static str, kind: IssueKind) {
        self.issues.push(FieldIssue { field, kind });
    }

    fn invalid(&mut self, field: &'static str, detail: &str) {
        self.reject(field, IssueKind::Invalid(detail.to_string()));
    }

    fn category(&mut self, field: &'static str) -> Option<String> {
        match self.present(field)? {
            Value::String(text) => Some(text.clone()),
            _ => {
                self.invalid(field, "must be a string");
                None
            }
        }
    }

    fn real(&mut self, field: &'static str) -> Option<f64> {
        let parsed = match self.present(field)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(value) if value.is_finite() => Some(value),
            _ => {
                self.invalid(field, "must be a number or numeric string");
                None
            }
        }
    }

    fn integer(&mut self, field: &'static str) -> Option<i64> {
        let value = self.present(field)?;
        match parse_integer(value) {
            Some(parsed) => Some(parsed),
            None => {
                self.invalid(field, "must be an integer");
                None
            }
        }
    }

    fn flag(&mut self, field: &'static str) -> Option<i64> {
        let value = self.present(field)?;
        match parse_integer(value) {
            Some(parsed @ (0 | 1)) => Some(parsed),
            _ => {
                self.invalid(field, "must be 0 or 1");
                None
            }
        }
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

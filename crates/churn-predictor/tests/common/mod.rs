#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

const SERVICE_TRIPLE: [&str; 3] = ["No", "No internet service", "Yes"];

/// Column order of the dummy-encoded Telco training frame.
pub fn telco_columns() -> Vec<String> {
    let mut columns = vec!["SeniorCitizen".to_string()];
    let mut push = |field: &str, values: &[&str]| {
        for value in values {
            columns.push(format!("{field}_{value}"));
        }
    };

    push("gender", &["Female", "Male"]);
    push("Partner", &["No", "Yes"]);
    push("Dependents", &["No", "Yes"]);
    push("PhoneService", &["No", "Yes"]);
    push("MultipleLines", &["No", "No phone service", "Yes"]);
    push("InternetService", &["DSL", "Fiber optic", "No"]);
    for field in [
        "OnlineSecurity",
        "OnlineBackup",
        "DeviceProtection",
        "TechSupport",
        "StreamingTV",
        "StreamingMovies",
    ] {
        push(field, &SERVICE_TRIPLE);
    }
    push("Contract", &["Month-to-month", "One year", "Two year"]);
    push("PaperlessBilling", &["No", "Yes"]);
    push(
        "PaymentMethod",
        &[
            "Bank transfer (automatic)",
            "Credit card (automatic)",
            "Electronic check",
            "Mailed check",
        ],
    );
    push(
        "tenure_group",
        &["1 - 12", "13 - 24", "25 - 36", "37 - 48", "49 - 60", "61 - 72"],
    );
    columns
}

/// The Telco columns plus the two charge columns used by numeric variants.
pub fn telco_columns_with_charges() -> Vec<String> {
    let mut columns = telco_columns();
    columns.insert(1, "MonthlyCharges".to_string());
    columns.insert(2, "TotalCharges".to_string());
    columns
}

pub fn sample_body() -> Value {
    json!({
        "SeniorCitizen": 0,
        "MonthlyCharges": 29.85,
        "TotalCharges": "29.85",
        "gender": "Female",
        "Partner": "Yes",
        "Dependents": "No",
        "PhoneService": "No",
        "MultipleLines": "No phone service",
        "InternetService": "DSL",
        "OnlineSecurity": "No",
        "OnlineBackup": "Yes",
        "DeviceProtection": "No",
        "TechSupport": "No",
        "StreamingTV": "No",
        "StreamingMovies": "No",
        "Contract": "Month-to-month",
        "PaperlessBilling": "Yes",
        "PaymentMethod": "Electronic check",
        "tenure": 1
    })
}

pub fn write_schema(dir: &Path, columns: &[String]) -> PathBuf {
    let path = dir.join("churn_model_columns.json");
    std::fs::write(&path, serde_json::to_string(columns).expect("columns encode"))
        .expect("schema written");
    path
}

/// Two stumps: month-to-month contracts and short tenure both push towards
/// churn.
pub fn write_forest(dir: &Path, columns: &[String]) -> PathBuf {
    let position = |name: &str| {
        columns
            .iter()
            .position(|column| column == name)
            .expect("column present")
    };
    let forest = json!({
        "n_features": columns.len(),
        "trees": [
            { "nodes": [
                { "feature": position("Contract_Month-to-month"), "threshold": 0.5, "left": 1, "right": 2 },
                { "value": [90.0, 10.0] },
                { "value": [25.0, 75.0] }
            ] },
            { "nodes": [
                { "feature": position("tenure_group_1 - 12"), "threshold": 0.5, "left": 1, "right": 2 },
                { "value": [80.0, 20.0] },
                { "value": [35.0, 65.0] }
            ] }
        ]
    });
    let path = dir.join("churn_predictor.json");
    std::fs::write(&path, forest.to_string()).expect("forest written");
    path
}

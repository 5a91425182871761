use churn_predictor::config::AppConfig;
use churn_predictor::error::AppError;
use churn_predictor::telemetry;
use churn_predictor::ChurnService;
use clap::Args;
use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV export whose header row names the 19 customer fields
    #[arg(long)]
    pub(crate) input: PathBuf,
}

pub(crate) async fn run_predict(args: BatchArgs) -> Result<(), AppError> {
    let service = load_service()?;
    let rows = read_rows(std::fs::File::open(&args.input)?)?;
    let scored = predict_rows(&service, &rows, &mut std::io::stdout()).await?;
    println!("\nScored {scored} of {} rows", rows.len());
    Ok(())
}

pub(crate) fn run_align(args: BatchArgs) -> Result<(), AppError> {
    let service = load_service()?;
    let rows = read_rows(std::fs::File::open(&args.input)?)?;
    align_rows(&service, &rows, &mut std::io::stdout())?;
    Ok(())
}

/// Writes one verdict line per row and returns how many rows were scored.
/// Rows that fail validation are reported and skipped; scoring failures abort.
pub(crate) async fn predict_rows<W: Write>(
    service: &ChurnService,
    rows: &[Value],
    out: &mut W,
) -> Result<usize, AppError> {
    let mut scored = 0usize;
    for (index, row) in rows.iter().enumerate() {
        match service.predict_json(row).await {
            Ok(verdict) => {
                scored += 1;
                writeln!(
                    out,
                    "row {}: {} ({})",
                    index + 1,
                    verdict.message(),
                    verdict.confidence_label()
                )?;
            }
            Err(err @ AppError::Validation(_)) => {
                writeln!(out, "row {}: skipped: {err}", index + 1)?
            }
            Err(err) => return Err(err),
        }
    }
    Ok(scored)
}

/// Writes each aligned vector as one JSON line and returns how many rows
/// were aligned.
pub(crate) fn align_rows<W: Write>(
    service: &ChurnService,
    rows: &[Value],
    out: &mut W,
) -> Result<usize, AppError> {
    let mut aligned = 0usize;
    for (index, row) in rows.iter().enumerate() {
        match service.align_json(row) {
            Ok(vector) => {
                aligned += 1;
                let rendered = serde_json::to_string(&vector).map_err(std::io::Error::from)?;
                writeln!(out, "{rendered}")?;
            }
            Err(err) => writeln!(out, "row {}: skipped: {err}", index + 1)?,
        }
    }
    Ok(aligned)
}

fn load_service() -> Result<ChurnService, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    ChurnService::from_config(&config.features, &config.scoring)
}

/// Each row becomes a JSON object of string cells keyed by header, the same
/// shape the web form posts.
pub(crate) fn read_rows<R: Read>(reader: R) -> Result<Vec<Value>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let headers = csv_reader.headers().map_err(std::io::Error::from)?.clone();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(std::io::Error::from)?;
        let object: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        rows.push(Value::Object(object));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_predictor::features::{AlignmentMode, FeatureAligner, FeatureSchema, RawRecord};
    use churn_predictor::prediction::{ClassOutput, Classifier, PredictionInvoker, ScoringError};
    use std::sync::Arc;

    /// Churns whenever the first column is set.
    struct FirstColumnClassifier;

    impl Classifier for FirstColumnClassifier {
        fn classify(&self, features: &[f64]) -> Result<ClassOutput, ScoringError> {
            let churn = features.first().copied() == Some(1.0);
            Ok(ClassOutput {
                label: i64::from(churn),
                churn_probability: Some(if churn { 0.8 } else { 0.25 }),
            })
        }
    }

    fn service() -> ChurnService {
        let schema = FeatureSchema::from_columns([
            "Contract_Month-to-month",
            "Contract_Two year",
            "tenure_group_1 - 12",
        ])
        .expect("valid schema");
        ChurnService::new(
            FeatureAligner::new(Arc::new(schema), AlignmentMode::OneHot),
            PredictionInvoker::local(Arc::new(FirstColumnClassifier)),
        )
    }

    const EXPORT: &str = "customerID,SeniorCitizen,MonthlyCharges,TotalCharges,gender,Partner,Dependents,PhoneService,MultipleLines,InternetService,OnlineSecurity,OnlineBackup,DeviceProtection,TechSupport,StreamingTV,StreamingMovies,Contract,PaperlessBilling,PaymentMethod,tenure
7590-VHVEG,0,29.85,29.85,Female,Yes,No,No,No phone service,DSL,No,Yes,No,No,No,No,Month-to-month,Yes,Electronic check,1
4472-LVYGI,0,52.55, ,Female,Yes,Yes,No,No phone service,DSL,Yes,No,Yes,Yes,Yes,No,Two year,Yes,Bank transfer (automatic),0
";

    #[test]
    fn rows_decode_into_validatable_records() {
        let rows = read_rows(EXPORT.as_bytes()).expect("csv parses");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["customerID"], "7590-VHVEG");

        let record = RawRecord::from_json(&rows[0]).expect("first row valid");
        assert_eq!(record.tenure, 1);
        assert_eq!(record.total_charges, 29.85);
    }

    #[test]
    fn blank_total_charges_rows_fail_validation() {
        let rows = read_rows(EXPORT.as_bytes()).expect("csv parses");
        let err = RawRecord::from_json(&rows[1]).expect_err("blank charges");
        assert_eq!(err.fields(), vec!["TotalCharges"]);
    }

    #[tokio::test]
    async fn predict_rows_scores_valid_rows_and_reports_skips() {
        let rows = read_rows(EXPORT.as_bytes()).expect("csv parses");
        let mut out = Vec::new();

        let scored = predict_rows(&service(), &rows, &mut out)
            .await
            .expect("batch scores");

        assert_eq!(scored, 1);
        let text = String::from_utf8(out).expect("utf8 output");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "row 1: This customer is likely to be churned!! (Confidence: 80.00)"
        );
        assert!(lines[1].starts_with("row 2: skipped: Missing or invalid input: "));
        assert!(lines[1].contains("TotalCharges"));
    }

    #[test]
    fn align_rows_emits_one_json_vector_per_valid_row() {
        let rows = read_rows(EXPORT.as_bytes()).expect("csv parses");
        let mut out = Vec::new();

        let aligned = align_rows(&service(), &rows, &mut out).expect("batch aligns");

        assert_eq!(aligned, 1);
        let text = String::from_utf8(out).expect("utf8 output");
        let mut lines = text.lines();
        let vector: Value =
            serde_json::from_str(lines.next().expect("vector line")).expect("json vector");
        assert_eq!(vector["values"], serde_json::json!([1, 0, 1]));
        assert_eq!(vector["degraded"], false);
        assert!(lines
            .next()
            .expect("skip line")
            .starts_with("row 2: skipped: "));
    }
}

use serde::Serialize;
use std::fmt;

pub const CHURN_MESSAGE: &str = "This customer is likely to be churned!!";
pub const CONTINUE_MESSAGE: &str = "This customer is likely to continue!!";
const OPAQUE_CONFIDENCE: &str = "ok";

/// Raw classifier output before it is phrased for users.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassOutput {
    pub label: i64,
    /// Probability of the churn class, when the backend reports one.
    pub churn_probability: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Churn,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    Probability(f64),
    Unavailable,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Probability(probability) => {
                write!(f, "Confidence: {:.2}", probability * 100.0)
            }
            Confidence::Unavailable => f.write_str(OPAQUE_CONFIDENCE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub confidence: Confidence,
}

impl Verdict {
    pub fn message(&self) -> &'static str {
        match self.outcome {
            Outcome::Churn => CHURN_MESSAGE,
            Outcome::Continue => CONTINUE_MESSAGE,
        }
    }

    pub fn confidence_label(&self) -> String {
        self.confidence.to_string()
    }
}

impl From<ClassOutput> for Verdict {
    fn from(output: ClassOutput) -> Self {
        let outcome = if output.label == 1 {
            Outcome::Churn
        } else {
            Outcome::Continue
        };
        let confidence = output
            .churn_probability
            .map_or(Confidence::Unavailable, Confidence::Probability);
        Self {
            outcome,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_one_means_churn() {
        let verdict = Verdict::from(ClassOutput {
            label: 1,
            churn_probability: Some(0.8125),
        });
        assert_eq!(verdict.outcome, Outcome::Churn);
        assert!(verdict.message().contains("churned"));
        assert_eq!(verdict.confidence_label(), "Confidence: 81.25");
    }

    #[test]
    fn any_other_label_means_continue() {
        for label in [0, 2, -1] {
            let verdict = Verdict::from(ClassOutput {
                label,
                churn_probability: None,
            });
            assert_eq!(verdict.outcome, Outcome::Continue);
            assert!(verdict.message().contains("continue"));
            assert_eq!(verdict.confidence_label(), "ok");
        }
    }

    #[test]
    fn confidence_reports_churn_probability_even_when_continuing() {
        let verdict = Verdict::from(ClassOutput {
            label: 0,
            churn_probability: Some(0.1),
        });
        assert_eq!(verdict.confidence_label(), "Confidence: 10.00");
    }
}

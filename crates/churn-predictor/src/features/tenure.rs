use std::fmt;

const FIRST_MONTH: i64 = 1;
const BUCKET_WIDTH: i64 = 12;
const BUCKET_COUNT: i64 = 6;

/// Twelve-month tenure bucket: `[1,13)`, `[13,25)`, ... `[61,73)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenureGroup {
    lower: i64,
}

impl TenureGroup {
    /// Returns `None` for tenure outside `[1, 72]`.
    pub fn from_tenure(tenure: i64) -> Option<Self> {
        let offset = tenure.checked_sub(FIRST_MONTH)?;
        if offset < 0 || offset >= BUCKET_WIDTH * BUCKET_COUNT {
            return None;
        }
        let lower = FIRST_MONTH + (offset / BUCKET_WIDTH) * BUCKET_WIDTH;
        Some(Self { lower })
    }

    pub fn upper(&self) -> i64 {
        self.lower + BUCKET_WIDTH - 1
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TenureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.lower, self.upper())
    }
}

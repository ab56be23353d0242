use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Success,
    Failed,
    Timeout,
    Error,
    NoValidEntities,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Success => "success",
            ResultCode::Failed => "failed",
            ResultCode::Timeout => "timeout",
            ResultCode::Error => "error",
            ResultCode::NoValidEntities => "no_valid_entities",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::Error => 1,
            ResultCode::NoValidEntities => 3,
            ResultCode::Failed => 5,
            ResultCode::Timeout => 6,
        }
    }
}

/// Aggregated outcome of one convergence call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(rename = "result")]
    pub result_code: ResultCode,
    pub message: String,
    pub attempts: u32,
    pub total_lights: usize,
    pub failed_lights: Vec<String>,
    pub skipped_lights: Vec<String>,
    pub elapsed_seconds: f64,
}

impl OperationResult {
    pub fn new(result_code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            success: result_code == ResultCode::Success,
            result_code,
            message: message.into(),
            attempts: 0,
            total_lights: 0,
            failed_lights: Vec::new(),
            skipped_lights: Vec::new(),
            elapsed_seconds: 0.0,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Error, message)
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_lights(mut self, total: usize, failed: Vec<String>, skipped: Vec<String>) -> Self {
        self.total_lights = total;
        self.failed_lights = failed;
        self.skipped_lights = skipped;
        self
    }

    /// Rounded to two decimals, as reported to callers.
    pub fn with_elapsed(mut self, elapsed_seconds: f64) -> Self {
        self.elapsed_seconds = (elapsed_seconds * 100.0).round() / 100.0;
        self
    }
}

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// One-shot user-facing message returned alongside a response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Notice {
    pub fn success(msg: impl Into<String>) -> Self { Self { success: Some(msg.into()), error: None } }
    pub fn error(msg: impl Into<String>) -> Self { Self { success: None, error: Some(msg.into()) } }
}

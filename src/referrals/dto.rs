use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CodeByEmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ReferralsRequest {
    #[serde(default)]
    pub referrer_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ReferralCodeResponse {
    pub referral_code: String,
}

#[derive(Debug, Serialize)]
pub struct ReferralsResponse {
    pub emails: Vec<String>,
}

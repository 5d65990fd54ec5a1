use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("failed to build API URL")
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("API error ({}): {}", status, error_message(&body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, req: reqwest::RequestBuilder) -> Result<()> {
        let response = req.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("API error ({}): {}", status, error_message(&body));
        }
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.url("/v1/health")?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn whoami(&self) -> Result<WhoamiResponse> {
        let url = self.url("/v1/auth/whoami")?;
        self.send_json(self.http.get(url)).await
    }

    // -------------------------------------------------------------------------
    // Approvals
    // -------------------------------------------------------------------------

    pub async fn list_approval_queue(
        &self,
        status: Option<&str>,
        seller_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<ProductResponse>> {
        let mut url = self.url("/v1/admin/approvals")?;
        if let Some(status) = status {
            url.query_pairs_mut().append_pair("status", status);
        }
        if let Some(seller_id) = seller_id {
            url.query_pairs_mut().append_pair("seller_id", seller_id);
        }
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        self.send_json(self.http.get(url)).await
    }

    pub async fn approval_stats(&self) -> Result<ApprovalStats> {
        let url = self.url("/v1/admin/approvals/stats")?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn get_product(&self, id: &str) -> Result<ProductResponse> {
        let url = self.url(&format!("/v1/admin/products/{id}"))?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn update_approval(
        &self,
        id: &str,
        req: UpdateApprovalRequest,
    ) -> Result<UpdateApprovalResponse> {
        let url = self.url(&format!("/v1/admin/products/{id}/approval"))?;
        self.send_json(self.http.put(url).json(&req)).await
    }

    // -------------------------------------------------------------------------
    // Repair
    // -------------------------------------------------------------------------

    pub async fn run_repair(&self) -> Result<RunRepairResponse> {
        let url = self.url("/v1/admin/repair")?;
        self.send_json(self.http.post(url)).await
    }

    pub async fn drift_report(&self, limit: Option<u32>) -> Result<DriftReport> {
        let mut url = self.url("/v1/admin/repair/report")?;
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        self.send_json(self.http.get(url)).await
    }

    pub async fn list_repair_runs(&self, limit: Option<u32>) -> Result<Vec<RepairRunResponse>> {
        let mut url = self.url("/v1/admin/repair/runs")?;
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        self.send_json(self.http.get(url)).await
    }

    // -------------------------------------------------------------------------
    // Sellers and tokens
    // -------------------------------------------------------------------------

    pub async fn create_seller(&self, req: CreateSellerRequest) -> Result<SellerResponse> {
        let url = self.url("/v1/admin/sellers")?;
        self.send_json(self.http.post(url).json(&req)).await
    }

    pub async fn list_sellers(&self) -> Result<Vec<SellerResponse>> {
        let url = self.url("/v1/admin/sellers")?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn get_seller(&self, id: &str) -> Result<SellerResponse> {
        let url = self.url(&format!("/v1/admin/sellers/{id}"))?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn create_token(&self, req: CreateTokenRequest) -> Result<CreateTokenResponse> {
        let url = self.url("/v1/admin/tokens")?;
        self.send_json(self.http.post(url).json(&req)).await
    }

    pub async fn list_tokens(&self, seller_id: Option<&str>) -> Result<Vec<TokenInfo>> {
        let mut url = self.url("/v1/admin/tokens")?;
        if let Some(seller_id) = seller_id {
            url.query_pairs_mut().append_pair("seller_id", seller_id);
        }
        self.send_json(self.http.get(url)).await
    }

    pub async fn revoke_token(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/v1/admin/tokens/{id}"))?;
        self.send_empty(self.http.delete(url)).await
    }
}

/// Pull `message` out of a structured error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|err| format!("{} ({})", err.message, err.code))
        .unwrap_or_else(|_| body.to_string())
}

// =============================================================================
// Request/response types (mirrored from server handlers)
// =============================================================================

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct WhoamiResponse {
    pub token_id: String,
    pub role: String,
    pub seller_id: Option<String>,
    pub seller_name: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    pub product_id: String,
    pub seller_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub category: Option<String>,
    pub approval_status: String,
    pub is_active: bool,
    pub is_approved: bool,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<String>,
    pub rejected_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalStats {
    pub pending: u64,
    pub under_review: u64,
    pub approved: u64,
    pub rejected: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct UpdateApprovalRequest {
    pub approval_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApprovalResponse {
    pub success: bool,
    pub message: String,
    pub notified: bool,
    pub product: ProductResponse,
}

#[derive(Debug, Deserialize)]
pub struct RepairRunResponse {
    pub run_id: String,
    pub trigger: String,
    pub activated: i64,
    pub deactivated: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub triggered_by: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunRepairResponse {
    pub success: bool,
    pub message: String,
    pub run: RepairRunResponse,
}

#[derive(Debug, Deserialize)]
pub struct DriftEntry {
    pub product_id: String,
    pub seller_id: String,
    pub name: String,
    pub approval_status: String,
    pub is_active: bool,
    pub is_approved: bool,
    pub drift: String,
    pub repaired_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DriftReport {
    pub total: usize,
    pub repairable: usize,
    pub by_drift: std::collections::BTreeMap<String, usize>,
    pub products: Vec<DriftEntry>,
}

#[derive(Debug, Serialize)]
pub struct CreateSellerRequest {
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SellerResponse {
    pub seller_id: String,
    pub display_name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenRequest {
    pub scopes: Vec<String>,
    pub seller_id: Option<String>,
    pub expires_in_secs: Option<u64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenResponse {
    pub token_id: String,
    pub token_secret: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    pub token_id: String,
    pub seller_id: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<String>,
    pub revoked_at: Option<String>,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub description: Option<String>,
}

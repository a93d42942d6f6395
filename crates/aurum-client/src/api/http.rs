//! Reqwest-backed implementation of [`WalletBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::{
    login_path, transactions_path, wallet_path, CreateWalletRequest, KdfBundle, LoginGrant,
    SubmitReceipt, UpdateWalletRequest, WalletBackend,
};
use crate::error::{ClientError, Result};
use crate::request_signer::SignedRequest;
use crate::tx::TransactionEnvelope;
use crate::types::NetworkConfig;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin reqwest wrapper: base-url joining, signature headers, typed error
/// mapping. No retries; retry policy belongs to the caller.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

/// Error body the wallet server returns alongside non-2xx statuses.
#[derive(Deserialize, Debug, Default)]
struct ServerErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    wallet_id: Option<Uuid>,
    #[serde(default)]
    token: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|_| ClientError::ServerUnreachable)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn attach_signature(req: RequestBuilder, signed: Option<&SignedRequest>) -> RequestBuilder {
        match signed {
            Some(signed) => signed
                .headers()
                .into_iter()
                .fold(req, |req, (name, value)| req.header(name, value)),
            None => req,
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30);
            return Err(ClientError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ClientError::ServerError(status.as_u16(), e.to_string()));
        }

        let code = status.as_u16();
        let body = response.json::<ServerErrorBody>().await.unwrap_or_default();
        Err(map_error_body(code, body))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.client.get(self.url(path)).send().await?;
        self.handle_response(resp).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        signed: Option<&SignedRequest>,
    ) -> Result<T> {
        let req = Self::attach_signature(self.client.post(self.url(path)).json(body), signed);
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        signed: Option<&SignedRequest>,
    ) -> Result<T> {
        let req = Self::attach_signature(self.client.put(self.url(path)).json(body), signed);
        let resp = req.send().await?;
        self.handle_response(resp).await
    }
}

fn map_error_body(status: u16, body: ServerErrorBody) -> ClientError {
    // Challenge responses are typed by the server's error code, not just
    // the HTTP status.
    match body.code.as_deref() {
        Some("verification_required") => {
            if let Some(wallet_id) = body.wallet_id {
                return ClientError::WalletUnverified { wallet_id };
            }
        }
        Some("tfa_required") => {
            if let Some(token) = body.token {
                return ClientError::TfaRequired { token };
            }
        }
        Some("tfa_invalid") => {
            return ClientError::TfaFailed(
                body.message.unwrap_or_else(|| "challenge rejected".to_string()),
            );
        }
        _ => {}
    }

    let msg = body
        .message
        .or(body.code)
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        401 | 403 => ClientError::WrongPassword,
        404 => ClientError::NotFound(msg),
        409 => ClientError::Conflict(msg),
        _ => ClientError::ServerError(status, msg),
    }
}

/// [`WalletBackend`] over HTTP+JSON.
#[derive(Clone)]
pub struct HttpBackend {
    http: HttpClient,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(base_url)?,
        })
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

#[async_trait]
impl WalletBackend for HttpBackend {
    async fn get_network_info(&self) -> Result<NetworkConfig> {
        self.http.get("/network").await
    }

    async fn get_kdf_params(&self, login: &str, is_recovery: bool) -> Result<KdfBundle> {
        let result = self
            .http
            .get(&format!("/kdf?login={login}&recovery={is_recovery}"))
            .await;
        match result {
            Err(ClientError::NotFound(_)) => Err(ClientError::NoSuchAccount),
            other => other,
        }
    }

    async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<()> {
        let _: serde_json::Value = self.http.post("/wallets", request, None).await?;
        Ok(())
    }

    async fn update_wallet(
        &self,
        wallet_id: Uuid,
        request: &UpdateWalletRequest,
        signed: SignedRequest,
    ) -> Result<()> {
        let _: serde_json::Value = self
            .http
            .put(&wallet_path(wallet_id), request, Some(&signed))
            .await?;
        Ok(())
    }

    async fn login_wallet(&self, wallet_id: Uuid, signed: SignedRequest) -> Result<LoginGrant> {
        self.http
            .post(&login_path(wallet_id), &serde_json::json!({}), Some(&signed))
            .await
    }

    async fn verify_wallet(&self, wallet_id: Uuid, token: &str) -> Result<()> {
        let body = serde_json::json!({ "token": token });
        let _: serde_json::Value = self
            .http
            .post(&format!("/wallets/{wallet_id}/verification"), &body, None)
            .await?;
        Ok(())
    }

    async fn resend_verification(&self, wallet_id: Uuid) -> Result<()> {
        let _: serde_json::Value = self
            .http
            .post(
                &format!("/wallets/{wallet_id}/verification/resend"),
                &serde_json::json!({}),
                None,
            )
            .await?;
        Ok(())
    }

    async fn submit_tfa(&self, token: &str, signature: &str) -> Result<()> {
        let body = serde_json::json!({ "token": token, "signature": signature });
        let _: serde_json::Value = self.http.post("/tfa", &body, None).await?;
        Ok(())
    }

    async fn submit_transaction(
        &self,
        envelope: &TransactionEnvelope,
        signed: SignedRequest,
    ) -> Result<SubmitReceipt> {
        self.http
            .post(&transactions_path(), envelope, Some(&signed))
            .await
    }
}

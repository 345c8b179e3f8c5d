//! External spreadsheet mirror of the ledger (Google Sheets v4 REST).
//!
//! The client only pushes rows; it never reads sheet data back. The local
//! ledger stays the source of truth: any failure here is surfaced to the
//! caller and leaves ledger state untouched.
//!
//! Authentication is a bearer token with one refresh-and-retry cycle on
//! HTTP 401. A second 401, or a failed refresh, surfaces as
//! [`SheetsError::AuthExpired`] and is not retried further.

use chrono::{DateTime, Utc};
use engine::{Contribution, Contributor, DashboardStats, Expense};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

/// The four sheets the export maintains.
const SHEET_TITLES: [&str; 4] = ["Contributors", "Contributions", "Expenses", "Summary"];

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("authorization expired and could not be refreshed")]
    AuthExpired,
    #[error("no spreadsheet configured; create or set one first")]
    NotConfigured,
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
}

/// OAuth client credentials used for token refresh.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

/// A created (or previously configured) spreadsheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpreadsheetInfo {
    pub id: String,
    pub url: String,
}

#[derive(Debug)]
pub struct SheetsClient {
    client: Client,
    api_base: String,
    token_url: String,
    credentials: Credentials,
    access_token: String,
    refresh_token: Option<String>,
    spreadsheet_id: Option<String>,
}

impl SheetsClient {
    pub fn new(
        client: Client,
        credentials: Credentials,
        access_token: String,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            client,
            api_base: "https://sheets.googleapis.com".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            credentials,
            access_token,
            refresh_token,
            spreadsheet_id: None,
        }
    }

    /// Overrides the API endpoints (tests point these at a local server).
    pub fn with_endpoints(mut self, api_base: String, token_url: String) -> Self {
        self.api_base = api_base;
        self.token_url = token_url;
        self
    }

    /// Targets an existing spreadsheet instead of creating one.
    pub fn with_spreadsheet_id(mut self, spreadsheet_id: String) -> Self {
        self.spreadsheet_id = Some(spreadsheet_id);
        self
    }

    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.spreadsheet_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.access_token)
            .query(query)
            .json(body)
            .send()
            .await
    }

    /// POSTs with one refresh-and-retry cycle on 401.
    async fn post_json(
        &mut self,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, SheetsError> {
        let resp = self.send(path, query, body).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Self::into_json(resp).await;
        }

        tracing::debug!("access token rejected, attempting refresh");
        self.refresh_access_token().await?;
        let resp = self.send(path, query, body).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(SheetsError::AuthExpired);
        }
        Self::into_json(resp).await
    }

    async fn into_json(resp: reqwest::Response) -> Result<Value, SheetsError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<Value>().await?);
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(err) => err.error.message,
            Err(_) => "server error".to_string(),
        };
        Err(SheetsError::Server { status, message })
    }

    /// Exchanges the refresh token for a new access token.
    async fn refresh_access_token(&mut self) -> Result<(), SheetsError> {
        let Some(refresh_token) = self.refresh_token.as_deref() else {
            return Err(SheetsError::AuthExpired);
        };

        #[derive(Debug, Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let resp = self
            .client
            .post(&self.token_url)
            .json(&json!({
                "refresh_token": refresh_token,
                "client_id": self.credentials.client_id,
                "client_secret": self.credentials.client_secret,
                "grant_type": "refresh_token",
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SheetsError::AuthExpired);
        }

        let token = resp
            .json::<TokenResponse>()
            .await
            .map_err(|_| SheetsError::AuthExpired)?;
        self.access_token = token.access_token;
        Ok(())
    }

    /// Creates the ledger spreadsheet with its four sheets and header rows,
    /// and targets it for subsequent pushes.
    pub async fn create_spreadsheet(&mut self, title: &str) -> Result<SpreadsheetInfo, SheetsError> {
        let sheets: Vec<Value> = SHEET_TITLES
            .iter()
            .map(|sheet_title| {
                json!({
                    "properties": {
                        "title": sheet_title,
                        "gridProperties": { "frozenRowCount": 1 },
                    }
                })
            })
            .collect();

        let created = self
            .post_json(
                "/v4/spreadsheets",
                &[],
                &json!({
                    "properties": { "title": title },
                    "sheets": sheets,
                }),
            )
            .await?;

        let id = created
            .get("spreadsheetId")
            .and_then(Value::as_str)
            .ok_or_else(|| SheetsError::Server {
                status: StatusCode::OK,
                message: "response missing spreadsheetId".to_string(),
            })?
            .to_string();
        self.spreadsheet_id = Some(id.clone());

        self.write_headers().await?;

        tracing::info!(spreadsheet = %id, "created ledger spreadsheet");
        Ok(SpreadsheetInfo {
            url: format!("https://docs.google.com/spreadsheets/d/{id}"),
            id,
        })
    }

    async fn write_headers(&mut self) -> Result<(), SheetsError> {
        let headers: [(&str, Vec<&str>); 4] = [
            (
                "Contributors!A1:H1",
                vec![
                    "ID",
                    "Name",
                    "Phone",
                    "Email",
                    "Balance",
                    "Total Contributed",
                    "Active",
                    "Last Updated",
                ],
            ),
            (
                "Contributions!A1:H1",
                vec![
                    "ID",
                    "Date",
                    "Contributor",
                    "Amount",
                    "Source",
                    "Transaction Ref",
                    "Notes",
                    "Synced At",
                ],
            ),
            (
                "Expenses!A1:G1",
                vec![
                    "ID",
                    "Date",
                    "Amount",
                    "Category",
                    "Description",
                    "Approved",
                    "Synced At",
                ],
            ),
            ("Summary!A1:B1", vec!["Metric", "Value"]),
        ];

        for (range, row) in headers {
            let row = row.into_iter().map(|s| s.to_string()).collect();
            self.append_rows(range, &[row]).await?;
        }
        Ok(())
    }

    /// Appends rows to a sheet range, raw values.
    pub async fn append_rows(
        &mut self,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsError> {
        let spreadsheet_id = self
            .spreadsheet_id
            .clone()
            .ok_or(SheetsError::NotConfigured)?;
        self.post_json(
            &format!("/v4/spreadsheets/{spreadsheet_id}/values/{range}:append"),
            &[("valueInputOption", "RAW")],
            &json!({ "values": rows }),
        )
        .await?;
        Ok(())
    }

    /// Clears a sheet range.
    pub async fn clear_range(&mut self, range: &str) -> Result<(), SheetsError> {
        let spreadsheet_id = self
            .spreadsheet_id
            .clone()
            .ok_or(SheetsError::NotConfigured)?;
        self.post_json(
            &format!("/v4/spreadsheets/{spreadsheet_id}/values/{range}:clear"),
            &[],
            &json!({}),
        )
        .await?;
        Ok(())
    }

    /// Pushes one contributor row.
    pub async fn sync_contributor(
        &mut self,
        contributor: &Contributor,
        now: DateTime<Utc>,
    ) -> Result<(), SheetsError> {
        self.append_rows("Contributors!A:H", &[contributor_row(contributor, now)])
            .await
    }

    /// Pushes one contribution row.
    pub async fn sync_contribution(
        &mut self,
        contribution: &Contribution,
        contributor_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), SheetsError> {
        self.append_rows(
            "Contributions!A:H",
            &[contribution_row(contribution, contributor_name, now)],
        )
        .await
    }

    /// Pushes one expense row.
    pub async fn sync_expense(
        &mut self,
        expense: &Expense,
        now: DateTime<Utc>,
    ) -> Result<(), SheetsError> {
        self.append_rows("Expenses!A:G", &[expense_row(expense, now)])
            .await
    }

    /// Rewrites the summary sheet from the given stats snapshot.
    pub async fn sync_summary(
        &mut self,
        stats: &DashboardStats,
        now: DateTime<Utc>,
    ) -> Result<(), SheetsError> {
        self.clear_range("Summary!A2:B100").await?;
        self.append_rows("Summary!A:B", &summary_rows(stats, now))
            .await
    }
}

/// Formats a minor-unit amount as a plain decimal cell value.
fn amount_cell(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    if abs % 100 == 0 {
        format!("{sign}{}", abs / 100)
    } else {
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

pub fn contributor_row(contributor: &Contributor, now: DateTime<Utc>) -> Vec<String> {
    vec![
        contributor.id.to_string(),
        contributor.name.clone(),
        contributor.phone.clone().unwrap_or_default(),
        contributor.email.clone().unwrap_or_default(),
        amount_cell(contributor.balance_minor),
        amount_cell(contributor.total_contributed_minor),
        yes_no(contributor.active),
        now.to_rfc3339(),
    ]
}

pub fn contribution_row(
    contribution: &Contribution,
    contributor_name: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<String> {
    vec![
        contribution.id.to_string(),
        contribution.date.to_rfc3339(),
        contributor_name.unwrap_or_default().to_string(),
        amount_cell(contribution.amount_minor),
        contribution.source.as_str().to_string(),
        contribution.transaction_ref.clone().unwrap_or_default(),
        contribution.notes.clone().unwrap_or_default(),
        now.to_rfc3339(),
    ]
}

pub fn expense_row(expense: &Expense, now: DateTime<Utc>) -> Vec<String> {
    vec![
        expense.id.to_string(),
        expense.date.to_rfc3339(),
        amount_cell(expense.amount_minor),
        expense.category.as_str().to_string(),
        expense.description.clone().unwrap_or_default(),
        yes_no(expense.approved),
        now.to_rfc3339(),
    ]
}

pub fn summary_rows(stats: &DashboardStats, now: DateTime<Utc>) -> Vec<Vec<String>> {
    vec![
        vec![
            "Total Contributions".to_string(),
            amount_cell(stats.total_contributions.minor()),
        ],
        vec![
            "Total Expenses".to_string(),
            amount_cell(stats.total_approved_expenses.minor()),
        ],
        vec![
            "Current Balance".to_string(),
            amount_cell(stats.current_balance.minor()),
        ],
        vec![
            "Active Contributors".to_string(),
            stats.active_contributors.to_string(),
        ],
        vec![
            "Pending Expenses".to_string(),
            amount_cell(stats.pending_expenses.minor()),
        ],
        vec!["Last Updated".to_string(), now.to_rfc3339()],
    ]
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use engine::{ContributionSource, Money};

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn amount_cell_drops_whole_fraction() {
        assert_eq!(amount_cell(1_250_000), "12500");
        assert_eq!(amount_cell(123_450), "1234.50");
        assert_eq!(amount_cell(-50), "-0.50");
    }

    #[test]
    fn contributor_row_layout() {
        let contributor = Contributor::new("Jean Bosco".to_string(), None, None, at()).unwrap();
        let row = contributor_row(&contributor, at());
        assert_eq!(row.len(), 8);
        assert_eq!(row[1], "Jean Bosco");
        assert_eq!(row[4], "0");
        assert_eq!(row[6], "Yes");
    }

    #[test]
    fn contribution_row_layout() {
        let contribution = Contribution::new(
            None,
            Money::new(500_000).minor(),
            ContributionSource::MtnMobileMoney,
            None,
            None,
            Some("AB12".to_string()),
            None,
            at(),
        )
        .unwrap();
        let row = contribution_row(&contribution, Some("Jean Bosco"), at());
        assert_eq!(row.len(), 8);
        assert_eq!(row[2], "Jean Bosco");
        assert_eq!(row[3], "5000");
        assert_eq!(row[4], "MTN_MOBILE_MONEY");
        assert_eq!(row[5], "AB12");
    }

    #[test]
    fn summary_rows_cover_all_metrics() {
        let stats = DashboardStats {
            total_contributions: Money::new(1_000_00),
            total_approved_expenses: Money::new(400_00),
            pending_expenses: Money::new(100_00),
            active_contributors: 3,
            current_balance: Money::new(600_00),
        };
        let rows = summary_rows(&stats, at());
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[2], vec!["Current Balance".to_string(), "600".to_string()]);
        assert_eq!(rows[3][1], "3");
    }
}

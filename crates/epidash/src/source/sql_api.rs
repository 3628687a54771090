// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Warehouse access over the `/api/v2/statements` SQL REST API.
//!
//! A statement is submitted once. While the warehouse answers 202 the
//! handle is polled until the statement completes or the configured
//! statement timeout elapses; then every result partition is fetched.

use crate::config::SqlApiConfig;
use crate::error::{ConfigError, ConfigResult, WarehouseError, WarehouseResult};
use crate::source::warehouse::{ResultSet, Warehouse, WarehouseSession};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const STATEMENTS_PATH: &str = "/api/v2/statements";

#[derive(Debug, Clone)]
pub struct SqlApiWarehouse {
    base_url: String,
    token: String,
    config: SqlApiConfig,
}

impl SqlApiWarehouse {
    pub fn from_config(config: &SqlApiConfig) -> ConfigResult<Self> {
        let base_url = config
            .account_url
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "source.sql_api.account_url".to_string(),
            })?;
        let token = config
            .token
            .clone()
            .ok_or_else(|| ConfigError::MissingRequired {
                field: "source.sql_api.token".to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            config: config.clone(),
        })
    }
}

impl Warehouse for SqlApiWarehouse {
    type Session = SqlApiSession;

    fn describe(&self) -> String {
        format!("sql api {}", self.base_url)
    }

    fn connect(&self) -> WarehouseResult<SqlApiSession> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.statement_timeout_secs + 30))
            .user_agent(concat!("epidash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WarehouseError::ConnectFailed {
                reason: e.to_string(),
            })?;
        info!(endpoint = %self.base_url, "opened warehouse session");
        Ok(SqlApiSession {
            client,
            statements_url: format!("{}{}", self.base_url, STATEMENTS_PATH),
            token: self.token.clone(),
            config: self.config.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementStatus {
    statement_handle: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResult {
    statement_handle: String,
    result_set_meta_data: ResultSetMetaData,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    row_type: Vec<RowType>,
    #[serde(default)]
    partition_info: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Partition {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug)]
pub struct SqlApiSession {
    client: Client,
    statements_url: String,
    token: String,
    config: SqlApiConfig,
}

impl SqlApiSession {
    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(
                "X-Snowflake-Authorization-Token-Type",
                self.config.token_type.as_str(),
            )
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn submit(&self, statement: &str) -> WarehouseResult<Response> {
        let body = StatementRequest {
            statement,
            timeout: self.config.statement_timeout_secs,
            warehouse: self.config.warehouse.as_deref(),
            role: self.config.role.as_deref(),
            database: self.config.database.as_deref(),
            schema: self.config.schema.as_deref(),
        };
        let response = self
            .authorised(self.client.post(&self.statements_url))
            .json(&body)
            .send()?;
        Ok(response)
    }

    fn poll(&self, handle: &str) -> WarehouseResult<Response> {
        let response = self
            .authorised(self.client.get(format!("{}/{handle}", self.statements_url)))
            .send()?;
        Ok(response)
    }

    fn partition(&self, handle: &str, index: usize) -> WarehouseResult<Vec<Vec<Option<String>>>> {
        let response = self
            .authorised(self.client.get(format!("{}/{handle}", self.statements_url)))
            .query(&[("partition", index)])
            .send()?;
        let response = ensure_success(response)?;
        let partition: Partition = response.json()?;
        Ok(partition.data)
    }

    /// Blocks until the statement leaves the 202 state or the deadline passes.
    fn await_completion(&self, mut response: Response) -> WarehouseResult<Response> {
        let started = Instant::now();
        let deadline = Duration::from_secs(self.config.statement_timeout_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        while response.status() == StatusCode::ACCEPTED {
            let status: StatementStatus = response.json()?;
            if started.elapsed() >= deadline {
                return Err(WarehouseError::StatementPending {
                    handle: status.statement_handle,
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            debug!(handle = %status.statement_handle, "statement still running");
            std::thread::sleep(interval);
            response = self.poll(&status.statement_handle)?;
        }
        Ok(response)
    }
}

fn ensure_success(response: Response) -> WarehouseResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(WarehouseError::Rejected {
        status: status.as_u16(),
        body,
    })
}

impl WarehouseSession for SqlApiSession {
    fn query(&self, statement: &str) -> WarehouseResult<ResultSet> {
        let response = self.submit(statement)?;
        let response = ensure_success(self.await_completion(response)?)?;
        let result: StatementResult = response.json()?;
        if result.result_set_meta_data.row_type.is_empty() {
            return Err(WarehouseError::MalformedResponse {
                reason: "result set metadata lists no columns".to_string(),
            });
        }
        let columns = result
            .result_set_meta_data
            .row_type
            .into_iter()
            .map(|column| column.name)
            .collect();
        let mut rows = result.data;
        let partitions = result.result_set_meta_data.partition_info.len();
        for index in 1..partitions {
            rows.extend(self.partition(&result.statement_handle, index)?);
        }
        info!(
            handle = %result.statement_handle,
            partitions,
            rows = rows.len(),
            "fetched statement result"
        );
        Ok(ResultSet::new(columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_url_and_token_are_required() {
        let mut config = SqlApiConfig::default();
        assert!(matches!(
            SqlApiWarehouse::from_config(&config),
            Err(ConfigError::MissingRequired { .. })
        ));
        config.account_url = Some("https://acme.snowflakecomputing.com/".to_string());
        assert!(SqlApiWarehouse::from_config(&config).is_err());
        config.token = Some("t".to_string());
        let warehouse = SqlApiWarehouse::from_config(&config).unwrap();
        assert_eq!(
            warehouse.describe(),
            "sql api https://acme.snowflakecomputing.com"
        );
    }

    #[test]
    fn statement_result_decodes_wire_shape() {
        let body = r#"{
            "statementHandle": "01b2-0000",
            "resultSetMetaData": {
                "numRows": 2,
                "rowType": [{"name": "COUNTRY", "type": "text"}, {"name": "NEW_CASES", "type": "fixed"}],
                "partitionInfo": [{"rowCount": 2}]
            },
            "data": [["Austria", "5"], ["Poland", null]]
        }"#;
        let result: StatementResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.statement_handle, "01b2-0000");
        assert_eq!(result.result_set_meta_data.row_type[1].name, "NEW_CASES");
        assert_eq!(result.result_set_meta_data.partition_info.len(), 1);
        assert_eq!(result.data[1], vec![Some("Poland".to_string()), None]);
    }

    #[test]
    fn request_omits_unset_context() {
        let body = StatementRequest {
            statement: "SELECT 1",
            timeout: 60,
            warehouse: None,
            role: Some("ANALYST"),
            database: None,
            schema: Some("PUBLIC"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["timeout"], 60);
        assert_eq!(json["role"], "ANALYST");
        assert!(json.get("warehouse").is_none());
        assert!(json.get("database").is_none());
        assert_eq!(json["schema"], "PUBLIC");
    }
}

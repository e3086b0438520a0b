//! High-level client for the FileMaker Data API.
//!
//! `FmClient` exposes the record-oriented operations (create, edit,
//! duplicate, delete, get, range, find, run-script) as thin request-shape
//! builders over the session layer, which supplies authentication, error
//! interpretation, and token renewal for every call.

use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::Session;
use crate::config::ClientConfig;
use crate::models::{
    CreateRecordResponse, DuplicateRecordResponse, EditRecordResponse, FindQuery, PortalRange,
    RecordsResponse, RunScriptResponse, ScriptExecution, SortOrder,
};

use super::FmError;

/// Options for a single-record get.
#[derive(Debug, Clone, Default)]
pub struct GetRecordParams {
    /// Return the record through a different layout.
    pub layout_response: Option<String>,
    /// Portals to include, each with its own record window.
    pub portals: Vec<PortalRange>,
    pub scripts: ScriptExecution,
}

/// Options for a record-range get.
#[derive(Debug, Clone, Default)]
pub struct GetRecordRangeParams {
    /// One-based index of the first record to return.
    pub starting_index: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Vec<SortOrder>,
    pub layout_response: Option<String>,
    pub portals: Vec<PortalRange>,
    pub scripts: ScriptExecution,
}

/// Options for a find request.
#[derive(Debug, Clone, Default)]
pub struct FindParams {
    /// The find criteria; entries are OR-ed, omit entries subtract.
    pub query: Vec<FindQuery>,
    pub sort: Vec<SortOrder>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub layout_response: Option<String>,
    pub portals: Vec<PortalRange>,
    pub scripts: ScriptExecution,
}

/// Options for a record edit beyond the field data itself.
#[derive(Debug, Clone, Default)]
pub struct EditRecordOptions {
    /// Related-record rows to modify, keyed by portal name.
    pub portal_data: Option<Value>,
    /// Related records to delete, as `portalName.portalRowId`.
    pub delete_related: Vec<String>,
    pub scripts: ScriptExecution,
}

/// Default found-set limit for find requests.
const DEFAULT_FIND_LIMIT: u32 = 100;

/// Client for one FileMaker database.
///
/// Clone is cheap and clones share the session token, so a token obtained
/// through one handle serves them all.
#[derive(Clone)]
pub struct FmClient {
    session: Session,
}

impl FmClient {
    pub fn new(config: &ClientConfig) -> Result<Self, FmError> {
        Ok(Self {
            session: Session::new(config)?,
        })
    }

    /// The underlying session, for callers that need direct access.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Log in explicitly. Optional: every operation opens the session on
    /// demand; this just front-loads the authentication round trip.
    pub async fn log_in(&self) -> Result<(), FmError> {
        self.session.open().await.map(|_| ())
    }

    /// Invalidate the session server-side and drop the cached token.
    pub async fn log_out(&self) -> Result<(), FmError> {
        self.session.close().await
    }

    /// Export the session token in encrypted form for a later process.
    /// Requires persistent mode; authenticates first if needed.
    pub async fn persist_token(&self) -> Result<String, FmError> {
        self.session.persist().await
    }

    /// Whether a live token is available locally (no network call).
    pub async fn validate_session(&self) -> Result<bool, FmError> {
        self.session.validate_session().await
    }

    /// Ask the server whether the current token is still honored.
    pub async fn validate_session_strict(&self) -> Result<bool, FmError> {
        self.session.validate_session_strict().await
    }

    /// Create a record in the given layout.
    pub async fn create_record<F: Serialize>(
        &self,
        layout: &str,
        field_data: &F,
        scripts: &ScriptExecution,
    ) -> Result<CreateRecordResponse, FmError> {
        let mut body = Map::new();
        body.insert("fieldData".to_string(), serde_json::to_value(field_data)?);
        scripts.apply_to_body(&mut body);

        self.session
            .request(
                &format!("/layouts/{}/records", encode(layout)),
                Method::POST,
                &[],
                Some(&Value::Object(body)),
            )
            .await
    }

    /// Edit a record's fields (and optionally its portal rows).
    pub async fn edit_record<F: Serialize>(
        &self,
        layout: &str,
        record_id: &str,
        field_data: &F,
        options: &EditRecordOptions,
    ) -> Result<EditRecordResponse, FmError> {
        let mut body = Map::new();
        body.insert("fieldData".to_string(), serde_json::to_value(field_data)?);
        if let Some(ref portal_data) = options.portal_data {
            body.insert("portalData".to_string(), portal_data.clone());
        }
        match options.delete_related.as_slice() {
            [] => {}
            [single] => {
                body.insert("deleteRelated".to_string(), Value::String(single.clone()));
            }
            many => {
                body.insert("deleteRelated".to_string(), serde_json::to_value(many)?);
            }
        }
        options.scripts.apply_to_body(&mut body);

        self.session
            .request(
                &format!("/layouts/{}/records/{}", encode(layout), encode(record_id)),
                Method::PATCH,
                &[],
                Some(&Value::Object(body)),
            )
            .await
    }

    /// Duplicate a record.
    pub async fn duplicate_record(
        &self,
        layout: &str,
        record_id: &str,
        scripts: &ScriptExecution,
    ) -> Result<DuplicateRecordResponse, FmError> {
        let mut body = Map::new();
        scripts.apply_to_body(&mut body);

        self.session
            .request(
                &format!("/layouts/{}/records/{}", encode(layout), encode(record_id)),
                Method::POST,
                &[],
                Some(&Value::Object(body)),
            )
            .await
    }

    /// Delete a record. Script directives travel as query parameters.
    pub async fn delete_record(
        &self,
        layout: &str,
        record_id: &str,
        scripts: &ScriptExecution,
    ) -> Result<(), FmError> {
        let _: Value = self
            .session
            .request(
                &format!("/layouts/{}/records/{}", encode(layout), encode(record_id)),
                Method::DELETE,
                &scripts.to_query_pairs(),
                None::<&Value>,
            )
            .await?;
        Ok(())
    }

    /// Get a single record.
    pub async fn get_record(
        &self,
        layout: &str,
        record_id: &str,
        params: &GetRecordParams,
    ) -> Result<RecordsResponse, FmError> {
        let mut query = portal_query_pairs(&params.portals, "_");
        if let Some(names) = portal_names_json(&params.portals)? {
            query.push(("portal".to_string(), names));
        }
        if let Some(ref layout_response) = params.layout_response {
            query.push(("layout.response".to_string(), layout_response.clone()));
        }
        query.extend(params.scripts.to_query_pairs());

        self.session
            .request(
                &format!("/layouts/{}/records/{}", encode(layout), encode(record_id)),
                Method::GET,
                &query,
                None::<&Value>,
            )
            .await
    }

    /// Get a range of records from a layout.
    pub async fn get_record_range(
        &self,
        layout: &str,
        params: &GetRecordRangeParams,
    ) -> Result<RecordsResponse, FmError> {
        let mut query = portal_query_pairs(&params.portals, "_");
        if let Some(names) = portal_names_json(&params.portals)? {
            query.push(("portal".to_string(), names));
        }
        if let Some(starting_index) = params.starting_index {
            query.push(("_offset".to_string(), starting_index.to_string()));
        }
        if let Some(limit) = params.limit {
            query.push(("_limit".to_string(), limit.to_string()));
        }
        if !params.sort.is_empty() {
            query.push(("_sort".to_string(), serde_json::to_string(&params.sort)?));
        }
        if let Some(ref layout_response) = params.layout_response {
            query.push(("layout.response".to_string(), layout_response.clone()));
        }
        query.extend(params.scripts.to_query_pairs());

        self.session
            .request(
                &format!("/layouts/{}/records", encode(layout)),
                Method::GET,
                &query,
                None::<&Value>,
            )
            .await
    }

    /// Find records matching the given criteria.
    ///
    /// A find with no matches is reported by the server as operation code
    /// 401 and surfaces as `FmError::Operation`.
    pub async fn find(&self, layout: &str, params: &FindParams) -> Result<RecordsResponse, FmError> {
        let body = build_find_body(params)?;

        self.session
            .request(
                &format!("/layouts/{}/_find", encode(layout)),
                Method::POST,
                &[],
                Some(&body),
            )
            .await
    }

    /// Run a script directly, outside any record operation.
    pub async fn run_script(
        &self,
        layout: &str,
        script_name: &str,
        parameter: Option<&str>,
    ) -> Result<RunScriptResponse, FmError> {
        let mut query = Vec::new();
        if let Some(parameter) = parameter {
            query.push(("script.param".to_string(), parameter.to_string()));
        }

        self.session
            .request(
                &format!("/layouts/{}/script/{}", encode(layout), encode(script_name)),
                Method::GET,
                &query,
                None::<&Value>,
            )
            .await
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Portal window parameters: `{prefix}offset.{name}` / `{prefix}limit.{name}`.
/// GET endpoints prefix with an underscore; the find body does not.
fn portal_query_pairs(portals: &[PortalRange], prefix: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for portal in portals {
        if let Some(offset) = portal.offset {
            pairs.push((format!("{prefix}offset.{}", portal.name), offset.to_string()));
        }
        if let Some(limit) = portal.limit {
            pairs.push((format!("{prefix}limit.{}", portal.name), limit.to_string()));
        }
    }
    pairs
}

/// JSON array of portal names, or None when no portals were requested.
fn portal_names_json(portals: &[PortalRange]) -> Result<Option<String>, FmError> {
    if portals.is_empty() {
        return Ok(None);
    }
    let names: Vec<&str> = portals.iter().map(|p| p.name.as_str()).collect();
    Ok(Some(serde_json::to_string(&names)?))
}

fn build_find_body(params: &FindParams) -> Result<Value, FmError> {
    let mut body = Map::new();
    body.insert("query".to_string(), serde_json::to_value(&params.query)?);
    if !params.sort.is_empty() {
        body.insert("sort".to_string(), serde_json::to_value(&params.sort)?);
    }
    // The server expects numeric window parameters as strings here.
    body.insert(
        "limit".to_string(),
        Value::String(params.limit.unwrap_or(DEFAULT_FIND_LIMIT).to_string()),
    );
    if let Some(offset) = params.offset {
        body.insert("offset".to_string(), Value::String(offset.to_string()));
    }
    if let Some(ref layout_response) = params.layout_response {
        body.insert(
            "layout.response".to_string(),
            Value::String(layout_response.clone()),
        );
    }
    for (key, value) in portal_query_pairs(&params.portals, "") {
        body.insert(key, Value::String(value));
    }
    params.scripts.apply_to_body(&mut body);
    Ok(Value::Object(body))
}

// ============================================================================
// Tests
// ============================================================================

mod store;

pub use store::ProfileStore;

use axum::{
    Router,
    body::Bytes,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    CityClass, EngineError, FinancialProfile, PayrollSnapshot, Recommendation,
    RecommendationCategory, Regime, SimulationResult, TaxAnalysisResult, analyze,
    recommendations, simulate, simulate_categories,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCityClass {
    Metro,
    NonMetro,
}

impl From<CliCityClass> for CityClass {
    fn from(value: CliCityClass) -> Self {
        match value {
            CliCityClass::Metro => CityClass::Metro,
            CliCityClass::NonMetro => CityClass::NonMetro,
        }
    }
}

impl From<CityClass> for CliCityClass {
    fn from(value: CityClass) -> Self {
        match value {
            CityClass::Metro => CliCityClass::Metro,
            CityClass::NonMetro => CliCityClass::NonMetro,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Selection {
    Ordinal(usize),
    Categories(Vec<RecommendationCategory>),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum SelectionMode {
    Ordinal,
    Category,
}

/// Either a JSON array of ids or a comma separated query string value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum IdList {
    Many(Vec<String>),
    Joined(String),
}

impl IdList {
    fn into_ids(self) -> Vec<String> {
        match self {
            IdList::Many(ids) => ids,
            IdList::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProfilePayload {
    gross_salary: Option<i64>,
    basic_salary: Option<i64>,
    hra_received: Option<i64>,
    provident_fund: Option<i64>,
    city_class: Option<CityClass>,
    annual_rent: Option<i64>,
    no_rent: Option<bool>,
    section_80c_investments: Option<i64>,
    health_premium: Option<i64>,

    accepted_count: Option<usize>,
    recommendation_ids: Option<IdList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SelectionPayload {
    accepted_count: Option<usize>,
    recommendation_ids: Option<IdList>,
}

#[derive(Parser, Debug)]
#[command(
    name = "taxwise",
    about = "Salary tax estimator (old vs new regime, HRA, 80C/80D gaps, what-if simulation)"
)]
struct Cli {
    #[arg(long)]
    gross_salary: i64,
    #[arg(long)]
    basic_salary: i64,
    #[arg(long, default_value_t = 0)]
    hra_received: i64,
    #[arg(long, default_value_t = 0, help = "Employee provident fund contribution")]
    provident_fund: i64,
    #[arg(long, value_enum, default_value_t = CliCityClass::Metro)]
    city_class: CliCityClass,
    #[arg(long, help = "Annual rent paid; omit if not renting")]
    annual_rent: Option<i64>,
    #[arg(
        long = "section-80c-investments",
        default_value_t = 0,
        help = "80C investments excluding provident fund"
    )]
    section_80c_investments: i64,
    #[arg(long, default_value_t = 0, help = "Self health insurance premium (80D)")]
    health_premium: i64,
    #[arg(
        long,
        default_value_t = 0,
        help = "Number of accepted recommendations to simulate (80C first, then 80D)"
    )]
    accepted: usize,
}

#[derive(Debug)]
struct ApiRequest {
    profile: FinancialProfile,
    selection: Selection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    #[serde(flatten)]
    analysis: TaxAnalysisResult,
    best_regime: Regime,
    min_tax: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    selection: SelectionMode,
    #[serde(flatten)]
    result: SimulationResult,
}

#[derive(Debug, Serialize)]
struct RecommendationsResponse {
    recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliReport {
    analysis: AnalyzeResponse,
    simulation: SimulateResponse,
    recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone, Default)]
struct AppState {
    store: ProfileStore,
}

fn check_non_negative(amounts: &[(&str, i64)]) -> Result<(), String> {
    for (name, value) in amounts {
        if *value < 0 {
            return Err(format!("{name} must be >= 0"));
        }
    }
    Ok(())
}

fn build_profile(cli: Cli) -> Result<FinancialProfile, String> {
    check_non_negative(&[
        ("--gross-salary", cli.gross_salary),
        ("--hra-received", cli.hra_received),
        ("--provident-fund", cli.provident_fund),
        ("--section-80c-investments", cli.section_80c_investments),
        ("--health-premium", cli.health_premium),
    ])?;

    if cli.basic_salary <= 0 {
        return Err("--basic-salary must be > 0".to_string());
    }

    if cli.basic_salary > cli.gross_salary {
        return Err("--basic-salary must be <= --gross-salary".to_string());
    }

    if let Some(rent) = cli.annual_rent {
        if rent < 0 {
            return Err("--annual-rent must be >= 0".to_string());
        }
    }

    Ok(FinancialProfile {
        city_class: cli.city_class.into(),
        annual_rent: cli.annual_rent,
        section_80c_investments: cli.section_80c_investments,
        health_premium: cli.health_premium,
        payroll: Some(PayrollSnapshot {
            gross_salary: cli.gross_salary,
            basic_salary: cli.basic_salary,
            hra_received: cli.hra_received,
            provident_fund: cli.provident_fund,
            allowances: Default::default(),
        }),
    })
}

/// Checks a profile submitted whole; payroll may still be missing at this stage.
fn validate_profile(profile: &FinancialProfile) -> Result<(), String> {
    check_non_negative(&[
        ("annualRent", profile.annual_rent.unwrap_or(0)),
        ("section80cInvestments", profile.section_80c_investments),
        ("healthPremium", profile.health_premium),
    ])?;

    if let Some(payroll) = &profile.payroll {
        check_non_negative(&[
            ("payroll.grossSalary", payroll.gross_salary),
            ("payroll.hraReceived", payroll.hra_received),
            ("payroll.providentFund", payroll.provident_fund),
        ])?;
        if payroll.basic_salary <= 0 {
            return Err("payroll.basicSalary must be > 0".to_string());
        }
        if payroll.basic_salary > payroll.gross_salary {
            return Err("payroll.basicSalary must be <= payroll.grossSalary".to_string());
        }
    }
    Ok(())
}

fn parse_selection(
    accepted_count: Option<usize>,
    recommendation_ids: Option<IdList>,
) -> Result<Selection, String> {
    match recommendation_ids {
        Some(ids) => {
            let categories = ids
                .into_ids()
                .iter()
                .map(|id| id.parse::<RecommendationCategory>())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Selection::Categories(categories))
        }
        None => Ok(Selection::Ordinal(accepted_count.unwrap_or(0))),
    }
}

/// An empty body selects nothing; anything else must be a valid selection payload.
fn selection_from_body(body: &[u8]) -> Result<Selection, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Selection::Ordinal(0));
    }
    let payload = serde_json::from_slice::<SelectionPayload>(body)
        .map_err(|e| format!("Invalid selection payload: {e}"))?;
    parse_selection(payload.accepted_count, payload.recommendation_ids)
}

fn run_selection(
    profile: &FinancialProfile,
    selection: &Selection,
) -> Result<SimulateResponse, EngineError> {
    let response = match selection {
        Selection::Ordinal(count) => SimulateResponse {
            selection: SelectionMode::Ordinal,
            result: simulate(profile, *count)?,
        },
        Selection::Categories(categories) => SimulateResponse {
            selection: SelectionMode::Category,
            result: simulate_categories(profile, categories)?,
        },
    };
    Ok(response)
}

fn build_analyze_response(analysis: TaxAnalysisResult) -> AnalyzeResponse {
    AnalyzeResponse {
        analysis,
        best_regime: analysis.best_regime(),
        min_tax: analysis.min_tax(),
    }
}

/// One-shot command-line analysis; prints the report as JSON on stdout.
pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let accepted = cli.accepted;
    let profile = build_profile(cli)?;

    let report = build_cli_report(&profile, accepted).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("failed to serialize report: {e}"))?;
    println!("{json}");
    Ok(())
}

fn build_cli_report(
    profile: &FinancialProfile,
    accepted: usize,
) -> Result<CliReport, EngineError> {
    Ok(CliReport {
        analysis: build_analyze_response(analyze(profile)?),
        simulation: run_selection(profile, &Selection::Ordinal(accepted))?,
        recommendations: recommendations(profile)?,
    })
}

pub fn router(store: ProfileStore) -> Router {
    Router::new()
        .route(
            "/api/analyze",
            get(analyze_get_handler).post(analyze_post_handler),
        )
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/recommendations",
            get(recommendations_get_handler).post(recommendations_post_handler),
        )
        .route(
            "/api/profiles/:id",
            put(save_profile_handler)
                .get(load_profile_handler)
                .delete(remove_profile_handler),
        )
        .route("/api/profiles/:id/analyze", post(stored_analyze_handler))
        .route("/api/profiles/:id/simulate", post(stored_simulate_handler))
        .route(
            "/api/profiles/:id/recommendations",
            get(stored_recommendations_handler),
        )
        .fallback(not_found_handler)
        .with_state(AppState { store })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(ProfileStore::new());

    let listener = TcpListener::bind(addr).await?;
    info!("taxwise HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/analyze");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn analyze_get_handler(
    payload: Result<Query<ProfilePayload>, QueryRejection>,
) -> Response {
    analyze_handler_impl(query_payload(payload))
}

async fn analyze_post_handler(payload: Result<Json<ProfilePayload>, JsonRejection>) -> Response {
    analyze_handler_impl(json_payload(payload))
}

async fn simulate_get_handler(
    payload: Result<Query<ProfilePayload>, QueryRejection>,
) -> Response {
    simulate_handler_impl(query_payload(payload))
}

async fn simulate_post_handler(payload: Result<Json<ProfilePayload>, JsonRejection>) -> Response {
    simulate_handler_impl(json_payload(payload))
}

async fn recommendations_get_handler(
    payload: Result<Query<ProfilePayload>, QueryRejection>,
) -> Response {
    recommendations_handler_impl(query_payload(payload))
}

async fn recommendations_post_handler(
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> Response {
    recommendations_handler_impl(json_payload(payload))
}

fn query_payload<T>(payload: Result<Query<T>, QueryRejection>) -> Result<T, String> {
    payload
        .map(|Query(payload)| payload)
        .map_err(|rejection| rejection.body_text())
}

fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, String> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| rejection.body_text())
}

fn analyze_handler_impl(payload: Result<ProfilePayload, String>) -> Response {
    let request = match payload.and_then(api_request_from_payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    analysis_response(&request.profile)
}

fn simulate_handler_impl(payload: Result<ProfilePayload, String>) -> Response {
    let request = match payload.and_then(api_request_from_payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    simulation_response(&request.profile, &request.selection)
}

fn recommendations_handler_impl(payload: Result<ProfilePayload, String>) -> Response {
    let request = match payload.and_then(api_request_from_payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    recommendations_response(&request.profile)
}

async fn save_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<FinancialProfile>, JsonRejection>,
) -> Response {
    let profile = match json_payload(payload) {
        Ok(profile) => profile,
        Err(msg) => return bad_request(&msg),
    };
    if let Err(msg) = validate_profile(&profile) {
        return bad_request(&msg);
    }
    let replaced = state.store.save(id.clone(), profile.clone()).await.is_some();
    info!(profile_id = %id, replaced, "stored profile");
    json_response(StatusCode::OK, profile)
}

async fn load_profile_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.load(&id).await {
        Some(profile) => json_response(StatusCode::OK, profile),
        None => profile_not_found(&id),
    }
}

async fn remove_profile_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.remove(&id).await {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => profile_not_found(&id),
    }
}

async fn stored_analyze_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.load(&id).await {
        Some(profile) => analysis_response(&profile),
        None => profile_not_found(&id),
    }
}

async fn stored_simulate_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let selection = match selection_from_body(&body) {
        Ok(selection) => selection,
        Err(msg) => return bad_request(&msg),
    };
    match state.store.load(&id).await {
        Some(profile) => simulation_response(&profile, &selection),
        None => profile_not_found(&id),
    }
}

async fn stored_recommendations_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.load(&id).await {
        Some(profile) => recommendations_response(&profile),
        None => profile_not_found(&id),
    }
}

fn analysis_response(profile: &FinancialProfile) -> Response {
    match analyze(profile) {
        Ok(analysis) => {
            let response = build_analyze_response(analysis);
            info!(
                best_regime = %response.best_regime,
                min_tax = response.min_tax,
                "analysis complete"
            );
            json_response(StatusCode::OK, response)
        }
        Err(err) => engine_error_response(err),
    }
}

fn simulation_response(profile: &FinancialProfile, selection: &Selection) -> Response {
    match run_selection(profile, selection) {
        Ok(response) => {
            info!(
                tax_before = response.result.tax_before,
                tax_after = response.result.tax_after,
                savings = response.result.savings,
                "simulation complete"
            );
            json_response(StatusCode::OK, response)
        }
        Err(err) => engine_error_response(err),
    }
}

fn recommendations_response(profile: &FinancialProfile) -> Response {
    match recommendations(profile) {
        Ok(recommendations) => {
            json_response(StatusCode::OK, RecommendationsResponse { recommendations })
        }
        Err(err) => engine_error_response(err),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn bad_request(msg: &str) -> Response {
    warn!(error = msg, "rejected request");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn profile_not_found(id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, &format!("Profile not found: {id}"))
}

fn engine_error_response(err: EngineError) -> Response {
    warn!(error = %err, "analysis failed");
    match err {
        EngineError::MissingData(_) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
        }
    }
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProfilePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProfilePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.gross_salary {
        cli.gross_salary = v;
    }
    if let Some(v) = payload.basic_salary {
        cli.basic_salary = v;
    }
    if let Some(v) = payload.hra_received {
        cli.hra_received = v;
    }
    if let Some(v) = payload.provident_fund {
        cli.provident_fund = v;
    }
    if let Some(v) = payload.city_class {
        cli.city_class = v.into();
    }
    if let Some(v) = payload.annual_rent {
        cli.annual_rent = Some(v);
    }
    if payload.no_rent == Some(true) {
        cli.annual_rent = None;
    }
    if let Some(v) = payload.section_80c_investments {
        cli.section_80c_investments = v;
    }
    if let Some(v) = payload.health_premium {
        cli.health_premium = v;
    }

    let selection = parse_selection(payload.accepted_count, payload.recommendation_ids)?;
    let profile = build_profile(cli)?;

    Ok(ApiRequest { profile, selection })
}

fn default_cli_for_api() -> Cli {
    Cli {
        gross_salary: 1_200_000,
        basic_salary: 600_000,
        hra_received: 300_000,
        provident_fund: 72_000,
        city_class: CliCityClass::Metro,
        annual_rent: Some(240_000),
        section_80c_investments: 0,
        health_premium: 0,
        accepted: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Request};
    use std::fs;
    use std::path::Path as FsPath;
    use tower::ServiceExt;

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    fn assert_golden_snapshot(path: &str, actual: &str) {
        let update = matches!(
            std::env::var("UPDATE_GOLDEN").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );
        let snapshot_path = FsPath::new(path);

        if update {
            if let Some(parent) = snapshot_path.parent() {
                fs::create_dir_all(parent).expect("failed to create snapshot directory");
            }
            fs::write(snapshot_path, actual).expect("failed to write golden snapshot");
            return;
        }

        let expected = fs::read_to_string(snapshot_path).unwrap_or_else(|_| {
            panic!("missing golden snapshot at {path}; run with UPDATE_GOLDEN=1 to generate")
        });
        assert_eq!(
            actual, expected,
            "snapshot mismatch for {path}; run with UPDATE_GOLDEN=1 to refresh if expected"
        );
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, _, value) = send_with_headers(app, method, uri, body).await;
        (status, value)
    }

    async fn send_with_headers(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, HeaderMap, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .oneshot(builder.body(body).expect("valid request"))
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, headers, value)
    }

    fn assert_json_bad_request(status: StatusCode, headers: &HeaderMap, body: &serde_json::Value) {
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            headers.get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
        assert!(body["error"].is_string(), "expected JSON error body, got {body}");
    }

    #[test]
    fn build_profile_rejects_negative_amounts() {
        let mut cli = sample_cli();
        cli.health_premium = -1;
        let err = build_profile(cli).expect_err("must reject negative premium");
        assert!(err.contains("--health-premium"));

        let mut cli = sample_cli();
        cli.annual_rent = Some(-5);
        let err = build_profile(cli).expect_err("must reject negative rent");
        assert!(err.contains("--annual-rent"));
    }

    #[test]
    fn build_profile_rejects_basic_above_gross() {
        let mut cli = sample_cli();
        cli.basic_salary = 2_000_000;
        let err = build_profile(cli).expect_err("must reject basic > gross");
        assert!(err.contains("--basic-salary"));

        let mut cli = sample_cli();
        cli.basic_salary = 0;
        let err = build_profile(cli).expect_err("must reject zero basic");
        assert!(err.contains("--basic-salary must be > 0"));
    }

    #[test]
    fn build_profile_populates_payroll() {
        let profile = build_profile(sample_cli()).expect("valid profile");
        let payroll = profile.payroll.expect("payroll populated");
        assert_eq!(payroll.gross_salary, 1_200_000);
        assert_eq!(payroll.provident_fund, 72_000);
        assert_eq!(profile.city_class, CityClass::Metro);
        assert_eq!(profile.annual_rent, Some(240_000));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "grossSalary": 900000,
          "basicSalary": 400000,
          "hraReceived": 160000,
          "providentFund": 48000,
          "cityClass": "non-metro",
          "annualRent": 180000,
          "section80cInvestments": 30000,
          "healthPremium": 12000,
          "acceptedCount": 2
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let profile = request.profile;
        let payroll = profile.payroll.as_ref().expect("payroll populated");

        assert_eq!(payroll.gross_salary, 900_000);
        assert_eq!(payroll.basic_salary, 400_000);
        assert_eq!(payroll.hra_received, 160_000);
        assert_eq!(payroll.provident_fund, 48_000);
        assert_eq!(profile.city_class, CityClass::NonMetro);
        assert_eq!(profile.annual_rent, Some(180_000));
        assert_eq!(profile.section_80c_investments, 30_000);
        assert_eq!(profile.health_premium, 12_000);
        assert_eq!(request.selection, Selection::Ordinal(2));
    }

    #[test]
    fn api_request_from_json_accepts_city_aliases_and_no_rent() {
        let request = api_request_from_json(r#"{"cityClass": "NonMetro", "noRent": true}"#)
            .expect("json should parse");
        assert_eq!(request.profile.city_class, CityClass::NonMetro);
        assert_eq!(request.profile.annual_rent, None);
    }

    #[test]
    fn recommendation_ids_select_by_category() {
        let request = api_request_from_json(r#"{"recommendationIds": ["80D-gap", "80c"]}"#)
            .expect("json should parse");
        assert_eq!(
            request.selection,
            Selection::Categories(vec![
                RecommendationCategory::Section80d,
                RecommendationCategory::Section80c
            ])
        );

        let joined = parse_selection(None, Some(IdList::Joined("80C-gap, 80D-gap".into())))
            .expect("joined ids parse");
        assert_eq!(
            joined,
            Selection::Categories(vec![
                RecommendationCategory::Section80c,
                RecommendationCategory::Section80d
            ])
        );
    }

    #[test]
    fn unknown_recommendation_id_is_rejected() {
        let err = api_request_from_json(r#"{"recommendationIds": ["hra-gap"]}"#)
            .expect_err("unknown id");
        assert!(err.contains("hra-gap"));
    }

    #[test]
    fn validate_profile_allows_missing_payroll_but_checks_amounts() {
        let mut profile = FinancialProfile::default();
        assert!(validate_profile(&profile).is_ok());

        profile.health_premium = -10;
        let err = validate_profile(&profile).expect_err("negative premium");
        assert!(err.contains("healthPremium"));
    }

    #[test]
    fn analyze_response_serialization_contains_expected_fields() {
        let profile = build_profile(sample_cli()).expect("valid profile");
        let report = build_cli_report(&profile, 2).expect("payroll present");
        let json = serde_json::to_string(&report).expect("report should serialize");

        assert!(json.contains("\"analysis\""));
        assert!(json.contains("\"taxOld\""));
        assert!(json.contains("\"section80cUtilized\""));
        assert!(json.contains("\"gap80d\""));
        assert!(json.contains("\"bestRegime\""));
        assert!(json.contains("\"finalPlan\""));
        assert!(json.contains("\"80C-gap\""));
        assert!(json.contains("\"estimatedTaxSavings\""));
    }

    #[test]
    fn golden_snapshot_sample_analysis_json() {
        let profile = build_profile(sample_cli()).expect("valid profile");
        let response = build_analyze_response(analyze(&profile).expect("payroll present"));
        let json = format!(
            "{}\n",
            serde_json::to_string(&response).expect("response should serialize")
        );

        assert_golden_snapshot("tests/golden/sample_analysis.json", &json);
    }

    #[test]
    fn golden_snapshot_sample_simulation_json() {
        let profile = build_profile(sample_cli()).expect("valid profile");
        let response = run_selection(&profile, &Selection::Ordinal(2)).expect("payroll present");
        let json = format!(
            "{}\n",
            serde_json::to_string(&response).expect("response should serialize")
        );

        assert_golden_snapshot("tests/golden/sample_simulation_two_accepted.json", &json);
    }

    #[tokio::test]
    async fn analyze_endpoint_uses_defaults_for_missing_fields() {
        let app = router(ProfileStore::new());
        let (status, body) = send(
            app,
            "POST",
            "/api/analyze",
            Some(r#"{"healthPremium": 25000}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gap80d"], 0);
        assert_eq!(body["hraExempt"], 180_000);
        assert_eq!(body["taxNew"], 75_400);
    }

    #[tokio::test]
    async fn analyze_endpoint_accepts_query_strings() {
        let app = router(ProfileStore::new());
        let (status, body) = send(
            app,
            "GET",
            "/api/analyze?grossSalary=1000000&basicSalary=500000&hraReceived=200000&providentFund=60000&annualRent=300000&section80cInvestments=90000&healthPremium=25000",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["taxOld"], 28_100);
        assert_eq!(body["bestRegime"], "old");
    }

    #[tokio::test]
    async fn simulate_endpoint_rejects_invalid_payload() {
        let app = router(ProfileStore::new());
        let (status, body) =
            send(app, "POST", "/api/simulate", Some(r#"{"grossSalary": -1}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap_or_default()
                .contains("--gross-salary")
        );
    }

    #[tokio::test]
    async fn stored_profile_without_payroll_is_unprocessable() {
        let store = ProfileStore::new();
        let app = router(store.clone());
        let (status, _) = send(
            app.clone(),
            "PUT",
            "/api/profiles/job-1",
            Some(r#"{"cityClass": "metro", "annualRent": 240000}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app, "POST", "/api/profiles/job-1/analyze", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(
            body["error"]
                .as_str()
                .unwrap_or_default()
                .contains("missing data")
        );
    }

    #[tokio::test]
    async fn stored_simulation_does_not_mutate_stored_profile() {
        let store = ProfileStore::new();
        let profile = build_profile(sample_cli()).expect("valid profile");
        store.save("job-2", profile.clone()).await;
        let app = router(store.clone());

        let (status, body) = send(
            app,
            "POST",
            "/api/profiles/job-2/simulate",
            Some(r#"{"recommendationIds": ["80C-gap", "80D-gap"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selection"], "category");
        assert_eq!(body["savings"], 1_540);
        assert_eq!(body["finalPlan"]["regime"], "old");

        assert_eq!(store.load("job-2").await, Some(profile));
    }

    #[tokio::test]
    async fn unknown_profile_and_route_are_not_found() {
        let app = router(ProfileStore::new());
        let (status, _) =
            send(app.clone(), "POST", "/api/profiles/missing/analyze", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(app, "GET", "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn malformed_json_payload_is_a_json_bad_request() {
        let app = router(ProfileStore::new());
        let (status, headers, body) = send_with_headers(
            app.clone(),
            "POST",
            "/api/simulate",
            Some(r#"{"acceptedCount": -1}"#),
        )
        .await;
        assert_json_bad_request(status, &headers, &body);
        assert!(
            body["error"]
                .as_str()
                .unwrap_or_default()
                .contains("acceptedCount")
        );

        let (status, headers, body) =
            send_with_headers(app, "POST", "/api/analyze", Some("{not json")).await;
        assert_json_bad_request(status, &headers, &body);
    }

    #[tokio::test]
    async fn malformed_query_string_is_a_json_bad_request() {
        let app = router(ProfileStore::new());
        let (status, headers, body) =
            send_with_headers(app, "GET", "/api/analyze?grossSalary=lots", None).await;
        assert_json_bad_request(status, &headers, &body);
    }

    #[tokio::test]
    async fn malformed_stored_profile_is_a_json_bad_request() {
        let store = ProfileStore::new();
        let app = router(store.clone());
        let (status, headers, body) = send_with_headers(
            app,
            "PUT",
            "/api/profiles/job-3",
            Some(r#"{"healthPremium": "plenty"}"#),
        )
        .await;
        assert_json_bad_request(status, &headers, &body);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn stored_simulation_rejects_invalid_selection_body() {
        let store = ProfileStore::new();
        store
            .save("job-4", build_profile(sample_cli()).expect("valid profile"))
            .await;
        let app = router(store);

        for bad in [r#"{"acceptedCount": "two"}"#, r#"{"acceptedCount": -1}"#] {
            let (status, headers, body) = send_with_headers(
                app.clone(),
                "POST",
                "/api/profiles/job-4/simulate",
                Some(bad),
            )
            .await;
            assert_json_bad_request(status, &headers, &body);
        }

        let (status, body) = send(app, "POST", "/api/profiles/job-4/simulate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selection"], "ordinal");
        assert_eq!(body["savings"], 0);
    }

    #[tokio::test]
    async fn simulate_endpoint_reads_comma_separated_ids_from_query() {
        let app = router(ProfileStore::new());
        let (status, body) = send(
            app,
            "GET",
            "/api/simulate?recommendationIds=80C-gap,80D-gap",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selection"], "category");
        assert_eq!(body["applied"], serde_json::json!(["80C-gap", "80D-gap"]));
        assert_eq!(body["savings"], 1_540);
    }
}

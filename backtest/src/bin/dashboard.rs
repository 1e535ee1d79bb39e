//! DCA Backtest Dashboard
//!
//! Web front end for the run session: configure a scenario, trigger a run,
//! and watch the state move from loading to a rendered curve.
//!
//! Usage: cargo run --bin dashboard
//! Then open http://localhost:3000

use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use dca_backtest::analyzer::{AnalysisResult, Citation, GeminiClient};
use dca_backtest::chart::{self, ChartSeries};
use dca_backtest::config::Config;
use dca_backtest::session::{FailureCause, RunInfo, RunRejected, RunState, Session, FAILURE_MESSAGE};
use dca_backtest::types::{find_preset, AssetPreset, Currency, Frequency, Mode, Scenario, ASSET_PRESETS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

// ── Types ──

struct AppState {
    config: Config,
    session: Session,
}

type SharedState = Arc<AppState>;

/// Any field left out falls back to the configured default
#[derive(Deserialize, Default)]
struct RunRequest {
    mode: Option<Mode>,
    asset: Option<String>,
    preset: Option<String>,
    amount: Option<Decimal>,
    target: Option<Decimal>,
    currency: Option<Currency>,
    frequency: Option<Frequency>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

#[derive(Serialize)]
struct RunResponse {
    ok: bool,
    message: String,
    run_id: Option<String>,
}

#[derive(Deserialize, Default)]
struct StateQuery {
    #[serde(default)]
    diagnostics: bool,
}

#[derive(Serialize)]
struct Diagnostics<'a> {
    cause: Option<&'a FailureCause>,
    raw_text: &'a str,
}

#[derive(Serialize)]
struct StateView<'a> {
    phase: &'static str,
    can_trigger: bool,
    run: Option<&'a RunInfo>,
    currency_symbol: Option<&'static str>,
    amount_label: Option<&'static str>,
    result: Option<&'a AnalysisResult>,
    citations: &'a [Citation],
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<Diagnostics<'a>>,
}

impl<'a> StateView<'a> {
    fn new(state: &'a RunState, with_diagnostics: bool) -> Self {
        let run = state.run();
        let mut view = StateView {
            phase: state.phase(),
            can_trigger: !state.is_loading(),
            run,
            currency_symbol: run.map(|r| r.scenario.currency_symbol()),
            amount_label: run.map(|r| r.scenario.mode.amount_label()),
            result: state.result(),
            citations: &[],
            message: None,
            diagnostics: None,
        };
        match state {
            RunState::Succeeded { citations, raw_text, .. } => {
                view.citations = citations.as_slice();
                if with_diagnostics {
                    view.diagnostics = Some(Diagnostics { cause: None, raw_text });
                }
            }
            RunState::ParseFailed { raw_text, cause, .. } => {
                view.message = Some(FAILURE_MESSAGE);
                if with_diagnostics {
                    view.diagnostics = Some(Diagnostics { cause: Some(cause), raw_text });
                }
            }
            _ => {}
        }
        view
    }
}

// ── Main ──

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    if !config.is_configured() {
        error!("GEMINI_API_KEY must be set");
        std::process::exit(1);
    }
    let port = config.dashboard_port;

    let gemini = GeminiClient::new(&config);
    info!("Model: {} (Google Search grounding)", gemini.model());

    let state: SharedState = Arc::new(AppState {
        session: Session::new(Arc::new(gemini)),
        config,
    });

    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!("Dashboard running at http://localhost:{}", port);
    axum::serve(listener, app).await.context("serve failed")?;
    Ok(())
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(serve_html))
        .route("/api/state", get(api_state))
        .route("/api/chart", get(api_chart))
        .route("/api/run", post(api_run))
        .route("/api/presets", get(api_presets))
        .route("/api/defaults", get(api_defaults))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── API Handlers ──

async fn serve_html() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn api_state(State(state): State<SharedState>, Query(q): Query<StateQuery>) -> Response {
    let current = state.session.state();
    Json(StateView::new(&current, q.diagnostics)).into_response()
}

async fn api_chart(State(state): State<SharedState>) -> Result<Json<ChartSeries>, StatusCode> {
    match state.session.state() {
        RunState::Succeeded { run, result, .. } => Ok(Json(chart::adapt(
            result.chart_data(),
            run.scenario.currency_symbol(),
        ))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn api_presets() -> Json<&'static [AssetPreset]> {
    Json(&ASSET_PRESETS[..])
}

/// Configured default scenario; seeds the form
async fn api_defaults(State(state): State<SharedState>) -> Json<Scenario> {
    Json(state.config.default_scenario(Mode::Compute))
}

async fn api_run(
    State(state): State<SharedState>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> (StatusCode, Json<RunResponse>) {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return reply(StatusCode::BAD_REQUEST, rejection.body_text(), None),
    };
    let scenario = match scenario_from_request(&state.config, req) {
        Ok(s) => s,
        Err(message) => return reply(StatusCode::BAD_REQUEST, message, None),
    };

    let ticket = match state.session.begin(scenario) {
        Ok(t) => t,
        Err(e @ RunRejected::InFlight(_)) => return reply(StatusCode::CONFLICT, e.to_string(), None),
    };
    let run_id = ticket.id().to_string();

    let shared = state.clone();
    tokio::spawn(async move {
        shared.session.execute(ticket).await;
    });

    reply(StatusCode::ACCEPTED, "Run started".to_string(), Some(run_id))
}

fn reply(status: StatusCode, message: String, run_id: Option<String>) -> (StatusCode, Json<RunResponse>) {
    let ok = status.is_success();
    (status, Json(RunResponse { ok, message, run_id }))
}

fn scenario_from_request(config: &Config, req: RunRequest) -> Result<Scenario, String> {
    let mut scenario = config.default_scenario(req.mode.unwrap_or_default());
    if let Some(key) = req.preset.as_deref() {
        let preset = find_preset(key).ok_or_else(|| format!("Unknown preset: {key}"))?;
        scenario.asset = preset.asset.to_string();
    }
    if let Some(asset) = req.asset {
        scenario.asset = asset;
    }
    if let Some(amount) = req.amount {
        scenario.amount = amount;
    }
    if let Some(target) = req.target {
        scenario.target = target;
    }
    if let Some(currency) = req.currency {
        scenario.currency = currency;
    }
    if let Some(frequency) = req.frequency {
        scenario.frequency = frequency;
    }
    if let Some(start) = req.start_date {
        scenario.start_date = start;
    }
    if let Some(end) = req.end_date {
        scenario.end_date = end;
    }
    scenario.validate().map_err(|e| e.to_string())?;
    Ok(scenario)
}


// ── HTML ──

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>DCA Backtest</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
<style>
  body { font-family: system-ui, sans-serif; background: #f8fafc; color: #1e293b; margin: 0; padding: 24px; }
  .grid { display: grid; grid-template-columns: 320px 1fr; gap: 24px; max-width: 1200px; margin: 0 auto; }
  .card { background: #fff; border-radius: 16px; padding: 20px; box-shadow: 0 4px 20px rgba(0,0,0,.04); }
  label { display: block; font-size: 11px; font-weight: 700; color: #94a3b8; text-transform: uppercase; margin: 12px 0 4px; }
  input, select { width: 100%; padding: 8px; border: 1px solid #e2e8f0; border-radius: 8px; box-sizing: border-box; }
  button { margin-top: 16px; width: 100%; padding: 12px; border: 0; border-radius: 10px; background: #0f172a; color: #fff; font-weight: 700; cursor: pointer; }
  button:disabled { background: #94a3b8; cursor: not-allowed; }
  .presets button { width: auto; margin: 4px 4px 0 0; padding: 4px 8px; font-size: 12px; background: #e2e8f0; color: #334155; }
  .cards { display: grid; grid-template-columns: repeat(4, 1fr); gap: 12px; }
  .pos { color: #059669; } .neg { color: #e11d48; }
  .err { color: #e11d48; background: #fff1f2; padding: 16px; border-radius: 12px; }
  #sources a { display: inline-block; font-size: 11px; margin: 2px; padding: 2px 6px; border: 1px solid #e2e8f0; border-radius: 6px; color: #64748b; }
</style>
</head>
<body>
<div class="grid">
  <div class="card">
    <label>Mode</label>
    <select id="mode"><option value="compute">Compute return</option><option value="backsolve">Back-solve plan</option></select>
    <label>Asset</label>
    <input id="asset">
    <div class="presets" id="presets"></div>
    <label>Currency</label>
    <select id="currency"><option>USD</option><option>CNY</option><option>HKD</option></select>
    <label>Frequency</label>
    <select id="frequency"><option value="monthly">Monthly</option><option value="weekly">Weekly</option><option value="quarterly">Quarterly</option></select>
    <label id="amountLabel">Amount per period</label>
    <input id="amount" type="number">
    <label>Start</label>
    <input id="start" type="date">
    <label>End</label>
    <input id="end" type="date">
    <button id="run">Run</button>
  </div>
  <div>
    <div id="empty" class="card">Pick a scenario and run it.</div>
    <div id="failed" class="err" hidden></div>
    <div id="done" hidden>
      <div class="cards">
        <div class="card"><label>Total invested</label><b id="totalInvested"></b></div>
        <div class="card"><label>Final value</label><b id="finalValue"></b></div>
        <div class="card"><label>ROI</label><b id="roi"></b></div>
        <div class="card"><label>CAGR</label><b id="cagr"></b></div>
      </div>
      <div class="card" style="height:400px;margin-top:16px"><canvas id="chart"></canvas></div>
      <div class="card" style="margin-top:16px"><label>Market analysis</label><div id="analysis"></div></div>
      <div id="sources" style="margin-top:12px"></div>
    </div>
  </div>
</div>
<script>
const $ = id => document.getElementById(id);
let chart = null, renderedRun = null, defaults = null;

$("mode").onchange = () => {
  const compute = $("mode").value === "compute";
  $("amountLabel").textContent = compute ? "Amount per period" : "Target value";
  if (defaults) $("amount").value = compute ? defaults.amount : defaults.target;
};

fetch("/api/defaults").then(r => r.json()).then(d => {
  defaults = d;
  $("asset").value = d.asset;
  $("currency").value = d.currency;
  $("frequency").value = d.frequency;
  $("start").value = d.start_date;
  $("end").value = d.end_date;
  $("mode").onchange();
});

fetch("/api/presets").then(r => r.json()).then(list => list.forEach(p => {
  const b = document.createElement("button");
  b.textContent = p.label;
  b.onclick = () => { $("asset").value = p.asset; };
  $("presets").appendChild(b);
}));

$("run").onclick = async () => {
  const compute = $("mode").value === "compute";
  const body = {
    mode: $("mode").value, asset: $("asset").value, currency: $("currency").value,
    frequency: $("frequency").value, start_date: $("start").value || undefined, end_date: $("end").value || undefined,
  };
  body[compute ? "amount" : "target"] = Number($("amount").value);
  const r = await fetch("/api/run", { method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify(body) });
  const isJson = (r.headers.get("content-type") || "").includes("application/json");
  const res = isJson ? await r.json() : { ok: false, message: await r.text() };
  if (!r.ok || !res.ok) alert(res.message || "Request failed (" + r.status + ")");
  poll();
};

async function poll() {
  const s = await (await fetch("/api/state")).json();
  $("run").disabled = !s.can_trigger;
  $("run").textContent = s.phase === "loading" ? "Computing..." : "Run";
  $("empty").hidden = s.phase !== "idle" && s.phase !== "loading";
  $("failed").hidden = s.phase !== "parse_failed";
  $("done").hidden = s.phase !== "succeeded";
  if (s.phase === "parse_failed") $("failed").textContent = s.message;
  if (s.phase === "succeeded" && renderedRun !== s.run.id) { render(s); renderedRun = s.run.id; }
  if (s.phase === "loading") setTimeout(poll, 1500);
}

async function render(s) {
  const sym = s.currency_symbol, sum = s.result.summary, tone = sum.profitIsPositive ? "pos" : "neg";
  $("totalInvested").textContent = sym + sum.totalInvested;
  for (const k of ["finalValue", "roi", "cagr"]) {
    $(k).textContent = (k === "finalValue" ? sym : "") + sum[k];
    $(k).className = tone;
  }
  $("analysis").textContent = s.result.analysis;
  $("sources").innerHTML = "";
  s.citations.forEach(c => {
    const a = document.createElement("a");
    a.href = c.uri; a.target = "_blank"; a.rel = "noopener noreferrer";
    a.textContent = c.title || c.uri;
    $("sources").appendChild(a);
  });
  const series = await (await fetch("/api/chart")).json();
  if (chart) chart.destroy();
  chart = new Chart($("chart"), {
    type: "line",
    data: { labels: series.labels, datasets: [
      { label: "Market value", data: series.value, borderColor: "#10b981", borderWidth: 3, tension: 0.4, pointRadius: 0 },
      { label: "Invested principal", data: series.invested, borderColor: "#94a3b8", borderDash: [5, 5], borderWidth: 2, tension: 0.4, pointRadius: 0 },
    ]},
    options: { responsive: true, maintainAspectRatio: false, interaction: { mode: "index", intersect: false },
      scales: { y: { ticks: { callback: v => series.currency_symbol + v } } },
      plugins: { tooltip: { callbacks: { label: c => c.dataset.label + ": " + series.currency_symbol + new Intl.NumberFormat("en-US").format(c.parsed.y) } } } },
  });
}

poll();
</script>
</body>
</html>
"##;

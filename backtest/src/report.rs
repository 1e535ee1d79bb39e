use crate::analyzer::{AnalysisResult, Citation};
use crate::chart::{self, ChartSeries};
use crate::session::{RunState, FAILURE_MESSAGE};

const MAX_TABLE_ROWS: usize = 24;
const BAR_WIDTH: usize = 30;

/// Plain-text rendering of a run state for the terminal
pub fn render(state: &RunState, show_raw: bool) -> String {
    match state {
        RunState::Idle => "Pick a scenario and run it to get:\n\
            1. the accumulation curve\n\
            2. return and CAGR\n\
            3. a review grounded in real historical data"
            .to_string(),
        RunState::Loading { run } => format!("Computing {} ...", run.scenario.asset),
        RunState::Succeeded { run, result, citations, .. } => {
            let series = chart::adapt(result.chart_data(), run.scenario.currency_symbol());
            let mut text = format!(
                "══ {} | {} {} | {} → {} ══\n",
                run.scenario.asset,
                run.scenario.frequency,
                run.scenario.currency,
                run.scenario.start_date,
                run.scenario.end_date,
            );
            text.push_str(&summary_block(result, &series.currency_symbol));
            text.push('\n');
            text.push_str(&chart_table(&series));
            text.push_str(&format!("\nMarket analysis\n{}\n", result.analysis()));
            text.push_str(&sources_block(citations));
            text
        }
        RunState::ParseFailed { raw_text, cause, .. } => {
            let mut text = format!("[!] Data parsing failed\n{FAILURE_MESSAGE}\n");
            if show_raw {
                text.push_str(&format!("\ncause: {cause:?}\n--- raw model text ---\n{raw_text}\n"));
            }
            text
        }
    }
}

fn summary_block(result: &AnalysisResult, symbol: &str) -> String {
    let s = result.summary();
    let tone = if s.profit_is_positive { "+" } else { "-" };
    format!(
        "Total invested : {symbol}{}\n\
        Final value    : {symbol}{} [{tone}]\n\
        Profit         : {symbol}{}\n\
        ROI            : {} [{tone}]\n\
        CAGR           : {} [{tone}]\n",
        s.total_invested, s.final_value, s.profit, s.roi, s.cagr,
    )
}

/// Evenly sampled rows, always keeping the last point
fn sample_indexes(len: usize, max: usize) -> Vec<usize> {
    if len <= max {
        return (0..len).collect();
    }
    let mut idx: Vec<usize> = (0..max - 1).map(|i| i * (len - 1) / (max - 1)).collect();
    idx.push(len - 1);
    idx
}

fn chart_table(series: &ChartSeries) -> String {
    let peak = series
        .value
        .iter()
        .chain(series.invested.iter())
        .fold(0.0_f64, |m, v| m.max(*v));

    let mut text = format!("{:<10} {:>14} {:>14}\n", "date", "invested", "value");
    for i in sample_indexes(series.labels.len(), MAX_TABLE_ROWS) {
        let bar_len = if peak > 0.0 {
            ((series.value[i].max(0.0) / peak) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        text.push_str(&format!(
            "{:<10} {:>14} {:>14} {}\n",
            series.labels[i],
            series.format_amount(series.invested[i]),
            series.format_amount(series.value[i]),
            "█".repeat(bar_len),
        ));
    }
    text
}

fn sources_block(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return String::new();
    }
    let mut text = String::from("\nSources\n");
    for c in citations {
        text.push_str(&format!("  - {} <{}>\n", c.display_title(), c.uri));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_indexes_keeps_ends() {
        assert_eq!(sample_indexes(3, 24), vec![0, 1, 2]);
        let idx = sample_indexes(100, 5);
        assert_eq!(idx.len(), 5);
        assert_eq!(idx[0], 0);
        assert_eq!(*idx.last().unwrap(), 99);
        assert!(idx.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_idle_and_sources() {
        assert!(render(&RunState::Idle, false).contains("accumulation curve"));
        assert_eq!(sources_block(&[]), "");
        let block = sources_block(&[Citation { uri: "https://a".into(), title: String::new() }]);
        assert!(block.contains("- https://a <https://a>"));
    }

    fn run_info() -> crate::session::RunInfo {
        use crate::types::{Currency, Frequency, Mode, Scenario};
        use rust_decimal_macros::dec;
        crate::session::RunInfo {
            id: uuid::Uuid::new_v4(),
            started_at: chrono::Utc::now(),
            scenario: Scenario {
                mode: Mode::Compute,
                asset: "CSI 300 Index (000300)".to_string(),
                amount: dec!(2000),
                target: dec!(0),
                currency: Currency::Cny,
                frequency: Frequency::Quarterly,
                start_date: chrono::NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
                end_date: chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            },
        }
    }

    #[test]
    fn test_render_success() {
        let result = crate::analyzer::parse(
            r#"{"summary":{"totalInvested":"40,000","finalValue":"38,200","profit":"-1,800","profitIsPositive":false,"roi":"-4.5%","cagr":"-1.1%"},
            "chartData":[{"date":"2019-Q1","invested":2000,"value":2000},{"date":"2023-Q4","invested":40000,"value":38200}],
            "analysis":"Choppy range."}"#,
        )
        .unwrap();
        let state = RunState::Succeeded {
            run: run_info(),
            result,
            citations: vec![Citation { uri: "https://csindex.example".into(), title: "CSI".into() }],
            raw_text: String::new(),
        };
        let text = render(&state, false);
        assert!(text.contains("Total invested : ¥40,000"));
        assert!(text.contains("ROI            : -4.5% [-]"));
        assert!(text.contains("¥38,200"));
        assert!(text.contains("Choppy range."));
        assert!(text.contains("- CSI <https://csindex.example>"));
    }

    #[test]
    fn test_render_failure_hides_raw_by_default() {
        let state = RunState::ParseFailed {
            run: run_info(),
            raw_text: "garbage".to_string(),
            cause: crate::session::FailureCause::Syntax("eof".into()),
        };
        assert!(!render(&state, false).contains("garbage"));
        assert!(render(&state, false).contains(FAILURE_MESSAGE));
        assert!(render(&state, true).contains("garbage"));
    }
}

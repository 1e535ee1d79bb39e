use crate::types::{Frequency, Mode, Scenario};

const ROLE: &str = "You are a senior financial analyst and data visualization specialist.
TASK: backtest a periodic investment plan against REAL historical prices and return JSON for a charting frontend.";

const RESULT_EXAMPLE: &str = r#"{
  "summary": {
    "totalInvested": "12,000",
    "finalValue": "18,500",
    "profit": "6,500",
    "profitIsPositive": true,
    "roi": "54.2%",
    "cagr": "12.5%"
  },
  "chartData": [
    {"date": "2020-01", "invested": 1000, "value": 1000},
    {"date": "2020-02", "invested": 2000, "value": 2150}
  ],
  "analysis": "One short paragraph describing the main market trend over the period."
}"#;

/// Build the model instruction for a scenario.
///
/// Total over every scenario: an empty asset still yields a complete prompt,
/// and a bad scenario only surfaces when the response fails validation.
pub fn build(scenario: &Scenario) -> String {
    let common = common_rules(scenario);
    match scenario.mode {
        Mode::Compute => compute_prompt(scenario, &common),
        Mode::BackSolve => backsolve_prompt(scenario, &common),
    }
}

fn common_rules(s: &Scenario) -> String {
    format!(
        "{ROLE}\n\
        \n\
        REQUIREMENTS:\n\
        1. You MUST use Google Search to look up the real historical prices of \"{asset}\" from {start} to {end}. Search results are the only factual source.\n\
        2. Use the densest data you can find: at least one data point per quarter, preferably one per month.\n\
        3. Do NOT wrap the output in markdown code blocks (no ```json). Return the raw JSON string only.\n\
        4. The JSON must be strictly valid and parseable by a standard JSON parser.\n\
        5. \"invested\" and \"value\" must be plain numbers: no thousands separators, no currency symbols, no quotes.",
        asset = s.asset,
        start = s.start_date,
        end = s.end_date,
    )
}

fn compute_prompt(s: &Scenario, common: &str) -> String {
    format!(
        "{common}\n\
        \n\
        SCENARIO: starting {start}, the user invests {currency} {amount} into {asset} on a {frequency} schedule until {end}.\n\
        \n\
        Compute from the asset's real historical price trajectory:\n\
        1. Total principal invested (totalInvested), accumulating {amount} per {period} interval\n\
        2. Final portfolio value at {end} (finalValue)\n\
        3. Return on investment (roi) and compound annual growth rate (cagr)\n\
        4. A time series of the portfolio (chartData): cumulative principal and market value at each point\n\
        \n\
        Return the result strictly in this JSON structure:\n\
        {RESULT_EXAMPLE}",
        asset = s.asset,
        start = s.start_date,
        end = s.end_date,
        currency = s.currency,
        amount = s.amount,
        frequency = s.frequency.to_string().to_lowercase(),
        period = period_noun(s),
    )
}

fn backsolve_prompt(s: &Scenario, common: &str) -> String {
    format!(
        "{common}\n\
        \n\
        SCENARIO: the user wants to reach a portfolio value of {currency} {target} on {end}.\n\
        Asset: {asset}\n\
        Start date: {start}\n\
        Frequency: {frequency}\n\
        \n\
        Work backwards from the asset's real historical returns: how much would the user have needed to invest each {period} to end with exactly {target}?\n\
        Simulate the curve with that contribution, and set finalValue to the target itself.\n\
        \n\
        Return the result strictly in this JSON structure:\n\
        {{\n\
          \"summary\": {{\n\
            \"totalInvested\": \"<inferred total principal>\",\n\
            \"finalValue\": \"{target}\",\n\
            \"profit\": \"<inferred profit>\",\n\
            \"profitIsPositive\": true,\n\
            \"roi\": \"<inferred ROI>\",\n\
            \"cagr\": \"<inferred CAGR>\"\n\
          }},\n\
          \"chartData\": [\n\
            {{\"date\": \"2020-01\", \"invested\": 1000, \"value\": 1000}}\n\
          ],\n\
          \"analysis\": \"To reach the target by {end} you would need to invest about <amount> {frequency_lower}. Based on the historical data...\"\n\
        }}\n\
        chartData must contain the full simulated curve, not just one point.",
        asset = s.asset,
        start = s.start_date,
        end = s.end_date,
        currency = s.currency,
        target = s.target,
        frequency = s.frequency,
        frequency_lower = s.frequency.to_string().to_lowercase(),
        period = period_noun(s),
    )
}

fn period_noun(s: &Scenario) -> &'static str {
    match s.frequency {
        Frequency::Weekly => "week",
        Frequency::Monthly => "month",
        Frequency::Quarterly => "quarter",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, Frequency};
    use chrono::NaiveDate;
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn scenario(mode: Mode) -> Scenario {
        Scenario {
            mode,
            asset: "S&P 500 Index (SPX)".to_string(),
            amount: dec!(1000),
            target: dec!(1000000),
            currency: Currency::Usd,
            frequency: Frequency::Monthly,
            start_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        }
    }

    #[test]
    fn test_common_rules_in_both_modes() {
        for mode in [Mode::Compute, Mode::BackSolve] {
            let p = build(&scenario(mode));
            assert!(p.contains("Google Search"));
            assert!(p.contains("\"S&P 500 Index (SPX)\" from 2018-01-01 to 2024-06-30"));
            assert!(p.contains("at least one data point per quarter"));
            assert!(p.contains("Do NOT wrap the output in markdown"));
            assert!(p.contains("must be plain numbers"));
            assert!(p.contains("\"chartData\""));
            assert!(p.contains("\"profitIsPositive\": true"));
        }
    }

    #[test]
    fn test_compute_prompt_mentions_contribution() {
        let p = build(&scenario(Mode::Compute));
        assert!(p.contains("invests USD 1000 into S&P 500 Index (SPX) on a monthly schedule"));
        assert!(p.contains("accumulating 1000 per month interval"));
        assert!(p.contains(RESULT_EXAMPLE));
        assert!(!p.contains("Work backwards"));
    }

    #[test]
    fn test_backsolve_prompt_pins_final_value() {
        let p = build(&scenario(Mode::BackSolve));
        assert!(p.contains("reach a portfolio value of USD 1000000 on 2024-06-30"));
        assert!(p.contains("\"finalValue\": \"1000000\""));
        assert!(p.contains("Work backwards"));
        assert!(!p.contains("accumulating"));
    }

    #[test]
    fn test_blank_asset_still_builds() {
        let mut s = scenario(Mode::Compute);
        s.asset = "   ".to_string();
        let p = build(&s);
        assert!(p.contains("\"   \" from 2018-01-01"));
        assert!(p.ends_with(RESULT_EXAMPLE));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_build_is_deterministic(
            asset in ".{0,40}",
            amount in 1u32..100_000,
            backsolve in any::<bool>(),
            day_offset in 0i64..5000,
        ) {
            let mut s = scenario(if backsolve { Mode::BackSolve } else { Mode::Compute });
            s.asset = asset;
            s.amount = Decimal::from(amount);
            s.end_date = s.start_date + chrono::Duration::days(day_offset);
            let first = build(&s);
            prop_assert_eq!(&first, &build(&s.clone()));
            prop_assert!(first.contains(&s.end_date.to_string()));
        }
    }
}

use crate::analyzer::ChartPoint;
use serde::Serialize;

/// Dual-line series in the shape a charting frontend consumes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    /// Category axis
    pub labels: Vec<String>,
    /// Market value line
    pub value: Vec<f64>,
    /// Invested principal line
    pub invested: Vec<f64>,
    pub currency_symbol: String,
}

/// Project validated chart points onto axis + two series. No checks here;
/// points come from a validated result and are never empty.
pub fn adapt(points: &[ChartPoint], currency_symbol: &str) -> ChartSeries {
    ChartSeries {
        labels: points.iter().map(|p| p.date.clone()).collect(),
        value: points.iter().map(|p| p.value).collect(),
        invested: points.iter().map(|p| p.invested).collect(),
        currency_symbol: currency_symbol.to_string(),
    }
}

impl ChartSeries {
    /// Axis tick / tooltip text, e.g. `HK$12,500`
    pub fn format_amount(&self, amount: f64) -> String {
        format!("{}{}", self.currency_symbol, group_thousands(amount))
    }
}

fn group_thousands(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, invested: f64, value: f64) -> ChartPoint {
        ChartPoint { date: date.to_string(), invested, value }
    }

    #[test]
    fn test_adapt_projects_fields_in_order() {
        let s = adapt(&[point("2020-01", 1000.0, 990.5), point("2020-02", 2000.0, 2100.0)], "¥");
        assert_eq!(s.labels, vec!["2020-01", "2020-02"]);
        assert_eq!(s.value, vec![990.5, 2100.0]);
        assert_eq!(s.invested, vec![1000.0, 2000.0]);
        assert_eq!(s.currency_symbol, "¥");
    }

    #[test]
    fn test_format_amount() {
        let s = adapt(&[point("x", 0.0, 0.0)], "HK$");
        assert_eq!(s.format_amount(1234567.4), "HK$1,234,567");
        assert_eq!(s.format_amount(999.0), "HK$999");
        assert_eq!(s.format_amount(-12500.0), "HK$-12,500");
        assert_eq!(s.format_amount(0.0), "HK$0");
    }
}

//! Cutflow report over named filters.

use std::fmt;

use serde::Serialize;

/// Pass/all counts of one named filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutInfo {
    /// Filter label.
    pub label: String,
    /// Rows reaching the filter.
    pub all: u64,
    /// Rows passing it.
    pub pass: u64,
}

impl CutInfo {
    /// Efficiency in percent; `0` when no rows reached the filter.
    pub fn efficiency(&self) -> f64 {
        if self.all == 0 { 0.0 } else { 100.0 * self.pass as f64 / self.all as f64 }
    }
}

/// Ordered per-filter statistics, as printed after an event loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CutflowReport {
    /// Cuts in registration order.
    pub cuts: Vec<CutInfo>,
}

impl CutflowReport {
    /// No named filters.
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Cut by label.
    pub fn get(&self, label: &str) -> Option<&CutInfo> {
        self.cuts.iter().find(|c| c.label == label)
    }

    /// Iterate over cuts.
    pub fn iter(&self) -> std::slice::Iter<'_, CutInfo> {
        self.cuts.iter()
    }
}

impl fmt::Display for CutflowReport {
    /// One line per cut:
    /// `label     : pass=N          all=M          -- eff=E % cumulative eff=C %`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.cuts.iter().map(|c| c.label.len()).max().unwrap_or(0).max(10);
        let first_all = self.cuts.first().map_or(0, |c| c.all);
        for cut in &self.cuts {
            let cumulative =
                if first_all == 0 { 0.0 } else { 100.0 * cut.pass as f64 / first_all as f64 };
            writeln!(
                f,
                "{:<width$}: pass={:<10} all={:<10} -- eff={:.2} % cumulative eff={:.2} %",
                cut.label,
                cut.pass,
                cut.all,
                cut.efficiency(),
                cumulative,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> CutflowReport {
        CutflowReport {
            cuts: vec![
                CutInfo { label: "presel".into(), all: 100, pass: 80 },
                CutInfo { label: "tight".into(), all: 80, pass: 20 },
            ],
        }
    }

    #[test]
    fn efficiencies() {
        let r = report();
        assert_eq!(r.get("presel").unwrap().efficiency(), 80.0);
        assert_eq!(r.get("tight").unwrap().efficiency(), 25.0);
        assert_eq!(CutInfo { label: "x".into(), all: 0, pass: 0 }.efficiency(), 0.0);
    }

    #[test]
    fn display_has_cumulative_efficiency() {
        let text = report().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("presel    : pass=80 "));
        assert!(lines[1].contains("eff=25.00 % cumulative eff=20.00 %"));
    }

    #[test]
    fn empty_report_prints_nothing() {
        assert_eq!(CutflowReport::default().to_string(), "");
    }
}

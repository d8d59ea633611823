use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_MONTH: &str = "DEC 2025";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// Which pivot goes into the summary workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SummaryMode {
    /// Net taxable per province, split HR / UP.
    #[default]
    Province,
    /// Quantity and taxable per province and line item, one sheet per warehouse.
    Itemized,
}

/// Everything one reconciliation run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub current: PathBuf,
    pub previous: PathBuf,
    pub month: String,
    pub output_dir: PathBuf,
    pub summary_mode: SummaryMode,
    pub preview_rows: usize,
}

impl RunConfig {
    /// Reporting month as used in sheet and file names.
    pub fn month_label(&self) -> String {
        let label = self.month.trim().to_uppercase();
        if label.is_empty() {
            DEFAULT_MONTH.to_string()
        } else {
            label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_label_is_uppercased() {
        let cfg = RunConfig {
            current: "a.csv".into(),
            previous: "b.xlsx".into(),
            month: " jan 2026 ".into(),
            output_dir: DEFAULT_OUTPUT_DIR.into(),
            summary_mode: SummaryMode::default(),
            preview_rows: 5,
        };
        assert_eq!(cfg.month_label(), "JAN 2026");
        assert_eq!(RunConfig { month: String::new(), ..cfg }.month_label(), DEFAULT_MONTH);
    }
}

// End-to-end reconciliation run.
//
// One run reads the two inputs, builds every ledger and summary in memory
// and then writes the artifacts. Nothing is shared between runs; a failed
// write removes whatever this run already produced and leaves files from
// earlier runs alone.
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::assemble::{append_with_gap, tag_warehouse};
use crate::classify::classify;
use crate::config::{RunConfig, SummaryMode};
use crate::error::{ReconError, Result};
use crate::format::finalize;
use crate::loader::{load_table, load_workbook};
use crate::normalize::{derive_taxable, normalize_columns, normalize_provinces, TaxablePolicy};
use crate::output::{render_table_rows, write_json, write_workbook};
use crate::reports::{itemized_summary, itemized_table, province_summary, province_table};
use crate::returns::{extract_workbook_returns, Returns};
use crate::types::{ItemSummaryRow, ProvinceSummaryRow, Table, Warehouse, Workbook};
use crate::util::{file_label, format_int, previous_month_label};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounts {
    pub current_rows: usize,
    pub hr_rows: usize,
    pub up_rows: usize,
    /// Rows that matched both warehouse rules.
    pub overlap_rows: usize,
    pub hr_returns: usize,
    pub up_returns: usize,
    pub summary_rows: usize,
}

/// Manifest written next to the artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub message: String,
    pub current_file: String,
    pub prev_file: String,
    pub summary_file: String,
    pub counts: RunCounts,
}

#[derive(Debug, Clone)]
pub enum Summary {
    Province(Vec<ProvinceSummaryRow>),
    Itemized { hr: Vec<ItemSummaryRow>, up: Vec<ItemSummaryRow> },
}

impl Summary {
    pub fn len(&self) -> usize {
        match self {
            Summary::Province(rows) => rows.len(),
            Summary::Itemized { hr, up } => hr.len() + up.len(),
        }
    }

    /// Named sheets for the summary workbook.
    fn sheets(&self, month: &str) -> Vec<(String, Table)> {
        match self {
            Summary::Province(rows) => vec![("SUMMARY_PIVOT".to_string(), province_table(rows))],
            Summary::Itemized { hr, up } => vec![
                (format!("{} HR ITEM PIVOT", month), itemized_table(hr)),
                (format!("{} UP ITEM PIVOT", month), itemized_table(up)),
            ],
        }
    }
}

/// Everything a run produces before it is written out.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub month: String,
    pub prev_month: String,
    /// Full normalized current month.
    pub whole: Table,
    pub hr_ledger: Table,
    pub up_ledger: Table,
    pub returns: Returns,
    pub summary: Summary,
    pub counts: RunCounts,
}

/// Normalize the raw current-month table: canonical headers, taxable amount
/// (kept when the export already has one) and province names.
pub fn prepare_current_month(raw: Table) -> Table {
    let mut table = normalize_columns(raw);
    derive_taxable(&mut table, TaxablePolicy::KeepExisting);
    normalize_provinces(&mut table);
    table
}

/// Run the whole reconciliation in memory.
pub fn reconcile(current: Table, previous: &Workbook, month: &str, mode: SummaryMode) -> Reconciliation {
    info!(month, "processing current month");
    let whole = prepare_current_month(current);
    let (mut current_hr, mut current_up, overlap_rows) = {
        let split = classify(&whole);
        (split.hr.to_table(), split.up.to_table(), split.overlap.len())
    };

    let prev_month = previous_month_label(month);
    info!(month = %prev_month, "processing previous month returns");
    let mut returns = extract_workbook_returns(previous, &prev_month);

    tag_warehouse(&mut current_hr, Warehouse::Hr);
    tag_warehouse(&mut returns.hr, Warehouse::Hr);
    tag_warehouse(&mut current_up, Warehouse::Up);
    tag_warehouse(&mut returns.up, Warehouse::Up);

    info!(?mode, "generating summary");
    let all = Table::concat([&current_hr, &returns.hr, &current_up, &returns.up]);
    let summary = match mode {
        SummaryMode::Province => Summary::Province(province_summary(&all)),
        SummaryMode::Itemized => Summary::Itemized {
            hr: itemized_summary(&all, Warehouse::Hr),
            up: itemized_summary(&all, Warehouse::Up),
        },
    };

    let counts = RunCounts {
        current_rows: whole.len(),
        hr_rows: current_hr.len(),
        up_rows: current_up.len(),
        overlap_rows,
        hr_returns: returns.hr.len(),
        up_returns: returns.up.len(),
        summary_rows: summary.len(),
    };
    debug!(?counts, "reconciled");

    info!("merging final data");
    let hr_ledger = append_with_gap(current_hr, &returns.hr);
    let up_ledger = append_with_gap(current_up, &returns.up);

    Reconciliation {
        month: month.to_string(),
        prev_month,
        whole,
        hr_ledger,
        up_ledger,
        returns,
        summary,
        counts,
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ReconError::MissingInput(format!("{} file {} not found", what, path.display())))
    }
}

/// Console preview of the summary. Each table is preceded by the name of
/// the sheet it is written to.
fn summary_preview(summary: &Summary, month: &str, max_rows: usize) -> String {
    match summary {
        Summary::Province(rows) => {
            format!("SUMMARY_PIVOT\n{}", render_table_rows(rows, max_rows))
        }
        Summary::Itemized { hr, up } => {
            let mut out = String::new();
            for (warehouse, rows) in [(Warehouse::Hr, hr), (Warehouse::Up, up)] {
                out.push_str(&format!("{} {} ITEM PIVOT\n", month, warehouse));
                out.push_str(&render_table_rows(rows, max_rows));
            }
            out
        }
    }
}

/// Read the inputs named in `config`, reconcile, and write all artifacts.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    require_file(&config.current, "current-month")?;
    require_file(&config.previous, "previous-month")?;

    let month = config.month_label();
    let current = load_table(&config.current)?;
    let previous = load_workbook(&config.previous)?;
    let rec = reconcile(current, &previous, &month, config.summary_mode);

    print!("{}", summary_preview(&rec.summary, &month, config.preview_rows));

    let report = write_outputs(&rec, &config.output_dir)?;
    info!(
        rows = %format_int(rec.counts.current_rows),
        current = %report.current_file,
        returns = %report.prev_file,
        summary = %report.summary_file,
        "processing complete"
    );
    Ok(report)
}

/// Write every artifact of `rec` into `dir`. If any write fails, files this
/// run already wrote are removed before the error is returned.
pub fn write_outputs(rec: &Reconciliation, dir: &Path) -> Result<RunReport> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let result = write_artifacts(rec, dir, &mut written);
    if result.is_err() {
        for path in &written {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed partial output"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "cannot remove partial output"),
            }
        }
    }
    result
}

/// Write one artifact under a staging name in `dir` and rename it into place
/// once it is complete. Only committed paths are recorded in `written`, so a
/// failed write never touches a file this run did not produce.
fn commit_artifact(
    dir: &Path,
    name: &str,
    written: &mut Vec<PathBuf>,
    write: impl FnOnce(&Path) -> Result<()>,
) -> Result<()> {
    let path = dir.join(name);
    let staging = dir.join(format!(".partial_{}", name));
    let result = write(&staging).and_then(|()| std::fs::rename(&staging, &path).map_err(ReconError::from));
    if let Err(e) = result {
        if let Err(rm) = std::fs::remove_file(&staging) {
            if rm.kind() != ErrorKind::NotFound {
                warn!(path = %staging.display(), error = %rm, "cannot remove staging file");
            }
        }
        return Err(e);
    }
    debug!(path = %path.display(), "wrote artifact");
    written.push(path);
    Ok(())
}

fn write_artifacts(rec: &Reconciliation, dir: &Path, written: &mut Vec<PathBuf>) -> Result<RunReport> {
    let month = &rec.month;
    let prev = &rec.prev_month;

    let current_file = format!("Processed_{}.xlsx", file_label(month));
    let up = finalize(rec.up_ledger.clone());
    let hr = finalize(rec.hr_ledger.clone());
    let whole = finalize(rec.whole.clone());
    commit_artifact(dir, &current_file, written, |path| {
        write_workbook(
            path,
            &[
                (format!("{} GSTR1 LEAF UP", month), &up),
                (format!("{} GSTR1 LEAF HR", month), &hr),
                (format!("{} WHOLE DATA", month), &whole),
            ],
        )
    })?;

    let prev_file = format!("Returns_{}.xlsx", file_label(prev));
    let hr_returns = finalize(rec.returns.hr.clone());
    let up_returns = finalize(rec.returns.up.clone());
    commit_artifact(dir, &prev_file, written, |path| {
        write_workbook(
            path,
            &[
                (format!("{} GSTR1 LEAF HR", prev), &hr_returns),
                (format!("{} GSTR1 LEAF UP", prev), &up_returns),
            ],
        )
    })?;

    let summary_file = format!("Summary_{}.xlsx", file_label(month));
    let sheets = rec.summary.sheets(month);
    let refs: Vec<(String, &Table)> = sheets.iter().map(|(n, t)| (n.clone(), t)).collect();
    commit_artifact(dir, &summary_file, written, |path| write_workbook(path, &refs))?;

    let report = RunReport {
        message: "Processing Complete".to_string(),
        current_file,
        prev_file,
        summary_file,
        counts: rec.counts.clone(),
    };
    let manifest = format!("run_{}.json", file_label(month));
    commit_artifact(dir, &manifest, written, |path| write_json(path, &report))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::table;
    use crate::types::{Cell, Sheet};

    fn current_month() -> Table {
        table(
            &["Courier Stauts", "Pickup Location", "Total", "Shipping Province", "Lineitem name", "Lineitem quantity"],
            &[
                &["Delivered", "Noida G-202", "118", "KA", "Soap", "1"],
                &["In Transit", "FAR_LF", "59", "HR", "Oil", "2"],
                &["RTO", "FAR_LF", "999", "", "Oil", "1"],
            ],
        )
    }

    fn previous_month() -> Workbook {
        let hr = table(
            &["Updated Status", "Total", "Shipping Province", "Lineitem name", "Lineitem quantity", "Month"],
            &[
                &["Cancelled", "118", "HR", "Oil", "1", "OCT 2025"],
                &["Delivered", "236", "HR", "Oil", "2", "OCT 2025"],
            ],
        );
        Workbook {
            sheets: vec![
                Sheet { name: "NOV 2025 GSTR1 LEAF HR PVT".into(), table: Table::default() },
                Sheet { name: "NOV 2025 GSTR1 LEAF HR".into(), table: hr },
            ],
        }
    }

    fn value<'a>(t: &'a Table, row: usize, name: &str) -> &'a Cell {
        &t.rows[row][t.column_index(name).unwrap()]
    }

    #[test]
    fn noida_delivery_lands_in_up_ledger() {
        let rec = reconcile(current_month(), &Workbook::default(), "DEC 2025", SummaryMode::Province);
        assert_eq!(rec.up_ledger.len(), 1);
        assert!((value(&rec.up_ledger, 0, "Taxable_Amount").to_number().unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(rec.counts.hr_rows, 1);
        assert_eq!(rec.counts.current_rows, 3);
        assert_eq!(rec.prev_month, "NOV 2025");
    }

    #[test]
    fn returns_are_appended_after_a_gap() {
        let rec = reconcile(current_month(), &previous_month(), "DEC 2025", SummaryMode::Province);
        assert_eq!(rec.returns.hr.len(), 1);
        assert!(rec.returns.up.is_empty());
        assert_eq!(rec.returns.hr.headers[0], "Month");
        assert_eq!(value(&rec.returns.hr, 0, "Month"), &Cell::text("NOV 2025"));
        assert_eq!(value(&rec.returns.hr, 0, "Total"), &Cell::Number(-118.0));

        // one current row, one blank row, one return row
        assert_eq!(rec.hr_ledger.len(), 3);
        assert!(rec.hr_ledger.rows[1].iter().all(Cell::is_blank));
        assert_eq!(value(&rec.hr_ledger, 2, "Month"), &Cell::text("NOV 2025"));
        assert_eq!(rec.up_ledger.len(), 1);
    }

    #[test]
    fn province_summary_nets_returns_per_warehouse() {
        let rec = reconcile(current_month(), &Workbook::default(), "DEC 2025", SummaryMode::Province);
        let Summary::Province(rows) = &rec.summary else {
            panic!("expected province summary");
        };
        let hr = rows.iter().find(|r| r.shipping_province == "HARYANA").unwrap();
        assert!((hr.hr_net_taxable - 50.0).abs() < 1e-9);
        assert_eq!(hr.up_net_taxable, 0.0);
        assert!((hr.total_combined - 50.0).abs() < 1e-9);
        assert_eq!(rows[0].shipping_province, "HARYANA");
        assert_eq!(rows[1].shipping_province, "KARNATAKA");

        let rec = reconcile(current_month(), &previous_month(), "DEC 2025", SummaryMode::Province);
        let Summary::Province(rows) = &rec.summary else {
            panic!("expected province summary");
        };
        let hr = rows.iter().find(|r| r.shipping_province == "HARYANA").unwrap();
        assert!((hr.hr_net_taxable - (50.0 - 100.0)).abs() < 1e-9);
    }

    #[test]
    fn itemized_mode_builds_one_table_per_warehouse() {
        let rec = reconcile(current_month(), &previous_month(), "DEC 2025", SummaryMode::Itemized);
        let Summary::Itemized { hr, up } = &rec.summary else {
            panic!("expected itemized summary");
        };
        assert_eq!(hr.len(), 1);
        assert_eq!(hr[0].lineitem_name, "Oil");
        assert_eq!(hr[0].lineitem_quantity, 1.0);
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].shipping_province, "KARNATAKA");
        assert_eq!(rec.summary.sheets("DEC 2025")[0].0, "DEC 2025 HR ITEM PIVOT");
    }

    #[test]
    fn run_writes_three_workbooks_and_a_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("orders.csv");
        std::fs::write(
            &current,
            "Courier Status,Pickup Location,Total,Shipping Province\n\
             Delivered,Noida G-202,118,UP\n\
             Delivered,Haryana WH,59,HR\n",
        )
        .unwrap();
        let previous = dir.path().join("prev.csv");
        std::fs::write(&previous, "Total\n1\n").unwrap();
        let out = dir.path().join("outputs");

        let config = RunConfig {
            current,
            previous,
            month: "dec 2025".into(),
            output_dir: out.clone(),
            summary_mode: SummaryMode::Province,
            preview_rows: 0,
        };
        let report = run(&config).unwrap();
        assert_eq!(report.current_file, "Processed_DEC_2025.xlsx");
        assert_eq!(report.prev_file, "Returns_NOV_2025.xlsx");
        assert_eq!(report.summary_file, "Summary_DEC_2025.xlsx");
        assert_eq!(report.counts.up_rows, 1);

        let processed = load_workbook(&out.join(&report.current_file)).unwrap();
        assert_eq!(
            processed.sheet_names(),
            vec!["DEC 2025 GSTR1 LEAF UP", "DEC 2025 GSTR1 LEAF HR", "DEC 2025 WHOLE DATA"]
        );
        let whole = processed.sheet("DEC 2025 WHOLE DATA").unwrap();
        assert!(!whole.has_column("Source_Warehouse"));
        assert!(whole.has_column("Taxable_Amount"));

        let summary = load_workbook(&out.join(&report.summary_file)).unwrap();
        let pivot = summary.sheet("SUMMARY_PIVOT").unwrap();
        assert_eq!(pivot.len(), 2);
        assert_eq!(pivot.rows[0][0], Cell::text("HARYANA"));
        assert!(out.join("run_DEC_2025.json").is_file());
    }

    #[test]
    fn missing_upload_fails_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            current: dir.path().join("nope.csv"),
            previous: dir.path().join("prev.xlsx"),
            month: "DEC 2025".into(),
            output_dir: dir.path().join("outputs"),
            summary_mode: SummaryMode::Province,
            preview_rows: 0,
        };
        assert!(matches!(run(&config), Err(ReconError::MissingInput(_))));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn itemized_preview_names_each_warehouse() {
        let rec = reconcile(current_month(), &previous_month(), "DEC 2025", SummaryMode::Itemized);
        let text = summary_preview(&rec.summary, "DEC 2025", 5);
        let hr = text.find("DEC 2025 HR ITEM PIVOT").unwrap();
        let up = text.find("DEC 2025 UP ITEM PIVOT").unwrap();
        assert!(hr < up);
        assert!(text[hr..up].contains("Oil"));
        assert!(text[up..].contains("KARNATAKA"));

        let rec = reconcile(current_month(), &Workbook::default(), "DEC 2025", SummaryMode::Province);
        assert!(summary_preview(&rec.summary, "DEC 2025", 5).starts_with("SUMMARY_PIVOT\n"));
    }

    #[test]
    fn failed_write_keeps_earlier_runs_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let earlier = dir.path().join("Processed_DEC_[2025].xlsx");
        std::fs::write(&earlier, b"earlier run").unwrap();

        let rec = reconcile(current_month(), &Workbook::default(), "DEC [2025]", SummaryMode::Province);
        assert!(write_outputs(&rec, dir.path()).is_err());
        assert_eq!(std::fs::read(&earlier).unwrap(), b"earlier run");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_write_leaves_no_partial_outputs() {
        let dir = tempfile::tempdir().unwrap();
        // A month label with characters Excel rejects in sheet names.
        let rec = reconcile(current_month(), &Workbook::default(), "DEC [2025]", SummaryMode::Province);
        assert!(write_outputs(&rec, dir.path()).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

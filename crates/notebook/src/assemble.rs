// Copyright 2025 Bench Analysis Contributors
// SPDX-License-Identifier: Apache-2.0

//! Analysis document assembly.
//!
//! This module turns a [`BenchmarkRun`] into an ordered list of [`Cell`]s:
//!
//! ```text
//! [header] [imports] [raw data] ([series heading] [table] [distribution plot]) * N
//! ```
//!
//! Assembly is pure and deterministic; a run with `N` series always yields
//! `3 + 3N` cells.

use crate::cell::Cell;
use bench_analysis_core::{BenchmarkRun, MeasurementSeries};

/// Title of every generated report.
pub const REPORT_TITLE: &str = "Benchmark analysis";

/// Libraries the generated notebook needs at execution time.
pub const IMPORT_PREAMBLE: &str = "import seaborn as sns\nimport pandas as pd";

/// Column holding the samples in the generated data frames.
pub const MEASUREMENTS_COLUMN: &str = "measurements";

/// Number of cells emitted before the per-series cells.
pub const HEADER_CELLS: usize = 3;

/// Number of cells emitted for each series.
pub const CELLS_PER_SERIES: usize = 3;

/// Header timestamp layout, the form PostgreSQL prints a `timestamptz` in.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// Build the analysis document for a run.
pub fn assemble(run: &BenchmarkRun) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(expected_cell_count(run.series.len()));

    cells.push(header_cell(run));
    cells.push(Cell::Code(IMPORT_PREAMBLE.to_string()));
    cells.push(raw_data_cell(&run.raw_data));

    for series in &run.series {
        cells.extend(series_cells(series));
    }

    cells
}

/// Cell count produced for a run with `series_count` series.
pub fn expected_cell_count(series_count: usize) -> usize {
    HEADER_CELLS + CELLS_PER_SERIES * series_count
}

fn header_cell(run: &BenchmarkRun) -> Cell {
    Cell::Narrative(format!(
        "## {REPORT_TITLE}\n\
         \n\
         ##### Generated by the automated benchmark analysis runner\n\
         \n\
         #### Benchmark name:\n\
         \n\
         {name}\n\
         \n\
         ### Benchmark timestamp:\n\
         \n\
         {timestamp}\n\
         \n\
         #### Benchmark description:\n\
         \n\
         {description}",
        name = run.name,
        timestamp = run.timestamp.format(TIMESTAMP_FORMAT),
        description = run.description,
    ))
}

// Embedded as-is: a raw_data containing ''' yields invalid Python.
fn raw_data_cell(raw_data: &str) -> Cell {
    Cell::Code(format!("raw_data = '''{raw_data}'''"))
}

fn series_cells(series: &MeasurementSeries) -> [Cell; CELLS_PER_SERIES] {
    let heading = Cell::Narrative(format!(
        "### Benchmark: {}\n\n#### Unit: {}",
        series.parameter, series.data_unit
    ));

    let table = Cell::Code(format!(
        "data = {{'{MEASUREMENTS_COLUMN}': {}}}\n\
         \n\
         df = pd.DataFrame(data=data)\n\
         df",
        python_float_list(&series.measurements)
    ));

    let mut plot = format!(
        "plt = sns.kdeplot(data=df, x=\"{MEASUREMENTS_COLUMN}\", fill=True)\n\
         plt.set_xlabel({})",
        python_str(&series.measurement_name)
    );
    // No usable samples, no mean: the reference line is omitted.
    if let Some(mean) = series.mean() {
        plot.push_str(&format!("\nplt.axvline(x={})", python_float(mean)));
    }

    [heading, table, Cell::Code(plot)]
}

/// Render a float as a Python literal that round-trips exactly.
pub fn python_float(value: f64) -> String {
    if value.is_nan() {
        "float('nan')".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "float('inf')".to_string()
        } else {
            "float('-inf')".to_string()
        }
    } else {
        // Debug is the shortest representation that parses back to the same bits.
        format!("{value:?}")
    }
}

fn python_float_list(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().copied().map(python_float).collect();
    format!("[{}]", items.join(", "))
}

fn python_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike, Utc};

    fn make_series(id: i32, parameter: &str, measurements: Vec<f64>) -> MeasurementSeries {
        MeasurementSeries {
            id,
            run_id: 1,
            parameter: parameter.to_string(),
            data_unit: "ms".to_string(),
            measurement_name: "latency".to_string(),
            measurements,
        }
    }

    fn make_run(series: Vec<MeasurementSeries>) -> BenchmarkRun {
        BenchmarkRun {
            id: 1,
            name: "latency-test".to_string(),
            description: "p99 check".to_string(),
            raw_data: "csv,1,2,3".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            generated_report: None,
            series,
        }
    }

    #[test]
    fn test_end_to_end_single_series() {
        let run = make_run(vec![make_series(1, "threads=4", vec![10.0, 20.0, 30.0])]);
        let cells = assemble(&run);

        assert_eq!(cells.len(), 6);
        assert!(matches!(cells[0], Cell::Narrative(_)));
        assert_eq!(cells[1], Cell::Code(IMPORT_PREAMBLE.to_string()));
        assert_eq!(cells[2], Cell::Code("raw_data = '''csv,1,2,3'''".to_string()));
        assert_eq!(
            cells[3],
            Cell::Narrative("### Benchmark: threads=4\n\n#### Unit: ms".to_string())
        );
        assert_eq!(
            cells[4],
            Cell::Code(
                "data = {'measurements': [10.0, 20.0, 30.0]}\n\ndf = pd.DataFrame(data=data)\ndf"
                    .to_string()
            )
        );
        assert_eq!(
            cells[5],
            Cell::Code(
                "plt = sns.kdeplot(data=df, x=\"measurements\", fill=True)\n\
                 plt.set_xlabel(\"latency\")\n\
                 plt.axvline(x=20.0)"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_header_contains_run_metadata() {
        let run = make_run(vec![]);
        let cells = assemble(&run);
        let header = cells[0].source();

        assert!(header.starts_with("## Benchmark analysis\n"));
        assert!(header.contains("\nlatency-test\n"));
        assert!(header.contains("\n2024-03-01 12:30:00+00:00\n"));
        assert!(header.ends_with("p99 check"));
    }

    #[test]
    fn test_cell_count_law() {
        for n in 0..5 {
            let series = (0..n)
                .map(|i| make_series(i, &format!("p{i}"), vec![1.0, 2.0]))
                .collect();
            let cells = assemble(&make_run(series));
            assert_eq!(cells.len(), 3 + 3 * n as usize);
            assert_eq!(cells.len(), expected_cell_count(n as usize));
        }
    }

    #[test]
    fn test_zero_series_yields_only_header_cells() {
        let cells = assemble(&make_run(vec![]));
        assert_eq!(cells.len(), HEADER_CELLS);
        assert!(!cells[0].is_code());
        assert!(cells[1].is_code());
        assert!(cells[2].is_code());
    }

    #[test]
    fn test_series_order_preserved() {
        let run = make_run(vec![
            make_series(9, "zeta", vec![1.0]),
            make_series(2, "alpha", vec![2.0]),
            make_series(5, "mid", vec![3.0]),
        ]);
        let cells = assemble(&run);

        let headings: Vec<&str> = cells
            .iter()
            .skip(HEADER_CELLS)
            .step_by(CELLS_PER_SERIES)
            .map(Cell::source)
            .collect();
        assert!(headings[0].contains("zeta"));
        assert!(headings[1].contains("alpha"));
        assert!(headings[2].contains("mid"));
    }

    #[test]
    fn test_samples_round_trip_into_table() {
        let samples = vec![3.0, 0.1, 1e-7, 123456789.125, -2.5, 0.30000000000000004];
        let run = make_run(vec![make_series(1, "p", samples.clone())]);
        let cells = assemble(&run);
        let table = cells[4].source();

        let start = table.find('[').unwrap() + 1;
        let end = table.find(']').unwrap();
        let parsed: Vec<f64> = table[start..end]
            .split(", ")
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(parsed, samples);
    }

    #[test]
    fn test_raw_data_embedded_verbatim() {
        let raw = "name,value\n\"quoted\",1\n\ttab\\slash\n";
        let mut run = make_run(vec![]);
        run.raw_data = raw.to_string();
        let cells = assemble(&run);
        assert_eq!(cells[2].source(), format!("raw_data = '''{raw}'''"));
    }

    #[test]
    fn test_mean_reference_line() {
        let run = make_run(vec![make_series(1, "p", vec![2.0, 4.0, 6.0])]);
        let cells = assemble(&run);
        assert!(cells[5].source().ends_with("plt.axvline(x=4.0)"));
    }

    #[test]
    fn test_empty_series_omits_reference_line() {
        let run = make_run(vec![make_series(1, "p", vec![])]);
        let cells = assemble(&run);
        assert_eq!(cells.len(), 6);
        assert!(cells[4].source().contains("{'measurements': []}"));
        assert!(!cells[5].source().contains("axvline"));
    }

    #[test]
    fn test_header_timestamp_keeps_fractional_seconds() {
        let mut run = make_run(vec![]);
        run.timestamp = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .unwrap()
            .with_nanosecond(250_000_000)
            .unwrap();
        let header = assemble(&run)[0].source().to_string();
        assert!(header.contains("2024-03-01 12:30:00.250+00:00"));
    }

    #[test]
    fn test_nan_samples_do_not_poison_reference_line() {
        let run = make_run(vec![make_series(1, "p", vec![2.0, f64::NAN, 6.0])]);
        let cells = assemble(&run);
        assert!(cells[4]
            .source()
            .contains("[2.0, float('nan'), 6.0]"));
        assert!(cells[5].source().ends_with("plt.axvline(x=4.0)"));
    }

    #[test]
    fn test_all_nan_series_omits_reference_line() {
        let run = make_run(vec![make_series(1, "p", vec![f64::NAN])]);
        assert!(!assemble(&run)[5].source().contains("axvline"));
    }

    #[test]
    fn test_axis_label_is_escaped() {
        let mut series = make_series(1, "p", vec![1.0]);
        series.measurement_name = r#"say "hi" \ there"#.to_string();
        let cells = assemble(&make_run(vec![series]));
        assert!(cells[5]
            .source()
            .contains(r#"plt.set_xlabel("say \"hi\" \\ there")"#));
    }

    #[test]
    fn test_python_float_literals() {
        assert_eq!(python_float(4.0), "4.0");
        assert_eq!(python_float(-0.5), "-0.5");
        assert_eq!(python_float(f64::NAN), "float('nan')");
        assert_eq!(python_float(f64::INFINITY), "float('inf')");
        assert_eq!(python_float(f64::NEG_INFINITY), "float('-inf')");
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let run = make_run(vec![make_series(1, "p", vec![1.0, 2.0])]);
        assert_eq!(assemble(&run), assemble(&run));
    }
}

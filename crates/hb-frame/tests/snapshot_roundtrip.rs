//! Integration tests: snapshot selected rows to Parquet and read them back.

use hb_frame::{DataSource, FrameError, LazyFrame, run_graphs};
use proptest::prelude::*;

fn events() -> DataSource {
    DataSource::from_columns([
        ("pt", vec![12.0, 48.0, 31.0, 7.0, 90.0]),
        ("eta", vec![0.1, -1.9, 2.4, 0.0, -0.3]),
    ])
    .unwrap()
}

#[test]
fn snapshot_writes_selected_rows_and_defines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skim/selected.parquet");

    let sel = LazyFrame::new(events())
        .filter("pt > 20", "pt20")
        .unwrap()
        .define("pt_gev2", "pt * pt")
        .unwrap();
    let written = sel.snapshot(&path, &[]).unwrap();
    assert_eq!(written, 3);

    let back = DataSource::from_parquet(&path).unwrap();
    assert_eq!(back.column_names(), ["pt", "eta", "pt_gev2"]);
    assert_eq!(back.column("pt").unwrap().as_slice(), &[48.0, 31.0, 90.0]);
    assert_eq!(back.column("pt_gev2").unwrap().as_slice(), &[2304.0, 961.0, 8100.0]);

    // The snapshot pass also fills the cutflow.
    let cut = sel.report();
    assert_eq!(cut.get("pt20").map(|c| (c.pass, c.all)), Some((3, 5)));
}

#[test]
fn snapshot_column_subset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eta.parquet");
    let n = LazyFrame::new(events()).range(2).snapshot(&path, &["eta"]).unwrap();
    assert_eq!(n, 2);
    let back = DataSource::from_parquet(&path).unwrap();
    assert_eq!(back.column_names(), ["eta"]);
    assert_eq!(back.n_entries(), 2);
}

#[test]
fn snapshot_of_empty_selection_writes_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("none.parquet");
    let n = LazyFrame::new(events()).filter("pt > 1000", "").unwrap().snapshot(&path, &[]).unwrap();
    assert_eq!(n, 0);
    let back = DataSource::from_parquet(&path).unwrap();
    assert_eq!(back.n_entries(), 0);
    assert_eq!(back.column_names(), ["pt", "eta"]);
}

#[test]
fn snapshot_unknown_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = LazyFrame::new(events()).snapshot(&dir.path().join("x.parquet"), &["phi"]).unwrap_err();
    assert!(matches!(err, FrameError::UnknownColumn { .. }));
}

proptest! {
    #[test]
    fn count_matches_manual_filter(values in prop::collection::vec(-100.0f64..100.0, 0..200), cut in -100.0f64..100.0) {
        let expected = values.iter().filter(|&&v| v > cut).count() as u64;
        let src = DataSource::from_columns([("v", values)]).unwrap();
        let c = LazyFrame::new(src).filter(&format!("v > {cut}"), "").unwrap().count();
        run_graphs(&[c.clone().into()]).unwrap();
        prop_assert_eq!(*c.get().unwrap(), expected);
    }
}

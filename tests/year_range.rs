//! Year range integration tests.
//!
//! Loads a yearly count CSV from disk and drives the year slider over it,
//! checking which sample each handle reports.
//!
//! Run with: `cargo test --test year_range`

use ride_map::{
    count_label, loader, run_until, DailyCount, HandleRole, YearRangeController, YearRangeEvent,
};

const COUNTS_CSV: &str = "\"Year\",\"Count\"\n\
    1880,12\n\
    1900,40\n\
    \n\
    1910,75\n\
    1950,\"1,200\"\n\
    2000,8000\n";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn load_controller(track_width: f64) -> YearRangeController {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counts.csv");
    std::fs::write(&path, COUNTS_CSV).unwrap();

    let counts = loader::load_daily_counts(&path).unwrap();
    assert_eq!(counts.len(), 5);
    YearRangeController::from_counts(counts, track_width).unwrap()
}

fn sample_changes(events: &[YearRangeEvent]) -> Vec<(HandleRole, DailyCount)> {
    events
        .iter()
        .filter_map(|e| match e {
            YearRangeEvent::SampleChanged { role, sample, .. } => Some((*role, *sample)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_csv_to_handle_samples() {
    // 1880..=2000 over 1200px: 10px per year
    let mut years = load_controller(1200.0);
    years.take_events();

    years.drag_start(HandleRole::End);
    years.drag(HandleRole::End, -400.0);
    years.drag_end(HandleRole::End);
    years.drag_start(HandleRole::Start);
    years.drag(HandleRole::Start, 180.0);
    years.drag_end(HandleRole::Start);

    assert_eq!(years.selection(), Some((1898, 1960)));
    let (start, end) = years.selection_samples().unwrap();
    assert_eq!(count_label(start.count), "40 Buildings");
    assert_eq!(count_label(end.count), "1200 Buildings");

    assert_eq!(
        sample_changes(&years.take_events()),
        vec![
            (HandleRole::End, DailyCount { year: 1950, count: 1200 }),
            (HandleRole::Start, DailyCount { year: 1900, count: 40 }),
        ]
    );
}

#[test]
fn test_slide_ends_on_target_samples() {
    let mut years = load_controller(600.0);
    years.take_events();

    years.slide_to(1910, 1950, 400, 0, None);
    run_until(&mut years, 2_000);

    let events = years.take_events();
    assert_eq!(events.last(), Some(&YearRangeEvent::SlideFinished));
    let last_start = sample_changes(&events)
        .into_iter()
        .filter(|(role, _)| *role == HandleRole::Start)
        .last()
        .unwrap();
    assert_eq!(last_start.1, DailyCount { year: 1910, count: 75 });
    assert_eq!(years.selection(), Some((1910, 1950)));
}

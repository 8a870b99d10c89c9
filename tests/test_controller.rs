use rust_parking::parking::clock::ManualClock;
use rust_parking::parking::config::{Config, ConfigError, Logging, Output};
use rust_parking::parking::controller::{
    ControllerError, LocalControllerBuilder, RunSummary, SUMMARY_FILE_NAME,
};
use rust_parking::parking::logging::LOG_FILE_NAME;
use rust_parking::parking::registry::Earnings;
use rust_parking::parking::scenario::Scenario;
use serial_test::serial;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn config_into(dir: &std::path::Path) -> Config {
    let mut config = Config::from_file("tests/resources/parking/config.yml").unwrap();
    config.set_output(Output {
        output_dir: dir.to_path_buf(),
        logging: Logging::Info,
    });
    config
}

fn scenario() -> Scenario {
    Scenario::from_file("tests/resources/parking/vehicles.yml").unwrap()
}

fn clock() -> ManualClock {
    ManualClock::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
}

#[test]
#[serial]
fn run_demo_day() {
    let dir = tempfile::tempdir().unwrap();
    let controller = LocalControllerBuilder::default()
        .config(Arc::new(config_into(dir.path())))
        .scenario(scenario())
        .clock(clock())
        .build()
        .unwrap();

    let summary = controller.run().unwrap();

    assert_eq!(summary.admitted.len(), 20);
    assert_eq!(summary.rejected.len(), 9);
    let rejected: Vec<_> = summary.rejected.iter().map(|r| r.plate.as_str()).collect();
    assert_eq!(
        rejected,
        vec![
            "AA111AA", "CC333CC", "CC333DD", "CC333EE", "CC333JJ", "CC333KK", "CC333LL",
            "CC333MM", "CC333MM"
        ]
    );

    let fees: Vec<_> = summary
        .receipts
        .iter()
        .map(|r| (r.plate.as_str(), r.fee()))
        .collect();
    assert_eq!(
        fees,
        vec![
            ("AA111AA", 21),
            ("DD444GG", 25),
            ("CC333EE", 35),
            ("AA111CC", 45)
        ]
    );
    assert_eq!(summary.not_found, vec!["AA111AT"]);
    assert_eq!(
        summary.earnings,
        Earnings {
            vehicles_checked_out: 4,
            total_charged: 126
        }
    );
    assert_eq!(summary.remaining.len(), 16);
    assert!(!summary.remaining.contains(&"AA111AA".to_string()));

    let written: RunSummary = serde_json::from_reader(
        std::fs::File::open(dir.path().join(SUMMARY_FILE_NAME)).unwrap(),
    )
    .unwrap();
    assert_eq!(written, summary);
    assert!(dir.path().join("output_config.yml").exists());
    assert!(dir.path().join(LOG_FILE_NAME).exists());
}

#[test]
#[serial]
fn half_even_rounding_changes_bus_fee() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_into(dir.path());
    config
        .apply_overrides(&[("pricing.rounding".to_string(), "half-even".to_string())])
        .unwrap();

    let summary = LocalControllerBuilder::default()
        .config(Arc::new(config))
        .scenario(scenario())
        .clock(clock())
        .build()
        .unwrap()
        .run()
        .unwrap();

    // DD444GG: bus, 60 minutes, discount 4.5 -> 4
    let bus = summary
        .receipts
        .iter()
        .find(|r| r.plate == "DD444GG")
        .unwrap();
    assert_eq!(bus.fee(), 26);
    assert_eq!(summary.earnings.total_charged, 127);
}

#[test]
#[serial]
fn empty_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let summary = LocalControllerBuilder::default()
        .config(Arc::new(config_into(dir.path())))
        .clock(clock())
        .build()
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(summary, RunSummary::default());
}

#[test]
#[serial]
fn unrepresentable_arrival_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = Scenario::from_yaml(
        "vehicles:\n  - plate: AA111AA\n    class: Car\n    parked_minutes: 18446744073709551615\n",
    )
    .unwrap();
    let result = LocalControllerBuilder::default()
        .config(Arc::new(config_into(dir.path())))
        .scenario(scenario)
        .clock(clock())
        .build()
        .unwrap()
        .run();
    assert!(matches!(
        result,
        Err(ControllerError::Config(ConfigError::InvalidValue { .. }))
    ));
    assert!(!dir.path().join(SUMMARY_FILE_NAME).exists());
}

// End-to-end runs over the solar system plus a small NEO table

use approx::assert_abs_diff_eq;
use clap::Parser;
use std::f64::consts::TAU;

use neo_navigator::body_registry::InitialAnomaly;
use neo_navigator::catalog::{solar_system, BodyKind};
use neo_navigator::neo_feed::{parse_neo_csv, DEFAULT_DELIMITER};
use neo_navigator::orbital_mechanics::SIZE_SCALER;
use neo_navigator::{build_simulation, BodyRegistry, Config, FrameInput, RegistryOptions, PRIMARY};

const NEO_TABLE: &str = "\
name;a;e;q;om;w;i;tp;diameter;gm
433 Eros;1.458;0.2227;1.1333;304.3;178.9;10.83;2459000.5;16.84;4.463e-4
99942 Apophis;0.9224;0.1914;0.7458;204.0;126.6;3.34;2459800.5;0.34;
1862 Apollo;1.4700;0.5600;0.6468;35.6;286.0;6.35;2459500.5;1.5;
Broken;1.0;1.5;0.1;10;20;3;2459000.5;;
";

fn registry_with_neos(options: RegistryOptions) -> BodyRegistry {
    let feed = parse_neo_csv(NEO_TABLE, DEFAULT_DELIMITER).unwrap();
    assert_eq!(feed.accepted.len(), 3);
    assert_eq!(feed.rejected.len(), 1);

    let mut builder = BodyRegistry::builder(options);
    builder.add_records(solar_system()).unwrap();
    builder.add_records(feed.element_records()).unwrap();
    builder.build().unwrap()
}

fn angle_diff(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

#[test]
fn test_neos_stay_between_apsides() {
    let mut registry = registry_with_neos(RegistryOptions::default());
    assert_eq!(registry.len(), 13);

    for _ in 0..400 {
        let report = registry.step(&FrameInput::new(1.5));
        assert!(report.is_clean());

        for (_, body) in registry.bodies() {
            if body.kind() != BodyKind::NearEarthObject {
                continue;
            }
            let elements = body.elements().unwrap();
            let r = body.position().0.magnitude() / SIZE_SCALER;
            assert!(r >= elements.perihelion_distance() - 1e-9, "{} inside q", body.name());
            assert!(r <= elements.aphelion_distance() + 1e-9, "{} outside Q", body.name());
        }
    }
}

#[test]
fn test_reverse_time_returns_to_start() {
    let mut registry = registry_with_neos(RegistryOptions::default());
    let start: Vec<f64> = registry
        .bodies()
        .filter_map(|(_, b)| b.state().map(|s| s.true_anomaly))
        .collect();

    for _ in 0..200 {
        registry.step(&FrameInput::new(2.0));
    }
    for _ in 0..200 {
        registry.step(&FrameInput::new(-2.0));
    }

    let end: Vec<f64> = registry
        .bodies()
        .filter_map(|(_, b)| b.state().map(|s| s.true_anomaly))
        .collect();
    for (a, b) in start.iter().zip(&end) {
        assert!(angle_diff(*a, *b) < 1e-3, "{} vs {}", a, b);
    }
}

#[test]
fn test_moon_tracks_earth_over_a_year() {
    let mut registry = registry_with_neos(RegistryOptions::default());
    for _ in 0..365 {
        registry.step(&FrameInput::new(1.0));
        let earth = registry.absolute_position("Earth").unwrap().0;
        let moon = registry.get("Moon").unwrap();
        let expected = earth.add(&moon.relative_position().0);
        assert_abs_diff_eq!(moon.position().0.x, expected.x, epsilon = 1e-9);
        assert_abs_diff_eq!(moon.position().0.y, expected.y, epsilon = 1e-9);
        assert_abs_diff_eq!(moon.position().0.z, expected.z, epsilon = 1e-9);
    }
    assert_eq!(registry.absolute_position(PRIMARY).unwrap().0.magnitude(), 0.0);
}

#[test]
fn test_mean_longitude_start_differs_from_perihelion() {
    let options = RegistryOptions {
        initial_anomaly: InitialAnomaly::MeanLongitude,
        ..RegistryOptions::default()
    };
    let registry = registry_with_neos(options);

    // NEOs start at perihelion by construction, planets generally do not
    let eros = registry.get("433 Eros").unwrap().state().unwrap();
    assert_abs_diff_eq!(angle_diff(eros.true_anomaly, 0.0), 0.0, epsilon = 1e-6);
    let mars = registry.get("Mars").unwrap().state().unwrap();
    assert!(angle_diff(mars.true_anomaly, 0.0) > 0.1);
}

#[test]
fn test_build_simulation_from_config_and_feed_file() {
    let path = std::env::temp_dir().join(format!("neo-sim-{}.csv", std::process::id()));
    std::fs::write(&path, NEO_TABLE).unwrap();

    let config = Config::try_parse_from([
        "neo-navigator",
        "--feed",
        path.to_str().unwrap(),
        "--sim-speed",
        "0.25",
        "--record-trails",
        "--trail-capacity",
        "4",
    ])
    .unwrap();
    let mut simulation = build_simulation(&config).unwrap();
    std::fs::remove_file(&path).unwrap();

    for _ in 0..10 {
        assert!(simulation.tick(0.016));
    }
    let snapshot = simulation.to_frontend();
    assert_eq!(snapshot.frame, 10);
    assert_eq!(snapshot.bodies.len(), 13);
    assert!(snapshot.bodies.iter().all(|b| b.trail_len == 4));
}

#[test]
fn test_repeated_and_catalog_names_do_not_abort_the_run() {
    let table = "\
name;a;e;q;om;w;i;tp;diameter;gm
433 Eros;1.458;0.2227;1.1333;304.3;178.9;10.83;2459000.5;16.84;4.463e-4
433 Eros;1.458;0.2227;1.1333;304.3;178.9;10.83;2459000.5;16.84;4.463e-4
Earth;1.0;0.0167;0.9833;0.0;102.9;0.0;2459000.5;;
99942 Apophis;0.9224;0.1914;0.7458;204.0;126.6;3.34;2459800.5;0.34;
";
    let path = std::env::temp_dir().join(format!("neo-dup-{}.csv", std::process::id()));
    std::fs::write(&path, table).unwrap();

    let config =
        Config::try_parse_from(["neo-navigator", "--feed", path.to_str().unwrap()]).unwrap();
    let simulation = build_simulation(&config);
    std::fs::remove_file(&path).unwrap();

    let simulation = simulation.unwrap();
    let registry = &simulation.registry;
    assert_eq!(registry.len(), solar_system().len() + 2);
    assert!(registry.get("433 Eros").is_some());
    assert!(registry.get("99942 Apophis").is_some());
    assert_eq!(registry.get("Earth").unwrap().kind(), BodyKind::Planet);
}

#[test]
fn test_non_finite_sim_speed_is_rejected() {
    let config = Config::try_parse_from(["neo-navigator", "--sim-speed", "NaN"]).unwrap();
    assert!(build_simulation(&config).is_err());
}

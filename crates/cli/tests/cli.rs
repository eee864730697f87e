//! Command-line tests running the `arcfoss` binary on temporary fixtures.

use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn arcfoss(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_arcfoss"))
        .args(args)
        .output()
        .expect("failed to run arcfoss")
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn point(id: &str, x: f64, y: f64, col1: &str) -> Value {
    json!({
        "type": "Feature",
        "properties": { "id": id, "col1": col1 },
        "geometry": { "type": "Point", "coordinates": [x, y] }
    })
}

fn write_geojson(dir: &TempDir, name: &str, features: Vec<Value>) -> PathBuf {
    let path = dir.path().join(name);
    let doc = json!({ "type": "FeatureCollection", "features": features });
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_reader(BufReader::new(File::open(path).unwrap())).unwrap()
}

fn fixtures(dir: &TempDir) -> (PathBuf, PathBuf) {
    let left = write_geojson(
        dir,
        "left.geojson",
        vec![point("riverside", -1.2168849741005956, 54.57827957221454795, "a")],
    );
    let right = write_geojson(
        dir,
        "right.geojson",
        vec![
            point("river_tees", -1.21279327075493448, 54.58131930464433168, "z"),
            point("hartlepool", -1.20634573821025537, 54.68589717425042807, "a"),
        ],
    );
    (left, right)
}

#[test]
fn help_lists_commands() {
    let out = arcfoss(&["--help"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    for command in [
        "datasets-to-extent",
        "vector-to-gpx",
        "conditional-spatial-join",
        "nearest-match",
    ] {
        assert!(text.contains(command), "missing {command} in help");
    }
}

#[test]
fn datasets_to_extent() {
    let dir = TempDir::new().unwrap();
    let (left, right) = fixtures(&dir);
    let output = dir.path().join("extents.geojson");

    let out = arcfoss(&["datasets-to-extent", arg(&left), arg(&right), "--output-file", arg(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let doc = read_json(&output);
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[1]["properties"]["filename"], "right.geojson");
    assert_eq!(features[1]["geometry"]["type"], "Polygon");
}

#[test]
fn vector_to_gpx() {
    let dir = TempDir::new().unwrap();
    let (_, right) = fixtures(&dir);
    let output = dir.path().join("right.gpx");

    let out = arcfoss(&["vector-to-gpx", arg(&right), arg(&output)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let doc = gpx::read(BufReader::new(File::open(&output).unwrap())).unwrap();
    assert_eq!(doc.waypoints.len(), 2);
}

#[test]
fn conditional_spatial_join() {
    let dir = TempDir::new().unwrap();
    let (left, right) = fixtures(&dir);
    let output = dir.path().join("joined.geojson");

    let out = arcfoss(&[
        "conditional-spatial-join",
        "--left",
        arg(&left),
        "--right",
        arg(&right),
        "--output-file",
        arg(&output),
        "--max-distance",
        "0.05",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let doc = read_json(&output);
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["id_right"], "river_tees");
    assert!(features[0]["properties"]["distance"].as_f64().unwrap() < 0.05);
}

#[test]
fn nearest_match_join_on() {
    let dir = TempDir::new().unwrap();
    let (left, right) = fixtures(&dir);
    let output = dir.path().join("matched.geojson");

    let out = arcfoss(&[
        "nearest-match",
        "-l",
        arg(&left),
        "-r",
        arg(&right),
        "-o",
        arg(&output),
        "--join-on",
        "col1",
        "--distance-col",
        "dist",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let doc = read_json(&output);
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["id"], "hartlepool");
    assert!(features[0]["properties"]["dist"].is_number());
}

#[test]
fn extent_prints_bounds() {
    let dir = TempDir::new().unwrap();
    let (_, right) = fixtures(&dir);

    let out = arcfoss(&["extent", arg(&right)]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("Bounds: (-1.212793, 54.581319) - (-1.206346, 54.685897)"), "{text}");
    assert!(text.contains("POLYGON (("));
}

#[test]
fn reproject_to_utm() {
    let dir = TempDir::new().unwrap();
    let (left, _) = fixtures(&dir);
    let output = dir.path().join("left_utm.geojson");

    let out = arcfoss(&["reproject", arg(&left), arg(&output), "--to-crs", "EPSG:32630"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let doc = read_json(&output);
    let x = doc["features"][0]["geometry"]["coordinates"][0].as_f64().unwrap();
    assert!(x > 500_000.0 && x < 700_000.0, "easting {x}");
}

#[test]
fn unreadable_input_fails() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("bogus.txt");
    std::fs::write(&bogus, "not geodata").unwrap();
    let output = dir.path().join("extents.geojson");

    let out = arcfoss(&["datasets-to-extent", arg(&bogus), "-o", arg(&output)]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Could not open file as either raster or vector"));
}

#[test]
fn negative_max_distance_rejected() {
    let dir = TempDir::new().unwrap();
    let (left, right) = fixtures(&dir);
    let output = dir.path().join("joined.geojson");

    let out = arcfoss(&[
        "conditional-spatial-join",
        "-l",
        arg(&left),
        "-r",
        arg(&right),
        "-o",
        arg(&output),
        "--max-distance=-1",
    ]);
    assert!(!out.status.success());
}

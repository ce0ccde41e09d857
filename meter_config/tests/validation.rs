use meter_config::{Config, EmptyColumns, load_toml};
use rstest::rstest;

#[test]
fn defaults_are_valid() {
    Config::default().validate().expect("defaults must validate");
}

#[test]
fn empty_toml_yields_defaults() {
    let cfg = load_toml("").expect("parse empty TOML");
    assert_eq!(cfg.output.port, 64250);
    assert_eq!(cfg.output.host, "127.0.0.1");
    assert_eq!(cfg.camera.resolution.width, 1280);
    assert_eq!(cfg.camera.resolution.height, 720);
    assert_eq!(cfg.edge.empty_columns, EmptyColumns::ZeroFill);
    cfg.validate().expect("valid");
}

#[test]
fn parses_sectioned_toml() {
    let toml = r#"
[camera]
index = 1
resolution = "800x600"
rotate_cw = false

[geometry]
object_distance = 150
tube_diameter = 12.5

[edge]
columns = 7
empty_columns = "exclude"

[output]
port = 5000
absent_text = ""
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    assert_eq!(cfg.camera.index, 1);
    assert_eq!(cfg.camera.resolution.width, 800);
    assert!(!cfg.camera.rotate_cw);
    assert!((cfg.geometry.object_distance - 150.0).abs() < 1e-12);
    assert!((cfg.geometry.tube_diameter - 12.5).abs() < 1e-12);
    assert_eq!(cfg.edge.columns, 7);
    assert_eq!(cfg.edge.empty_columns, EmptyColumns::Exclude);
    assert_eq!(cfg.output.port, 5000);
    assert_eq!(cfg.output.absent_text, "");
    cfg.validate().expect("valid");
}

#[test]
fn rejects_unknown_toml_keys() {
    let err = load_toml("[geometry]\ntube_diam = 6\n").expect_err("unknown key must fail");
    assert!(format!("{err}").contains("tube_diam"));
}

#[test]
fn rejects_malformed_resolution() {
    let err = load_toml("[camera]\nresolution = \"1280by720\"\n").expect_err("bad resolution");
    assert!(format!("{err}").contains("WIDTHxHEIGHT"));
}

#[rstest]
#[case("[geometry]\nobject_distance = 0\n", "object_distance must be > 0")]
#[case("[geometry]\ntube_diameter = -1\n", "tube_diameter must be >= 0")]
#[case("[roi]\npercent_x = 5\n", "roi.percent_x must be in [10, 100]")]
#[case("[roi]\npercent_y = 101\n", "roi.percent_y must be in [10, 100]")]
#[case("[detector]\nscore_threshold = 1.5\n", "score_threshold must be in [0.0, 1.0]")]
#[case("[detector]\nmax_detections = 3\n", "max_detections must be 1 or 2")]
#[case("[edge]\ncolumns = 0\n", "edge.columns must be >= 1")]
#[case("[output]\nport = 0\n", "output.port must be > 0")]
#[case("[runner]\nframe_delay_ms = 0\n", "frame_delay_ms must be >= 1")]
#[case("[camera]\nresolution = \"0x720\"\n", "resolution must be non-zero")]
#[case("[display]\ncanvas_height = 0\n", "canvas_height must be >= 1")]
fn validation_rejects(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

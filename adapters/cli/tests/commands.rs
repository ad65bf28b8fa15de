use std::{
    fs,
    path::PathBuf,
    process::{Command, Output},
};

fn oval() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tracks/oval.txt")
}

fn vector_racing(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vector-racing"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to invoke the vector-racing binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf-8 output")
}

#[test]
fn validate_summarises_the_demo_track() {
    let output = vector_racing(&["validate", oval().to_str().expect("utf-8 path")]);

    assert!(output.status.success(), "validate should succeed");
    let report = stdout(&output);
    assert!(report.starts_with("20x13 track"));
    assert!(report.contains("finish line: 6 cells"));
}

#[test]
fn encoded_tracks_decode_to_the_same_glyphs() {
    let encoded = vector_racing(&["encode", oval().to_str().expect("utf-8 path")]);
    assert!(encoded.status.success(), "encode should succeed");
    let transfer = stdout(&encoded);
    assert!(transfer.starts_with("track:v1:20x13:"));

    let decoded = vector_racing(&["decode", transfer.trim()]);
    assert!(decoded.status.success(), "decode should succeed");

    let original = fs::read_to_string(oval()).expect("demo track readable");
    assert_eq!(
        stdout(&decoded).lines().collect::<Vec<_>>(),
        original.lines().collect::<Vec<_>>()
    );
}

#[test]
fn malformed_inputs_fail_with_a_message() {
    let decoded = vector_racing(&["decode", "maze:v1:1x1:AA"]);
    assert!(!decoded.status.success());
    assert!(String::from_utf8_lossy(&decoded.stderr).contains("invalid transfer string"));

    let missing = vector_racing(&["validate", "no/such/track.txt"]);
    assert!(!missing.status.success());
}

#[test]
fn unknown_heuristics_in_the_config_are_rejected() {
    let config = std::env::temp_dir().join(format!(
        "vector-racing-bad-config-{}.toml",
        std::process::id()
    ));
    fs::write(&config, "heuristic = \"telepathy\"\n").expect("temp config written");

    let output = vector_racing(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "validate",
        oval().to_str().expect("utf-8 path"),
    ]);
    let _ = fs::remove_file(&config);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to parse configuration"));
}

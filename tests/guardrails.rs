const MAINS: [(&str, &str, &str); 3] = [
    (
        "treasure_manager",
        include_str!("../src/bin/treasure_manager.rs"),
        "treasure_hunt::cli::manager::run_cli()",
    ),
    (
        "treasure_hub",
        include_str!("../src/bin/treasure_hub.rs"),
        "treasure_hunt::cli::hub::run_cli()",
    ),
    (
        "score_calculator",
        include_str!("../src/bin/score_calculator.rs"),
        "treasure_hunt::cli::score::run_cli()",
    ),
];

#[test]
fn binaries_stay_thin_wrappers_over_the_library() {
    for (name, source, entry) in MAINS {
        assert!(source.contains(entry), "{name} should call {entry}");
        assert!(source.contains("std::process::exit"));
        assert!(
            !source.contains("clap"),
            "{name} main should not parse arguments itself"
        );

        let significant = source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("//"))
            .count();
        assert!(
            significant <= 4,
            "{name} main should remain tiny (found {significant} significant lines)"
        );
    }
}

#[test]
fn logging_never_writes_to_stdout() {
    // stdout is the monitor's relay pipe; a log line there would reach the hub.
    let source = include_str!("../src/logging.rs");
    assert!(source.contains("with_writer(std::io::stderr)"));
    assert!(!source.contains("std::io::stdout"));
}

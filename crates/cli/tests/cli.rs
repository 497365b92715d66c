use clap::Parser;
use solmove_cli::opts::App;

#[test]
fn writes_a_move_package() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Counter.sol");
    std::fs::write(
        &input,
        "contract Counter { uint256 count; function inc() public { count += 1; } }",
    )
    .unwrap();
    let out = dir.path().join("out");

    let app = App::parse_from([
        "solmove",
        input.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--optimization-level",
        "low",
    ]);
    let had_errors = app.run().unwrap();
    assert!(!had_errors);

    assert!(out.join("Move.toml").exists());
    let module = std::fs::read_to_string(out.join("sources").join("counter.move")).unwrap();
    assert!(module.contains("module 0x42::counter {"));
    assert!(module.contains("struct CounterState has key"));
}

#[test]
fn json_mode_prints_the_structured_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Bad.sol");
    std::fs::write(&input, "contract {").unwrap();

    let app = App::parse_from(["solmove", input.to_str().unwrap(), "--json"]);
    let had_errors = app.run().unwrap();
    assert!(had_errors, "parse failures surface through the exit status");
}

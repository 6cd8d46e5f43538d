use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["kwdb-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["kwdb-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["kwdb-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_keys_status() {
    let cli = Cli::try_parse_from(["kwdb-cli", "keys", "status"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Keys {
            command: KeysCommands::Status
        })
    ));
}

#[test]
fn expand_takes_seed_and_optional_rounds() {
    let cli = Cli::try_parse_from(["kwdb-cli", "expand", "캠핑", "--rounds", "3"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Expand { ref seed, rounds: Some(3) }) if seed == "캠핑"
    ));
}

#[test]
fn research_defaults() {
    let cli = Cli::try_parse_from(["kwdb-cli", "research", "camping"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Research {
            dry_run: false,
            show: 20,
            ..
        })
    ));
}

#[test]
fn research_dry_run() {
    let cli = Cli::try_parse_from(["kwdb-cli", "research", "camping", "--dry-run", "--show", "5"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Research {
            dry_run: true,
            show: 5,
            ..
        })
    ));
}

#[test]
fn research_requires_a_seed() {
    assert!(Cli::try_parse_from(["kwdb-cli", "research"]).is_err());
}

#[test]
fn collect_auto_without_flags() {
    let cli = Cli::try_parse_from(["kwdb-cli", "collect", "auto"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            command: CollectCommands::Auto { target: None, ref seeds }
        }) if seeds.is_empty()
    ));
}

#[test]
fn collect_auto_with_target_and_repeated_seeds() {
    let cli = Cli::try_parse_from([
        "kwdb-cli", "collect", "auto", "--target", "200", "--seed", "tent", "--seed", "stove",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            command: CollectCommands::Auto { target: Some(200), ref seeds }
        }) if seeds == &["tent".to_string(), "stove".to_string()]
    ));
}

#[test]
fn collect_auto_rejects_non_numeric_target() {
    assert!(Cli::try_parse_from(["kwdb-cli", "collect", "auto", "--target", "lots"]).is_err());
}

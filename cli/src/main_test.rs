use super::*;

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["tavern-admin"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn content_type_follows_extension() {
    assert_eq!(content_type_for(Path::new("cover.PNG")), Some("image/png"));
    assert_eq!(content_type_for(Path::new("art/cover.jpeg")), Some("image/jpeg"));
    assert_eq!(content_type_for(Path::new("notes.txt")), None);
    assert_eq!(content_type_for(Path::new("cover")), None);
}

#[test]
fn role_parser_lists_known_roles_on_error() {
    assert_eq!(parse_role("Dungeon_Master"), Ok(Role::DungeonMaster));
    let err = parse_role("wizard").unwrap_err();
    assert!(err.contains("player, dungeon_master, admin"));
}

#[test]
fn status_parser_accepts_wire_names() {
    assert_eq!(parse_status("confirmed"), Ok(SignupStatus::Confirmed));
    assert!(parse_status("maybe").is_err());
}

#[test]
fn users_create_collects_repeated_roles() {
    let cli = parse(&[
        "--credential-file",
        "/tmp/cred",
        "users",
        "create",
        "mira",
        "--password",
        "pw",
        "--role",
        "player",
        "--role",
        "admin",
    ]);
    let Command::Users(UsersCommand { command: UsersSubcommand::Create { login, roles, .. } }) = cli.command else {
        panic!("expected users create");
    };
    assert_eq!(login, "mira");
    assert_eq!(roles, vec![Role::Player, Role::Admin]);
    assert_eq!(cli.credential_file, Some(PathBuf::from("/tmp/cred")));
}

#[test]
fn signups_set_status_parses_status() {
    let cli = parse(&["signups", "set-status", "7", "cancelled"]);
    let Command::Signups(SignupsCommand { command: SignupsSubcommand::SetStatus { id, status } }) = cli.command else {
        panic!("expected signups set-status");
    };
    assert_eq!((id, status), (7, SignupStatus::Cancelled));
}

#[test]
fn adventures_cover_accepts_explicit_content_type() {
    let cli = parse(&["adventures", "cover", "3", "art.bin", "--content-type", "image/png"]);
    let Command::Adventures(AdventuresCommand {
        command: AdventuresSubcommand::Cover { id, path, content_type },
    }) = cli.command
    else {
        panic!("expected adventures cover");
    };
    assert_eq!(id, 3);
    assert_eq!(path, PathBuf::from("art.bin"));
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[test]
fn unknown_role_is_a_usage_error() {
    let result = Cli::try_parse_from(["tavern-admin", "users", "add-role", "1", "wizard"]);
    assert!(result.is_err());
}

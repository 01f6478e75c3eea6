use crate::{resolve, JailError, JailRoot, SessionState};
use std::fs;
use std::path::Path;

fn jail_with_outside() -> (tempfile::TempDir, JailRoot, SessionState) {
    let td = tempfile::tempdir().unwrap();
    fs::create_dir(td.path().join("jail")).unwrap();
    fs::create_dir(td.path().join("outside")).unwrap();
    fs::write(td.path().join("outside/secret"), "s").unwrap();
    let jail = JailRoot::try_new(td.path().join("jail")).unwrap();
    let session = SessionState::new(&jail);
    (td, jail, session)
}

#[test]
fn known_traversal_patterns_never_yield_outside_paths() {
    let (td, jail, session) = jail_with_outside();
    std::os::unix::fs::symlink(td.path().join("outside"), td.path().join("jail/door")).unwrap();

    let attack_patterns = [
        "../outside/secret",
        "../../../../etc/passwd",
        "/../outside",
        "/..",
        "..",
        "door/secret",
        "door/../jail",
        "door/new",
        "./door",
        "....//....//etc",
        "missing/../../outside",
        "/door/a/b/c",
    ];

    for pattern in attack_patterns {
        let candidate = resolve(&jail, &session, pattern).unwrap();
        match jail.confine(candidate) {
            Ok(confined) => {
                assert!(
                    Path::new(confined.interop_path()).starts_with(jail.path()),
                    "attack pattern '{pattern}' escaped: {confined:?}"
                );
            }
            Err(JailError::NotConfined { .. }) | Err(JailError::Resolution { .. }) => {}
            Err(other) => panic!("unexpected error for '{pattern}': {other:?}"),
        }
    }
}

#[test]
fn entries_reached_through_outside_symlink_are_refused() {
    let (td, jail, session) = jail_with_outside();
    std::os::unix::fs::symlink(td.path().join("outside"), td.path().join("jail/door")).unwrap();

    for pattern in ["door/secret", "door/new-link"] {
        let err = jail
            .confine_entry(resolve(&jail, &session, pattern).unwrap())
            .unwrap_err();
        assert!(err.is_not_confined(), "{pattern}: {err:?}");
    }
    assert!(td.path().join("outside/secret").exists());
}

#[test]
fn symlink_entries_are_removed_as_links_not_followed() {
    let (td, jail, session) = jail_with_outside();
    let jail_dir = td.path().join("jail");
    std::os::unix::fs::symlink(td.path().join("outside/secret"), jail_dir.join("ptr")).unwrap();
    std::os::unix::fs::symlink(td.path().join("outside/nowhere"), jail_dir.join("dangling")).unwrap();

    let ptr = jail
        .confine_entry(resolve(&jail, &session, "ptr").unwrap())
        .unwrap();
    ptr.remove_file().unwrap();
    assert!(fs::symlink_metadata(jail_dir.join("ptr")).is_err());

    let dangling = jail
        .confine_entry(resolve(&jail, &session, "dangling").unwrap())
        .unwrap();
    assert!(dangling.exists());
    dangling.remove_file().unwrap();
    assert!(!dangling.exists());

    assert_eq!(fs::read_to_string(td.path().join("outside/secret")).unwrap(), "s");
}

#[test]
fn symlink_entry_renamed_and_linked_as_itself() {
    let (td, jail, session) = jail_with_outside();
    let jail_dir = td.path().join("jail");
    std::os::unix::fs::symlink(td.path().join("outside/secret"), jail_dir.join("ptr")).unwrap();

    let from = jail.confine_entry(resolve(&jail, &session, "ptr").unwrap()).unwrap();
    let to = jail.confine_entry(resolve(&jail, &session, "moved").unwrap()).unwrap();
    from.rename_to(&to).unwrap();
    assert!(fs::symlink_metadata(jail_dir.join("moved")).unwrap().file_type().is_symlink());

    let original = jail.confine_entry(resolve(&jail, &session, "moved").unwrap()).unwrap();
    let link = jail.confine_entry(resolve(&jail, &session, "hard").unwrap()).unwrap();
    original.hard_link_to(&link).unwrap();
    assert!(fs::symlink_metadata(jail_dir.join("hard")).unwrap().file_type().is_symlink());

    // Renaming over an outside-pointing link replaces the link, not its target.
    fs::write(jail_dir.join("plain"), "inside").unwrap();
    let from = jail.confine_entry(resolve(&jail, &session, "plain").unwrap()).unwrap();
    let over = jail.confine_entry(resolve(&jail, &session, "hard").unwrap()).unwrap();
    from.rename_to(&over).unwrap();
    assert_eq!(fs::read_to_string(jail_dir.join("hard")).unwrap(), "inside");
    assert_eq!(fs::read_to_string(td.path().join("outside/secret")).unwrap(), "s");
}

#[test]
fn overlong_entry_candidate_is_refused() {
    let (_td, jail, _session) = jail_with_outside();
    let limit = jail.path().as_os_str().len() + 8;
    let jail = jail.with_max_path_len(limit);
    let candidate = crate::CandidatePath::new(jail.path().join("a-much-longer-name"));
    assert!(matches!(
        jail.confine_entry(candidate),
        Err(JailError::PathTooLong { .. })
    ));
}

#[test]
fn the_jail_root_is_not_an_entry() {
    let (_td, jail, session) = jail_with_outside();
    for pattern in ["/", ".", "..", "/.", "/..", "sub/.."] {
        let err = jail
            .confine_entry(resolve(&jail, &session, pattern).unwrap())
            .unwrap_err();
        assert!(
            matches!(err, JailError::NotConfined { .. } | JailError::InvalidPath { .. }),
            "{pattern}: {err:?}"
        );
    }
}

#[test]
fn parent_swapped_for_symlink_after_validation_is_not_followed() {
    let (td, jail, session) = jail_with_outside();
    let jail_dir = td.path().join("jail");
    fs::create_dir(jail_dir.join("sub")).unwrap();
    fs::write(jail_dir.join("sub/secret"), "inside").unwrap();

    let entry = jail
        .confine_entry(resolve(&jail, &session, "sub/secret").unwrap())
        .unwrap();

    // Swap the validated parent for a symlink that points out of the jail.
    fs::rename(jail_dir.join("sub"), jail_dir.join("sub-moved")).unwrap();
    std::os::unix::fs::symlink(td.path().join("outside"), jail_dir.join("sub")).unwrap();

    entry.remove_file().unwrap();
    assert!(td.path().join("outside/secret").exists(), "outside file was removed");
    assert!(!jail_dir.join("sub-moved/secret").exists());
}

#[test]
fn create_dir_all_does_not_follow_a_symlink_planted_mid_chain() {
    let (td, jail, session) = jail_with_outside();
    let jail_dir = td.path().join("jail");
    let target = jail
        .confine(resolve(&jail, &session, "a/b").unwrap())
        .unwrap();

    // Plant "a" as a symlink out of the jail before the creation runs.
    std::os::unix::fs::symlink(td.path().join("outside"), jail_dir.join("a")).unwrap();
    assert!(target.create_dir_all(0o755).is_err());
    assert!(!td.path().join("outside/b").exists());
}

#[test]
fn sibling_with_shared_prefix_stays_untouched() {
    let td = tempfile::tempdir().unwrap();
    fs::create_dir(td.path().join("test")).unwrap();
    fs::create_dir(td.path().join("test-evil")).unwrap();
    fs::write(td.path().join("test-evil/x"), "x").unwrap();
    let jail = JailRoot::try_new(td.path().join("test")).unwrap();
    let session = SessionState::new(&jail);

    let err = jail
        .confine_entry(resolve(&jail, &session, "../test-evil/x").unwrap())
        .unwrap_err();
    assert!(err.is_not_confined());
    assert!(Path::new(&td.path().join("test-evil/x")).exists());
}

use jail_path::JailRoot;
use jailsh::{repl, Shell};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

struct Sandbox {
    _td: tempfile::TempDir,
    base: PathBuf,
    root: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let td = tempfile::tempdir().unwrap();
        let base = fs::canonicalize(td.path()).unwrap();
        let root = base.join("jail");
        fs::create_dir(&root).unwrap();
        fs::create_dir(base.join("outside")).unwrap();
        fs::write(base.join("outside/secret"), "secret").unwrap();
        fs::create_dir(base.join("jail-evil")).unwrap();
        fs::write(base.join("jail-evil/x"), "x").unwrap();
        Self {
            _td: td,
            base,
            root,
        }
    }

    fn shell(&self) -> Shell {
        Shell::new(JailRoot::try_new(&self.root).unwrap())
    }

    fn outside_untouched(&self) {
        assert_eq!(fs::read_to_string(self.base.join("outside/secret")).unwrap(), "secret");
        assert_eq!(fs::read_to_string(self.base.join("jail-evil/x")).unwrap(), "x");
        let mut names: Vec<_> = fs::read_dir(&self.base)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["jail", "jail-evil", "outside"]);
    }
}

fn feed(shell: &mut Shell, script: &str) -> String {
    let mut out = Vec::new();
    repl::run(shell, script.as_bytes(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn traversal_out_of_the_jail_leaves_session_unchanged() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    let out = feed(&mut shell, "cd ../../etc\n");
    assert_eq!(
        out,
        "/ $ cd: ../../etc: Permission denied: outside the jail\n/ $ \n"
    );
    assert_eq!(shell.session().relative_display(), "/");
}

#[test]
fn mkdir_builds_missing_chain_but_not_outside() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    let out = feed(&mut shell, "mkdir a/b/c\nmkdir ../escape\ncd a/b/c\n");
    assert!(sb.root.join("a/b/c").is_dir());
    assert!(out.contains("mkdir: ../escape: Permission denied: outside the jail"), "{out}");
    assert!(out.ends_with("/a/b/c $ \n"), "{out}");
    sb.outside_untouched();
}

#[test]
fn overlong_argument_is_refused_without_effect() {
    let sb = Sandbox::new();
    let jail = JailRoot::try_new(&sb.root).unwrap().with_max_path_len(256);
    let mut shell = Shell::new(jail);

    let long = "d".repeat(300);
    let out = feed(&mut shell, &format!("mkdir {long}\ncd {long}\n"));
    assert!(out.contains("mkdir: "), "{out}");
    assert!(out.contains("path too long"), "{out}");
    assert_eq!(fs::read_dir(&sb.root).unwrap().count(), 0);
}

#[test]
fn session_directory_relocated_outside_is_reset() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    fs::create_dir(sb.root.join("work")).unwrap();
    feed(&mut shell, "cd work\n");
    assert_eq!(shell.session().relative_display(), "/work");

    fs::rename(sb.root.join("work"), sb.base.join("outside/work")).unwrap();
    std::os::unix::fs::symlink(sb.base.join("outside/work"), sb.root.join("work")).unwrap();

    let out = feed(&mut shell, "mkdir planted\n");
    assert!(out.starts_with("working directory is gone or left the jail; back at /\n/ $ "), "{out}");
    assert!(sb.root.join("planted").is_dir());
    assert!(!sb.base.join("outside/work/planted").exists());
}

#[test]
fn short_symlink_to_long_directory_keeps_the_session() {
    let sb = Sandbox::new();
    let long = "d".repeat(60);
    fs::create_dir(sb.root.join(&long)).unwrap();
    std::os::unix::fs::symlink(sb.root.join(&long), sb.root.join("s")).unwrap();
    let limit = sb.root.as_os_str().len() + 20;
    let mut shell = Shell::new(JailRoot::try_new(&sb.root).unwrap().with_max_path_len(limit));

    feed(&mut shell, "cd s\n");
    let out = feed(&mut shell, "ls\n");
    assert!(!out.contains("back at /"), "{out}");
    assert_eq!(shell.session().relative_display(), format!("/{long}"));
}

#[test]
fn listing_is_idempotent_and_sorted() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    feed(&mut shell, "mkdir b\nmkdir a\n");
    fs::write(sb.root.join("c"), "abc").unwrap();

    let first = feed(&mut shell, "ls\n");
    let second = feed(&mut shell, "ls\n");
    assert_eq!(first, second);

    let names: Vec<_> = first
        .lines()
        .filter(|l| l.contains(" Access: "))
        .map(|l| l.rsplit(' ').next().unwrap())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn rename_ln_rm_inside_the_jail() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    fs::write(sb.root.join("notes"), "n").unwrap();

    let out = feed(
        &mut shell,
        "mkdir dir\nrename notes dir/notes\ncd dir\nln notes /copy\nrm notes\n",
    );
    assert!(out.contains("Hard link created: /copy -> notes"), "{out}");
    assert!(out.contains("File removed: notes"), "{out}");
    assert_eq!(fs::read_to_string(sb.root.join("copy")).unwrap(), "n");
    assert!(!sb.root.join("dir/notes").exists());
}

#[test]
fn symlinks_leading_out_are_dead_ends() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    std::os::unix::fs::symlink(sb.base.join("outside"), sb.root.join("door")).unwrap();

    let out = feed(
        &mut shell,
        "cd door\nmkdir door/x\nrm door/secret\nrename door/secret stolen\nln door/secret mine\nrmdir door\n",
    );
    assert_eq!(out.matches("outside the jail").count(), 5, "{out}");
    assert!(out.contains("rmdir: door: Not a directory"), "{out}");
    assert!(sb.root.join("door").symlink_metadata().is_ok());
    sb.outside_untouched();
}

#[test]
fn planted_symlink_pointing_out_can_be_cleaned_up() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    std::os::unix::fs::symlink(sb.base.join("outside/secret"), sb.root.join("ptr")).unwrap();
    std::os::unix::fs::symlink(sb.base.join("outside/gone"), sb.root.join("dangling")).unwrap();

    let out = feed(&mut shell, "ln ptr hard\nrename ptr moved\nrm moved\nrm hard\nrm dangling\n");
    assert!(out.contains("Hard link created: hard -> ptr"), "{out}");
    assert!(out.contains("File removed: moved"), "{out}");
    assert!(out.contains("File removed: dangling"), "{out}");
    assert_eq!(fs::read_dir(&sb.root).unwrap().count(), 0);
    sb.outside_untouched();
}

#[test]
fn prefix_sharing_sibling_is_outside() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    let out = feed(&mut shell, "cd ../jail-evil\nrm ../jail-evil/x\nln ../jail-evil/x mine\n");
    assert_eq!(out.matches("outside the jail").count(), 3, "{out}");
    sb.outside_untouched();
}

#[test]
fn output_never_contains_the_host_root() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    let out = feed(
        &mut shell,
        "mkdir a\ncd a\nrmdir missing\nrm /nope/x\ncd /\nrename a\nls\nfoo\nhelp\ncd ..\n",
    );
    assert!(!out.contains(sb.base.to_str().unwrap()), "{out}");
}

#[test]
fn quit_stops_reading() {
    let sb = Sandbox::new();
    let mut shell = sb.shell();
    let out = feed(&mut shell, "quit\nmkdir late\n");
    assert_eq!(out, "/ $ ");
    assert!(!sb.root.join("late").exists());
}

#[test]
fn binary_exits_zero_on_end_of_input() {
    let sb = Sandbox::new();
    let mut child = Command::new(env!("CARGO_BIN_EXE_jailsh"))
        .arg("--root")
        .arg(&sb.root)
        .env_remove("JAILSH_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"mkdir made\nls\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(sb.root.join("made").is_dir());
    assert!(String::from_utf8_lossy(&output.stdout).contains(" made\n"));
}

#[test]
fn binary_creates_missing_root_with_restricted_mode() {
    use std::os::unix::fs::PermissionsExt;
    let sb = Sandbox::new();
    let root = sb.root.join("fresh");
    let output = run_binary(&root, b"quit\n");
    assert!(output.status.success());
    let mode = fs::metadata(&root).unwrap().permissions().mode();
    assert_eq!(mode & 0o077, 0);
}

#[test]
fn binary_exits_one_when_root_cannot_be_established() {
    let sb = Sandbox::new();
    let output = run_binary(&sb.base.join("outside/secret/jail"), b"quit\n");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot establish jail root"));
}

fn run_binary(root: &Path, input: &[u8]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jailsh"))
        .arg("--root")
        .arg(root)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    // The process may already have exited; a broken pipe is fine.
    let _ = child.stdin.take().unwrap().write_all(input);
    child.wait_with_output().unwrap()
}

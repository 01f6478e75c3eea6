//! SUMMARY:
//! Render `ls` output for the session directory.
//!
//! DETAILS:
//! The directory is a `ConfinedPath`, so everything listed is inside the jail. Entries are
//! read with `lstat` semantics: a symlink is described as itself, and its target (which may
//! lie outside the jail) is never touched.
use chrono::{DateTime, Local};
use jail_path::ConfinedPath;
use nix::unistd::{Gid, Group, Uid, User};
use std::fs::Metadata;
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};

const TIME_FORMAT: &str = "%b %d %H:%M";

/// SUMMARY:
/// Produce one line per entry of `dir`, sorted by name, without `.` and `..`.
///
/// DETAILS:
/// An entry whose metadata cannot be read yields `ls: <name>: <reason>` in its place; the
/// listing continues.
///
/// ERRORS:
/// - `io::Error`: `dir` itself cannot be read.
pub fn render(dir: &ConfinedPath) -> io::Result<Vec<String>> {
    let mut entries = dir
        .read_dir()?
        .map(|entry| entry.map(|e| (e.file_name(), e.path())))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let lines = entries
        .into_iter()
        .map(|(name, path)| {
            let name = name.to_string_lossy();
            match std::fs::symlink_metadata(&path) {
                Ok(meta) => format_entry(&name, &meta),
                Err(e) => format!("ls: {name}: {}", crate::error::io_reason(&e)),
            }
        })
        .collect();
    Ok(lines)
}

/// `<type+perms> <nlink> <owner> <group> <size> Access: <atime> Modify: <mtime> <name>`
pub fn format_entry(name: &str, meta: &Metadata) -> String {
    format!(
        "{} {} {} {} {:>5} Access: {} Modify: {} {}",
        mode_string(meta),
        meta.nlink(),
        owner_name(meta.uid()),
        group_name(meta.gid()),
        meta.size(),
        format_time(meta.atime(), meta.atime_nsec()),
        format_time(meta.mtime(), meta.mtime_nsec()),
        name,
    )
}

/// Type character followed by the nine permission bits, `ls -l` style.
pub fn mode_string(meta: &Metadata) -> String {
    let ft = meta.file_type();
    let kind = if ft.is_dir() {
        'd'
    } else if ft.is_symlink() {
        'l'
    } else if ft.is_fifo() {
        'p'
    } else if ft.is_socket() {
        's'
    } else if ft.is_block_device() {
        'b'
    } else if ft.is_char_device() {
        'c'
    } else {
        '-'
    };

    let mode = meta.permissions().mode();
    let mut shown = String::with_capacity(10);
    shown.push(kind);
    for (bit, ch) in [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ] {
        shown.push(if mode & bit != 0 { ch } else { '-' });
    }
    shown
}

/// User name for `uid`, or the number when there is no such user.
pub fn owner_name(uid: u32) -> String {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}

/// Group name for `gid`, or the number when there is no such group.
pub fn group_name(gid: u32) -> String {
    match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}

fn format_time(secs: i64, nsecs: i64) -> String {
    let nsecs = u32::try_from(nsecs).unwrap_or(0);
    match DateTime::from_timestamp(secs, nsecs) {
        Some(utc) => utc.with_timezone(&Local).format(TIME_FORMAT).to_string(),
        None => secs.to_string(),
    }
}

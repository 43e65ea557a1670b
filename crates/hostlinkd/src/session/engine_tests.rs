//! Tests for the session engine and its command handlers.

use std::fs;
use std::io::Cursor;
use std::path::MAIN_SEPARATOR;
use std::sync::Arc;

use camino::Utf8PathBuf;
use mockall::predicate::eq;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::ports::{
    HostFileStore, MockMessagePort, MockPeripheralPort, MockProcessTable, PeripheralError,
    ProcessError, ProcessRecord,
};
use crate::state::SharedToggleState;

use super::engine::{Session, SessionContext};
use super::errors::SessionError;

struct Harness {
    root: TempDir,
    ctx: SessionContext,
}

#[fixture]
fn harness() -> Harness {
    let root = tempfile::tempdir().expect("temp dir");
    let browse_root =
        Utf8PathBuf::from_path_buf(root.path().to_path_buf()).expect("utf8 temp path");
    let ctx = SessionContext {
        files: Arc::new(HostFileStore::new()),
        processes: Arc::new(MockProcessTable::new()),
        peripherals: Arc::new(MockPeripheralPort::new()),
        messages: Arc::new(MockMessagePort::new()),
        input_block: SharedToggleState::new(),
        browse_root,
    };
    Harness { root, ctx }
}

impl Harness {
    fn path(&self, name: &str) -> String {
        self.root
            .path()
            .join(name)
            .to_str()
            .expect("utf8 temp path")
            .to_owned()
    }

    fn root_path(&self) -> String {
        self.root.path().to_str().expect("utf8 temp path").to_owned()
    }
}

fn run(ctx: SessionContext, input: impl Into<Vec<u8>>) -> (Result<(), SessionError>, Vec<u8>) {
    let mut output = Vec::new();
    let mut session = Session::new(Cursor::new(input.into()), &mut output, Arc::new(ctx));
    let result = session.run();
    drop(session);
    (result, output)
}

fn response_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output)
        .lines()
        .map(str::to_owned)
        .collect()
}

#[rstest]
fn unknown_verb_reports_and_keeps_the_session_open(harness: Harness) {
    let (result, output) = run(harness.ctx, "NOT_A_VERB\nLIST_DIRS_C\n");
    result.expect("session should end cleanly");
    let lines = response_lines(&output);
    assert_eq!(lines[0], "UNKNOWN_COMMAND");
    assert!(lines[1].starts_with("DIRS:"), "got {}", lines[1]);
}

#[rstest]
fn list_dirs_reports_subdirectories_with_separator_suffix(harness: Harness) {
    fs::create_dir(harness.root.path().join("users")).expect("fixture dir");
    fs::create_dir(harness.root.path().join("windows")).expect("fixture dir");
    fs::write(harness.root.path().join("stray.txt"), b"x").expect("fixture file");

    let (result, output) = run(harness.ctx, "LIST_DIRS_C\n");
    result.expect("session should end cleanly");
    let lines = response_lines(&output);
    let body = lines[0].strip_prefix("DIRS:").expect("DIRS prefix");
    let mut names: Vec<&str> = body.split(';').collect();
    names.sort_unstable();
    let users = format!("users{MAIN_SEPARATOR}");
    let windows = format!("windows{MAIN_SEPARATOR}");
    assert_eq!(names, vec![users.as_str(), windows.as_str()]);
}

#[rstest]
fn list_files_reports_entries_with_kind_and_length(harness: Harness) {
    fs::create_dir(harness.root.path().join("public")).expect("fixture dir");
    fs::write(harness.root.path().join("alice.txt"), vec![0u8; 42]).expect("fixture file");

    let input = format!("LIST_FILES\n{}\n", harness.root_path());
    let (result, output) = run(harness.ctx, input);
    result.expect("session should end cleanly");
    let lines = response_lines(&output);
    let body = lines[0].strip_prefix("FILES:").expect("FILES prefix");
    let mut entries: Vec<&str> = body.split('|').collect();
    entries.sort_unstable();
    let public = format!("public{MAIN_SEPARATOR};0");
    assert_eq!(entries, vec!["alice.txt;42", public.as_str()]);
}

#[rstest]
fn list_files_rejects_missing_paths_and_plain_files(harness: Harness) {
    fs::write(harness.root.path().join("plain.txt"), b"x").expect("fixture file");
    let input = format!(
        "LIST_FILES\n{}\nLIST_FILES\n{}\n",
        harness.path("absent"),
        harness.path("plain.txt"),
    );
    let (result, output) = run(harness.ctx, input);
    result.expect("session should end cleanly");
    assert_eq!(
        response_lines(&output),
        vec!["ERROR:Invalid directory", "ERROR:Invalid directory"]
    );
}

#[rstest]
fn delete_file_removes_files_only(harness: Harness) {
    fs::write(harness.root.path().join("doomed.txt"), b"x").expect("fixture file");
    fs::create_dir(harness.root.path().join("keep")).expect("fixture dir");

    let input = format!(
        "DELETE_FILE\n{}\nDELETE_FILE\n{}\nDELETE_FILE\n{}\n",
        harness.path("doomed.txt"),
        harness.path("keep"),
        harness.path("absent.txt"),
    );
    let (result, output) = run(harness.ctx, input);
    result.expect("session should end cleanly");
    assert_eq!(
        response_lines(&output),
        vec!["DELETE_SUCCESS", "DELETE_INVALID", "DELETE_INVALID"]
    );
    assert!(!fs::exists(harness.root.path().join("doomed.txt")).expect("exists check"));
    assert!(harness.root.path().join("keep").is_dir());
}

#[rstest]
fn rename_moves_existing_entries(harness: Harness) {
    fs::write(harness.root.path().join("old.txt"), b"payload").expect("fixture file");
    let input = format!(
        "RENAME\n{}\n{}\nRENAME\n{}\n{}\n",
        harness.path("old.txt"),
        harness.path("new.txt"),
        harness.path("ghost.txt"),
        harness.path("other.txt"),
    );
    let (result, output) = run(harness.ctx, input);
    result.expect("session should end cleanly");
    assert_eq!(
        response_lines(&output),
        vec!["RENAME_SUCCESS", "RENAME_NOT_FOUND"]
    );
    assert_eq!(
        fs::read(harness.root.path().join("new.txt")).expect("renamed file"),
        b"payload"
    );
}

#[rstest]
fn get_file_frames_header_payload_and_trailer(harness: Harness) {
    // Payload contains a newline: it must be counted, not scanned.
    fs::write(harness.root.path().join("data.bin"), b"hello\nworld").expect("fixture file");
    let input = format!("GET_FILE\n{}\n", harness.path("data.bin"));
    let (result, output) = run(harness.ctx, input);
    result.expect("session should end cleanly");
    assert_eq!(output, b"FILE_START:11\nhello\nworldFILE_END\n");
}

#[rstest]
fn get_file_reports_missing_targets(harness: Harness) {
    let input = format!(
        "GET_FILE\n{}\nGET_FILE\n{}\n",
        harness.path("absent.bin"),
        harness.root_path(),
    );
    let (result, output) = run(harness.ctx, input);
    result.expect("session should end cleanly");
    assert_eq!(
        response_lines(&output),
        vec!["FILE_NOT_FOUND", "FILE_NOT_FOUND"]
    );
}

#[rstest]
fn put_file_receives_the_exact_announced_frame(harness: Harness) {
    let dest = harness.path("incoming/upload.bin");
    let mut input = format!("PUT_FILE\n{dest}\n11\n").into_bytes();
    input.extend_from_slice(b"hello\nworld");
    input.extend_from_slice(b"LIST_DIRS_C\n");

    let (result, output) = run(harness.ctx, input);
    result.expect("session should end cleanly");
    let lines = response_lines(&output);
    assert_eq!(lines[0], "READY_FOR_DATA");
    assert_eq!(lines[1], "FILE_RECEIVED:11");
    assert!(lines[2].starts_with("DIRS:"), "session should continue");
    assert_eq!(
        fs::read(harness.root.path().join("incoming/upload.bin")).expect("uploaded file"),
        b"hello\nworld"
    );
}

#[rstest]
fn put_file_rejects_malformed_sizes_and_continues(harness: Harness) {
    let dest = harness.path("upload.bin");
    let input = format!("PUT_FILE\n{dest}\nnot-a-number\nLIST_DIRS_C\n");
    let (result, output) = run(harness.ctx, input);
    result.expect("session should end cleanly");
    let lines = response_lines(&output);
    assert_eq!(lines[0], "READY_FOR_DATA");
    assert_eq!(lines[1], "ERROR:Invalid file size");
    assert!(lines[2].starts_with("DIRS:"), "session should continue");
}

#[rstest]
fn put_file_truncated_frame_is_fatal_and_keeps_partial_bytes(harness: Harness) {
    let dest = harness.path("partial.bin");
    let mut input = format!("PUT_FILE\n{dest}\n10\n").into_bytes();
    input.extend_from_slice(b"abcd");

    let (result, output) = run(harness.ctx, input);
    assert!(matches!(
        result,
        Err(SessionError::FrameUnderrun {
            expected: 10,
            remaining: 6,
        })
    ));
    assert_eq!(response_lines(&output), vec!["READY_FOR_DATA"]);
    // No rollback: the destination holds exactly what arrived.
    assert_eq!(
        fs::read(harness.root.path().join("partial.bin")).expect("partial file"),
        b"abcd"
    );
}

#[rstest]
fn eof_between_verb_and_arguments_is_fatal(harness: Harness) {
    let (result, output) = run(harness.ctx, "GET_FILE\n");
    assert!(matches!(
        result,
        Err(SessionError::TruncatedCommand { verb: "GET_FILE" })
    ));
    assert!(output.is_empty());
}

#[rstest]
fn toggle_input_flips_the_shared_flag_per_call(harness: Harness) {
    let mut harness = harness;
    let mut peripherals = MockPeripheralPort::new();
    peripherals
        .expect_set_input_blocked()
        .with(eq(true))
        .times(1)
        .returning(|_| Ok(()));
    peripherals
        .expect_set_input_blocked()
        .with(eq(false))
        .times(1)
        .returning(|_| Ok(()));
    harness.ctx.peripherals = Arc::new(peripherals);
    let toggle = harness.ctx.input_block.clone();

    let (result, output) = run(harness.ctx, "TOGGLE_MOUSE_KEYBOARD\nTOGGLE_MOUSE_KEYBOARD\n");
    result.expect("session should end cleanly");
    assert_eq!(
        response_lines(&output),
        vec!["MOUSE_KEYBOARD_BLOCKED", "MOUSE_KEYBOARD_UNBLOCKED"]
    );
    assert!(!toggle.is_blocked());
}

#[rstest]
fn toggle_input_rolls_back_when_the_backend_refuses(harness: Harness) {
    let mut harness = harness;
    let mut peripherals = MockPeripheralPort::new();
    peripherals
        .expect_set_input_blocked()
        .with(eq(true))
        .times(1)
        .returning(|_| Err(PeripheralError::new("no input hook")));
    harness.ctx.peripherals = Arc::new(peripherals);
    let toggle = harness.ctx.input_block.clone();

    let (result, output) = run(harness.ctx, "TOGGLE_MOUSE_KEYBOARD\n");
    result.expect("session should end cleanly");
    assert_eq!(response_lines(&output), vec!["ERROR:no input hook"]);
    assert!(!toggle.is_blocked());
}

#[rstest]
fn toggle_monitor_maps_the_argument_to_power_state(harness: Harness) {
    let mut harness = harness;
    let mut peripherals = MockPeripheralPort::new();
    peripherals
        .expect_set_monitor_power()
        .with(eq(false))
        .times(1)
        .return_const(());
    peripherals
        .expect_set_monitor_power()
        .with(eq(true))
        .times(1)
        .return_const(());
    harness.ctx.peripherals = Arc::new(peripherals);

    let (result, output) = run(
        harness.ctx,
        "TOGGLE_MONITOR\ntrue\nTOGGLE_MONITOR\nfalse\nTOGGLE_MONITOR\nmaybe\n",
    );
    result.expect("session should end cleanly");
    assert_eq!(
        response_lines(&output),
        vec![
            "MONITOR_OFF",
            "MONITOR_ON",
            "ERROR:invalid monitor state: maybe"
        ]
    );
}

#[rstest]
fn list_processes_formats_pid_name_memory_tuples(harness: Harness) {
    let mut harness = harness;
    let mut processes = MockProcessTable::new();
    processes.expect_list().times(1).returning(|| {
        Ok(vec![
            ProcessRecord {
                pid: 1,
                name: "init".to_owned(),
                memory_bytes: 1024,
            },
            ProcessRecord {
                pid: 42,
                name: "hostlinkd".to_owned(),
                memory_bytes: 2048,
            },
        ])
    });
    harness.ctx.processes = Arc::new(processes);

    let (result, output) = run(harness.ctx, "LIST_PROCESSES\n");
    result.expect("session should end cleanly");
    assert_eq!(
        response_lines(&output),
        vec!["PROCESSES:1|init|1024;42|hostlinkd|2048"]
    );
}

#[rstest]
fn kill_process_covers_success_failure_and_unknown(harness: Harness) {
    let mut harness = harness;
    let mut processes = MockProcessTable::new();
    processes
        .expect_terminate()
        .with(eq(7u32))
        .times(1)
        .returning(|_| Ok(0));
    processes
        .expect_terminate()
        .with(eq(8u32))
        .times(1)
        .returning(|_| Ok(137));
    processes
        .expect_terminate()
        .with(eq(999u32))
        .times(1)
        .returning(|pid| Err(ProcessError::NotFound { pid }));
    harness.ctx.processes = Arc::new(processes);

    let (result, output) = run(
        harness.ctx,
        "KILL_PROCESS\n7\nKILL_PROCESS\n8\nKILL_PROCESS\n999\nKILL_PROCESS\nabc\n",
    );
    result.expect("session should end cleanly");
    assert_eq!(
        response_lines(&output),
        vec![
            "PROCESS_KILLED",
            "KILL_FAILED:137",
            "ERROR:no such process: 999",
            "ERROR:invalid pid: abc"
        ]
    );
}

#[rstest]
fn start_process_reports_the_new_pid(harness: Harness) {
    let mut harness = harness;
    let mut processes = MockProcessTable::new();
    processes
        .expect_spawn()
        .with(eq("echo hi"))
        .times(1)
        .returning(|_| Ok(4242));
    harness.ctx.processes = Arc::new(processes);

    let (result, output) = run(harness.ctx, "START_PROCESS\necho hi\n");
    result.expect("session should end cleanly");
    assert_eq!(response_lines(&output), vec!["PROCESS_STARTED:4242"]);
}

#[rstest]
fn show_message_acknowledges_accepted_messages(harness: Harness) {
    let mut harness = harness;
    let mut messages = MockMessagePort::new();
    messages
        .expect_show_message()
        .with(eq("hello operator"))
        .times(1)
        .returning(|_| Ok(()));
    harness.ctx.messages = Arc::new(messages);

    let (result, output) = run(harness.ctx, "SHOW_MESSAGE\nhello operator\n");
    result.expect("session should end cleanly");
    assert_eq!(response_lines(&output), vec!["MESSAGE_SHOWN"]);
}

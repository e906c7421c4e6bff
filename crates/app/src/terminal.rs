//! Line-oriented host for one exam session.

use std::fmt::Write as _;
use std::io::{IsTerminal, Write as _};

use tokio::io::{AsyncBufReadExt, BufReader};

use exam_core::model::{OptionCode, PerformanceLevel, SessionReport};
use exam_core::time::format_clock;
use exam_core::{IntegritySignal, SessionState};
use services::session::QuestionStatus;
use services::{SessionCommand, SessionHandle, SessionView, SignalHub};

pub const HELP: &str = "\
commands:
  start            begin the exam
  a | b | c | d    choose an option
  n / p            next / previous question
  g <number>       go to question <number>
  submit           finish now (asks for confirmation)
  y / back         confirm / return to the questions
  retry            resend a failed submission
  ok               dismiss the integrity warning
  reset            discard this attempt
  quit             leave";

/// DECSET 1004: the terminal reports focus changes as `ESC [ I` / `ESC [ O`.
const FOCUS_REPORTS_ON: &str = "\x1b[?1004h";
const FOCUS_REPORTS_OFF: &str = "\x1b[?1004l";
const FOCUS_GAINED: &str = "\x1b[I";
const FOCUS_LOST: &str = "\x1b[O";

/// Remaining-time announcements, in seconds, besides every full minute.
const FINAL_COUNTDOWN: [u32; 4] = [30, 10, 5, 1];

/// Parse one input line. `None` means the line was not understood.
#[must_use]
pub fn parse_command(line: &str) -> Option<SessionCommand> {
    let line = line.trim().to_ascii_lowercase();
    let mut words = line.split_whitespace();
    let command = match words.next()? {
        "start" => SessionCommand::Start,
        "n" | "next" => SessionCommand::Next,
        "p" | "prev" | "previous" => SessionCommand::Previous,
        "g" | "go" => {
            let number: usize = words.next()?.parse().ok()?;
            SessionCommand::JumpTo(number.checked_sub(1)?)
        }
        "submit" => SessionCommand::RequestConfirmation,
        "y" | "yes" | "confirm" => SessionCommand::Confirm,
        "back" | "cancel" => SessionCommand::CancelConfirmation,
        "retry" => SessionCommand::Retry,
        "ok" => SessionCommand::AcknowledgeWarning,
        "reset" => SessionCommand::Reset,
        "q" | "quit" | "exit" => SessionCommand::Shutdown,
        word => SessionCommand::Select(word.parse::<OptionCode>().ok()?),
    };
    if words.next().is_some() {
        return None;
    }
    Some(command)
}

/// Strip focus reports from an input line. Returns the remaining text and
/// how many times focus was lost.
#[must_use]
pub fn take_focus_reports(line: &str) -> (String, usize) {
    let lost = line.matches(FOCUS_LOST).count();
    let text = line.replace(FOCUS_LOST, "").replace(FOCUS_GAINED, "");
    (text, lost)
}

/// Full screen for the current view.
#[must_use]
pub fn render(view: &SessionView) -> String {
    let mut out = String::new();
    match &view.state {
        SessionState::NotStarted => {
            let _ = writeln!(
                out,
                "{} ({} questions, {}). Type `start` to begin.",
                view.exam_name,
                view.question_count,
                format_clock(view.time_remaining_secs)
            );
        }
        SessionState::InProgress { .. } | SessionState::AwaitingConfirmation { .. } => {
            render_question(&mut out, view);
            if matches!(view.state, SessionState::AwaitingConfirmation { .. }) {
                let _ = writeln!(
                    out,
                    "Submit {} of {} answers? (y / back)",
                    view.progress.answered, view.progress.total
                );
            }
        }
        SessionState::Submitting => {
            let _ = writeln!(out, "Submitting answers...");
        }
        SessionState::Completed { .. } => {
            if let Some(report) = &view.report {
                render_report(&mut out, report);
            }
        }
        SessionState::Failed { kind } => {
            let detail = view.last_error.as_deref().unwrap_or("unknown error");
            let _ = writeln!(out, "Submission failed ({kind:?}): {detail}");
            if kind.is_retryable() {
                let _ = writeln!(out, "Your answers are kept. Type `retry` to send them again.");
            } else {
                let _ = writeln!(out, "Sign in again, then `reset` to start over.");
            }
        }
    }
    if view.warning_active {
        let _ = writeln!(
            out,
            "WARNING: leaving the exam window is recorded. Type `ok` to dismiss."
        );
    }
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "({notice})");
    }
    out
}

fn render_question(out: &mut String, view: &SessionView) {
    let panel: String = view
        .panel
        .iter()
        .map(|entry| match entry.status {
            QuestionStatus::Current => '>',
            QuestionStatus::Answered => '#',
            QuestionStatus::Unanswered => '.',
        })
        .collect();
    let _ = writeln!(
        out,
        "[{}] {}  {}/{} answered  [{panel}]",
        format_clock(view.time_remaining_secs),
        view.exam_name,
        view.progress.answered,
        view.progress.total
    );
    let _ = writeln!(
        out,
        "Q{} of {}: {}",
        view.question_index + 1,
        view.question_count,
        view.prompt
    );
    for option in &view.options {
        let marker = if view.selected == Some(option.code) { '*' } else { ' ' };
        let _ = writeln!(out, " {marker} {}) {}", option.code.label(), option.text);
    }
}

fn render_report(out: &mut String, report: &SessionReport) {
    if report.timed_out() {
        let _ = writeln!(out, "Time's up! Your answers were submitted automatically.");
    }
    let result = &report.result;
    let _ = writeln!(
        out,
        "{}: {:.1} / {:.1} marks ({:.1}%) - {}",
        report.exam_name,
        result.obtained_marks,
        result.total_marks,
        result.percentage,
        report.performance().label()
    );
    let _ = writeln!(
        out,
        "Correct {}  Wrong {}  Answered {}/{}  Time used {}",
        result.correct_answers,
        result.wrong_answers,
        report.answered,
        report.question_count,
        format_clock(report.time_used_secs)
    );
    if report.performance() == PerformanceLevel::NeedsImprovement {
        let _ = writeln!(out, "Review the material and try again.");
    }
}

/// Equal views apart from the clock.
fn same_screen(a: &SessionView, b: &SessionView) -> bool {
    strip_clock(a) == strip_clock(b)
}

fn strip_clock(view: &SessionView) -> SessionView {
    let mut view = view.clone();
    view.time_remaining_secs = 0;
    view.state = match view.state {
        SessionState::InProgress { current_index, .. } => SessionState::InProgress {
            current_index,
            time_remaining_secs: 0,
        },
        SessionState::AwaitingConfirmation { current_index, .. } => {
            SessionState::AwaitingConfirmation {
                current_index,
                time_remaining_secs: 0,
            }
        }
        other => other,
    };
    view
}

fn announce_time(secs: u32) -> bool {
    secs > 0 && (secs % 60 == 0 || FINAL_COUNTDOWN.contains(&secs))
}

/// Read commands from stdin and print the session until it is left.
///
/// Focus losses reported by the terminal are forwarded to `signals`. Stdin is
/// line buffered, so a report is seen together with the next line entered.
///
/// # Errors
///
/// Returns an I/O error if stdin cannot be read.
pub async fn drive(handle: &SessionHandle, signals: &SignalHub) -> std::io::Result<()> {
    let focus_reports = std::io::stdout().is_terminal();
    if focus_reports {
        print!("{FOCUS_REPORTS_ON}");
    }
    let outcome = read_commands(handle, signals).await;
    if focus_reports {
        print!("{FOCUS_REPORTS_OFF}");
        let _ = std::io::stdout().flush();
    }
    outcome
}

async fn read_commands(handle: &SessionHandle, signals: &SignalHub) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut views = handle.view();
    let mut shown = views.borrow_and_update().clone();
    println!("{}", render(&shown));
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let (line, lost) = take_focus_reports(&line);
                for _ in 0..lost {
                    signals.emit(IntegritySignal::FocusLost);
                }
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Some(SessionCommand::Shutdown) => break,
                    Some(command) => {
                        if !handle.send(command).await {
                            break;
                        }
                    }
                    None => println!("{HELP}"),
                }
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if !same_screen(&shown, &view) {
                    print!("{}", render(&view));
                } else if view.time_remaining_secs != shown.time_remaining_secs
                    && announce_time(view.time_remaining_secs)
                {
                    println!("{} remaining", format_clock(view.time_remaining_secs));
                }
                shown = view;
            }
        }
    }
    Ok(())
}

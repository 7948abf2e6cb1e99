//! Terminal front end: a `View` that prints to stdout and the command parser
//! for the `hq` binary.

use hq_core::model::{Leaderboard, Message, Origin, ScoreOutcome};
use hq_core::view::{CaptureStatus, Feedback, OptionMark, QuizDisplay, Screen, View};

/// Renders everything as plain lines on stdout.
#[derive(Debug, Default)]
pub struct ConsoleView;

impl ConsoleView {
    pub fn new() -> Self {
        Self
    }
}

impl View for ConsoleView {
    fn show_screen(&self, screen: Screen) {
        match screen {
            Screen::SignedOut => println!("== Signed out. Use `login <name>` to save scores. =="),
            Screen::Dashboard => println!("== HQ dashboard =="),
        }
    }

    fn append_message(&self, message: &Message) {
        let speaker = match message.origin {
            Origin::Visitor => "you",
            Origin::System => "HQ",
        };
        println!("[{speaker}] {}", message.text);
    }

    fn render_capture_status(&self, status: CaptureStatus) {
        println!("(mic) {}", status.label());
    }

    fn render_quiz(&self, quiz: &QuizDisplay) {
        for line in quiz_lines(quiz) {
            println!("{line}");
        }
    }

    fn render_feedback(&self, feedback: &Feedback) {
        println!("{}", feedback.message());
    }

    fn render_score(&self, outcome: &ScoreOutcome) {
        println!("{}", outcome.message());
    }

    fn show_next_round(&self) {
        println!("Next Scenario: type `quiz`");
    }

    fn render_leaderboard(&self, board: &Leaderboard) {
        println!("-- Leaderboard --");
        for line in board.lines() {
            println!("  {line}");
        }
    }

    fn notify(&self, text: &str) {
        println!("! {text}");
    }
}

fn quiz_lines(quiz: &QuizDisplay) -> Vec<String> {
    match quiz {
        QuizDisplay::Loading => vec![QuizDisplay::LOADING_TEXT.to_string()],
        QuizDisplay::Invalid => vec![
            QuizDisplay::INVALID_TEXT.to_string(),
            "Type `quiz` to retry.".to_string(),
        ],
        QuizDisplay::Offline => vec![QuizDisplay::OFFLINE_TEXT.to_string()],
        QuizDisplay::Round { question, options } => {
            let mut lines = vec![question.clone()];
            for (idx, option) in options.iter().enumerate() {
                let marker = match option.mark {
                    Some(OptionMark::Correct) => " [correct]",
                    Some(OptionMark::Wrong) => " [wrong]",
                    None => "",
                };
                let bullet = if option.enabled {
                    format!("{}.", idx + 1)
                } else {
                    "-".to_string()
                };
                lines.push(format!("  {bullet} {}{marker}", option.label));
            }
            lines
        }
    }
}

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Record,
    Stop,
    Quiz,
    /// Zero-based option index; typed one-based.
    Answer(usize),
    Leaderboard,
    Login(String),
    Logout,
    Help,
    Quit,
}

impl Command {
    pub const HELP: &'static str = "commands: ask <text> | record | stop | quiz | answer <n> | \
        leaderboard | login <name> | logout | help | quit";

    /// Parses a line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "ask" if !rest.is_empty() => Command::Ask(rest.to_string()),
            "ask" => return Err("usage: ask <text>".to_string()),
            "record" => Command::Record,
            "stop" => Command::Stop,
            "quiz" | "next" => Command::Quiz,
            "answer" => {
                let n: usize = rest
                    .parse()
                    .map_err(|_| "usage: answer <n>, starting at 1".to_string())?;
                if n == 0 {
                    return Err("options are numbered from 1".to_string());
                }
                Command::Answer(n - 1)
            }
            "leaderboard" => Command::Leaderboard,
            "login" if !rest.is_empty() => Command::Login(rest.to_string()),
            "login" => return Err("usage: login <name>".to_string()),
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            // Anything else is a question.
            _ => Command::Ask(line.to_string()),
        };
        Ok(Some(command))
    }
}

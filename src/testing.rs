//! Test doubles for the runner, prompter and notifier seams.

use crate::error::{Result, ShovelError};
use crate::notify::{Notification, Notifier};
use crate::prompt::Prompter;
use crate::runner::{CommandOutput, Runner};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

/// Runner that records every command line and answers from a script.
///
/// Commands are keyed by `cmd arg1 arg2 ...`. Unknown commands succeed with
/// empty output.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<String>>,
    responses: HashMap<String, String>,
    failures: HashSet<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `command` print `stdout`.
    pub fn respond(mut self, command: &str, stdout: &str) -> Self {
        self.responses.insert(command.to_string(), stdout.to_string());
        self
    }

    /// Make `command` exit non-zero.
    pub fn fail_on(mut self, command: &str) -> Self {
        self.failures.insert(command.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn ran(&self, command: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == command)
    }

    pub fn ran_matching(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, cmd: &str, args: &[&str]) -> String {
        let line = std::iter::once(cmd)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.borrow_mut().push(line.clone());
        line
    }
}

impl Runner for RecordingRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<bool> {
        let line = self.record(cmd, args);
        Ok(!self.failures.contains(&line))
    }

    fn capture(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let line = self.record(cmd, args);
        let success = !self.failures.contains(&line);
        Ok(CommandOutput {
            success,
            stdout: self.responses.get(&line).cloned().unwrap_or_default(),
            stderr: if success {
                String::new()
            } else {
                "scripted failure".to_string()
            },
        })
    }
}

/// One scripted operator answer.
#[derive(Debug, Clone)]
pub enum Answer {
    Pick(String),
    Confirm(bool),
    Text(String),
    Select(usize),
    Eof,
}

/// Prompter answering from a fixed script, in order.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, message: &str) -> Result<Answer> {
        self.asked.push(message.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| ShovelError::Prompt(format!("no scripted answer for {message:?}")))
    }

    fn unexpected(message: &str, answer: &Answer) -> ShovelError {
        ShovelError::Prompt(format!("unexpected answer {answer:?} for {message:?}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn pick_file(&mut self, message: &str, _candidates: &[String]) -> Result<String> {
        match self.next(message)? {
            Answer::Pick(path) => Ok(path),
            other => Err(Self::unexpected(message, &other)),
        }
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        match self.next(message)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(Self::unexpected(message, &other)),
        }
    }

    fn input(&mut self, message: &str) -> Result<String> {
        match self.next(message)? {
            Answer::Text(text) => Ok(text),
            other => Err(Self::unexpected(message, &other)),
        }
    }

    fn select(&mut self, message: &str, _items: &[String]) -> Result<usize> {
        match self.next(message)? {
            Answer::Select(index) => Ok(index),
            other => Err(Self::unexpected(message, &other)),
        }
    }

    fn command_line(&mut self, message: &str) -> Result<Option<String>> {
        match self.next(message)? {
            Answer::Text(text) => Ok(Some(text)),
            Answer::Eof => Ok(None),
            other => Err(Self::unexpected(message, &other)),
        }
    }
}

/// Notifier that keeps every notification, optionally failing.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<Notification>>,
    pub fail: bool,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        if self.fail {
            return Err(ShovelError::Notification("connection refused".to_string()));
        }
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

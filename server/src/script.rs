//! Script source handling and the script engine contract
//!
//! The engine that compiles and runs scripts lives outside this crate. Levels
//! and weapons only split authored source into its server and client halves,
//! prepare the inline form older clients execute, queue deferred actions, and
//! call the engine through [`ScriptEngine`].

use crate::level::PlayerId;
use shared::SCRIPT_LINE_SEPARATOR;
use std::collections::VecDeque;
use std::fmt;

/// Marks the start of the client half of a script
pub const CLIENTSIDE_MARKER: &str = "//#CLIENTSIDE";

/// Authored script text split into server and client halves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCode {
    source: String,
    split: Option<usize>,
}

impl SourceCode {
    pub fn new(source: String) -> Self {
        let split = source.find(CLIENTSIDE_MARKER);
        Self { source, split }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Code before the marker. Without a marker nothing runs on the server.
    pub fn server_side(&self) -> &str {
        match self.split {
            Some(split) => &self.source[..split],
            None => "",
        }
    }

    /// Code after the marker, or the whole source when there is none.
    pub fn client_side(&self) -> &str {
        match self.split {
            Some(split) => &self.source[split + CLIENTSIDE_MARKER.len()..],
            None => &self.source,
        }
    }
}

/// Strips `//` and `/* */` comments, leaving string literals intact.
pub fn remove_comments(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        let next = chars.peek().copied();
        match (c, next) {
            ('"' | '\'', _) => {
                quote = Some(c);
                out.push(c);
            }
            ('/', Some('/')) => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Inline script form embedded in legacy packets: comments removed, each
/// non-empty line trimmed and terminated by the client line separator.
pub fn format_client_script(raw: &str) -> Vec<u8> {
    let stripped = remove_comments(raw);
    let mut formatted = Vec::with_capacity(stripped.len());
    for line in stripped.lines().map(str::trim).filter(|line| !line.is_empty()) {
        formatted.extend_from_slice(line.as_bytes());
        formatted.push(SCRIPT_LINE_SEPARATOR);
    }
    formatted
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Contract of the external script engine.
///
/// Only `compile` is required; the lifecycle hooks default to no-ops.
pub trait ScriptEngine: Send + Sync {
    fn compile(
        &self,
        source: &str,
        kind: &str,
        name: &str,
        is_weapon: bool,
    ) -> Result<Vec<u8>, Vec<CompileError>>;

    /// Drops cached compiled state for a script owner.
    fn release(&self, _name: &str, _server_script: &str) {}

    /// Schedules the owner's queued actions for execution.
    fn register_update(&self, _name: &str) {}

    fn unregister_update(&self, _name: &str) {}
}

/// Engine used when no compiler is available. Every compile fails, so
/// weapons stay on the inline script path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompiler;

impl ScriptEngine for NoCompiler {
    fn compile(
        &self,
        _source: &str,
        _kind: &str,
        _name: &str,
        _is_weapon: bool,
    ) -> Result<Vec<u8>, Vec<CompileError>> {
        Err(vec![CompileError {
            line: 0,
            message: "no script compiler available".to_string(),
        }])
    }
}

/// Deferred event for a scriptable entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptAction {
    pub event: String,
    pub player: Option<PlayerId>,
    pub args: String,
}

/// FIFO of actions waiting for the engine. The engine drains it; owners
/// clear it on teardown.
#[derive(Debug, Clone, Default)]
pub struct ActionQueue {
    actions: VecDeque<ScriptAction>,
}

impl ActionQueue {
    pub fn push(&mut self, action: ScriptAction) {
        self.actions.push_back(action);
    }

    pub fn pop(&mut self) -> Option<ScriptAction> {
        self.actions.pop_front()
    }

    pub fn drain(&mut self) -> Vec<ScriptAction> {
        self.actions.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_split() {
        let source = SourceCode::new("function onCreated() {}\n//#CLIENTSIDE\nplay x;\n".into());
        assert_eq!(source.server_side(), "function onCreated() {}\n");
        assert_eq!(source.client_side(), "\nplay x;\n");
    }

    #[test]
    fn test_source_without_marker_is_client_only() {
        let source = SourceCode::new("if (playertouchsme) say 1;".into());
        assert_eq!(source.server_side(), "");
        assert_eq!(source.client_side(), "if (playertouchsme) say 1;");
    }

    #[test]
    fn test_remove_comments() {
        let code = "a = 1; // set a\n/* block\ncomment */b = \"//not a comment\";\nc = '/*';";
        assert_eq!(
            remove_comments(code),
            "a = 1; \nb = \"//not a comment\";\nc = '/*';"
        );
    }

    #[test]
    fn test_format_client_script() {
        let formatted = format_client_script("  if (created) {\n\n    // hello\n    x = 1;\n  }\n");
        let expected: Vec<u8> = [&b"if (created) {"[..], &b"x = 1;"[..], &b"}"[..]]
            .iter()
            .flat_map(|line| line.iter().copied().chain(std::iter::once(0xa7)))
            .collect();
        assert_eq!(formatted, expected);
    }

    #[test]
    fn test_format_empty_script() {
        assert!(format_client_script("// nothing here\n").is_empty());
    }

    #[test]
    fn test_action_queue_fifo() {
        let mut queue = ActionQueue::default();
        for event in ["first", "second"] {
            queue.push(ScriptAction {
                event: event.to_string(),
                player: None,
                args: String::new(),
            });
        }
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().event, "first");
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_no_compiler_fails() {
        let result = NoCompiler.compile("x = 1;", "weapon", "Bow", true);
        assert!(result.is_err());
    }
}

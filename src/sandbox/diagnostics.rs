//! Reduce raw stderr to a short, user-presentable diagnostic.

use regex::Regex;
use std::sync::OnceLock;

/// Marker emitted by the sandbox image ahead of compiler output.
const COMPILE_MARKER: &str = "Compilation Error";

/// Classified stderr text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// Compiler rejection; carries `"Compilation Error: <file>:<line>: error: <msg>"`
    Compile(String),
    /// Runtime failure; carries the first lines of the stack trace
    Runtime(String),
}

impl Diagnostic {
    pub fn message(&self) -> &str {
        match self {
            Diagnostic::Compile(text) | Diagnostic::Runtime(text) => text,
        }
    }
}

fn compile_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // First `<file>.java:<line>: error: ...` span, up to the caret line.
    RE.get_or_init(|| Regex::new(r"(?s)(\w+\.java:\d+: error:.+?)(?:\n\s*\^|$)").unwrap())
}

/// Classify raw stderr into a compile or runtime diagnostic.
///
/// Text starting with the compilation marker is narrowed to the first
/// file/line error span. Anything else is treated as a runtime trace and cut
/// to its first three non-blank lines, enough to identify the exception type
/// and throw site. If nothing usable remains, the raw text passes through.
pub fn classify(stderr: &str) -> Diagnostic {
    if stderr.starts_with(COMPILE_MARKER) {
        if let Some(captures) = compile_span().captures(stderr) {
            let span = captures[1].trim().to_string();
            return Diagnostic::Compile(format!("{}: {}", COMPILE_MARKER, span));
        }
        return Diagnostic::Compile(first_lines(stderr));
    }
    Diagnostic::Runtime(first_lines(stderr))
}

/// First three non-blank lines, joined with newlines; raw text when every
/// line is blank.
pub fn excerpt(text: &str) -> String {
    first_lines(text)
}

fn first_lines(text: &str) -> String {
    let mut result = String::new();
    let mut count = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        result.push_str(line);
        result.push('\n');
        count += 1;
        if count >= 3 {
            break;
        }
    }
    if result.is_empty() {
        return text.to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_span_is_extracted() {
        let stderr = "Compilation Error\nMain.java:3: error: ';' expected\n        System.out.println(\"hi\")\n                                 ^\n1 error\n";
        let diag = classify(stderr);
        assert_eq!(
            diag,
            Diagnostic::Compile(
                "Compilation Error: Main.java:3: error: ';' expected\n        System.out.println(\"hi\")"
                    .to_string()
            )
        );
    }

    #[test]
    fn runtime_trace_is_cut_to_three_lines() {
        let stderr = "Exception in thread \"main\" java.lang.ArithmeticException: / by zero\n\tat Main.divide(Main.java:7)\n\tat Main.main(Main.java:3)\n\tat jdk.internal.reflect.DirectMethodHandleAccessor.invoke(Unknown Source)\n";
        match classify(stderr) {
            Diagnostic::Runtime(text) => {
                assert_eq!(text.lines().count(), 3);
                assert!(text.starts_with("Exception in thread"));
                assert!(text.contains("Main.divide"));
                assert!(!text.contains("DirectMethodHandleAccessor"));
            }
            other => panic!("unexpected diagnostic: {:?}", other),
        }
    }

    #[test]
    fn blank_lines_are_skipped() {
        let stderr = "\n\njava.lang.NullPointerException\n\n\tat Main.main(Main.java:2)\n";
        match classify(stderr) {
            Diagnostic::Runtime(text) => {
                assert_eq!(text.lines().count(), 2);
                assert!(text.starts_with("java.lang.NullPointerException"));
            }
            other => panic!("unexpected diagnostic: {:?}", other),
        }
    }

    #[test]
    fn all_blank_text_passes_through() {
        let stderr = "  \n\t\n";
        assert_eq!(classify(stderr), Diagnostic::Runtime(stderr.to_string()));
    }

    #[test]
    fn marker_without_span_falls_back_to_lines() {
        let stderr = "Compilation Error\nsomething went wrong\n";
        match classify(stderr) {
            Diagnostic::Compile(text) => assert!(text.contains("something went wrong")),
            other => panic!("unexpected diagnostic: {:?}", other),
        }
    }
}

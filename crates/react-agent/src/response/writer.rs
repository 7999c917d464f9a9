//! Canonical XML form of a turn
//!
//! Arguments are always written as `<arg><name/><value/></arg>` pairs and a
//! structured thought always carries both step lists, so anything written here
//! reads back unchanged. Values with leading or trailing whitespace go into
//! CDATA so the readers do not mistake it for indentation.

use std::fmt::Write;

use quick_xml::escape::escape;

use super::{Action, Decision, Step, StructuredResponse, Thought};

const INDENT: &str = "  ";

/// Serialize a response to the wire XML the model is asked to produce
pub fn to_xml(response: &StructuredResponse) -> String {
    let mut out = String::from("<response>\n");
    write_thought(&mut out, &response.thought, 1);
    match &response.decision {
        Decision::Act(action) => write_action(&mut out, action, 1),
        Decision::Answer(answer) => leaf(&mut out, 1, "final_answer", answer),
    }
    out.push_str("</response>");
    out
}

/// Serialize a step list wrapped in `<tag>`
pub fn write_steps(tag: &str, steps: &[Step]) -> String {
    let mut out = String::new();
    push_steps(&mut out, tag, steps, 0);
    out
}

fn write_thought(out: &mut String, thought: &Thought, depth: usize) {
    match thought {
        Thought::Text(text) => leaf(out, depth, "thought", text),
        Thought::Structured(plan) => {
            open(out, depth, "thought");
            leaf(out, depth + 1, "reasoning", &plan.reasoning);
            push_steps(out, "to_do", &plan.to_do, depth + 1);
            push_steps(out, "done", &plan.done, depth + 1);
            close(out, depth, "thought");
        }
    }
}

fn write_action(out: &mut String, action: &Action, depth: usize) {
    open(out, depth, "action");
    leaf(out, depth + 1, "tool_name", &action.tool_name);
    leaf(out, depth + 1, "reason", &action.reason);
    if let Some(step_name) = &action.step_name {
        leaf(out, depth + 1, "step_name", step_name);
    }
    if action.arguments.is_empty() {
        empty(out, depth + 1, "arguments");
    } else {
        open(out, depth + 1, "arguments");
        for (name, value) in &action.arguments {
            open(out, depth + 2, "arg");
            leaf(out, depth + 3, "name", name);
            leaf(out, depth + 3, "value", value);
            close(out, depth + 2, "arg");
        }
        close(out, depth + 1, "arguments");
    }
    close(out, depth, "action");
}

fn push_steps(out: &mut String, tag: &str, steps: &[Step], depth: usize) {
    if steps.is_empty() {
        empty(out, depth, tag);
        return;
    }
    open(out, depth, tag);
    for step in steps {
        open(out, depth + 1, "step");
        leaf(out, depth + 2, "name", &step.name);
        leaf(out, depth + 2, "description", &step.description);
        leaf(out, depth + 2, "reason", &step.reason);
        if let Some(result) = &step.result {
            leaf(out, depth + 2, "result", result);
        }
        if !step.depends_on_steps.is_empty() {
            open(out, depth + 2, "depends_on_steps");
            for name in &step.depends_on_steps {
                leaf(out, depth + 3, "step_name", name);
            }
            close(out, depth + 2, "depends_on_steps");
        }
        close(out, depth + 1, "step");
    }
    close(out, depth, tag);
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn open(out: &mut String, depth: usize, tag: &str) {
    indent(out, depth);
    let _ = writeln!(out, "<{tag}>");
}

fn close(out: &mut String, depth: usize, tag: &str) {
    indent(out, depth);
    let _ = writeln!(out, "</{tag}>");
}

fn empty(out: &mut String, depth: usize, tag: &str) {
    indent(out, depth);
    let _ = writeln!(out, "<{tag}/>");
}

fn leaf(out: &mut String, depth: usize, tag: &str, text: &str) {
    indent(out, depth);
    if text.trim() == text {
        let _ = writeln!(out, "<{tag}>{}</{tag}>", escape(text));
    } else {
        let _ = writeln!(out, "<{tag}>{}</{tag}>", cdata(text));
    }
}

/// A CDATA section cannot contain `]]>`, so that sequence is split across two
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{Plan, ResponseParser};

    #[test]
    fn test_escapes_text() {
        let response = StructuredResponse::answer(Thought::Text("a < b".into()), "Tom & Jerry");
        let xml = to_xml(&response);
        assert!(xml.contains("<thought>a &lt; b</thought>"));
        assert!(xml.contains("<final_answer>Tom &amp; Jerry</final_answer>"));
    }

    #[test]
    fn test_canonical_argument_form() {
        let response = StructuredResponse::act(
            Thought::Text("t".into()),
            Action::new("ECHO", "r").with_argument("text", "hi"),
        );
        let xml = to_xml(&response);
        assert!(xml.contains("<arg>"));
        assert!(xml.contains("<name>text</name>"));
        assert!(xml.contains("<value>hi</value>"));
    }

    #[test]
    fn test_edge_whitespace_goes_into_cdata() {
        let mut out = String::new();
        leaf(&mut out, 0, "value", "  x ]]> y\n");
        assert_eq!(out, "<value><![CDATA[  x ]]]]><![CDATA[> y\n]]></value>\n");

        let mut out = String::new();
        leaf(&mut out, 0, "value", "a ]]> b");
        assert_eq!(out, "<value>a ]]&gt; b</value>\n");
    }

    #[test]
    fn test_round_trip_keeps_value_whitespace() {
        let response = StructuredResponse::act(
            Thought::Text("  write the file".into()),
            Action::new("FILE_WRITER", "save")
                .with_argument("content", "    indented()\n")
                .with_argument("path", "out.py")
                .with_argument("blank", "   "),
        );
        let xml = to_xml(&response);
        let parser = ResponseParser::new(["file_writer"]);

        assert_eq!(parser.parse_strict(&xml).unwrap(), response);
        assert_eq!(parser.parse_lenient(&xml).unwrap(), response);
        assert_eq!(parser.parse(&xml).unwrap(), response);
    }

    #[test]
    fn test_write_steps_empty_list() {
        assert_eq!(write_steps("done", &[]), "<done/>\n");
    }

    #[test]
    fn test_round_trip_structured_action() {
        let response = StructuredResponse::act(
            Thought::Structured(Plan {
                reasoning: "Fetch then summarize".into(),
                to_do: vec![Step::new("summary", "Summarize the page", "User asked")
                    .with_dependency("page")],
                done: vec![Step::new("page", "Fetch the page", "Need content").with_result("<html> & co")],
            }),
            Action::new("SHELL_COMMAND", "Count words")
                .with_step_name("summary")
                .with_argument("command", "wc -w < page.txt && echo done")
                .with_argument("timeout", "30"),
        );

        let parser = ResponseParser::new(["shell_command"]);
        let parsed = parser.parse_strict(&to_xml(&response)).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_round_trip_answer() {
        let response = StructuredResponse::answer(
            Thought::Structured(Plan {
                reasoning: "All done".into(),
                to_do: Vec::new(),
                done: vec![Step::new("a", "d", "r").with_result("X")],
            }),
            "The answer is X",
        );

        let parser = ResponseParser::new(Vec::<String>::new());
        assert_eq!(parser.parse(&to_xml(&response)).unwrap(), response);
    }
}

//! Structural rules that turn an element tree into a [`StructuredResponse`]
//!
//! Both readers feed the same rules. The strict reader looks up direct
//! children only; the lenient reader searches descendants and accepts a few
//! alias tags, because a recovered tree may have elements nested under an
//! unclosed sibling.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::tree::XmlElement;
use super::{Action, Plan, Step, StructuredResponse, Thought};

/// A well-formed document that does not describe a valid turn
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("root element must be <response>, found <{0}>")]
    UnexpectedRoot(String),

    #[error("unexpected element <{0}> in <response>")]
    UnexpectedElement(String),

    #[error("missing required element <{0}>")]
    MissingElement(&'static str),

    #[error("element <{0}> must not be empty")]
    EmptyElement(&'static str),

    #[error("response must contain either <action> or <final_answer>")]
    MissingDecision,

    #[error("response must contain exactly one <action> or <final_answer>, found {actions} and {answers}")]
    AmbiguousDecision { actions: usize, answers: usize },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("step {position} is missing <{field}>")]
    MissingStepField { position: usize, field: &'static str },

    #[error("malformed argument: {0}")]
    MalformedArgument(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    Children,
    Descendants,
}

const TOP_LEVEL: &[&str] = &["thought", "action", "final_answer", "answer"];
const FINAL_ANSWER: &[&str] = &["final_answer", "answer"];
const DECISION: &[&str] = &["action", "final_answer", "answer"];
const REASONING_STOP: &[&str] = &["to_do", "done", "action", "final_answer", "answer"];
const PLAN_LISTS: &[&str] = &["to_do", "done"];

pub(crate) fn interpret(
    root: &XmlElement,
    lookup: Lookup,
    tools: &BTreeSet<String>,
) -> Result<StructuredResponse, ValidationError> {
    if !root.is("response") {
        return Err(ValidationError::UnexpectedRoot(root.name.clone()));
    }
    if let Some(unknown) = root.elements().find(|el| !el.is_any(TOP_LEVEL)) {
        return Err(ValidationError::UnexpectedElement(unknown.name.clone()));
    }

    let rules = Rules { lookup, tools };
    let thought = rules.thought(root)?;

    let mut actions = Vec::new();
    let mut answers = Vec::new();
    rules.decisions(root, &mut actions, &mut answers);

    match (actions.as_slice(), answers.as_slice()) {
        ([], []) => Err(ValidationError::MissingDecision),
        ([action], []) => Ok(StructuredResponse::act(thought, rules.action(action)?)),
        ([], [answer]) => {
            let text = answer.text();
            if text.is_empty() {
                return Err(ValidationError::EmptyElement("final_answer"));
            }
            Ok(StructuredResponse::answer(thought, text))
        }
        _ => Err(ValidationError::AmbiguousDecision {
            actions: actions.len(),
            answers: answers.len(),
        }),
    }
}

struct Rules<'a> {
    lookup: Lookup,
    tools: &'a BTreeSet<String>,
}

impl Rules<'_> {
    fn lenient(&self) -> bool {
        self.lookup == Lookup::Descendants
    }

    fn find<'e>(&self, parent: &'e XmlElement, names: &[&str]) -> Option<&'e XmlElement> {
        match self.lookup {
            Lookup::Children => parent.child(names),
            Lookup::Descendants => parent.descendant(names),
        }
    }

    /// Collect decision elements without looking inside one, so an argument
    /// named `answer` is not taken for a final answer
    fn decisions<'e>(
        &self,
        parent: &'e XmlElement,
        actions: &mut Vec<&'e XmlElement>,
        answers: &mut Vec<&'e XmlElement>,
    ) {
        for el in parent.elements() {
            if el.is("action") {
                actions.push(el);
            } else if el.is_any(FINAL_ANSWER) {
                answers.push(el);
            } else if self.lenient() {
                self.decisions(el, actions, answers);
            }
        }
    }

    /// Tag names for a field, with the lenient aliases when applicable
    fn names(&self, strict: &'static [&'static str], lenient: &'static [&'static str]) -> &'static [&'static str] {
        if self.lenient() {
            lenient
        } else {
            strict
        }
    }

    fn thought(&self, root: &XmlElement) -> Result<Thought, ValidationError> {
        let thought = self
            .find(root, &["thought"])
            .ok_or(ValidationError::MissingElement("thought"))?;

        let reasoning = self.find(thought, &["reasoning"]);
        let to_do = self.find(thought, &["to_do"]);
        let done = self.find(thought, &["done"]);

        if reasoning.is_none() && to_do.is_none() && done.is_none() {
            let text = if self.lenient() {
                thought.text_excluding(DECISION)
            } else {
                thought.text()
            };
            if text.is_empty() {
                return Err(ValidationError::EmptyElement("thought"));
            }
            return Ok(Thought::Text(text));
        }

        Ok(Thought::Structured(Plan {
            reasoning: reasoning
                .map(|el| el.text_excluding(REASONING_STOP))
                .unwrap_or_default(),
            to_do: self.steps(to_do)?,
            done: self.steps(done)?,
        }))
    }

    fn steps(&self, list: Option<&XmlElement>) -> Result<Vec<Step>, ValidationError> {
        let mut elements = Vec::new();
        if let Some(list) = list {
            self.collect_steps(list, &mut elements);
        }
        elements
            .into_iter()
            .enumerate()
            .map(|(i, el)| self.step(el, i + 1))
            .collect()
    }

    fn collect_steps<'e>(&self, parent: &'e XmlElement, out: &mut Vec<&'e XmlElement>) {
        for el in parent.elements() {
            if el.is("step") {
                out.push(el);
                if self.lenient() {
                    self.collect_steps(el, out);
                }
            } else if self.lenient() && !el.is_any(PLAN_LISTS) {
                self.collect_steps(el, out);
            }
        }
    }

    fn step(&self, el: &XmlElement, position: usize) -> Result<Step, ValidationError> {
        let field = |names: &[&str], field: &'static str| {
            self.find(el, names)
                .map(XmlElement::text)
                .ok_or(ValidationError::MissingStepField { position, field })
        };

        let name = field(self.names(&["name"], &["name", "n"]), "name")?;
        if name.is_empty() {
            return Err(ValidationError::MissingStepField { position, field: "name" });
        }

        let mut step = Step::new(
            name,
            field(&["description"], "description")?,
            field(&["reason"], "reason")?,
        );
        step.result = self
            .find(el, self.names(&["result"], &["result", "r"]))
            .map(XmlElement::text);

        if let Some(deps) = self.find(el, self.names(&["depends_on_steps"], &["depends_on_steps", "depends_on"])) {
            let mut names = Vec::new();
            self.collect_step_names(deps, &mut names);
            step.depends_on_steps = names;
        }

        Ok(step)
    }

    fn collect_step_names(&self, parent: &XmlElement, out: &mut Vec<String>) {
        for el in parent.elements() {
            if el.is("step_name") {
                let text = el.text();
                if !text.is_empty() {
                    out.push(text);
                }
            }
            if self.lenient() {
                self.collect_step_names(el, out);
            }
        }
    }

    fn action(&self, el: &XmlElement) -> Result<Action, ValidationError> {
        let tool_name = self
            .find(el, &["tool_name"])
            .ok_or(ValidationError::MissingElement("tool_name"))?
            .text();
        if tool_name.is_empty() {
            return Err(ValidationError::EmptyElement("tool_name"));
        }
        if !self.tools.contains(&tool_name.to_uppercase()) {
            return Err(ValidationError::UnknownTool(tool_name));
        }

        let reason = self
            .find(el, &["reason"])
            .ok_or(ValidationError::MissingElement("reason"))?
            .text();

        let mut action = Action::new(tool_name, reason);
        action.step_name = self
            .find(el, &["step_name"])
            .map(XmlElement::text)
            .filter(|name| !name.is_empty());

        if let Some(arguments) = self.find(el, &["arguments"]) {
            self.arguments(arguments, &mut action.arguments)?;
        }
        if let Some(input) = self.find(el, &["input"]) {
            action
                .arguments
                .entry("input".to_string())
                .or_insert_with(|| input.text());
        }

        Ok(action)
    }

    fn arguments(
        &self,
        arguments: &XmlElement,
        out: &mut BTreeMap<String, String>,
    ) -> Result<(), ValidationError> {
        for child in arguments.elements() {
            if child.is("arg") {
                self.arg_pair(child, out)?;
            } else {
                out.insert(child.name.clone(), child.text());
            }
        }
        Ok(())
    }

    fn arg_pair(&self, arg: &XmlElement, out: &mut BTreeMap<String, String>) -> Result<(), ValidationError> {
        let name = arg
            .child(self.names(&["name"], &["name", "n"]))
            .map(XmlElement::text)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ValidationError::MalformedArgument("<arg> without <name>".to_string()))?;
        let value = arg
            .child(&["value"])
            .map(|value| value.text_excluding(&["arg"]))
            .ok_or_else(|| ValidationError::MalformedArgument(format!("argument '{name}' has no <value>")))?;
        out.insert(name, value);

        // An unclosed <arg> swallows the ones after it
        if self.lenient() {
            let mut nested = Vec::new();
            nearest_args(arg, &mut nested);
            for el in nested {
                self.arg_pair(el, out)?;
            }
        }
        Ok(())
    }
}

fn nearest_args<'e>(parent: &'e XmlElement, out: &mut Vec<&'e XmlElement>) {
    for el in parent.elements() {
        if el.is("arg") {
            out.push(el);
        } else {
            nearest_args(el, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{lenient, strict};

    fn tools() -> BTreeSet<String> {
        ["ECHO", "SHELL_COMMAND"].iter().map(|s| s.to_string()).collect()
    }

    fn read_strict(xml: &str) -> Result<StructuredResponse, ValidationError> {
        interpret(&strict::parse(xml).unwrap(), Lookup::Children, &tools())
    }

    fn read_lenient(xml: &str) -> Result<StructuredResponse, ValidationError> {
        interpret(&lenient::parse(xml).unwrap(), Lookup::Descendants, &tools())
    }

    #[test]
    fn test_text_thought_with_answer() {
        let response = read_strict("<response><thought>math</thought><final_answer>4</final_answer></response>").unwrap();
        assert_eq!(response.thought, Thought::Text("math".into()));
        assert_eq!(response.final_answer(), Some("4"));
    }

    #[test]
    fn test_structured_thought() {
        let response = read_strict(
            "<response><thought><reasoning>plan</reasoning>\
             <to_do><step><name>b</name><description>d</description><reason>r</reason>\
             <depends_on_steps><step_name>a</step_name></depends_on_steps></step></to_do>\
             <done><step><name>a</name><description>d</description><reason>r</reason><result>X</result></step></done>\
             </thought><final_answer>ok</final_answer></response>",
        )
        .unwrap();
        assert_eq!(response.thought.reasoning(), "plan");
        assert_eq!(response.thought.to_do()[0].depends_on_steps, vec!["a".to_string()]);
        assert_eq!(response.thought.done()[0].result.as_deref(), Some("X"));
    }

    #[test]
    fn test_both_argument_shapes() {
        let pairs = read_strict(
            "<response><thought>t</thought><action><tool_name>echo</tool_name><reason>r</reason>\
             <arguments><arg><name>text</name><value>hi</value></arg></arguments></action></response>",
        )
        .unwrap();
        let named = read_strict(
            "<response><thought>t</thought><action><tool_name>echo</tool_name><reason>r</reason>\
             <arguments><text>hi</text></arguments></action></response>",
        )
        .unwrap();
        assert_eq!(pairs.action().unwrap().arguments["text"], "hi");
        assert_eq!(pairs, named);
    }

    #[test]
    fn test_input_shorthand() {
        let response = read_strict(
            "<response><thought>t</thought><action><tool_name>ECHO</tool_name><reason>r</reason>\
             <input>hello</input></action></response>",
        )
        .unwrap();
        assert_eq!(response.action().unwrap().arguments["input"], "hello");
    }

    #[test]
    fn test_validation_failures() {
        assert_eq!(
            read_strict("<reply><thought>t</thought></reply>"),
            Err(ValidationError::UnexpectedRoot("reply".into()))
        );
        assert_eq!(
            read_strict("<response><thought>t</thought></response>"),
            Err(ValidationError::MissingDecision)
        );
        assert_eq!(
            read_strict("<response><final_answer>4</final_answer></response>"),
            Err(ValidationError::MissingElement("thought"))
        );
        assert_eq!(
            read_strict("<response><thought>t</thought><extra/><final_answer>4</final_answer></response>"),
            Err(ValidationError::UnexpectedElement("extra".into()))
        );
        assert_eq!(
            read_strict(
                "<response><thought>t</thought><action><reason>r</reason></action></response>"
            ),
            Err(ValidationError::MissingElement("tool_name"))
        );
        assert_eq!(
            read_strict(
                "<response><thought>t</thought><action><tool_name>NOPE</tool_name><reason>r</reason></action></response>"
            ),
            Err(ValidationError::UnknownTool("NOPE".into()))
        );
        assert_eq!(
            read_strict(
                "<response><thought><to_do><step><name>a</name><reason>r</reason></step></to_do></thought>\
                 <final_answer>4</final_answer></response>"
            ),
            Err(ValidationError::MissingStepField { position: 1, field: "description" })
        );
    }

    #[test]
    fn test_answer_and_action_together_rejected() {
        let result = read_strict(
            "<response><thought>t</thought><action><tool_name>ECHO</tool_name><reason>r</reason></action>\
             <answer>4</answer></response>",
        );
        assert_eq!(result, Err(ValidationError::AmbiguousDecision { actions: 1, answers: 1 }));
    }

    #[test]
    fn test_two_actions_rejected() {
        let xml = "<response><thought>t</thought>\
                   <action><tool_name>ECHO</tool_name><reason>first</reason></action>\
                   <action><tool_name>SHELL_COMMAND</tool_name><reason>second</reason></action></response>";
        let expected = Err(ValidationError::AmbiguousDecision { actions: 2, answers: 0 });
        assert_eq!(read_strict(xml), expected);
        assert_eq!(read_lenient(xml), expected);

        let answers = "<response><thought>t</thought><final_answer>a</final_answer><answer>b</answer></response>";
        assert_eq!(
            read_strict(answers),
            Err(ValidationError::AmbiguousDecision { actions: 0, answers: 2 })
        );
    }

    #[test]
    fn test_lenient_argument_named_answer_is_not_a_decision() {
        let response = read_lenient(
            "<response><thought>t</thought><action><tool_name>ECHO</tool_name><reason>r</reason>\
             <arguments><answer>42</answer></arguments></action></response>",
        )
        .unwrap();
        assert_eq!(response.action().unwrap().arguments["answer"], "42");
    }

    #[test]
    fn test_lenient_aliases() {
        let response = read_lenient(
            "<response><thought><reasoning>p</reasoning><done><step><n>a</n><description>d</description>\
             <reason>r</reason><r>X</r><depends_on><step_name>z</step_name></depends_on></step></done>\
             </thought><answer>X</answer></response>",
        )
        .unwrap();
        let step = &response.thought.done()[0];
        assert_eq!(step.name, "a");
        assert_eq!(step.result.as_deref(), Some("X"));
        assert_eq!(step.depends_on_steps, vec!["z".to_string()]);
    }

    #[test]
    fn test_lenient_unclosed_thought_keeps_answer() {
        let response = read_lenient("<response><thought>thinking hard<final_answer>4</final_answer></response>").unwrap();
        assert_eq!(response.thought.reasoning(), "thinking hard");
        assert_eq!(response.final_answer(), Some("4"));
    }

    #[test]
    fn test_lenient_unclosed_arg() {
        let response = read_lenient(
            "<response><thought>t</thought><action><tool_name>ECHO</tool_name><reason>r</reason><arguments>\
             <arg><name>a</name><value>1</value><arg><name>b</name><value>2</value></arg>\
             </arguments></action></response>",
        )
        .unwrap();
        let args = &response.action().unwrap().arguments;
        assert_eq!(args["a"], "1");
        assert_eq!(args["b"], "2");
    }
}

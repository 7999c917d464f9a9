//! Prompt assembly for one THINKING step

use tracing::warn;

use crate::tools::ToolDefinition;

use super::state::{AgentConfig, AgentState};

const RESPONSE_FORMATS: &str = r#"### Format 1 - use a tool
```xml
<response>
  <thought>
    <reasoning><![CDATA[Your reasoning about the next step]]></reasoning>
    <to_do>
      <step>
        <name>unique_step_name</name>
        <description>What the step does</description>
        <reason>Why it is needed</reason>
        <depends_on_steps><step_name>earlier_step</step_name></depends_on_steps>
      </step>
    </to_do>
    <done><!-- copy completed steps from the progress section --></done>
  </thought>
  <action>
    <tool_name>EXACT_TOOL_NAME</tool_name>
    <reason><![CDATA[Why this tool]]></reason>
    <step_name>unique_step_name</step_name>
    <arguments>
      <arg>
        <name>argument_name</name>
        <value><![CDATA[argument value, may reference $earlier_step$]]></value>
      </arg>
    </arguments>
  </action>
</response>
```

### Format 2 - the goal is fully achieved
```xml
<response>
  <thought><![CDATA[Why you can answer now]]></thought>
  <final_answer><![CDATA[Your final answer, in Markdown unless the query asks otherwise]]></final_answer>
</response>
```"#;

/// Build the prompt for the current iteration
pub fn build_prompt(state: &AgentState, config: &AgentConfig, tools: &[ToolDefinition]) -> String {
    let tools_json = serde_json::to_string_pretty(tools).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize tool definitions");
        String::from("[]")
    });
    let remaining = config.max_iterations.saturating_sub(state.iteration);

    format!(
        r#"# Goal

You are a ReAct (Reasoning and Acting) agent. Answer the following query:

<query><![CDATA[
{query}
]]></query>

## Session history

<history><![CDATA[
{history}
]]></history>

- Current iteration: {iteration}
- Max iterations: {max_iterations}
- You have {remaining} iterations left.

## Available tools

```json
{tools_json}
```

## Plan and progress

{ledger}
## Instructions

1. Review the query, the history and the progress above, then decide the next step.
2. Either call exactly one tool or give the final answer.
3. Steps already in `done` have results; reference a result in a tool argument as `$step_name$`.
4. Respond with ONLY one XML document in one of these formats:

{formats}

Do not write anything outside the XML block. The XML must be well-formed; wrap free text in CDATA.
"#,
        query = state.query,
        history = state.render_history(),
        iteration = state.iteration,
        max_iterations = config.max_iterations,
        remaining = remaining,
        tools_json = tools_json,
        ledger = state.ledger.render(config.ledger_format),
        formats = RESPONSE_FORMATS,
    )
}

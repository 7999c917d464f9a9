//! Agent loop implementation

use std::io::{stdout, Write};
use std::sync::Arc;

use llm_core::GenerativeModel;
use tracing::{debug, info, instrument, warn};

use crate::response::{Action, Decision, ResponseParser, Step, Thought};
use crate::tools::router::{RouteResult, ToolRouter};
use crate::tools::{ToolCall, ToolContext};

use super::error::AgentError;
use super::prompt::build_prompt;
use super::state::{AgentConfig, AgentPhase, AgentState, Role};

// ANSI colors
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const CYAN: &str = "\x1b[96m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Drives think, parse, decide and act until an answer or the budget runs out
pub struct AgentLoop {
    model: Arc<dyn GenerativeModel>,
    router: ToolRouter,
    parser: ResponseParser,
    config: AgentConfig,
}

impl AgentLoop {
    pub fn new(model: Arc<dyn GenerativeModel>, router: ToolRouter, config: AgentConfig) -> Self {
        let parser = ResponseParser::new(router.registry().list_names());
        Self {
            model,
            router,
            parser,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Answer a query. Never fails: errors come back as a message.
    pub async fn execute(&self, query: &str) -> String {
        self.run(query).await.outcome()
    }

    /// Run the loop and return the final state
    #[instrument(skip(self, query), fields(model = %self.model.name()))]
    pub async fn run(&self, query: &str) -> AgentState {
        info!(query_len = query.len(), max_iterations = self.config.max_iterations, "Starting agent loop");
        let mut state = AgentState::new(query);

        let tool_defs = self.router.registry().tool_definitions();
        let tool_ctx = ToolContext::new(self.config.working_dir.clone())
            .with_auto_approve(self.config.auto_approve)
            .with_command_timeout(self.config.command_timeout_secs)
            .with_approval_timeout(self.config.approval_timeout);

        while !state.is_finished() && state.iteration < self.config.max_iterations {
            state.iteration += 1;
            state.transition(AgentPhase::Thinking);
            debug!(iteration = state.iteration, history = state.history.len(), "Starting iteration");
            self.print(format_args!("{DIM}[Iteration {}]{RESET} ", state.iteration));

            let prompt = build_prompt(&state, &self.config, &tool_defs);
            let generation = match self.model.generate(&prompt).await {
                Ok(generation) => generation,
                Err(e) => {
                    let err = AgentError::ModelInvocationFailed(format!("{e:#}"));
                    warn!(error = %err, "Model request failed");
                    self.print(format_args!("{YELLOW}Model error{RESET}\n"));
                    state.mark_error(err.to_string());
                    break;
                }
            };
            state.usage.record(&generation);
            debug!(
                prompt_tokens = generation.prompt_tokens,
                completion_tokens = generation.completion_tokens,
                "Recorded token usage"
            );

            state.transition(AgentPhase::Deciding);
            let response = match self.parser.parse(&generation.content) {
                Ok(response) => response,
                Err(e) => {
                    let err = AgentError::from(e);
                    warn!(iteration = state.iteration, error = %err, "Could not parse model response");
                    self.print(format_args!("{YELLOW}Unparseable reply{RESET}\n"));
                    state.add_history(Role::System, format!("Error: {err}"));
                    continue;
                }
            };

            state.add_history(Role::Assistant, format!("Thought: {}", response.thought));
            state.thoughts.push(response.thought.clone());

            match response.decision {
                Decision::Answer(answer) => {
                    info!(iterations = state.iteration, "Agent produced a final answer");
                    self.print(format_args!("{GREEN}Done{RESET}\n"));
                    state.add_history(Role::Assistant, format!("Answer: {answer}"));
                    state.mark_complete(answer);
                }
                Decision::Act(action) => {
                    if let Thought::Structured(plan) = &response.thought {
                        state.ledger.merge_plan(&plan.to_do);
                    }
                    self.print(format_args!("{CYAN}[Tool: {}]{RESET} ", action.tool_name));

                    match self.handle_action(&mut state, &action, &tool_ctx).await {
                        Ok(output) => {
                            self.print(format_args!("{GREEN}OK{RESET}\n"));
                            state.add_history(
                                Role::Tool,
                                format!("Observation from {}: {}", action.tool_name, output),
                            );
                        }
                        Err(err) if err.is_recoverable() => {
                            self.print(format_args!("{YELLOW}Failed{RESET}\n"));
                            state.add_history(Role::Tool, format!("Observation: {err}"));
                        }
                        Err(err) => {
                            warn!(error = %err, "Unrecoverable tool failure");
                            self.print(format_args!("{YELLOW}Crashed{RESET}\n"));
                            state.mark_error(err.to_string());
                        }
                    }
                }
            }
        }

        if !state.is_finished() {
            let exhausted = AgentError::IterationBudgetExhausted(self.config.max_iterations);
            warn!(error = %exhausted, "Agent stopped without an answer");
        }

        info!(
            phase = %state.phase,
            iterations = state.iteration,
            usage = %state.usage.summary(),
            error = ?state.error,
            "Agent loop completed"
        );

        state
    }

    /// Interpolate, route and record one tool call
    async fn handle_action(
        &self,
        state: &mut AgentState,
        action: &Action,
        ctx: &ToolContext,
    ) -> Result<String, AgentError> {
        let call = ToolCall {
            name: action.tool_name.clone(),
            arguments: action
                .arguments
                .iter()
                .map(|(name, value)| (name.clone(), state.ledger.interpolate(value)))
                .collect(),
        };

        match self.router.route(&call, ctx).await {
            RouteResult::Success(output) => {
                let step = step_for(state, action);
                debug!(step = %step.name, "Recording completed step");
                state.ledger.record_completed(step, output.clone());
                Ok(output)
            }
            RouteResult::NotFound(name) => Err(AgentError::ToolNotFound(name)),
            RouteResult::NotApproved(name) => Err(AgentError::ToolNotApproved(name)),
            RouteResult::InvalidArguments { tool, error } => Err(AgentError::ArgumentCoercionFailed { tool, source: error }),
            RouteResult::Failed { tool, error } => Err(AgentError::ToolExecutionFailed {
                tool,
                message: error.to_string(),
            }),
            RouteResult::Crashed { tool, message } => Err(AgentError::ToolCrashed { tool, message }),
        }
    }

    fn print(&self, args: std::fmt::Arguments<'_>) {
        if self.config.verbose {
            print!("{args}");
            let _ = stdout().flush();
        }
    }
}

/// The step an action carries out: the named one, else the next planned one,
/// else a step synthesised for this iteration
fn step_for(state: &AgentState, action: &Action) -> Step {
    let planned = match &action.step_name {
        Some(name) => state.ledger.to_do().iter().find(|step| &step.name == name),
        None => state.ledger.next_planned(),
    };
    if let Some(step) = planned {
        return step.clone();
    }

    let name = action
        .step_name
        .clone()
        .unwrap_or_else(|| format!("step_{}", state.iteration));
    Step::new(name, format!("Run {}", action.tool_name), action.reason.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::NO_ANSWER;
    use crate::tools::registry::ToolRegistry;
    use crate::tools::security::{AutoApprove, AutoDeny};
    use crate::tools::{required_str, Tool, ToolArgument, ToolError};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use llm_core::Generation;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned replies; repeats `fallback` once the script runs out
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, String>>>,
        fallback: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
                fallback: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn repeating(reply: &str) -> Self {
            Self {
                fallback: Some(reply.to_string()),
                ..Self::new(&[])
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
                ..Self::new(&[])
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        fn prompt(&self, index: usize) -> String {
            self.prompts.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> anyhow::Result<Generation> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let next = self.replies.lock().unwrap().pop_front();
            match next.or_else(|| self.fallback.clone().map(Ok)) {
                Some(Ok(content)) => Ok(Generation::text(content).with_usage(10, 5, Duration::from_millis(5))),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("script exhausted")),
            }
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "ECHO"
        }

        fn description(&self) -> &str {
            "Echoes text"
        }

        fn arguments(&self) -> Vec<ToolArgument> {
            vec![ToolArgument::string("text", "Text to echo")]
        }

        async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<String, ToolError> {
            Ok(required_str(args, "text")?.to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "FAIL"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn arguments(&self) -> Vec<ToolArgument> {
            Vec::new()
        }

        async fn execute(&self, _args: &Value, _ctx: &ToolContext) -> Result<String, ToolError> {
            Err(ToolError::execution("disk full"))
        }
    }

    struct GuardedTool;

    #[async_trait]
    impl Tool for GuardedTool {
        fn name(&self) -> &str {
            "GUARDED"
        }

        fn description(&self) -> &str {
            "Needs approval"
        }

        fn arguments(&self) -> Vec<ToolArgument> {
            Vec::new()
        }

        fn need_validation(&self) -> bool {
            true
        }

        async fn execute(&self, _args: &Value, _ctx: &ToolContext) -> Result<String, ToolError> {
            Ok("ran".to_string())
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "PANIC"
        }

        fn description(&self) -> &str {
            "Always panics"
        }

        fn arguments(&self) -> Vec<ToolArgument> {
            Vec::new()
        }

        async fn execute(&self, _args: &Value, _ctx: &ToolContext) -> Result<String, ToolError> {
            panic!("corrupted state");
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(FailingTool);
        registry.register(GuardedTool);
        registry.register(PanickingTool);
        registry
    }

    fn build_agent(model: Arc<ScriptedModel>, max_iterations: usize) -> AgentLoop {
        AgentLoop::new(
            model,
            ToolRouter::new(registry(), AutoApprove),
            AgentConfig::new().with_max_iterations(max_iterations),
        )
    }

    fn answer(text: &str) -> String {
        format!("<response><thought>done</thought><final_answer>{text}</final_answer></response>")
    }

    fn call(tool: &str, args: &str) -> String {
        format!(
            "```xml\n<response><thought>use a tool</thought><action><tool_name>{tool}</tool_name>\
             <reason>needed</reason><arguments>{args}</arguments></action></response>\n```"
        )
    }

    #[tokio::test]
    async fn test_direct_answer_in_one_iteration() {
        let model = Arc::new(ScriptedModel::new(&[
            "<response><thought>math</thought><final_answer>4</final_answer></response>",
        ]));
        let agent = build_agent(model.clone(), 20);

        let state = agent.run("What is 2+2?").await;
        assert_eq!(state.phase, AgentPhase::Complete);
        assert_eq!(state.iteration, 1);
        assert_eq!(state.final_response.as_deref(), Some("4"));
        assert_eq!(model.calls(), 1);
        assert_eq!(state.usage.total_tokens(), 15);

        let model = Arc::new(ScriptedModel::new(&[
            "<response><thought>math</thought><final_answer>4</final_answer></response>",
        ]));
        assert_eq!(build_agent(model, 20).execute("What is 2+2?").await, "4");
    }

    #[tokio::test]
    async fn test_tool_then_answer() {
        let model = Arc::new(ScriptedModel::new(&[
            &call("ECHO", "<arg><name>text</name><value>hi</value></arg>"),
            &answer("hi"),
        ]));
        let agent = build_agent(model.clone(), 20);

        let state = agent.run("Say hi").await;
        assert_eq!(state.iteration, 2);
        assert_eq!(state.final_response.as_deref(), Some("hi"));
        assert!(state
            .history
            .iter()
            .any(|entry| entry.role == Role::Tool && entry.content == "Observation from ECHO: hi"));
        assert!(model.prompt(1).contains("Observation from ECHO: hi"));
        assert_eq!(state.ledger.done().len(), 1);
        assert_eq!(state.ledger.variable("step_1"), Some("hi"));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_sentinel() {
        let model = Arc::new(ScriptedModel::repeating(&call(
            "ECHO",
            "<arg><name>text</name><value>again</value></arg>",
        )));
        let agent = build_agent(model.clone(), 3);

        assert_eq!(agent.execute("loop forever").await, NO_ANSWER);
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_parse_failures_consume_iterations() {
        let model = Arc::new(ScriptedModel::new(&["I think it is 4.", &answer("4")]));
        let agent = build_agent(model.clone(), 5);

        let state = agent.run("What is 2+2?").await;
        assert_eq!(state.iteration, 2);
        assert_eq!(state.final_response.as_deref(), Some("4"));
        assert!(model.prompt(1).contains("system: Error: no ```xml block"));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation() {
        let model = Arc::new(ScriptedModel::new(&[&call("NOPE", ""), &answer("gave up")]));
        let state = build_agent(model, 5).run("q").await;

        assert_eq!(state.final_response.as_deref(), Some("gave up"));
        assert!(state
            .history
            .iter()
            .any(|entry| entry.role == Role::System && entry.content.contains("unknown tool 'NOPE'")));
    }

    #[tokio::test]
    async fn test_tool_failure_is_not_fatal() {
        let model = Arc::new(ScriptedModel::new(&[&call("FAIL", ""), &answer("recovered")]));
        let state = build_agent(model, 5).run("q").await;

        assert_eq!(state.iteration, 2);
        assert_eq!(state.phase, AgentPhase::Complete);
        assert!(state
            .history
            .iter()
            .any(|entry| entry.content == "Observation: Error executing tool FAIL: disk full"));
        assert!(state.ledger.done().is_empty());
    }

    #[tokio::test]
    async fn test_bad_arguments_are_reported() {
        let model = Arc::new(ScriptedModel::new(&[&call("ECHO", ""), &answer("ok")]));
        let state = build_agent(model, 5).run("q").await;

        assert!(state
            .history
            .iter()
            .any(|entry| entry.content.contains("Invalid arguments for tool ECHO: missing required argument 'text'")));
    }

    #[tokio::test]
    async fn test_denied_approval_is_observation() {
        let model = Arc::new(ScriptedModel::new(&[&call("GUARDED", ""), &answer("skipped")]));
        let agent = AgentLoop::new(
            model,
            ToolRouter::new(registry(), AutoDeny),
            AgentConfig::new().with_max_iterations(5),
        );

        let state = agent.run("q").await;
        assert_eq!(state.final_response.as_deref(), Some("skipped"));
        assert!(state
            .history
            .iter()
            .any(|entry| entry.content == "Observation: Action not approved: GUARDED"));
    }

    #[tokio::test]
    async fn test_model_failure_is_fatal() {
        let model = Arc::new(ScriptedModel::failing("connection refused"));
        let agent = build_agent(model.clone(), 5);

        let result = agent.execute("q").await;
        assert_eq!(
            result,
            "An error occurred while processing your query: Model invocation failed: connection refused"
        );
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_panic_moves_to_error() {
        let model = Arc::new(ScriptedModel::new(&[&call("PANIC", ""), &answer("never")]));
        let agent = build_agent(model.clone(), 5);

        let state = agent.run("q").await;
        assert_eq!(state.phase, AgentPhase::Error);
        assert!(state.error.unwrap().contains("Tool PANIC crashed: corrupted state"));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_results_interpolate_into_later_steps() {
        let first = "<response><thought><reasoning>greet first</reasoning><to_do>\
                     <step><name>greet</name><description>Say hi</description><reason>asked</reason></step>\
                     <step><name>extend</name><description>Add more</description><reason>asked</reason>\
                     <depends_on_steps><step_name>greet</step_name></depends_on_steps></step>\
                     </to_do><done/></thought><action><tool_name>ECHO</tool_name><reason>greet</reason>\
                     <arguments><text>hi</text></arguments></action></response>";
        let second = "<response><thought><reasoning>extend it</reasoning><to_do>\
                      <step><name>greet</name><description>Say hi</description><reason>asked</reason></step>\
                      <step><name>extend</name><description>Add more</description><reason>asked</reason>\
                      <depends_on_steps><step_name>greet</step_name></depends_on_steps></step>\
                      </to_do><done/></thought><action><tool_name>echo</tool_name><reason>extend</reason>\
                      <step_name>extend</step_name><arguments><text>$greet$ there $missing$</text></arguments>\
                      </action></response>";
        let model = Arc::new(ScriptedModel::new(&[first, second, &answer("done")]));

        let state = build_agent(model, 5).run("q").await;
        assert_eq!(state.ledger.variable("greet"), Some("hi"));
        assert_eq!(state.ledger.variable("extend"), Some("hi there $missing$"));
        assert!(state.ledger.to_do().is_empty());

        let done: Vec<&str> = state.ledger.done().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(done, vec!["greet", "extend"]);
        assert_eq!(state.ledger.done()[1].depends_on_steps, vec!["greet".to_string()]);
    }

    #[tokio::test]
    async fn test_zero_budget_never_calls_model() {
        let model = Arc::new(ScriptedModel::new(&[&answer("4")]));
        assert_eq!(build_agent(model.clone(), 0).execute("q").await, NO_ANSWER);
        assert_eq!(model.calls(), 0);
    }
}
